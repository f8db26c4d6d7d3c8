//! Session lifecycle: creation with dual-token issuance, listing,
//! revocation, and access-token resolution with refresh.
//!
//! A session is `ACTIVE` (`valid = true`) until revoked; revocation is
//! terminal. Access-token verification is purely cryptographic and never
//! consults the store, so an access token issued before revocation keeps
//! authenticating until it expires (at most one access TTL). Only the
//! refresh path checks the session record.

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::AuthError;
use super::jwt::{TokenCodec, Verified};
use crate::models::auth::{Identity, Session, SessionFilter, SessionPatch, TokenClaims, TokenPair};
use crate::store::SessionStore;

/// Access token lifetime: 15 minutes.
pub const ACCESS_TOKEN_EXPIRY_SECS: i64 = 15 * 60;

/// Refresh token lifetime: 365 days.
pub const REFRESH_TOKEN_EXPIRY_SECS: i64 = 365 * 24 * 60 * 60;

/// Validity windows for issued tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTtl {
    pub access: Duration,
    pub refresh: Duration,
}

/// Longest accepted token lifetime: 100 years.
pub const MAX_TOKEN_TTL_SECS: i64 = 100 * 365 * 24 * 60 * 60;

impl TokenTtl {
    /// Build from second counts, rejecting values [`TokenTtl::validate`]
    /// would reject.
    pub fn from_secs(access: i64, refresh: i64) -> Result<Self, AuthError> {
        let ttl = Self {
            access: ttl_seconds("access", access)?,
            refresh: ttl_seconds("refresh", refresh)?,
        };
        ttl.validate()?;
        Ok(ttl)
    }

    /// Both lifetimes must be positive and at most [`MAX_TOKEN_TTL_SECS`].
    pub fn validate(&self) -> Result<(), AuthError> {
        for (name, ttl) in [("access", self.access), ("refresh", self.refresh)] {
            if ttl <= Duration::zero() || ttl.num_seconds() > MAX_TOKEN_TTL_SECS {
                return Err(AuthError::Config(format!(
                    "{name} token TTL must be between 1 and {MAX_TOKEN_TTL_SECS} seconds, got {}",
                    ttl.num_seconds()
                )));
            }
        }
        Ok(())
    }
}

fn ttl_seconds(name: &str, secs: i64) -> Result<Duration, AuthError> {
    Duration::try_seconds(secs)
        .ok_or_else(|| AuthError::Config(format!("{name} token TTL out of range: {secs}")))
}

impl Default for TokenTtl {
    fn default() -> Self {
        Self {
            access: Duration::seconds(ACCESS_TOKEN_EXPIRY_SECS),
            refresh: Duration::seconds(REFRESH_TOKEN_EXPIRY_SECS),
        }
    }
}

/// Identity resolved for one inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No usable token; continue without an identity.
    Anonymous,
    /// The access token verified.
    Authenticated(TokenClaims),
    /// The access token was absent or expired and a new one was minted from
    /// the refresh token. The caller must hand `access_token` back to the
    /// client.
    Refreshed {
        claims: TokenClaims,
        access_token: String,
    },
}

impl Resolution {
    /// Claims of the resolved identity, if any.
    pub fn claims(&self) -> Option<&TokenClaims> {
        match self {
            Resolution::Anonymous => None,
            Resolution::Authenticated(claims) | Resolution::Refreshed { claims, .. } => {
                Some(claims)
            }
        }
    }
}

/// Orchestrates session creation, token issuance and revocation.
pub struct SessionManager {
    codec: Arc<TokenCodec>,
    store: Arc<dyn SessionStore>,
    ttl: TokenTtl,
}

impl SessionManager {
    pub fn new(codec: Arc<TokenCodec>, store: Arc<dyn SessionStore>, ttl: TokenTtl) -> Self {
        Self { codec, store, ttl }
    }

    pub fn ttl(&self) -> TokenTtl {
        self.ttl
    }

    /// Create an active session for an already-verified identity and issue
    /// its access and refresh tokens.
    ///
    /// The session is persisted before anything is signed; if the store
    /// fails no token is issued.
    pub async fn login(&self, identity: &Identity, user_agent: &str) -> Result<TokenPair, AuthError> {
        let session = self.store.create_session(identity.id, user_agent).await?;
        let claims = TokenClaims::for_session(identity, session.id);

        let access_token = self.codec.sign(&claims, self.ttl.access)?;
        let refresh_token = self.codec.sign(&claims, self.ttl.refresh)?;

        info!(identity_id = %identity.id, session_id = %session.id, "session created");
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Sessions owned by `identity_id`, optionally restricted to valid ones.
    pub async fn list_sessions(
        &self,
        identity_id: Uuid,
        only_valid: bool,
    ) -> Result<Vec<Session>, AuthError> {
        let mut filter = SessionFilter::by_identity(identity_id);
        if only_valid {
            filter = filter.with_valid(true);
        }
        Ok(self.store.find_sessions(&filter).await?)
    }

    /// Valid sessions owned by `identity_id`.
    pub async fn list_active_sessions(&self, identity_id: Uuid) -> Result<Vec<Session>, AuthError> {
        self.list_sessions(identity_id, true).await
    }

    /// Revoke a session. Revoking an already-revoked or unknown session is
    /// not an error.
    pub async fn revoke(&self, session_id: Uuid) -> Result<(), AuthError> {
        let matched = self
            .store
            .update_sessions(&SessionFilter::by_id(session_id), &SessionPatch::revoke())
            .await?;
        if matched == 0 {
            debug!(%session_id, "revoke matched no session");
        } else {
            info!(%session_id, "session revoked");
        }
        Ok(())
    }

    /// Verify an access token without consulting the store.
    pub fn verify_access(&self, token: &str) -> Verified<TokenClaims> {
        self.codec.verify(token)
    }

    /// Mint a new access token from a refresh token whose session is still
    /// valid. Returns the claims and the new token.
    pub async fn refresh_access(
        &self,
        refresh_token: &str,
    ) -> Result<(TokenClaims, String), AuthError> {
        let claims: TokenClaims = self.codec.verify(refresh_token).into_result()?;

        let session = self
            .store
            .find_session(claims.session)
            .await?
            .ok_or(AuthError::SessionNotFound)?;
        if !session.valid {
            return Err(AuthError::SessionRevoked);
        }

        let access_token = self.codec.sign(&claims, self.ttl.access)?;
        debug!(session_id = %session.id, "access token refreshed");
        Ok((claims, access_token))
    }

    /// Resolve the identity behind an optional access/refresh token pair.
    ///
    /// A valid access token wins. An absent or expired one falls back to the
    /// refresh token; an access token that is invalid for any other reason
    /// does not. Every failure resolves to [`Resolution::Anonymous`].
    pub async fn resolve(&self, access: Option<&str>, refresh: Option<&str>) -> Resolution {
        match access.map(|token| self.verify_access(token)) {
            Some(Verified::Valid(claims)) => return Resolution::Authenticated(claims),
            Some(Verified::Invalid) => return Resolution::Anonymous,
            Some(Verified::Expired) | None => {}
        }

        let Some(refresh) = refresh else {
            return Resolution::Anonymous;
        };

        match self.refresh_access(refresh).await {
            Ok((claims, access_token)) => Resolution::Refreshed {
                claims,
                access_token,
            },
            Err(AuthError::StoreUnavailable(msg)) => {
                warn!(error = %msg, "session lookup failed during refresh");
                Resolution::Anonymous
            }
            Err(e) => {
                debug!(error = %e, "refresh rejected");
                Resolution::Anonymous
            }
        }
    }
}
