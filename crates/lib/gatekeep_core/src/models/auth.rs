//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API request/response
//! models in `gatekeep_api` (which rename fields to camelCase etc.).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Domain identity (a user account).
///
/// Credential material is deliberately absent; see [`IdentityWithCredential`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identity with its stored password hash (for internal auth flows).
///
/// Federated identities have no password hash.
#[derive(Debug, Clone)]
pub struct IdentityWithCredential {
    pub identity: Identity,
    pub password_hash: Option<String>,
}

/// Identity record to insert. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub password_hash: Option<String>,
}

/// Profile returned by a federated identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedProfile {
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub verified_email: bool,
}

/// Session record.
///
/// A session is either valid or revoked; revocation is one-way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    /// Owning identity, immutable after creation.
    pub identity_id: Uuid,
    pub valid: bool,
    /// Client user agent captured at creation.
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Conjunctive filter over session records. `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFilter {
    pub id: Option<Uuid>,
    pub identity_id: Option<Uuid>,
    pub valid: Option<bool>,
}

impl SessionFilter {
    /// Match a single session by ID.
    pub fn by_id(id: Uuid) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Match all sessions owned by an identity.
    pub fn by_identity(identity_id: Uuid) -> Self {
        Self {
            identity_id: Some(identity_id),
            ..Self::default()
        }
    }

    /// Restrict to valid (or revoked) sessions.
    pub fn with_valid(mut self, valid: bool) -> Self {
        self.valid = Some(valid);
        self
    }

    /// Whether `session` satisfies every set field.
    pub fn matches(&self, session: &Session) -> bool {
        self.id.is_none_or(|id| session.id == id)
            && self.identity_id.is_none_or(|id| session.identity_id == id)
            && self.valid.is_none_or(|valid| session.valid == valid)
    }
}

/// Partial mutation applied to matching sessions.
///
/// Revocation is the only state change a patch can express; a revoked
/// session never becomes valid again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPatch {
    revoke: bool,
}

impl SessionPatch {
    /// Flip `valid` to false.
    pub fn revoke() -> Self {
        Self { revoke: true }
    }

    /// Whether the patch revokes the matched sessions.
    pub fn revokes(&self) -> bool {
        self.revoke
    }
}

/// Claims embedded in both access and refresh tokens.
///
/// `iat`/`exp` are added by the token codec and are not part of this set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: identity ID.
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// Session the token belongs to.
    pub session: Uuid,
}

impl TokenClaims {
    /// Build the claim set for a session owned by `identity`.
    pub fn for_session(identity: &Identity, session_id: Uuid) -> Self {
        Self {
            sub: identity.id,
            email: identity.email.clone(),
            name: identity.name.clone(),
            picture: identity.picture.clone(),
            session: session_id,
        }
    }
}

/// Freshly issued access + refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}
