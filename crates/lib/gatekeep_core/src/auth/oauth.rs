//! OAuth identity federation (Google authorization-code flow).
//!
//! One flow is a single pass with no state kept between steps: build the
//! consent URL, exchange the returned code, fetch the profile, gate on a
//! verified email, upsert the local identity, then create a session.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, info, warn};
use url::Url;

use super::AuthError;
use super::session::SessionManager;
use crate::models::auth::{FederatedProfile, TokenPair};
use crate::store::IdentityStore;

pub const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v1/userinfo";

/// Requested scopes: profile and email only.
pub const GOOGLE_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
];

/// Default timeout for provider round-trips.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Identity provider endpoints and client credentials.
#[derive(Clone)]
pub struct OAuthProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    /// Applied to every provider request; a timeout fails like a
    /// connection error.
    pub timeout: Duration,
}

impl fmt::Debug for OAuthProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthProviderConfig")
            .field("client_id", &self.client_id)
            .field("redirect_url", &self.redirect_url)
            .field("token_url", &self.token_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl OAuthProviderConfig {
    /// Google endpoints with the given client credentials.
    pub fn google(client_id: &str, client_secret: &str, redirect_url: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_url: redirect_url.to_string(),
            authorize_url: GOOGLE_AUTHORIZE_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

/// Tokens returned by the provider's token endpoint.
#[derive(Clone, Deserialize)]
pub struct ProviderTokens {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl fmt::Debug for ProviderTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderTokens")
            .field("access_token", &"<redacted>")
            .field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Google `userinfo` response (only the fields we use).
#[derive(Debug, Deserialize)]
struct GoogleUser {
    email: String,
    #[serde(default)]
    verified_email: bool,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

impl From<GoogleUser> for FederatedProfile {
    fn from(user: GoogleUser) -> Self {
        let name = user
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| user.email.clone());
        FederatedProfile {
            email: user.email,
            name,
            picture: user.picture,
            verified_email: user.verified_email,
        }
    }
}

/// The provider-facing half of a federation flow.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Consent URL the user agent is sent to.
    fn authorization_url(&self) -> String;

    /// Trade a single-use authorization code for provider tokens. Not
    /// retried: a consumed code fails at the provider.
    async fn exchange_code(&self, code: &str) -> Result<ProviderTokens, AuthError>;

    /// Fetch the federated profile.
    async fn fetch_profile(&self, tokens: &ProviderTokens) -> Result<FederatedProfile, AuthError>;
}

/// Google implementation of [`IdentityProvider`].
pub struct GoogleProvider {
    config: OAuthProviderConfig,
    authorize_url: Url,
    client: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(config: OAuthProviderConfig) -> Result<Self, AuthError> {
        let authorize_url = Url::parse(&config.authorize_url)
            .map_err(|e| AuthError::Internal(format!("invalid authorize URL: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AuthError::Internal(format!("http client: {e}")))?;
        Ok(Self {
            config,
            authorize_url,
            client,
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorization_url(&self) -> String {
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("redirect_uri", &self.config.redirect_url)
            .append_pair("client_id", &self.config.client_id)
            .append_pair("access_type", "offline")
            .append_pair("response_type", "code")
            .append_pair("prompt", "consent")
            .append_pair("scope", &GOOGLE_SCOPES.join(" "));
        url.into()
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderTokens, AuthError> {
        let params = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let resp = self
            .client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::FederationExchangeFailed(format!("token exchange: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            error!(%status, %body, "token exchange rejected by provider");
            return Err(AuthError::FederationExchangeFailed(format!(
                "token exchange HTTP {status}"
            )));
        }

        resp.json::<ProviderTokens>().await.map_err(|e| {
            AuthError::FederationExchangeFailed(format!("token response parse error: {e}"))
        })
    }

    async fn fetch_profile(&self, tokens: &ProviderTokens) -> Result<FederatedProfile, AuthError> {
        // The access token rides in the query string; the ID token goes in
        // the Authorization header.
        let mut request = self.client.get(&self.config.userinfo_url).query(&[
            ("alt", "json"),
            ("access_token", tokens.access_token.as_str()),
        ]);
        if let Some(id_token) = &tokens.id_token {
            request = request.bearer_auth(id_token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| AuthError::FederationExchangeFailed(format!("profile fetch: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            error!(%status, "profile fetch rejected by provider");
            return Err(AuthError::FederationExchangeFailed(format!(
                "profile fetch HTTP {status}"
            )));
        }

        let user = resp.json::<GoogleUser>().await.map_err(|e| {
            AuthError::FederationExchangeFailed(format!("profile parse error: {e}"))
        })?;
        Ok(user.into())
    }
}

/// Runs a federation flow end to end and hands the identity to the
/// session lifecycle.
pub struct FederationClient {
    provider: Arc<dyn IdentityProvider>,
    identities: Arc<dyn IdentityStore>,
    sessions: Arc<SessionManager>,
}

impl FederationClient {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        identities: Arc<dyn IdentityStore>,
        sessions: Arc<SessionManager>,
    ) -> Self {
        Self {
            provider,
            identities,
            sessions,
        }
    }

    /// Consent URL: profile+email scopes, offline access, forced consent.
    pub fn authorization_url(&self) -> String {
        self.provider.authorization_url()
    }

    /// Exchange `code`, gate on a verified email, upsert the identity and
    /// create a session.
    ///
    /// Exchange, profile and verification failures leave no identity or
    /// session behind.
    pub async fn complete_login(&self, code: &str, user_agent: &str) -> Result<TokenPair, AuthError> {
        let tokens = self.provider.exchange_code(code).await?;
        debug!(tokens = ?tokens, "provider tokens received");

        let profile = self.provider.fetch_profile(&tokens).await?;
        if !profile.verified_email {
            warn!("federated login with unverified email");
            return Err(AuthError::UnverifiedFederatedEmail);
        }

        let identity = self.identities.upsert_federated_identity(&profile).await?;
        info!(identity_id = %identity.id, "federated identity upserted");

        self.sessions.login(&identity, user_agent).await
    }
}
