//! Shared harness: in-memory stores, a scripted identity provider and the
//! fixture key pair.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Method, Request, Response};
use axum_extra::extract::cookie::Cookie;
use gatekeep_api::config::ApiConfig;
use gatekeep_api::services::cookies::CookieSettings;
use gatekeep_api::{AppState, router};
use gatekeep_core::auth::AuthError;
use gatekeep_core::auth::oauth::{IdentityProvider, OAuthProviderConfig, ProviderTokens};
use gatekeep_core::auth::session::TokenTtl;
use gatekeep_core::models::auth::FederatedProfile;
use gatekeep_core::store::memory::MemoryStore;
use serde_json::Value;
use tower::ServiceExt;

pub const PRIVATE_PEM: &str = include_str!("../../../gatekeep_core/testdata/private.pem");
pub const PUBLIC_PEM: &str = include_str!("../../../gatekeep_core/testdata/public.pem");

pub const ORIGIN: &str = "http://localhost:3000";
pub const CONSENT_URL: &str = "https://provider.test/consent";

/// Identity provider that replays a fixed profile.
pub struct ScriptedProvider {
    pub profile: FederatedProfile,
    pub fail_exchange: bool,
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    fn authorization_url(&self) -> String {
        CONSENT_URL.into()
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderTokens, AuthError> {
        if self.fail_exchange || code == "bad" {
            return Err(AuthError::FederationExchangeFailed("invalid_grant".into()));
        }
        Ok(serde_json::from_value(serde_json::json!({
            "access_token": "provider-access",
            "id_token": "provider-id"
        }))
        .expect("provider tokens"))
    }

    async fn fetch_profile(&self, _tokens: &ProviderTokens) -> Result<FederatedProfile, AuthError> {
        Ok(self.profile.clone())
    }
}

pub fn google_profile(verified: bool) -> FederatedProfile {
    FederatedProfile {
        email: "g@x.com".into(),
        name: "Grace".into(),
        picture: Some("https://img.test/g.png".into()),
        verified_email: verified,
    }
}

pub fn test_config() -> ApiConfig {
    ApiConfig {
        bind_addr: "127.0.0.1:0".into(),
        database_url: String::new(),
        origin: ORIGIN.into(),
        cookies: CookieSettings::default(),
        private_key_pem: PRIVATE_PEM.into(),
        public_key_pem: PUBLIC_PEM.into(),
        google: OAuthProviderConfig::google("client", "secret", "http://localhost/cb"),
        token_ttl: TokenTtl::default(),
        bcrypt_cost: 4,
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_provider(ScriptedProvider {
            profile: google_profile(true),
            fail_exchange: false,
        })
    }

    pub fn with_provider(provider: ScriptedProvider) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(
            test_config(),
            store.clone(),
            store.clone(),
            Arc::new(provider),
        )
        .expect("app state");
        Self {
            router: router(state.clone()),
            store,
            state,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.expect("request")
    }

    /// Register `email` with password `secret` and log in.
    pub async fn login(&self, email: &str) -> Response<Body> {
        let created = self
            .send(json_request(
                Method::POST,
                "/api/users",
                serde_json::json!({
                    "email": email,
                    "name": "Alice",
                    "password": "secret",
                    "passwordConfirmation": "secret"
                }),
            ))
            .await;
        assert_eq!(created.status(), 200);

        self.send(json_request(
            Method::POST,
            "/api/sessions",
            serde_json::json!({ "email": email, "password": "secret" }),
        ))
        .await
    }
}

pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .header("user-agent", "integration-test")
        .body(Body::from(body.to_string()))
        .expect("request")
}

/// Request carrying the given cookies.
pub fn cookie_request(method: Method, uri: &str, cookies: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if !cookies.is_empty() {
        let header = cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        builder = builder.header(COOKIE, header);
    }
    builder.body(Body::empty()).expect("request")
}

/// Cookie named `name` set by `response`, if any.
pub fn set_cookie(response: &Response<Body>, name: &str) -> Option<Cookie<'static>> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| Cookie::parse(v.to_string()).ok())
        .find(|c| c.name() == name)
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse JSON")
}
