//! # gatekeep_api
//!
//! HTTP API library for Gatekeep: routes, cookie transport and the
//! request authentication middleware over `gatekeep_core`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use gatekeep_core::auth::AuthError;
use gatekeep_core::auth::accounts::AccountService;
use gatekeep_core::auth::jwt::TokenCodec;
use gatekeep_core::auth::oauth::{FederationClient, IdentityProvider};
use gatekeep_core::auth::password::Bcrypt;
use gatekeep_core::auth::session::SessionManager;
use gatekeep_core::store::{IdentityStore, SessionStore};
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::config::ApiConfig;
use crate::handlers::{health, oauth, sessions, users};
use crate::middleware::auth::{ACCESS_TOKEN_HEADER, REFRESH_HEADER};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub accounts: Arc<AccountService>,
    pub federation: Arc<FederationClient>,
    pub config: ApiConfig,
}

impl AppState {
    /// Wire the core services over the given stores and provider.
    ///
    /// Fails when the token TTLs are out of range or the configured key pair
    /// cannot be loaded or does not match.
    pub fn new(
        config: ApiConfig,
        session_store: Arc<dyn SessionStore>,
        identities: Arc<dyn IdentityStore>,
        provider: Arc<dyn IdentityProvider>,
    ) -> Result<Self, AuthError> {
        config.token_ttl.validate()?;
        let codec = Arc::new(TokenCodec::from_rsa_pem(
            config.private_key_pem.as_bytes(),
            config.public_key_pem.as_bytes(),
        )?);
        let sessions = Arc::new(SessionManager::new(codec, session_store, config.token_ttl));
        let accounts = Arc::new(AccountService::new(
            Arc::clone(&identities),
            Arc::new(Bcrypt::new(config.bcrypt_cost)),
        ));
        let federation = Arc::new(FederationClient::new(
            provider,
            identities,
            Arc::clone(&sessions),
        ));

        Ok(Self {
            sessions,
            accounts,
            federation,
            config,
        })
    }
}

fn cors(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static(REFRESH_HEADER),
        ])
        .expose_headers([HeaderName::from_static(ACCESS_TOKEN_HEADER)]);

    match HeaderValue::from_str(origin) {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            warn!(origin, "invalid ORIGIN, cross-origin requests disabled");
            layer
        }
    }
}

/// Builds the Axum router with all routes and shared state.
///
/// Every request passes through [`middleware::auth::deserialize_user`];
/// protected handlers take [`middleware::auth::AuthenticatedUser`].
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(routes::GET_HEALTHCHECK, get(health::healthcheck))
        .route(routes::POST_API_USERS, post(users::create_user_handler))
        .route(routes::GET_API_ME, get(users::current_user_handler))
        .route(
            routes::API_SESSIONS,
            post(sessions::create_session_handler)
                .get(sessions::list_sessions_handler)
                .delete(sessions::delete_session_handler),
        )
        .route(
            routes::GET_API_SESSIONS_OAUTH_URL,
            get(oauth::oauth_url_handler),
        )
        .route(
            routes::GET_API_SESSIONS_OAUTH_GOOGLE,
            get(oauth::google_oauth_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::deserialize_user,
        ))
        .layer(cors(&state.config.origin))
        .with_state(state)
}
