//! Authentication: token signing, the session lifecycle, password accounts
//! and OAuth federation.
//!
//! Store and network failures are translated into [`AuthError`] here; raw
//! `sqlx` or `reqwest` errors never leave this module.

pub mod accounts;
pub mod jwt;
pub mod oauth;
pub mod password;
pub mod session;

use thiserror::Error;

use crate::store::StoreError;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Password or identity check failed. The message never says which.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token invalid")]
    TokenInvalid,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Federation exchange failed: {0}")]
    FederationExchangeFailed(String),

    #[error("Federated email is not verified")]
    UnverifiedFederatedEmail,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Session revoked")]
    SessionRevoked,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Validation error: {0}")]
    Validation(String),

    /// A setting is out of range. Fatal at startup.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Signing or verification key could not be loaded. Fatal at startup.
    #[error("Key configuration error: {0}")]
    KeyConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(msg) => AuthError::StoreUnavailable(msg),
            StoreError::DuplicateEmail(_) => AuthError::EmailTaken,
        }
    }
}
