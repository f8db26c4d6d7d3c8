//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gatekeep_core::auth::AuthError;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Upstream provider failed: {0}")]
    BadGateway(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::Conflict(m) => (StatusCode::CONFLICT, "conflict", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            AppError::BadGateway(_) => (
                StatusCode::BAD_GATEWAY,
                "bad_gateway",
                "Identity provider request failed",
            ),
            AppError::StoreUnavailable(m) => {
                error!(cause = %m, "store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "store_unavailable",
                    "Session store unavailable",
                )
            }
            AppError::Internal(m) => {
                error!(cause = %m, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => AppError::Unauthorized(e.to_string()),
            AuthError::TokenExpired
            | AuthError::TokenInvalid
            | AuthError::SessionNotFound
            | AuthError::SessionRevoked => AppError::Unauthorized("Authentication required".into()),
            AuthError::UnverifiedFederatedEmail => {
                AppError::Forbidden("Google account is not verified".into())
            }
            AuthError::EmailTaken => AppError::Conflict(e.to_string()),
            AuthError::Validation(msg) => AppError::Validation(msg),
            AuthError::StoreUnavailable(msg) => AppError::StoreUnavailable(msg),
            AuthError::FederationExchangeFailed(msg) => AppError::BadGateway(msg),
            AuthError::Config(msg) | AuthError::KeyConfig(msg) | AuthError::Internal(msg) => {
                AppError::Internal(msg)
            }
        }
    }
}
