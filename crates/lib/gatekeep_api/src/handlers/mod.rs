//! Request handlers.

use axum::http::HeaderMap;
use axum::http::header::USER_AGENT;

pub mod health;
pub mod oauth;
pub mod sessions;
pub mod users;

/// Client user agent, empty when absent.
pub(crate) fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
