//! Liveness probe.

use axum::http::StatusCode;

/// `GET /healthcheck`: always `200`.
pub async fn healthcheck() -> StatusCode {
    StatusCode::OK
}
