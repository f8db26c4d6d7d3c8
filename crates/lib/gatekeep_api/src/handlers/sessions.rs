//! Session handlers: login, listing and logout.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum_extra::extract::cookie::CookieJar;
use tracing::info;

use super::user_agent;
use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{LoginRequest, LogoutResponse, SessionResponse, TokenResponse};
use crate::services::cookies;

/// `POST /api/sessions`: password login. Sets both token cookies and
/// returns the pair in the body.
pub async fn create_session_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<TokenResponse>)> {
    let identity = state
        .accounts
        .verify_password(&body.email, &body.password)
        .await?;
    let pair = state
        .sessions
        .login(&identity, &user_agent(&headers))
        .await?;

    let jar = cookies::set_token_cookies(jar, &pair, &state.config.cookies, state.sessions.ttl());
    Ok((jar, Json(pair.into())))
}

/// `GET /api/sessions`: valid sessions of the current identity.
pub async fn list_sessions_handler(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<SessionResponse>>> {
    let sessions = state.sessions.list_active_sessions(claims.sub).await?;
    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}

/// `DELETE /api/sessions`: revoke the current session and clear cookies.
pub async fn delete_session_handler(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<LogoutResponse>)> {
    state.sessions.revoke(claims.session).await?;
    info!(session_id = %claims.session, "logged out");

    let jar = cookies::clear_token_cookies(jar, &state.config.cookies);
    Ok((jar, Json(LogoutResponse::default())))
}
