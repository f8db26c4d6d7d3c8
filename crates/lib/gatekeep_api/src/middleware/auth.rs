//! Request authentication: token extraction, silent refresh and the
//! identity guard.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{AUTHORIZATION, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use gatekeep_core::auth::session::Resolution;
use gatekeep_core::models::auth::TokenClaims;
use tracing::{debug, warn};

use crate::AppState;
use crate::error::AppError;
use crate::services::cookies::{self, ACCESS_COOKIE, REFRESH_COOKIE};

/// Request header carrying the refresh token for non-browser clients.
pub const REFRESH_HEADER: &str = "x-refresh";
/// Response header carrying a freshly minted access token.
pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// Claims of the identity attached to the current request.
///
/// Stored in request extensions by [`deserialize_user`]. As an extractor it
/// is the identity guard: handlers taking it reject anonymous requests with
/// `401`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub TokenClaims);

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))
    }
}

/// Access token from the `accessToken` cookie, else `Authorization: Bearer`.
fn access_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    jar.get(ACCESS_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::to_string)
        })
        .filter(|t| !t.is_empty())
}

/// Refresh token from the `refreshToken` cookie, else the `x-refresh` header.
fn refresh_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    jar.get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| {
            headers
                .get(REFRESH_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .filter(|t| !t.is_empty())
}

/// True when the handler already set (or cleared) the access cookie.
fn sets_access_cookie(response: &Response) -> bool {
    let prefix = format!("{ACCESS_COOKIE}=");
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&prefix))
}

/// Axum middleware: resolves the request's identity from its tokens and
/// injects [`AuthenticatedUser`] into request extensions.
///
/// Never rejects. Anonymous requests pass through untouched; protected
/// handlers enforce the identity through the extractor. When the access
/// token was absent or expired and a refresh succeeded, the new access token
/// goes back both as a cookie and in the `x-access-token` header.
pub async fn deserialize_user(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let access = access_token(&jar, request.headers());
    let refresh = refresh_token(&jar, request.headers());

    match state
        .sessions
        .resolve(access.as_deref(), refresh.as_deref())
        .await
    {
        Resolution::Anonymous => next.run(request).await,
        Resolution::Authenticated(claims) => {
            request.extensions_mut().insert(AuthenticatedUser(claims));
            next.run(request).await
        }
        Resolution::Refreshed {
            claims,
            access_token,
        } => {
            debug!(session_id = %claims.session, "access token reissued");
            request.extensions_mut().insert(AuthenticatedUser(claims));
            let mut response = next.run(request).await;

            if sets_access_cookie(&response) {
                return response;
            }

            let cookie = cookies::access_cookie(
                &access_token,
                &state.config.cookies,
                state.sessions.ttl().access,
            );
            match (
                HeaderValue::from_str(&access_token),
                HeaderValue::from_str(&cookie.to_string()),
            ) {
                (Ok(token), Ok(cookie)) => {
                    let headers = response.headers_mut();
                    headers.insert(ACCESS_TOKEN_HEADER, token);
                    headers.append(SET_COOKIE, cookie);
                }
                _ => warn!("reissued access token is not a valid header value"),
            }
            response
        }
    }
}
