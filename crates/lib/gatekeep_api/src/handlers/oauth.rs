//! Google OAuth handlers.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use gatekeep_core::auth::AuthError;
use serde::Deserialize;
use tracing::{error, warn};

use super::user_agent;
use crate::AppState;
use crate::models::OAuthUrlResponse;
use crate::routes::OAUTH_ERROR_PATH;
use crate::services::cookies;

/// Query parameters for the OAuth callback.
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackParams {
    pub code: Option<String>,
}

/// `GET /api/sessions/oauth/url`: the provider consent URL.
pub async fn oauth_url_handler(State(state): State<AppState>) -> Json<OAuthUrlResponse> {
    Json(OAuthUrlResponse {
        url: state.federation.authorization_url(),
    })
}

/// `GET /api/sessions/oauth/google`: provider callback.
///
/// On success sets both token cookies and redirects to the frontend origin.
/// An unverified Google email is `403`; any other failure redirects to the
/// frontend's error page.
pub async fn google_oauth_handler(
    State(state): State<AppState>,
    Query(params): Query<OAuthCallbackParams>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Response {
    let origin = state.config.origin.trim_end_matches('/');
    let error_redirect = format!("{origin}{OAUTH_ERROR_PATH}");

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        warn!("oauth callback without code");
        return Redirect::to(&error_redirect).into_response();
    };

    match state
        .federation
        .complete_login(&code, &user_agent(&headers))
        .await
    {
        Ok(pair) => {
            let jar =
                cookies::set_token_cookies(jar, &pair, &state.config.cookies, state.sessions.ttl());
            (jar, Redirect::to(&state.config.origin)).into_response()
        }
        Err(AuthError::UnverifiedFederatedEmail) => {
            (StatusCode::FORBIDDEN, "Google account is not verified").into_response()
        }
        Err(e) => {
            error!(error = %e, "failed to authorize Google user");
            Redirect::to(&error_redirect).into_response()
        }
    }
}
