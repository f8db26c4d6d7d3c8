//! Identity handlers.

use axum::Json;
use axum::extract::State;
use gatekeep_core::auth::accounts::Registration;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{CreateUserRequest, CurrentUserResponse, IdentityResponse};

/// `POST /api/users`: register an identity with email + password.
pub async fn create_user_handler(
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> AppResult<Json<IdentityResponse>> {
    let identity = state
        .accounts
        .register(Registration {
            email: body.email,
            name: body.name,
            password: body.password,
            password_confirmation: body.password_confirmation,
        })
        .await?;
    Ok(Json(identity.into()))
}

/// `GET /api/me`: the identity carried by the request's token.
pub async fn current_user_handler(user: AuthenticatedUser) -> Json<CurrentUserResponse> {
    Json(user.0.into())
}
