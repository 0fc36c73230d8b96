//! `/api/auth` handlers.

use axum::extract::State;
use serde_json::{Value, json};
use tracing::instrument;

use crate::api::extract::{AuthUser, BearerToken, JsonBody, blocking};
use crate::api::{ApiError, ApiResponse};
use crate::services::{AuthSession, LoginRequest, RegisterRequest};
use crate::state::AppState;

/// `POST /api/auth/guest`
#[instrument(skip(state))]
pub async fn create_guest(
    State(state): State<AppState>,
) -> Result<ApiResponse<AuthSession>, ApiError> {
    let session = blocking(&state, |s| s.accounts().create_guest())
        .await
        .map_err(|e| e.context("Error creating guest user"))?;
    Ok(ApiResponse::created(session).with_message("Guest user created successfully"))
}

/// `POST /api/auth/register`
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    BearerToken(header_token): BearerToken,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<ApiResponse<AuthSession>, ApiError> {
    let request = request.or_guest_token(header_token);
    let session = blocking(&state, move |s| s.accounts().register(request))
        .await
        .map_err(|e| e.context("Error registering user"))?;

    let message = if session.upgraded() == &Some(true) {
        "Guest account upgraded to Student successfully"
    } else {
        "User registered successfully"
    };
    Ok(ApiResponse::created(session).with_message(message))
}

/// `POST /api/auth/login`
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<ApiResponse<AuthSession>, ApiError> {
    let session = blocking(&state, move |s| s.accounts().login(request))
        .await
        .map_err(|e| e.context("Error logging in"))?;
    Ok(ApiResponse::ok(session).with_message("Login successful"))
}

/// `POST /api/auth/logout`
///
/// Tokens are stateless; the client discards its copy.
#[instrument]
pub async fn logout() -> ApiResponse<Value> {
    ApiResponse::ok(Value::Null).with_message("Logout successful")
}

/// `GET /api/auth/me`
#[instrument(skip_all, fields(user_id = user.id()))]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<ApiResponse<Value>, ApiError> {
    let user_id = *user.id();
    let profile = blocking(&state, move |s| s.accounts().profile(user_id))
        .await
        .map_err(|e| e.context("Error fetching user info"))?;
    Ok(ApiResponse::ok(json!({ "user": profile })))
}
