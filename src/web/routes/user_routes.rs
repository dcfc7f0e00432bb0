use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use std::sync::Arc;

use crate::services::auth_service::{self, ProfileInput};
use crate::web::extract::ValidatedJson;
use crate::web::models::{
    AuthenticatedUser, LoginRequest, RegisterRequest, TokenResponse, UserResponse,
};
use crate::web::{AppError, AppState};

/// Signup and token exchange. Mounted without the auth layer.
pub fn create_public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create", post(create_user_handler))
        .route("/token", post(create_token_handler))
}

/// Profile of the calling account.
pub fn create_protected_router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/me",
        get(auth_service::me)
            .put(replace_profile_handler)
            .patch(update_profile_handler),
    )
}

async fn create_user_handler(
    State(app_state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let account = app_state
        .auth
        .create_user(
            payload.email.as_deref(),
            payload.password.as_deref(),
            payload.name.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

async fn create_token_handler(
    State(app_state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let token = app_state
        .auth
        .issue_or_fetch_token(payload.email.as_deref(), payload.password.as_deref())
        .await?;
    Ok(Json(TokenResponse { token }))
}

async fn save_profile(
    app_state: &AppState,
    user_id: i32,
    payload: RegisterRequest,
    replace: bool,
) -> Result<Json<UserResponse>, AppError> {
    let input = ProfileInput {
        email: payload.email,
        password: payload.password,
        name: payload.name,
    };
    let account = app_state.auth.update_profile(user_id, input, replace).await?;
    Ok(Json(account.into()))
}

async fn replace_profile_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<Json<UserResponse>, AppError> {
    save_profile(&app_state, authenticated_user.id, payload, true).await
}

async fn update_profile_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<Json<UserResponse>, AppError> {
    save_profile(&app_state, authenticated_user.id, payload, false).await
}
