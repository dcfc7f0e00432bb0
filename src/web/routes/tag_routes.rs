use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use std::sync::Arc;

use crate::db::models::Tag;
use crate::services::validation::{NAME_MAX_LEN, require_text};
use crate::web::extract::ValidatedJson;
use crate::web::models::{AssignedOnlyQuery, AuthenticatedUser, CreateNamedRequest};
use crate::web::{AppError, AppState};

pub fn create_tags_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(get_user_tags_handler).post(create_tag_handler))
}

async fn create_tag_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<CreateNamedRequest>,
) -> Result<(StatusCode, Json<Tag>), AppError> {
    let name = require_text("name", payload.name.as_deref(), NAME_MAX_LEN)?;
    let tag = app_state
        .tags
        .create_tag(authenticated_user.id, &name)
        .await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

async fn get_user_tags_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<AssignedOnlyQuery>,
) -> Result<Json<Vec<Tag>>, AppError> {
    let tags = app_state
        .tags
        .list_tags(authenticated_user.id, query.assigned_only()?)
        .await?;
    Ok(Json(tags))
}
