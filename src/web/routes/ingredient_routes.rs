use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use std::sync::Arc;

use crate::db::models::Ingredient;
use crate::services::validation::{NAME_MAX_LEN, require_text};
use crate::web::extract::ValidatedJson;
use crate::web::models::{AssignedOnlyQuery, AuthenticatedUser, CreateNamedRequest};
use crate::web::{AppError, AppState};

pub fn create_ingredients_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(get_user_ingredients_handler).post(create_ingredient_handler))
}

async fn create_ingredient_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<CreateNamedRequest>,
) -> Result<(StatusCode, Json<Ingredient>), AppError> {
    let name = require_text("name", payload.name.as_deref(), NAME_MAX_LEN)?;
    let ingredient = app_state
        .ingredients
        .create_ingredient(authenticated_user.id, &name)
        .await?;
    Ok((StatusCode::CREATED, Json(ingredient)))
}

async fn get_user_ingredients_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<AssignedOnlyQuery>,
) -> Result<Json<Vec<Ingredient>>, AppError> {
    let ingredients = app_state
        .ingredients
        .list_ingredients(authenticated_user.id, query.assigned_only()?)
        .await?;
    Ok(Json(ingredients))
}
