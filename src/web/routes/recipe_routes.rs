use axum::{
    Extension, Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Query, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    routing::{get, post},
};
use std::sync::Arc;
use tracing::info;

use crate::db::models::{MEDIA_URL, Recipe, RecipeDetail};
use crate::web::error::FieldErrors;
use crate::web::extract::{ValidatedJson, ValidatedPath};
use crate::web::models::{AuthenticatedUser, RecipeImageResponse, RecipeListQuery, RecipeRequest};
use crate::web::{AppError, AppState};

/// Multipart field that carries the uploaded file.
const IMAGE_FIELD: &str = "image";

pub fn create_recipes_router(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_recipes_handler).post(create_recipe_handler))
        .route(
            "/{recipe_id}",
            get(get_recipe_handler)
                .put(replace_recipe_handler)
                .patch(update_recipe_handler)
                .delete(delete_recipe_handler),
        )
        .route(
            "/{recipe_id}/upload-image",
            post(upload_image_handler).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}

async fn list_recipes_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<RecipeListQuery>,
) -> Result<Json<Vec<Recipe>>, AppError> {
    let recipes = app_state
        .recipes
        .list_recipes(authenticated_user.id, query.into_filter()?)
        .await?;
    Ok(Json(recipes))
}

async fn create_recipe_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<RecipeRequest>,
) -> Result<(StatusCode, Json<Recipe>), AppError> {
    let recipe = app_state
        .recipes
        .create_recipe(authenticated_user.id, payload.into_new_recipe()?)
        .await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn get_recipe_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    ValidatedPath(recipe_id): ValidatedPath<i32>,
) -> Result<Json<RecipeDetail>, AppError> {
    let recipe = app_state
        .recipes
        .get_recipe_detail(authenticated_user.id, recipe_id)
        .await?;
    Ok(Json(recipe))
}

async fn save_recipe(
    app_state: &AppState,
    user_id: i32,
    recipe_id: i32,
    payload: RecipeRequest,
    replace: bool,
) -> Result<Json<Recipe>, AppError> {
    // Ownership first, so another account's recipe is a 404 rather than a validation error.
    app_state.recipes.get_recipe(user_id, recipe_id).await?;
    let changes = payload.into_changes(replace)?;
    let recipe = app_state
        .recipes
        .update_recipe(user_id, recipe_id, changes)
        .await?;
    Ok(Json(recipe))
}

async fn replace_recipe_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    ValidatedPath(recipe_id): ValidatedPath<i32>,
    ValidatedJson(payload): ValidatedJson<RecipeRequest>,
) -> Result<Json<Recipe>, AppError> {
    save_recipe(&app_state, authenticated_user.id, recipe_id, payload, true).await
}

async fn update_recipe_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    ValidatedPath(recipe_id): ValidatedPath<i32>,
    ValidatedJson(payload): ValidatedJson<RecipeRequest>,
) -> Result<Json<Recipe>, AppError> {
    save_recipe(&app_state, authenticated_user.id, recipe_id, payload, false).await
}

async fn delete_recipe_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    ValidatedPath(recipe_id): ValidatedPath<i32>,
) -> Result<StatusCode, AppError> {
    app_state
        .recipes
        .delete_recipe(authenticated_user.id, recipe_id)
        .await?;
    info!(user_id = authenticated_user.id, recipe_id, "Recipe deleted.");
    Ok(StatusCode::NO_CONTENT)
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::InvalidInput(err.body_text())
    }
}

/// Reads the bytes of the `image` field, skipping any other parts.
async fn read_image_field(multipart: &mut Multipart) -> Result<Vec<u8>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        if field.name() == Some(IMAGE_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(multipart_error)?;
            return Ok(bytes.to_vec());
        }
    }
    Err(AppError::Validation(FieldErrors::single(
        IMAGE_FIELD,
        "No file was submitted.",
    )))
}

async fn upload_image_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    ValidatedPath(recipe_id): ValidatedPath<i32>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<RecipeImageResponse>, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    app_state
        .recipes
        .get_recipe(authenticated_user.id, recipe_id)
        .await?;

    let bytes = read_image_field(&mut multipart).await?;
    let path = app_state.media.save_recipe_image(bytes).await?;
    let recipe = match app_state
        .recipes
        .set_recipe_image(authenticated_user.id, recipe_id, &path)
        .await
    {
        Ok(recipe) => recipe,
        Err(e) => {
            app_state.media.discard(&path).await;
            return Err(e);
        }
    };

    Ok(Json(RecipeImageResponse {
        id: recipe.id,
        image: recipe.image.map(|path| format!("{MEDIA_URL}{path}")),
    }))
}
