use axum::{
    Router,
    http::Method,
    middleware as axum_middleware,
    routing::get,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::db::services::{IngredientService, RecipeService, TagService, TokenService, UserService};
use crate::db::store::{IngredientStore, RecipeStore, TagStore};
use crate::server::config::ServerConfig;
use crate::services::auth_service::AuthService;
use crate::services::media_service::MediaStorage;
use crate::web::{middleware::auth, routes::*};

pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub tags: Arc<dyn TagStore>,
    pub ingredients: Arc<dyn IngredientStore>,
    pub recipes: Arc<dyn RecipeStore>,
    pub media: MediaStorage,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wires every store to the sea-orm implementation over `db`.
    pub fn from_database(db: DatabaseConnection, config: Arc<ServerConfig>) -> Self {
        let auth = AuthService::new(
            Arc::new(UserService::new(db.clone())),
            Arc::new(TokenService::new(db.clone())),
            config.bcrypt_cost,
        );
        Self {
            auth,
            tags: Arc::new(TagService::new(db.clone())),
            ingredients: Arc::new(IngredientService::new(db.clone())),
            recipes: Arc::new(RecipeService::new(db)),
            media: MediaStorage::new(&config.media_dir),
            config,
        }
    }
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let user_router = user_routes::create_public_router()
        .merge(user_routes::create_protected_router().route_layer(
            axum_middleware::from_fn_with_state(app_state.clone(), auth::auth),
        ));

    Router::new()
        .route("/health", get(health_check_handler))
        .nest("/user", user_router)
        .nest(
            "/recipe/tags",
            tag_routes::create_tags_router().route_layer(
                axum_middleware::from_fn_with_state(app_state.clone(), auth::auth),
            ),
        )
        .nest(
            "/recipe/ingredients",
            ingredient_routes::create_ingredients_router().route_layer(
                axum_middleware::from_fn_with_state(app_state.clone(), auth::auth),
            ),
        )
        .nest(
            "/recipe/recipes",
            recipe_routes::create_recipes_router(app_state.config.max_upload_bytes)
                .route_layer(axum_middleware::from_fn_with_state(
                    app_state.clone(),
                    auth::auth,
                )),
        )
        .nest_service("/media", ServeDir::new(app_state.media.root()))
        .with_state(app_state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
