//! The `services` module holds the sea-orm implementations of the store
//! traits in `db::store`. All SQL lives here; the rest of the application
//! works with the plain records in `db::models`.
//!
//! One sub-module per entity, each exposing a cheap-to-clone service struct
//! that wraps the shared `DatabaseConnection`.

pub mod ingredient_service;
pub mod recipe_service;
pub mod tag_service;
pub mod token_service;
pub mod user_service;

pub use ingredient_service::IngredientService;
pub use recipe_service::RecipeService;
pub use tag_service::TagService;
pub use token_service::TokenService;
pub use user_service::UserService;
