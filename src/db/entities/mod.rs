//! SeaORM entities that map to database tables.
//!
//! Each entity is defined in its own module. Handlers never touch these types
//! directly; the store implementations in `db::services` convert them into
//! the plain records in `db::models`.

pub mod auth_token;
pub mod ingredient;
pub mod recipe;
pub mod recipe_ingredient;
pub mod recipe_tag;
pub mod tag;
pub mod user;

