//! Storage interfaces, one per entity.
//!
//! The web layer only talks to these traits. Every method that touches
//! user-owned data takes the owner's id and must behave as if records of
//! other owners did not exist.

use async_trait::async_trait;

use crate::db::models::{
    Account, AccountChanges, Ingredient, NewAccount, NewRecipe, Recipe, RecipeChanges,
    RecipeDetail, RecipeFilter, Tag,
};
use crate::web::error::AppError;

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fails with a validation error when the email is already taken.
    async fn insert_account(&self, account: NewAccount) -> Result<Account, AppError>;
    async fn find_by_id(&self, id: i32) -> Result<Option<Account>, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError>;
    async fn update_account(&self, id: i32, changes: AccountChanges) -> Result<Account, AppError>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Returns the account's token, creating it with `new_key` when none exists.
    async fn get_or_create_token(&self, user_id: i32, new_key: &str) -> Result<String, AppError>;
    /// Resolves a token key to the account it belongs to.
    async fn find_account_by_token(&self, key: &str) -> Result<Option<Account>, AppError>;
}

#[async_trait]
pub trait TagStore: Send + Sync {
    async fn create_tag(&self, user_id: i32, name: &str) -> Result<Tag, AppError>;
    /// Ordered by name, descending.
    async fn list_tags(&self, user_id: i32, assigned_only: bool) -> Result<Vec<Tag>, AppError>;
}

#[async_trait]
pub trait IngredientStore: Send + Sync {
    async fn create_ingredient(&self, user_id: i32, name: &str) -> Result<Ingredient, AppError>;
    /// Ordered by name, descending.
    async fn list_ingredients(
        &self,
        user_id: i32,
        assigned_only: bool,
    ) -> Result<Vec<Ingredient>, AppError>;
}

#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Ordered by id, descending. Each recipe appears once.
    async fn list_recipes(&self, user_id: i32, filter: RecipeFilter)
        -> Result<Vec<Recipe>, AppError>;
    async fn get_recipe(&self, user_id: i32, recipe_id: i32) -> Result<Recipe, AppError>;
    async fn get_recipe_detail(
        &self,
        user_id: i32,
        recipe_id: i32,
    ) -> Result<RecipeDetail, AppError>;
    /// Tag and ingredient ids must belong to `user_id`.
    async fn create_recipe(&self, user_id: i32, recipe: NewRecipe) -> Result<Recipe, AppError>;
    async fn update_recipe(
        &self,
        user_id: i32,
        recipe_id: i32,
        changes: RecipeChanges,
    ) -> Result<Recipe, AppError>;
    async fn set_recipe_image(
        &self,
        user_id: i32,
        recipe_id: i32,
        image_path: &str,
    ) -> Result<Recipe, AppError>;
    async fn delete_recipe(&self, user_id: i32, recipe_id: i32) -> Result<(), AppError>;
}
