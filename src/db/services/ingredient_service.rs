use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::Query,
};

use crate::db::entities::{ingredient, recipe_ingredient};
use crate::db::models::Ingredient;
use crate::db::store::IngredientStore;
use crate::services::validation::{NAME_MAX_LEN, require_text};
use crate::web::error::AppError;

// --- Ingredient Service ---

#[derive(Clone)]
pub struct IngredientService {
    db: DatabaseConnection,
}

impl IngredientService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl From<ingredient::Model> for Ingredient {
    fn from(model: ingredient::Model) -> Self {
        Ingredient {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
        }
    }
}

#[async_trait]
impl IngredientStore for IngredientService {
    async fn create_ingredient(&self, user_id: i32, name: &str) -> Result<Ingredient, AppError> {
        let name = require_text("name", Some(name), NAME_MAX_LEN)?;

        let new_ingredient = ingredient::ActiveModel {
            user_id: Set(user_id),
            name: Set(name),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        let ingredient_model = new_ingredient.insert(&self.db).await?;
        Ok(ingredient_model.into())
    }

    async fn list_ingredients(&self, user_id: i32, assigned_only: bool) -> Result<Vec<Ingredient>, AppError> {
        let mut query = ingredient::Entity::find().filter(ingredient::Column::UserId.eq(user_id));

        if assigned_only {
            query = query.filter(
                ingredient::Column::Id.in_subquery(
                    Query::select()
                        .column(recipe_ingredient::Column::IngredientId)
                        .from(recipe_ingredient::Entity)
                        .to_owned(),
                ),
            );
        }

        let ingredients = query
            .order_by_desc(ingredient::Column::Name)
            .order_by_desc(ingredient::Column::Id)
            .all(&self.db)
            .await?;
        Ok(ingredients.into_iter().map(Ingredient::from).collect())
    }
}
