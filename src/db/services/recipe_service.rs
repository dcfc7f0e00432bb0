//! Recipe persistence, including the tag and ingredient join tables.
//!
//! Writes that touch more than one table run in a single transaction, and
//! every tag/ingredient id is checked against the recipe owner before any
//! join row is written.

use async_trait::async_trait;
use chrono::Utc;
use futures::try_join;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, ModelTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::Query,
};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::db::entities::{ingredient, recipe, recipe_ingredient, recipe_tag, tag};
use crate::db::models::{
    Ingredient, NewRecipe, Recipe, RecipeChanges, RecipeDetail, RecipeFilter, Tag,
    price_from_cents, price_to_cents,
};
use crate::db::store::RecipeStore;
use crate::services::validation::{TITLE_MAX_LEN, require_text};
use crate::web::error::{AppError, FieldErrors};

#[derive(Clone)]
pub struct RecipeService {
    db: DatabaseConnection,
}

impl RecipeService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Attaches relation ids to already fetched recipe rows, keeping their order.
    async fn with_relations(&self, models: Vec<recipe::Model>) -> Result<Vec<Recipe>, AppError> {
        if models.is_empty() {
            return Ok(Vec::new());
        }
        let recipe_ids: Vec<i32> = models.iter().map(|m| m.id).collect();

        let tags_future = recipe_tag::Entity::find()
            .filter(recipe_tag::Column::RecipeId.is_in(recipe_ids.clone()))
            .order_by_asc(recipe_tag::Column::TagId)
            .all(&self.db);
        let ingredients_future = recipe_ingredient::Entity::find()
            .filter(recipe_ingredient::Column::RecipeId.is_in(recipe_ids))
            .order_by_asc(recipe_ingredient::Column::IngredientId)
            .all(&self.db);

        let (tag_links, ingredient_links) = try_join!(tags_future, ingredients_future)?;

        let mut tag_map: HashMap<i32, Vec<i32>> = HashMap::new();
        for link in tag_links {
            tag_map.entry(link.recipe_id).or_default().push(link.tag_id);
        }
        let mut ingredient_map: HashMap<i32, Vec<i32>> = HashMap::new();
        for link in ingredient_links {
            ingredient_map
                .entry(link.recipe_id)
                .or_default()
                .push(link.ingredient_id);
        }

        Ok(models
            .into_iter()
            .map(|model| {
                let tag_ids = tag_map.remove(&model.id).unwrap_or_default();
                let ingredient_ids = ingredient_map.remove(&model.id).unwrap_or_default();
                to_recipe(model, tag_ids, ingredient_ids)
            })
            .collect())
    }

    async fn load_one(&self, model: recipe::Model) -> Result<Recipe, AppError> {
        self.with_relations(vec![model])
            .await?
            .pop()
            .ok_or_else(|| AppError::InternalServerError("Recipe vanished while loading".to_string()))
    }
}

fn to_recipe(model: recipe::Model, tag_ids: Vec<i32>, ingredient_ids: Vec<i32>) -> Recipe {
    Recipe {
        id: model.id,
        user_id: model.user_id,
        title: model.title,
        time_minute: model.time_minute,
        price: price_from_cents(model.price_cents),
        tag_ids,
        ingredient_ids,
        image: model.image,
    }
}

fn dedup_ids(ids: &[i32]) -> Vec<i32> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn invalid_pk(id: i32) -> String {
    format!("Invalid pk \"{id}\" - object does not exist.")
}

async fn find_owned<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    recipe_id: i32,
) -> Result<recipe::Model, AppError> {
    recipe::Entity::find_by_id(recipe_id)
        .filter(recipe::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe not found".to_string()))
}

/// Ids from `ids` that are not tags owned by `user_id`.
async fn foreign_tag_ids<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    ids: &[i32],
) -> Result<Vec<i32>, DbErr> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let owned: HashSet<i32> = tag::Entity::find()
        .select_only()
        .column(tag::Column::Id)
        .filter(tag::Column::Id.is_in(ids.to_vec()))
        .filter(tag::Column::UserId.eq(user_id))
        .into_tuple::<i32>()
        .all(db)
        .await?
        .into_iter()
        .collect();
    Ok(ids.iter().copied().filter(|id| !owned.contains(id)).collect())
}

async fn foreign_ingredient_ids<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    ids: &[i32],
) -> Result<Vec<i32>, DbErr> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let owned: HashSet<i32> = ingredient::Entity::find()
        .select_only()
        .column(ingredient::Column::Id)
        .filter(ingredient::Column::Id.is_in(ids.to_vec()))
        .filter(ingredient::Column::UserId.eq(user_id))
        .into_tuple::<i32>()
        .all(db)
        .await?
        .into_iter()
        .collect();
    Ok(ids.iter().copied().filter(|id| !owned.contains(id)).collect())
}

/// Rejects relation ids the owner cannot see, reporting every offending id.
async fn check_relations<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    tag_ids: Option<&[i32]>,
    ingredient_ids: Option<&[i32]>,
) -> Result<(), AppError> {
    let mut errors = FieldErrors::new();
    if let Some(ids) = tag_ids {
        for id in foreign_tag_ids(db, user_id, ids).await? {
            errors.add("tags", invalid_pk(id));
        }
    }
    if let Some(ids) = ingredient_ids {
        for id in foreign_ingredient_ids(db, user_id, ids).await? {
            errors.add("ingredient", invalid_pk(id));
        }
    }
    errors.into_result()
}

async fn replace_tags<C: ConnectionTrait>(db: &C, recipe_id: i32, tag_ids: &[i32]) -> Result<(), DbErr> {
    recipe_tag::Entity::delete_many()
        .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
        .exec(db)
        .await?;
    if !tag_ids.is_empty() {
        let links = tag_ids.iter().map(|tag_id| recipe_tag::ActiveModel {
            recipe_id: Set(recipe_id),
            tag_id: Set(*tag_id),
        });
        recipe_tag::Entity::insert_many(links).exec_without_returning(db).await?;
    }
    Ok(())
}

async fn replace_ingredients<C: ConnectionTrait>(
    db: &C,
    recipe_id: i32,
    ingredient_ids: &[i32],
) -> Result<(), DbErr> {
    recipe_ingredient::Entity::delete_many()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .exec(db)
        .await?;
    if !ingredient_ids.is_empty() {
        let links = ingredient_ids
            .iter()
            .map(|ingredient_id| recipe_ingredient::ActiveModel {
                recipe_id: Set(recipe_id),
                ingredient_id: Set(*ingredient_id),
            });
        recipe_ingredient::Entity::insert_many(links).exec_without_returning(db).await?;
    }
    Ok(())
}

#[async_trait]
impl RecipeStore for RecipeService {
    async fn list_recipes(
        &self,
        user_id: i32,
        filter: RecipeFilter,
    ) -> Result<Vec<Recipe>, AppError> {
        let mut query = recipe::Entity::find().filter(recipe::Column::UserId.eq(user_id));

        // Subqueries rather than joins, so a recipe matching several ids is returned once.
        if let Some(tag_ids) = filter.tag_ids {
            query = query.filter(
                recipe::Column::Id.in_subquery(
                    Query::select()
                        .column(recipe_tag::Column::RecipeId)
                        .from(recipe_tag::Entity)
                        .and_where(recipe_tag::Column::TagId.is_in(tag_ids))
                        .to_owned(),
                ),
            );
        }
        if let Some(ingredient_ids) = filter.ingredient_ids {
            query = query.filter(
                recipe::Column::Id.in_subquery(
                    Query::select()
                        .column(recipe_ingredient::Column::RecipeId)
                        .from(recipe_ingredient::Entity)
                        .and_where(recipe_ingredient::Column::IngredientId.is_in(ingredient_ids))
                        .to_owned(),
                ),
            );
        }

        let models = query
            .order_by_desc(recipe::Column::Id)
            .all(&self.db)
            .await?;
        self.with_relations(models).await
    }

    async fn get_recipe(&self, user_id: i32, recipe_id: i32) -> Result<Recipe, AppError> {
        let model = find_owned(&self.db, user_id, recipe_id).await?;
        self.load_one(model).await
    }

    async fn get_recipe_detail(
        &self,
        user_id: i32,
        recipe_id: i32,
    ) -> Result<RecipeDetail, AppError> {
        let model = find_owned(&self.db, user_id, recipe_id).await?;

        let tags_future = model
            .find_related(tag::Entity)
            .order_by_asc(tag::Column::Id)
            .all(&self.db);
        let ingredients_future = model
            .find_related(ingredient::Entity)
            .order_by_asc(ingredient::Column::Id)
            .all(&self.db);
        let (tags, ingredients) = try_join!(tags_future, ingredients_future)?;

        Ok(RecipeDetail {
            id: model.id,
            title: model.title,
            time_minute: model.time_minute,
            price: price_from_cents(model.price_cents),
            tags: tags.into_iter().map(Tag::from).collect(),
            ingredients: ingredients.into_iter().map(Ingredient::from).collect(),
            image: model.image,
        })
    }

    async fn create_recipe(&self, user_id: i32, recipe: NewRecipe) -> Result<Recipe, AppError> {
        let title = require_text("title", Some(&recipe.title), TITLE_MAX_LEN)?;
        let tag_ids = dedup_ids(&recipe.tag_ids);
        let ingredient_ids = dedup_ids(&recipe.ingredient_ids);

        let txn = self.db.begin().await?;

        check_relations(&txn, user_id, Some(tag_ids.as_slice()), Some(ingredient_ids.as_slice())).await?;

        let now = Utc::now();
        let new_recipe = recipe::ActiveModel {
            user_id: Set(user_id),
            title: Set(title),
            time_minute: Set(recipe.time_minute),
            price_cents: Set(price_to_cents(recipe.price)),
            image: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = new_recipe.insert(&txn).await?;

        replace_tags(&txn, model.id, &tag_ids).await?;
        replace_ingredients(&txn, model.id, &ingredient_ids).await?;

        txn.commit().await?;

        debug!(recipe_id = model.id, user_id, "Recipe created.");
        Ok(to_recipe(model, tag_ids, ingredient_ids))
    }

    async fn update_recipe(
        &self,
        user_id: i32,
        recipe_id: i32,
        changes: RecipeChanges,
    ) -> Result<Recipe, AppError> {
        let title = changes
            .title
            .as_deref()
            .map(|t| require_text("title", Some(t), TITLE_MAX_LEN))
            .transpose()?;
        let tag_ids = changes.tag_ids.as_deref().map(dedup_ids);
        let ingredient_ids = changes.ingredient_ids.as_deref().map(dedup_ids);

        let txn = self.db.begin().await?;

        let model = find_owned(&txn, user_id, recipe_id).await?;
        check_relations(&txn, user_id, tag_ids.as_deref(), ingredient_ids.as_deref()).await?;

        let mut active_model = model.into_active_model();
        if let Some(title) = title {
            active_model.title = Set(title);
        }
        if let Some(time_minute) = changes.time_minute {
            active_model.time_minute = Set(time_minute);
        }
        if let Some(price) = changes.price {
            active_model.price_cents = Set(price_to_cents(price));
        }
        active_model.updated_at = Set(Utc::now());
        let model = active_model.update(&txn).await?;

        if let Some(ids) = &tag_ids {
            replace_tags(&txn, recipe_id, ids).await?;
        }
        if let Some(ids) = &ingredient_ids {
            replace_ingredients(&txn, recipe_id, ids).await?;
        }

        txn.commit().await?;

        self.load_one(model).await
    }

    async fn set_recipe_image(
        &self,
        user_id: i32,
        recipe_id: i32,
        image_path: &str,
    ) -> Result<Recipe, AppError> {
        let model = find_owned(&self.db, user_id, recipe_id).await?;

        let mut active_model = model.into_active_model();
        active_model.image = Set(Some(image_path.to_string()));
        active_model.updated_at = Set(Utc::now());
        let model = active_model.update(&self.db).await?;

        self.load_one(model).await
    }

    async fn delete_recipe(&self, user_id: i32, recipe_id: i32) -> Result<(), AppError> {
        let txn = self.db.begin().await?;

        let model = find_owned(&txn, user_id, recipe_id).await?;
        replace_tags(&txn, model.id, &[]).await?;
        replace_ingredients(&txn, model.id, &[]).await?;
        model.delete(&txn).await?;

        txn.commit().await?;
        Ok(())
    }
}
