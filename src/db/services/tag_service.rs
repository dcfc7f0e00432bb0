use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::Query,
};

use crate::db::entities::{recipe_tag, tag};
use crate::db::models::Tag;
use crate::db::store::TagStore;
use crate::services::validation::{NAME_MAX_LEN, require_text};
use crate::web::error::AppError;

// --- Tag Service ---

#[derive(Clone)]
pub struct TagService {
    db: DatabaseConnection,
}

impl TagService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl From<tag::Model> for Tag {
    fn from(model: tag::Model) -> Self {
        Tag {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
        }
    }
}

#[async_trait]
impl TagStore for TagService {
    async fn create_tag(&self, user_id: i32, name: &str) -> Result<Tag, AppError> {
        let name = require_text("name", Some(name), NAME_MAX_LEN)?;

        let new_tag = tag::ActiveModel {
            user_id: Set(user_id),
            name: Set(name),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        let tag_model = new_tag.insert(&self.db).await?;
        Ok(tag_model.into())
    }

    /// With `assigned_only`, keeps tags attached to at least one recipe. Recipes
    /// can only reference their owner's tags, so no join back to recipes is needed.
    async fn list_tags(&self, user_id: i32, assigned_only: bool) -> Result<Vec<Tag>, AppError> {
        let mut query = tag::Entity::find().filter(tag::Column::UserId.eq(user_id));

        if assigned_only {
            query = query.filter(
                tag::Column::Id.in_subquery(
                    Query::select()
                        .column(recipe_tag::Column::TagId)
                        .from(recipe_tag::Entity)
                        .to_owned(),
                ),
            );
        }

        let tags = query
            .order_by_desc(tag::Column::Name)
            .order_by_desc(tag::Column::Id)
            .all(&self.db)
            .await?;
        Ok(tags.into_iter().map(Tag::from).collect())
    }
}
