use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
};

use crate::db::entities::{auth_token, user};
use crate::db::models::Account;
use crate::db::store::TokenStore;
use crate::web::error::AppError;

// --- Token Service ---

#[derive(Clone)]
pub struct TokenService {
    db: DatabaseConnection,
}

impl TokenService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_token_for_user(&self, user_id: i32) -> Result<Option<String>, AppError> {
        let token = auth_token::Entity::find()
            .filter(auth_token::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;
        Ok(token.map(|t| t.key))
    }
}

#[async_trait]
impl TokenStore for TokenService {
    async fn get_or_create_token(&self, user_id: i32, new_key: &str) -> Result<String, AppError> {
        if let Some(key) = self.find_token_for_user(user_id).await? {
            return Ok(key);
        }

        let new_token = auth_token::ActiveModel {
            key: Set(new_key.to_string()),
            user_id: Set(user_id),
            created_at: Set(Utc::now()),
        };

        match new_token.insert(&self.db).await {
            Ok(token) => Ok(token.key),
            // A concurrent login created the row first; hand out that one.
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => self
                .find_token_for_user(user_id)
                .await?
                .ok_or_else(|| AppError::DatabaseError(e.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_account_by_token(&self, key: &str) -> Result<Option<Account>, AppError> {
        let found = auth_token::Entity::find_by_id(key.to_string())
            .find_also_related(user::Entity)
            .one(&self.db)
            .await?;
        Ok(found.and_then(|(_, user_model)| user_model.map(Account::from)))
    }
}
