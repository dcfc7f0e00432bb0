use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, Set, SqlErr,
};

use crate::db::entities::user;
use crate::db::models::{Account, AccountChanges, NewAccount};
use crate::db::store::AccountStore;
use crate::web::error::AppError;

// --- User Service ---

const EMAIL_TAKEN: &str = "user with this email already exists.";

#[derive(Clone)]
pub struct UserService {
    db: DatabaseConnection,
}

impl UserService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl From<user::Model> for Account {
    fn from(model: user::Model) -> Self {
        Account {
            id: model.id,
            email: model.email,
            password_hash: model.password_hash,
            name: model.name,
            is_active: model.is_active,
            is_staff: model.is_staff,
            is_superuser: model.is_superuser,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Maps a unique violation on `users.email` to a field error.
fn map_email_conflict(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::validation("email", EMAIL_TAKEN),
        _ => AppError::DatabaseError(err.to_string()),
    }
}

#[async_trait]
impl AccountStore for UserService {
    async fn insert_account(&self, account: NewAccount) -> Result<Account, AppError> {
        if self.find_by_email(&account.email).await?.is_some() {
            return Err(AppError::validation("email", EMAIL_TAKEN));
        }

        let now = Utc::now();
        let new_user = user::ActiveModel {
            email: Set(account.email),
            password_hash: Set(account.password_hash),
            name: Set(account.name),
            is_active: Set(true),
            is_staff: Set(account.is_staff),
            is_superuser: Set(account.is_superuser),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let user_model = new_user.insert(&self.db).await.map_err(map_email_conflict)?;
        Ok(user_model.into())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Account>, AppError> {
        let user_model = user::Entity::find_by_id(id).one(&self.db).await?;
        Ok(user_model.map(Account::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        let user_model = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?;
        Ok(user_model.map(Account::from))
    }

    async fn update_account(&self, id: i32, changes: AccountChanges) -> Result<Account, AppError> {
        let user_model = user::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if let Some(email) = changes.email.as_deref() {
            if email != user_model.email && self.find_by_email(email).await?.is_some() {
                return Err(AppError::validation("email", EMAIL_TAKEN));
            }
        }

        let mut active_model = user_model.into_active_model();
        if let Some(email) = changes.email {
            active_model.email = Set(email);
        }
        if let Some(name) = changes.name {
            active_model.name = Set(name);
        }
        if let Some(password_hash) = changes.password_hash {
            active_model.password_hash = Set(password_hash);
        }
        active_model.updated_at = Set(Utc::now());

        let updated = active_model.update(&self.db).await.map_err(map_email_conflict)?;
        Ok(updated.into())
    }
}
