use axum::Extension;
use bcrypt::{hash, verify};
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::models::{Account, AccountChanges, NewAccount};
use crate::db::store::{AccountStore, TokenStore};
use crate::services::validation::{NAME_MAX_LEN, email_value, normalize_email, password_value};
use crate::web::error::{AppError, FieldErrors};
use crate::web::models::{AuthenticatedUser, UserResponse};

/// Length in bytes of a freshly minted token, before hex encoding.
const TOKEN_BYTES: usize = 20;

/// Account creation, credential checks and token issuing.
#[derive(Clone)]
pub struct AuthService {
    accounts: Arc<dyn AccountStore>,
    tokens: Arc<dyn TokenStore>,
    bcrypt_cost: u32,
}

/// Profile fields as received from a client; `None` means "not supplied".
#[derive(Debug, Default, Clone)]
pub struct ProfileInput {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

fn name_value(raw: Option<&str>) -> Result<String, String> {
    let name = raw.unwrap_or_default().trim();
    if name.chars().count() > NAME_MAX_LEN {
        return Err(format!(
            "Ensure this field has no more than {NAME_MAX_LEN} characters."
        ));
    }
    Ok(name.to_string())
}

pub fn generate_token_key() -> String {
    hex::encode(rand::random::<[u8; TOKEN_BYTES]>())
}

/// Verifies a plaintext password against the stored hash. A corrupt hash never matches.
pub fn check_password(account: &Account, plaintext: &str) -> bool {
    verify(plaintext, &account.password_hash).unwrap_or(false)
}

impl AuthService {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        tokens: Arc<dyn TokenStore>,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            accounts,
            tokens,
            bcrypt_cost,
        }
    }

    fn hash_password(&self, password: &str) -> Result<String, AppError> {
        hash(password, self.bcrypt_cost)
            .map_err(|e| AppError::PasswordHashingError(format!("Failed to hash password: {e}")))
    }

    async fn create_account(
        &self,
        email: Option<&str>,
        password: Option<&str>,
        name: Option<&str>,
        superuser: bool,
    ) -> Result<Account, AppError> {
        let mut errors = FieldErrors::new();
        let email = email_value(email).map_err(|msg| errors.add("email", msg)).ok();
        let password = password_value(password)
            .map_err(|msg| errors.add("password", msg))
            .ok();
        let name = name_value(name).map_err(|msg| errors.add("name", msg)).ok();

        let (Some(email), Some(password), Some(name)) = (email, password, name) else {
            return Err(AppError::Validation(errors));
        };

        let account = self
            .accounts
            .insert_account(NewAccount {
                email,
                password_hash: self.hash_password(&password)?,
                name,
                is_staff: superuser,
                is_superuser: superuser,
            })
            .await?;

        info!(user_id = account.id, superuser, "Account created.");
        Ok(account)
    }

    /// Registers a regular account. The email is stored lowercased.
    pub async fn create_user(
        &self,
        email: Option<&str>,
        password: Option<&str>,
        name: Option<&str>,
    ) -> Result<Account, AppError> {
        self.create_account(email, password, name, false).await
    }

    pub async fn create_superuser(&self, email: &str, password: &str) -> Result<Account, AppError> {
        self.create_account(Some(email), Some(password), None, true)
            .await
    }

    /// Returns the account's token, minting one on first use.
    pub async fn issue_or_fetch_token(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<String, AppError> {
        let (Some(email), Some(password)) = (email, password) else {
            return Err(AppError::InvalidCredentials);
        };
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AppError::InvalidCredentials);
        }

        let account = match self.accounts.find_by_email(&email).await? {
            Some(account) if account.is_active => account,
            _ => return Err(AppError::InvalidCredentials),
        };

        if !check_password(&account, password) {
            warn!(user_id = account.id, "Token request with a wrong password.");
            return Err(AppError::InvalidCredentials);
        }

        self.tokens
            .get_or_create_token(account.id, &generate_token_key())
            .await
    }

    /// Resolves a presented token to an active account.
    pub async fn authenticate(&self, key: &str) -> Result<Account, AppError> {
        let account = self
            .tokens
            .find_account_by_token(key)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid token.".to_string()))?;

        if !account.is_active {
            return Err(AppError::Unauthorized(
                "User inactive or deleted.".to_string(),
            ));
        }
        Ok(account)
    }

    pub async fn get_profile(&self, user_id: i32) -> Result<Account, AppError> {
        self.accounts
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Applies a profile change. With `replace`, email and password are required.
    pub async fn update_profile(
        &self,
        user_id: i32,
        input: ProfileInput,
        replace: bool,
    ) -> Result<Account, AppError> {
        let mut errors = FieldErrors::new();
        let mut changes = AccountChanges::default();

        if replace || input.email.is_some() {
            match email_value(input.email.as_deref()) {
                Ok(email) => changes.email = Some(email),
                Err(msg) => errors.add("email", msg),
            }
        }
        if replace || input.password.is_some() {
            match password_value(input.password.as_deref()) {
                Ok(password) => changes.password_hash = Some(self.hash_password(&password)?),
                Err(msg) => errors.add("password", msg),
            }
        }
        if replace || input.name.is_some() {
            match name_value(input.name.as_deref()) {
                Ok(name) => changes.name = Some(name),
                Err(msg) => errors.add("name", msg),
            }
        }
        errors.into_result()?;

        self.accounts.update_account(user_id, changes).await
    }
}

impl From<Account> for UserResponse {
    fn from(account: Account) -> Self {
        UserResponse {
            id: account.id,
            email: account.email,
            name: account.name,
        }
    }
}

pub async fn me(
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<axum::Json<UserResponse>, AppError> {
    Ok(axum::Json(UserResponse {
        id: user.id,
        email: user.email,
        name: user.name,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_generate_token_key_shape() {
        let key = generate_token_key();
        assert_eq!(key.len(), TOKEN_BYTES * 2);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(key, generate_token_key());
    }

    #[test]
    fn test_check_password() {
        let now = Utc::now();
        let account = Account {
            id: 1,
            email: "a@b.com".to_string(),
            password_hash: hash("Signup!23", 4).unwrap(),
            name: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            created_at: now,
            updated_at: now,
        };
        assert!(check_password(&account, "Signup!23"));
        assert!(!check_password(&account, "signup!23"));

        let corrupt = Account {
            password_hash: "not-a-hash".to_string(),
            ..account
        };
        assert!(!check_password(&corrupt, "Signup!23"));
    }

    #[test]
    fn test_name_value() {
        assert_eq!(name_value(None).unwrap(), "");
        assert_eq!(name_value(Some(" Joshua ")).unwrap(), "Joshua");
        assert!(name_value(Some(&"x".repeat(256))).is_err());
    }
}
