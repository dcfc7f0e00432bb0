use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::models::{NewRecipe, RecipeChanges, RecipeFilter};
use crate::services::validation::{
    TITLE_MAX_LEN, minutes_value, parse_flag, parse_id_list, price_value, text_value,
};
use crate::web::error::{AppError, FieldErrors};

// --- Accounts ---

/// Signup and profile payload. Every field is optional so that missing
/// values surface as field-level validation errors.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Struct to hold authenticated user details, to be passed as a request extension.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i32,
    pub email: String,
    pub name: String,
}

// --- Tags and ingredients ---

#[derive(Debug, Default, Deserialize)]
pub struct CreateNamedRequest {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssignedOnlyQuery {
    pub assigned_only: Option<String>,
}

impl AssignedOnlyQuery {
    pub fn assigned_only(&self) -> Result<bool, AppError> {
        parse_flag("assigned_only", self.assigned_only.as_deref())
    }
}

// --- Recipes ---

#[derive(Debug, Default, Deserialize)]
pub struct RecipeListQuery {
    pub tags: Option<String>,
    #[serde(alias = "ingredients")]
    pub ingredient: Option<String>,
}

impl RecipeListQuery {
    /// An absent or empty parameter does not filter.
    pub fn into_filter(self) -> Result<RecipeFilter, AppError> {
        let parse = |field: &str, raw: Option<String>| -> Result<Option<Vec<i32>>, AppError> {
            match raw {
                Some(raw) => {
                    let ids = parse_id_list(field, &raw)?;
                    Ok((!ids.is_empty()).then_some(ids))
                }
                None => Ok(None),
            }
        };
        Ok(RecipeFilter {
            tag_ids: parse("tags", self.tags)?,
            ingredient_ids: parse("ingredient", self.ingredient)?,
        })
    }
}

/// Recipe payload for create, full update and partial update.
/// `time_minute` and `price` stay raw JSON so bad values become field errors.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeRequest {
    pub title: Option<String>,
    #[serde(alias = "time", alias = "time_minutes")]
    pub time_minute: Option<Value>,
    pub price: Option<Value>,
    pub tags: Option<Vec<i32>>,
    #[serde(alias = "ingredients")]
    pub ingredient: Option<Vec<i32>>,
}

impl RecipeRequest {
    /// Validates a create request; title, time and price are required.
    pub fn into_new_recipe(self) -> Result<NewRecipe, AppError> {
        let mut errors = FieldErrors::new();
        let title = text_value(self.title.as_deref(), TITLE_MAX_LEN)
            .map_err(|msg| errors.add("title", msg))
            .ok();
        let time_minute = minutes_value(self.time_minute.as_ref())
            .map_err(|msg| errors.add("time_minute", msg))
            .ok();
        let price = price_value(self.price.as_ref())
            .map_err(|msg| errors.add("price", msg))
            .ok();

        match (title, time_minute, price) {
            (Some(title), Some(time_minute), Some(price)) => Ok(NewRecipe {
                title,
                time_minute,
                price,
                tag_ids: self.tags.unwrap_or_default(),
                ingredient_ids: self.ingredient.unwrap_or_default(),
            }),
            _ => Err(AppError::Validation(errors)),
        }
    }

    /// Validates an update. With `replace` (PUT) scalar fields are required and
    /// omitted relations are cleared; otherwise (PATCH) only supplied fields change.
    pub fn into_changes(self, replace: bool) -> Result<RecipeChanges, AppError> {
        if replace {
            let recipe = self.into_new_recipe()?;
            return Ok(RecipeChanges {
                title: Some(recipe.title),
                time_minute: Some(recipe.time_minute),
                price: Some(recipe.price),
                tag_ids: Some(recipe.tag_ids),
                ingredient_ids: Some(recipe.ingredient_ids),
            });
        }

        let mut errors = FieldErrors::new();
        let mut changes = RecipeChanges {
            tag_ids: self.tags,
            ingredient_ids: self.ingredient,
            ..Default::default()
        };
        if let Some(title) = self.title.as_deref() {
            match text_value(Some(title), TITLE_MAX_LEN) {
                Ok(title) => changes.title = Some(title),
                Err(msg) => errors.add("title", msg),
            }
        }
        if let Some(raw) = self.time_minute.as_ref() {
            match minutes_value(Some(raw)) {
                Ok(minutes) => changes.time_minute = Some(minutes),
                Err(msg) => errors.add("time_minute", msg),
            }
        }
        if let Some(raw) = self.price.as_ref() {
            match price_value(Some(raw)) {
                Ok(price) => changes.price = Some(price),
                Err(msg) => errors.add("price", msg),
            }
        }
        errors.into_result()?;
        Ok(changes)
    }
}

#[derive(Debug, Serialize)]
pub struct RecipeImageResponse {
    pub id: i32,
    pub image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: Value) -> RecipeRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_create_requires_scalar_fields() {
        let err = request(json!({ "tags": [1] })).into_new_recipe().unwrap_err();
        let AppError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.get("title").is_some());
        assert!(errors.get("time_minute").is_some());
        assert!(errors.get("price").is_some());
    }

    #[test]
    fn test_create_accepts_aliases() {
        let recipe = request(json!({
            "title": "Curry",
            "time": 60,
            "price": 20.00,
            "ingredients": [3, 4]
        }))
        .into_new_recipe()
        .unwrap();
        assert_eq!(recipe.time_minute, 60);
        assert_eq!(recipe.price.to_string(), "20.00");
        assert_eq!(recipe.ingredient_ids, vec![3, 4]);
        assert!(recipe.tag_ids.is_empty());
    }

    #[test]
    fn test_full_update_clears_missing_relations() {
        let changes = request(json!({ "title": "Carbonara", "time_minute": 10, "price": "5.00" }))
            .into_changes(true)
            .unwrap();
        assert_eq!(changes.tag_ids, Some(vec![]));
        assert_eq!(changes.ingredient_ids, Some(vec![]));
    }

    #[test]
    fn test_partial_update_keeps_missing_relations() {
        let changes = request(json!({ "title": "Curry", "tags": [2] }))
            .into_changes(false)
            .unwrap();
        assert_eq!(changes.title.as_deref(), Some("Curry"));
        assert_eq!(changes.tag_ids, Some(vec![2]));
        assert_eq!(changes.ingredient_ids, None);
        assert_eq!(changes.price, None);
    }

    #[test]
    fn test_partial_update_rejects_blank_title() {
        let err = request(json!({ "title": "  " })).into_changes(false).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_list_query_parsing() {
        let filter = RecipeListQuery {
            tags: Some("1,2".to_string()),
            ingredient: Some(String::new()),
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.tag_ids, Some(vec![1, 2]));
        assert_eq!(filter.ingredient_ids, None);

        let bad = RecipeListQuery {
            tags: Some("a".to_string()),
            ingredient: None,
        };
        assert!(bad.into_filter().is_err());
    }
}
