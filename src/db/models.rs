use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

/// URL prefix under which files in the media root are served.
pub const MEDIA_URL: &str = "/media/";

/// Represents a user account.
/// Corresponds to the `users` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: i32,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated, already hashed account ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// Profile fields to overwrite; `None` leaves the stored value alone.
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password_hash: Option<String>,
}

/// Represents a tag owned by one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: i32,
    #[serde(skip_serializing)]
    pub user_id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ingredient {
    pub id: i32,
    #[serde(skip_serializing)]
    pub user_id: i32,
    pub name: String,
}

/// Recipe as listed: related records are referenced by ID only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipe {
    pub id: i32,
    #[serde(skip_serializing)]
    pub user_id: i32,
    pub title: String,
    pub time_minute: i32,
    pub price: Decimal,
    #[serde(rename = "tags")]
    pub tag_ids: Vec<i32>,
    #[serde(rename = "ingredient")]
    pub ingredient_ids: Vec<i32>,
    #[serde(serialize_with = "serialize_media_url")]
    pub image: Option<String>,
}

/// Recipe with its tags and ingredients expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeDetail {
    pub id: i32,
    pub title: String,
    pub time_minute: i32,
    pub price: Decimal,
    pub tags: Vec<Tag>,
    #[serde(rename = "ingredient")]
    pub ingredients: Vec<Ingredient>,
    #[serde(serialize_with = "serialize_media_url")]
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub title: String,
    pub time_minute: i32,
    pub price: Decimal,
    pub tag_ids: Vec<i32>,
    pub ingredient_ids: Vec<i32>,
}

/// Fields to overwrite on an existing recipe. `Some(vec![])` clears a relation.
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub time_minute: Option<i32>,
    pub price: Option<Decimal>,
    pub tag_ids: Option<Vec<i32>>,
    pub ingredient_ids: Option<Vec<i32>>,
}

/// Listing filter. Within one list the IDs are OR-ed; the two lists are AND-ed.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub tag_ids: Option<Vec<i32>>,
    pub ingredient_ids: Option<Vec<i32>>,
}

/// Converts a price in hundredths into a two-decimal value.
pub fn price_from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Converts a price (already limited to two decimals) into hundredths.
pub fn price_to_cents(price: Decimal) -> i64 {
    let mut scaled = price;
    scaled.rescale(2);
    scaled.mantissa() as i64
}

fn serialize_media_url<S>(image: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match image {
        Some(path) => serializer.serialize_str(&format!("{MEDIA_URL}{path}")),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_price_cents_conversion() {
        assert_eq!(price_from_cents(2000).to_string(), "20.00");
        assert_eq!(price_to_cents(Decimal::from_str("20").unwrap()), 2000);
        assert_eq!(price_to_cents(Decimal::from_str("5.5").unwrap()), 550);
        assert_eq!(price_to_cents(Decimal::from_str("-1.25").unwrap()), -125);
    }

    #[test]
    fn test_recipe_serializes_ids_and_media_url() {
        let recipe = Recipe {
            id: 7,
            user_id: 1,
            title: "Curry".to_string(),
            time_minute: 60,
            price: price_from_cents(2000),
            tag_ids: vec![1, 2],
            ingredient_ids: vec![3],
            image: Some("uploads/recipe/a.png".to_string()),
        };

        let json = serde_json::to_value(&recipe).unwrap();
        assert_eq!(json["price"], "20.00");
        assert_eq!(json["tags"], serde_json::json!([1, 2]));
        assert_eq!(json["ingredient"], serde_json::json!([3]));
        assert_eq!(json["image"], "/media/uploads/recipe/a.png");
        assert!(json.get("user_id").is_none());
    }
}
