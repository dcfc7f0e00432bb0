//! Store implementations exercised directly against in-memory SQLite.

use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use std::str::FromStr;

use recipe_api::db;
use recipe_api::db::models::{AccountChanges, NewAccount, NewRecipe, RecipeChanges, RecipeFilter};
use recipe_api::db::services::{
    IngredientService, RecipeService, TagService, TokenService, UserService,
};
use recipe_api::db::store::{AccountStore, IngredientStore, RecipeStore, TagStore, TokenStore};
use recipe_api::web::AppError;

async fn make_db() -> DatabaseConnection {
    let db_pool = db::connect("sqlite::memory:", 1).await.unwrap();
    db::create_tables(&db_pool).await.unwrap();
    db_pool
}

async fn insert_user(users: &UserService, email: &str) -> i32 {
    users
        .insert_account(NewAccount {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            name: String::new(),
            is_staff: false,
            is_superuser: false,
        })
        .await
        .unwrap()
        .id
}

fn new_recipe(title: &str, tag_ids: Vec<i32>, ingredient_ids: Vec<i32>) -> NewRecipe {
    NewRecipe {
        title: title.to_string(),
        time_minute: 10,
        price: Decimal::from_str("5.50").unwrap(),
        tag_ids,
        ingredient_ids,
    }
}

#[tokio::test]
async fn test_create_tables_is_idempotent() {
    let db_pool = make_db().await;
    db::create_tables(&db_pool).await.unwrap();
}

#[tokio::test]
async fn test_account_store_rejects_duplicate_email() {
    let db_pool = make_db().await;
    let users = UserService::new(db_pool);
    insert_user(&users, "taken@example.com").await;

    let err = users
        .insert_account(NewAccount {
            email: "taken@example.com".to_string(),
            password_hash: "hash".to_string(),
            name: String::new(),
            is_staff: false,
            is_superuser: false,
        })
        .await
        .unwrap_err();
    let AppError::Validation(errors) = err else {
        panic!("expected a validation error");
    };
    assert!(errors.get("email").is_some());
}

#[tokio::test]
async fn test_account_store_update_and_lookup() {
    let db_pool = make_db().await;
    let users = UserService::new(db_pool);
    let id = insert_user(&users, "before@example.com").await;

    let updated = users
        .update_account(
            id,
            AccountChanges {
                email: Some("after@example.com".to_string()),
                name: Some("After".to_string()),
                password_hash: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.email, "after@example.com");
    assert_eq!(updated.password_hash, "hash");
    assert!(users.find_by_email("before@example.com").await.unwrap().is_none());
    assert_eq!(
        users.find_by_email("after@example.com").await.unwrap().map(|a| a.id),
        Some(id)
    );
}

#[tokio::test]
async fn test_token_store_get_or_create() {
    let db_pool = make_db().await;
    let users = UserService::new(db_pool.clone());
    let tokens = TokenService::new(db_pool);
    let id = insert_user(&users, "token@example.com").await;

    let first = tokens.get_or_create_token(id, "aaaa").await.unwrap();
    let second = tokens.get_or_create_token(id, "bbbb").await.unwrap();
    assert_eq!(first, "aaaa");
    assert_eq!(second, "aaaa");

    let account = tokens.find_account_by_token("aaaa").await.unwrap().unwrap();
    assert_eq!(account.id, id);
    assert!(tokens.find_account_by_token("bbbb").await.unwrap().is_none());
}

#[tokio::test]
async fn test_recipe_store_relations_and_filters() {
    let db_pool = make_db().await;
    let users = UserService::new(db_pool.clone());
    let tags = TagService::new(db_pool.clone());
    let ingredients = IngredientService::new(db_pool.clone());
    let recipes = RecipeService::new(db_pool);

    let owner = insert_user(&users, "owner@example.com").await;
    let vegan = tags.create_tag(owner, "Vegan").await.unwrap();
    let tofu = ingredients.create_ingredient(owner, "Tofu").await.unwrap();

    let stir_fry = recipes
        .create_recipe(owner, new_recipe("Stir fry", vec![vegan.id, vegan.id], vec![tofu.id]))
        .await
        .unwrap();
    assert_eq!(stir_fry.tag_ids, vec![vegan.id]);
    assert_eq!(stir_fry.price.to_string(), "5.50");
    let toast = recipes
        .create_recipe(owner, new_recipe("Toast", vec![], vec![]))
        .await
        .unwrap();

    let filtered = recipes
        .list_recipes(
            owner,
            RecipeFilter {
                tag_ids: Some(vec![vegan.id]),
                ingredient_ids: Some(vec![tofu.id]),
            },
        )
        .await
        .unwrap();
    assert_eq!(filtered.iter().map(|r| r.id).collect::<Vec<_>>(), vec![stir_fry.id]);

    let all = recipes.list_recipes(owner, RecipeFilter::default()).await.unwrap();
    assert_eq!(all.iter().map(|r| r.id).collect::<Vec<_>>(), vec![toast.id, stir_fry.id]);

    let detail = recipes.get_recipe_detail(owner, stir_fry.id).await.unwrap();
    assert_eq!(detail.tags, vec![vegan.clone()]);
    assert_eq!(detail.ingredients, vec![tofu]);

    let assigned = tags.list_tags(owner, true).await.unwrap();
    assert_eq!(assigned, vec![vegan]);
}

#[tokio::test]
async fn test_recipe_store_enforces_ownership() {
    let db_pool = make_db().await;
    let users = UserService::new(db_pool.clone());
    let tags = TagService::new(db_pool.clone());
    let recipes = RecipeService::new(db_pool);

    let owner = insert_user(&users, "owner@example.com").await;
    let stranger = insert_user(&users, "stranger@example.com").await;
    let foreign_tag = tags.create_tag(stranger, "Secret").await.unwrap();

    let err = recipes
        .create_recipe(owner, new_recipe("Borrowed", vec![foreign_tag.id], vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(recipes
        .list_recipes(owner, RecipeFilter::default())
        .await
        .unwrap()
        .is_empty());

    let recipe = recipes
        .create_recipe(owner, new_recipe("Mine", vec![], vec![]))
        .await
        .unwrap();
    assert!(matches!(
        recipes.get_recipe(stranger, recipe.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        recipes
            .update_recipe(stranger, recipe.id, RecipeChanges::default())
            .await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        recipes.delete_recipe(stranger, recipe.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_recipe_store_update_and_delete() {
    let db_pool = make_db().await;
    let users = UserService::new(db_pool.clone());
    let tags = TagService::new(db_pool.clone());
    let recipes = RecipeService::new(db_pool);

    let owner = insert_user(&users, "cook@example.com").await;
    let quick = tags.create_tag(owner, "Quick").await.unwrap();
    let recipe = recipes
        .create_recipe(owner, new_recipe("Soup", vec![quick.id], vec![]))
        .await
        .unwrap();

    let kept = recipes
        .update_recipe(
            owner,
            recipe.id,
            RecipeChanges {
                title: Some("Tomato soup".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(kept.title, "Tomato soup");
    assert_eq!(kept.tag_ids, vec![quick.id]);

    let cleared = recipes
        .update_recipe(
            owner,
            recipe.id,
            RecipeChanges {
                tag_ids: Some(vec![]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(cleared.tag_ids.is_empty());

    let with_image = recipes
        .set_recipe_image(owner, recipe.id, "uploads/recipe/x.png")
        .await
        .unwrap();
    assert_eq!(with_image.image.as_deref(), Some("uploads/recipe/x.png"));

    recipes.delete_recipe(owner, recipe.id).await.unwrap();
    assert!(matches!(
        recipes.get_recipe(owner, recipe.id).await,
        Err(AppError::NotFound(_))
    ));
    assert_eq!(tags.list_tags(owner, false).await.unwrap().len(), 1);
}
