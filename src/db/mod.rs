use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema};
use tracing::info;

pub mod entities;
pub mod models;
pub mod services;
pub mod store;

use entities::{auth_token, ingredient, recipe, recipe_ingredient, recipe_tag, tag, user};

/// Opens the connection pool. The backend (Postgres or SQLite) follows the URL scheme.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.max_connections(max_connections).sqlx_logging(false);
    Database::connect(opt).await
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(backend.build(&statement)).await?;
    Ok(())
}

/// Creates any missing table from the entity definitions. Referenced tables
/// are created before the tables pointing at them.
pub async fn create_tables<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, user::Entity).await?;
    create_table(db, &schema, auth_token::Entity).await?;
    create_table(db, &schema, tag::Entity).await?;
    create_table(db, &schema, ingredient::Entity).await?;
    create_table(db, &schema, recipe::Entity).await?;
    create_table(db, &schema, recipe_tag::Entity).await?;
    create_table(db, &schema, recipe_ingredient::Entity).await?;

    info!("Database schema is up to date.");
    Ok(())
}
