//! Store adapters for the egg-bank evaluation pipeline.
//!
//! - [`store`]: the document store collaborator (Postgres JSONB and in-memory)
//! - [`blob`]: the image blob store collaborator (local filesystem)
//! - [`models`] / [`repositories`]: typed access per collection
//! - [`repositories::TaskRepo`]: the relational task queue table

use sqlx::postgres::PgPoolOptions;

pub mod blob;
pub mod error;
pub mod models;
pub mod repositories;
pub mod store;
pub mod timestamp;

pub use error::StoreError;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
