//! Storage layer for schemas, entities and relationship edges.
//!
//! Two backends implement the repository traits in [`repositories`]:
//! PostgreSQL (via sqlx) and an in-process memory store. [`connect`] picks
//! one from the database URL at startup.

use sqlx::postgres::PgPoolOptions;

pub mod error;
pub mod memory;
pub mod repositories;

pub use error::StoreError;
pub use repositories::Repositories;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations in `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Build the repositories for `database_url`, choosing the backend by scheme.
///
/// | Scheme                      | Backend                              |
/// |-----------------------------|--------------------------------------|
/// | `postgres`, `postgresql`    | PostgreSQL, migrations applied       |
/// | `memory`                    | in-process, lost on restart          |
///
/// Any other scheme is an [`StoreError::UnsupportedProtocol`].
pub async fn connect(database_url: &str, max_connections: u32) -> Result<Repositories, StoreError> {
    let protocol = database_url
        .split_once("://")
        .map(|(scheme, _)| scheme)
        .unwrap_or_default();

    tracing::info!(protocol, "Initializing repositories");

    match protocol {
        "postgres" | "postgresql" => {
            let pool = create_pool(database_url, max_connections).await?;
            tracing::info!("Database connection pool created");

            health_check(&pool).await?;
            tracing::info!("Database health check passed");

            run_migrations(&pool).await?;
            tracing::info!("Database migrations applied");

            Ok(Repositories::postgres(pool))
        }
        "memory" => Ok(Repositories::in_memory()),
        other => Err(StoreError::UnsupportedProtocol(other.to_string())),
    }
}
