//! Database wiring: connection pool and schema bootstrap.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, instrument};

use crate::config::DatabaseConfig;

const SCHEMA: &str = include_str!("schema.sql");

/// Open a connection pool using `config`.
#[instrument(skip(config), fields(max_connections = config.max_connections), err)]
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await?;
    info!("database pool ready");
    Ok(pool)
}

/// Create the authorization tables and indexes if they do not exist yet.
///
/// Runs in one transaction, so a partially created schema is never left behind.
#[instrument(skip(pool), err)]
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::raw_sql(SCHEMA).execute(&mut *tx).await?;
    tx.commit().await?;
    Ok(())
}
