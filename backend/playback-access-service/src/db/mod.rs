//! Relational tier
//!
//! PostgreSQL pool creation and the video metadata repository.

pub mod videos;

pub use videos::{PgVideoRepository, VideoRepository};

use crate::config::DatabaseConfig;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

/// Create a PostgreSQL connection pool
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .connect(&config.url)
        .await?;

    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        max_lifetime_secs = config.max_lifetime_secs,
        "Connected to database"
    );
    Ok(pool)
}
