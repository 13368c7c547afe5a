use std::time::Duration;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::Config;

fn pool_options(config: &Config) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
}

/// Connects the pool the list and record queries run on. Sizing comes from
/// [`Config`]; the queries themselves are short single statements, so a
/// stuck acquire means the pool is exhausted, not a slow query.
pub async fn create_pool(config: &Config) -> Result<PgPool> {
    let pool = pool_options(config).connect(&config.database_url).await?;

    info!(
        max_connections = config.db_max_connections,
        "database pool ready"
    );
    Ok(pool)
}
