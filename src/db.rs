use std::time::Duration;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::{DatabaseConfig, RedisConfig};

/// Bounded Postgres pool; sizes and timeouts come from config.
pub async fn connect_postgres(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .connect(&config.url)
        .await
        .context("connect to database")?;
    tracing::info!(max_connections = config.max_connections, "postgres connected");
    Ok(pool)
}

pub async fn run_migrations(db: &PgPool) {
    if let Err(e) = sqlx::migrate!("./migrations").run(db).await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }
}

pub async fn connect_redis(config: &RedisConfig) -> anyhow::Result<deadpool_redis::Pool> {
    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    redis_config.pool = Some(deadpool_redis::PoolConfig::new(config.pool_size));

    let pool = redis_config
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .context("create redis pool")?;

    // Fail fast at startup; request-time cache errors are tolerated instead.
    let mut conn = pool.get().await.context("connect to redis")?;
    let _: String = redis::cmd("PING")
        .query_async(&mut conn)
        .await
        .context("redis ping")?;
    tracing::info!(url = %config.url, "redis connected");
    Ok(pool)
}
