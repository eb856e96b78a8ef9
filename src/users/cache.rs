use anyhow::Context;
use async_trait::async_trait;
use deadpool_redis::{redis::AsyncCommands, Pool};
use std::time::Duration;
use uuid::Uuid;

use super::dto::UserResponse;

/// Key under which a user's public projection is cached.
pub fn cache_key(prefix: &str, id: &Uuid) -> String {
    format!("{}:{}", prefix, id)
}

#[async_trait]
pub trait UserCache: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<UserResponse>>;
    async fn set(&self, key: &str, user: &UserResponse, ttl: Duration) -> anyhow::Result<()>;
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct RedisUserCache {
    pool: Pool,
}

impl RedisUserCache {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserCache for RedisUserCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<UserResponse>> {
        let mut conn = self.pool.get().await.context("redis pool get")?;
        let raw: Option<String> = conn.get(key).await.context("redis GET")?;
        match raw {
            Some(json) => {
                let user = serde_json::from_str(&json)
                    .with_context(|| format!("decode cached user {}", key))?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, user: &UserResponse, ttl: Duration) -> anyhow::Result<()> {
        let json = serde_json::to_string(user).context("encode cached user")?;
        let mut conn = self.pool.get().await.context("redis pool get")?;
        let _: () = conn
            .set_ex(key, json, ttl.as_secs().max(1))
            .await
            .context("redis SETEX")?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let mut conn = self.pool.get().await.context("redis pool get")?;
        let _: () = conn.del(key).await.context("redis DEL")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_prefix_and_id() {
        let id = Uuid::nil();
        assert_eq!(
            cache_key("user-api", &id),
            "user-api:00000000-0000-0000-0000-000000000000"
        );
    }
}
