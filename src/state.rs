use std::sync::Arc;

use crate::auth::jwt::JwtKeys;
use crate::auth::services::AuthService;
use crate::config::AppConfig;
use crate::db;
use crate::expenses::repo::{ExpenseRepository, PgExpenseRepository};
use crate::expenses::services::ExpenseService;
use crate::storage::{Storage, StorageClient};
use crate::users::cache::{RedisUserCache, UserCache};
use crate::users::repo::{PgUserRepository, UserRepository};
use crate::users::services::UserService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt: JwtKeys,
    pub auth: AuthService,
    pub users: UserService,
    pub expenses: ExpenseService,
}

impl AppState {
    /// Connects every backing service and runs pending migrations.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let pg = db::connect_postgres(&config.database).await?;
        db::run_migrations(&pg).await;
        let redis = db::connect_redis(&config.redis).await?;
        let storage = Storage::new(&config.storage).await?;

        Ok(Self::from_parts(
            config,
            Arc::new(PgUserRepository::new(pg.clone())),
            Arc::new(RedisUserCache::new(redis)),
            Arc::new(storage),
            Arc::new(PgExpenseRepository::new(pg)),
        ))
    }

    /// Wires services from already-built gateways.
    pub fn from_parts(
        config: AppConfig,
        users: Arc<dyn UserRepository>,
        cache: Arc<dyn UserCache>,
        storage: Arc<dyn StorageClient>,
        expenses: Arc<dyn ExpenseRepository>,
    ) -> Self {
        let jwt = JwtKeys::new(&config.jwt);
        Self {
            auth: AuthService::new(users.clone(), jwt.clone()),
            users: UserService::new(
                users,
                cache,
                storage,
                config.cache.clone(),
                config.storage.public_endpoint.clone(),
            ),
            expenses: ExpenseService::new(expenses),
            jwt,
            config: Arc::new(config),
        }
    }
}
