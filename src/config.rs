use std::{str::FromStr, time::Duration};

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub shutdown_grace_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub pool_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub prefix: String,
    pub ttl_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
    pub cookie_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    /// Base used when building public avatar URLs; defaults to `endpoint`.
    pub public_endpoint: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub cache: CacheConfig,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let server = ServerConfig {
            host: var_or("APP_HOST", "0.0.0.0"),
            port: parsed_or("APP_PORT", 8080)?,
            request_timeout_secs: parsed_or("REQUEST_TIMEOUT_SECS", 30)?,
            shutdown_grace_secs: parsed_or("SHUTDOWN_GRACE_SECS", 5)?,
        };

        let database = DatabaseConfig {
            url: required("DATABASE_URL")?,
            max_connections: parsed_or("DB_MAX_CONNECTIONS", 60)?,
            min_connections: parsed_or("DB_MIN_CONNECTIONS", 5)?,
            acquire_timeout_secs: parsed_or("DB_ACQUIRE_TIMEOUT_SECS", 5)?,
            idle_timeout_secs: parsed_or("DB_IDLE_TIMEOUT_SECS", 20)?,
            max_lifetime_secs: parsed_or("DB_MAX_LIFETIME_SECS", 120)?,
        };

        let redis = RedisConfig {
            url: var_or("REDIS_URL", "redis://127.0.0.1:6379"),
            pool_size: parsed_or("REDIS_POOL_SIZE", 16)?,
        };

        let cache = CacheConfig {
            prefix: var_or("CACHE_PREFIX", "user-api"),
            ttl_secs: parsed_or("CACHE_TTL_SECS", 3600)?,
        };

        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            issuer: var_or("JWT_ISSUER", "expenses-api"),
            audience: var_or("JWT_AUDIENCE", "expenses-api-users"),
            ttl_minutes: parsed_or("JWT_TTL_MINUTES", 15)?,
            refresh_ttl_minutes: parsed_or("JWT_REFRESH_TTL_MINUTES", 60 * 24)?,
            cookie_name: var_or("AUTH_COOKIE_NAME", "jwt-token"),
        };

        let endpoint = var_or("S3_ENDPOINT", "http://localhost:9000");
        let storage = StorageConfig {
            public_endpoint: std::env::var("S3_PUBLIC_ENDPOINT").unwrap_or_else(|_| endpoint.clone()),
            endpoint,
            region: var_or("S3_REGION", "us-east-1"),
            access_key: required("S3_ACCESS_KEY")?,
            secret_key: required("S3_SECRET_KEY")?,
        };

        Ok(Self {
            server,
            database,
            redis,
            cache,
            jwt,
            storage,
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnv(key))
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue(key)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_or_falls_back_to_default_when_unset() {
        let v: u64 = parsed_or("EXPENSES_API_TEST_UNSET_VAR", 42).unwrap();
        assert_eq!(v, 42);
    }

    #[test]
    fn parsed_or_rejects_garbage() {
        std::env::set_var("EXPENSES_API_TEST_GARBAGE_PORT", "eighty");
        let err = parsed_or::<u16>("EXPENSES_API_TEST_GARBAGE_PORT", 8080).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("EXPENSES_API_TEST_GARBAGE_PORT")));
    }

    #[test]
    fn required_reports_missing_key() {
        let err = required("EXPENSES_API_TEST_MISSING_SECRET").unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing environment variable: EXPENSES_API_TEST_MISSING_SECRET"
        );
    }
}
