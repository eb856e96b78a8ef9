use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{NewUser, User};
use crate::timestamp::now_millis;

/// Raised by [`UserRepository::create`] and [`UserRepository::update`] when
/// the email is already taken by another row.
#[derive(Debug, thiserror::Error)]
#[error("email already exists")]
pub struct DuplicateEmail;

pub fn is_duplicate(err: &anyhow::Error) -> bool {
    err.downcast_ref::<DuplicateEmail>().is_some()
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn create(&self, user: NewUser) -> anyhow::Result<User>;
    /// Writes the profile fields of `user`; `None` if the row is gone.
    async fn update(&self, user: &User) -> anyhow::Result<Option<User>>;
    async fn update_avatar(&self, id: Uuid, url: &str) -> anyhow::Result<Option<User>>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const USER_COLUMNS: &str = "id, first_name, last_name, email, password, avatar, city, phone_number, created_at, updated_at";

fn map_unique(err: sqlx::Error) -> anyhow::Error {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => anyhow::Error::new(DuplicateEmail),
        _ => anyhow::Error::new(err),
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .context("PgUserRepository.find_by_email")
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("PgUserRepository.find_by_id")
    }

    async fn create(&self, user: NewUser) -> anyhow::Result<User> {
        let now = now_millis();
        let sql = format!(
            r#"
            INSERT INTO users (id, first_name, last_name, email, password, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(now)
            .fetch_one(&self.db)
            .await
            .map_err(map_unique)
            .context("PgUserRepository.create")
    }

    async fn update(&self, user: &User) -> anyhow::Result<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
            SET first_name = $2, last_name = $3, email = $4, city = $5, phone_number = $6, updated_at = $7
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.city)
            .bind(&user.phone_number)
            .bind(now_millis())
            .fetch_optional(&self.db)
            .await
            .map_err(map_unique)
            .context("PgUserRepository.update")
    }

    async fn update_avatar(&self, id: Uuid, url: &str) -> anyhow::Result<Option<User>> {
        let sql = format!(
            "UPDATE users SET avatar = $2, updated_at = $3 WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(url)
            .bind(now_millis())
            .fetch_optional(&self.db)
            .await
            .context("PgUserRepository.update_avatar")
    }
}
