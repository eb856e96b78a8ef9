use sqlx::FromRow;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String, // trimmed + lowercased
    #[sqlx(rename = "password")]
    pub password_hash: String, // argon2 PHC string, never serialized
    pub avatar: Option<String>,
    pub city: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: i64, // unix millis
    pub updated_at: i64, // unix millis
}

/// Insert payload; id and timestamps are assigned by the repository.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}
