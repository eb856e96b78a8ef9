use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::User;
use crate::error::SubError;
use crate::validation::{Validate, Validator};

/// Public projection of a user. Also the shape stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub city: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<&User> for UserResponse {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            email: u.email.clone(),
            avatar: u.avatar.clone(),
            city: u.city.clone(),
            phone_number: u.phone_number.clone(),
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// PATCH /user/me body. Empty strings mean "leave unchanged".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub city: String,
    pub phone_number: String,
}

impl Validate for UpdateUserRequest {
    fn validate(&self) -> Result<(), Vec<SubError>> {
        let mut v = Validator::new();
        v.optional("first_name", &self.first_name).max_len(100).alpha();
        v.optional("last_name", &self.last_name).max_len(100).alpha();
        v.optional("email", &self.email).max_len(100).email();
        v.optional("city", &self.city).max_len(100).alpha_spaced();
        v.optional("phone_number", &self.phone_number).max_len(13).numeric();
        v.finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct AvatarQuery {
    pub bucket: Option<String>,
}
