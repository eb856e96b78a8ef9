use serde::{Deserialize, Serialize};

use crate::error::SubError;
use crate::validation::{Validate, Validator};

/// Request body for user registration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), Vec<SubError>> {
        let mut v = Validator::new();
        v.field("first_name", &self.first_name).required().max_len(100).alpha();
        v.field("last_name", &self.last_name).required().max_len(100).alpha();
        v.field("email", &self.email).required().max_len(100).email();
        v.field("password", &self.password).required().min_len(8).max_len(100);
        v.finish()
    }
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), Vec<SubError>> {
        let mut v = Validator::new();
        v.field("email", &self.email).required().max_len(100).email();
        v.field("password", &self.password).required().min_len(8).max_len(100);
        v.finish()
    }
}

/// Request body for token refresh.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

impl Validate for RefreshRequest {
    fn validate(&self) -> Result<(), Vec<SubError>> {
        let mut v = Validator::new();
        v.field("refresh_token", &self.refresh_token).required();
        v.finish()
    }
}

/// Returned by login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}
