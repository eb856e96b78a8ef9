use std::sync::Arc;

use anyhow::anyhow;
use tracing::{info, instrument};

use super::dto::{LoginRequest, RegisterRequest, TokenPair};
use super::jwt::JwtKeys;
use super::password::{hash_password, verify_password};
use crate::error::{AppError, AppResult, EMAIL_ALREADY_EXISTS_MSG, INVALID_EMAIL_OR_PASSWORD_MSG};
use crate::users::dto::UserResponse;
use crate::users::repo::{is_duplicate, UserRepository};
use crate::users::repo_types::NewUser;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Unknown email and wrong password must look the same to the caller.
fn invalid_credentials(cause: anyhow::Error) -> AppError {
    AppError::bad_request(INVALID_EMAIL_OR_PASSWORD_MSG).with_cause(cause)
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    jwt: JwtKeys,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, jwt: JwtKeys) -> Self {
        Self { users, jwt }
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn register(&self, req: RegisterRequest) -> AppResult<UserResponse> {
        let email = normalize_email(&req.email);
        match self.users.find_by_email(&email).await {
            Ok(Some(_)) => return Err(AppError::conflict(EMAIL_ALREADY_EXISTS_MSG)),
            Ok(None) => {}
            Err(e) => return Err(AppError::internal(e.context("AuthService.register: find_by_email"))),
        }

        let password = req.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(AppError::internal)?
            .map_err(|e| AppError::internal(e.context("AuthService.register: hash password")))?;

        let user = self
            .users
            .create(NewUser {
                first_name: req.first_name.trim().to_string(),
                last_name: req.last_name.trim().to_string(),
                email,
                password_hash,
            })
            .await
            .map_err(|e| {
                if is_duplicate(&e) {
                    AppError::conflict(EMAIL_ALREADY_EXISTS_MSG)
                } else {
                    AppError::internal(e.context("AuthService.register: create"))
                }
            })?;

        info!(user_id = %user.id, "user registered");
        Ok(UserResponse::from(&user))
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn login(&self, req: LoginRequest) -> AppResult<TokenPair> {
        let email = normalize_email(&req.email);
        let user = self
            .users
            .find_by_email(&email)
            .await
            .map_err(|e| AppError::internal(e.context("AuthService.login: find_by_email")))?
            .ok_or_else(|| invalid_credentials(anyhow!("no user with email {}", email)))?;

        let password = req.password;
        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(AppError::internal)?
            .map_err(|e| AppError::internal(e.context("AuthService.login: verify password")))?;
        if !matches {
            return Err(invalid_credentials(anyhow!("password mismatch for user {}", user.id)));
        }

        let pair = self
            .jwt
            .issue_pair(user.id, &user.email)
            .map_err(|e| AppError::internal(e.context("AuthService.login: sign tokens")))?;
        info!(user_id = %user.id, "user logged in");
        Ok(pair)
    }

    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let claims = self
            .jwt
            .verify_refresh(refresh_token)
            .map_err(AppError::invalid_token)?;
        let user = self
            .users
            .find_by_id(claims.sub)
            .await
            .map_err(|e| AppError::internal(e.context("AuthService.refresh: find_by_id")))?
            .ok_or_else(|| AppError::unauthorized(anyhow!("user {} no longer exists", claims.sub)))?;

        self.jwt
            .issue_pair(user.id, &user.email)
            .map_err(|e| AppError::internal(e.context("AuthService.refresh: sign tokens")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fakes;
    use axum::http::StatusCode;
    use std::sync::atomic::Ordering;

    fn register_req(email: &str) -> RegisterRequest {
        RegisterRequest {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            password: "analytical-engine".into(),
        }
    }

    #[tokio::test]
    async fn register_normalizes_and_hashes() {
        let fakes = Fakes::new();
        let svc = fakes.auth_service();

        let user = svc.register(register_req("  Ada@Example.COM ")).await.unwrap();
        assert_eq!(user.email, "ada@example.com");

        let stored = fakes.users.by_email("ada@example.com").unwrap();
        assert_ne!(stored.password_hash, "analytical-engine");
        assert!(stored.password_hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn register_rejects_case_variant_duplicates() {
        let fakes = Fakes::new();
        let svc = fakes.auth_service();
        svc.register(register_req("ada@example.com")).await.unwrap();

        for variant in ["ada@example.com", "ADA@example.com", " ada@example.com "] {
            let err = svc.register(register_req(variant)).await.unwrap_err();
            assert_eq!(err.status, StatusCode::CONFLICT);
            assert_eq!(err.message, EMAIL_ALREADY_EXISTS_MSG);
        }
        assert_eq!(fakes.users.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn register_lookup_failure_is_internal() {
        let fakes = Fakes::new();
        fakes.users.fail.store(true, Ordering::SeqCst);
        let err = fakes
            .auth_service()
            .register(register_req("ada@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(fakes.users.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let fakes = Fakes::new();
        let svc = fakes.auth_service();
        svc.register(register_req("ada@example.com")).await.unwrap();

        let unknown = svc
            .login(LoginRequest {
                email: "nobody@example.com".into(),
                password: "analytical-engine".into(),
            })
            .await
            .unwrap_err();
        let wrong = svc
            .login(LoginRequest {
                email: "ada@example.com".into(),
                password: "difference-engine".into(),
            })
            .await
            .unwrap_err();

        assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
        assert_eq!(unknown.status, wrong.status);
        assert_eq!(unknown.message, wrong.message);
        assert_eq!(unknown.message, INVALID_EMAIL_OR_PASSWORD_MSG);
    }

    #[tokio::test]
    async fn login_then_refresh_issues_tokens_for_same_user() {
        let fakes = Fakes::new();
        let svc = fakes.auth_service();
        let user = svc.register(register_req("ada@example.com")).await.unwrap();

        let pair = svc
            .login(LoginRequest {
                email: "ADA@example.com".into(),
                password: "analytical-engine".into(),
            })
            .await
            .unwrap();
        let claims = fakes.jwt.verify_access(&pair.access_token).unwrap();
        assert_eq!(claims.sub, user.id);

        let renewed = svc.refresh(&pair.refresh_token).await.unwrap();
        assert_eq!(fakes.jwt.verify_access(&renewed.access_token).unwrap().sub, user.id);

        let err = svc.refresh(&pair.access_token).await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }
}
