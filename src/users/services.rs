use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::avatar::AvatarUpload;
use super::cache::{cache_key, UserCache};
use super::dto::{UpdateUserRequest, UserResponse};
use super::repo::{is_duplicate, UserRepository};
use super::repo_types::User;
use crate::config::CacheConfig;
use crate::error::{AppError, AppResult, BAD_REQUEST_MSG, EMAIL_ALREADY_EXISTS_MSG};
use crate::storage::{Storage, StorageClient};

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    cache: Arc<dyn UserCache>,
    storage: Arc<dyn StorageClient>,
    cache_config: CacheConfig,
    public_endpoint: String,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        cache: Arc<dyn UserCache>,
        storage: Arc<dyn StorageClient>,
        cache_config: CacheConfig,
        public_endpoint: String,
    ) -> Self {
        Self {
            users,
            cache,
            storage,
            cache_config,
            public_endpoint,
        }
    }

    /// Cache-aside read of the caller's profile.
    #[instrument(skip(self))]
    pub async fn get_current_user(&self, id: &str) -> AppResult<UserResponse> {
        let user_id = Uuid::parse_str(id).map_err(|e| {
            AppError::bad_request(BAD_REQUEST_MSG)
                .with_cause(anyhow::Error::new(e).context("UserService.get_current_user: parse id"))
        })?;
        let key = cache_key(&self.cache_config.prefix, &user_id);

        match self.cache.get(&key).await {
            Ok(Some(user)) => {
                debug!(%user_id, "user cache hit");
                return Ok(user);
            }
            Ok(None) => debug!(%user_id, "user cache miss"),
            Err(e) => warn!(%user_id, error = %format!("{:#}", e), "user cache read failed; falling back to db"),
        }

        let user = self.load(user_id, "UserService.get_current_user").await?;
        let response = UserResponse::from(&user);
        if let Err(e) = self.cache.set(&key, &response, self.cache_config.ttl()).await {
            warn!(%user_id, error = %format!("{:#}", e), "user cache write failed");
        }
        Ok(response)
    }

    /// Merges the non-empty fields of `patch` into the stored profile.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: Uuid, patch: UpdateUserRequest) -> AppResult<UserResponse> {
        let mut user = self.load(id, "UserService.update").await?;
        let previous_email = user.email.clone();
        merge_profile(&mut user, patch);

        if user.email != previous_email {
            match self.users.find_by_email(&user.email).await {
                Ok(Some(other)) if other.id != user.id => {
                    return Err(AppError::conflict(EMAIL_ALREADY_EXISTS_MSG));
                }
                Ok(_) => {}
                Err(e) => return Err(AppError::internal(e.context("UserService.update: find_by_email"))),
            }
        }

        let updated = match self.users.update(&user).await {
            Ok(Some(u)) => u,
            Ok(None) => return Err(AppError::not_found(anyhow!("user {} not found", id))),
            Err(e) if is_duplicate(&e) => return Err(AppError::conflict(EMAIL_ALREADY_EXISTS_MSG)),
            Err(e) => return Err(AppError::internal(e.context("UserService.update"))),
        };

        self.invalidate(id).await;
        info!(user_id = %id, "user profile updated");
        Ok(UserResponse::from(&updated))
    }

    /// Stores the image, then points the user's avatar at its public URL.
    #[instrument(skip(self, upload), fields(bucket = %upload.bucket, size = upload.body.len()))]
    pub async fn upload_avatar(&self, id: Uuid, upload: AvatarUpload) -> AppResult<UserResponse> {
        let key = upload.object_key(id);
        let stored_key = self
            .storage
            .put_object(&upload.bucket, &key, upload.body.clone(), upload.content_type)
            .await
            .map_err(|e| AppError::internal(e.context("UserService.upload_avatar: put_object")))?;
        let url = Storage::public_url(&self.public_endpoint, &upload.bucket, &stored_key);

        let updated = match self.users.update_avatar(id, &url).await {
            Ok(Some(u)) => u,
            Ok(None) => {
                self.discard_object(&upload.bucket, &stored_key).await;
                return Err(AppError::not_found(anyhow!("user {} not found", id)));
            }
            Err(e) => {
                self.discard_object(&upload.bucket, &stored_key).await;
                return Err(AppError::internal(e.context("UserService.upload_avatar")));
            }
        };

        self.invalidate(id).await;
        info!(user_id = %id, %url, "avatar uploaded");
        Ok(UserResponse::from(&updated))
    }

    async fn load(&self, id: Uuid, op: &'static str) -> AppResult<User> {
        self.users
            .find_by_id(id)
            .await
            .map_err(|e| AppError::internal(e.context(op)))?
            .ok_or_else(|| AppError::not_found(anyhow!("{}: user {} not found", op, id)))
    }

    async fn invalidate(&self, id: Uuid) {
        let key = cache_key(&self.cache_config.prefix, &id);
        if let Err(e) = self.cache.delete(&key).await {
            warn!(user_id = %id, error = %format!("{:#}", e), "user cache invalidation failed");
        }
    }

    async fn discard_object(&self, bucket: &str, key: &str) {
        if let Err(e) = self.storage.delete_object(bucket, key).await {
            warn!(bucket, key, error = %format!("{:#}", e), "orphaned avatar object left in storage");
        }
    }
}

fn merge_profile(user: &mut User, patch: UpdateUserRequest) {
    fn keep_or(target: &mut String, incoming: String) {
        let incoming = incoming.trim();
        if !incoming.is_empty() {
            *target = incoming.to_string();
        }
    }
    fn keep_or_opt(target: &mut Option<String>, incoming: String) {
        let incoming = incoming.trim();
        if !incoming.is_empty() {
            *target = Some(incoming.to_string());
        }
    }

    keep_or(&mut user.first_name, patch.first_name);
    keep_or(&mut user.last_name, patch.last_name);
    keep_or(&mut user.email, patch.email.to_lowercase());
    keep_or_opt(&mut user.city, patch.city);
    keep_or_opt(&mut user.phone_number, patch.phone_number);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_user, Fakes, PNG};
    use axum::http::StatusCode;
    use bytes::Bytes;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let fakes = Fakes::new();
        let user = seed_user(&fakes, "ada@example.com").await;
        let svc = fakes.user_service();

        let first = svc.get_current_user(&user.id.to_string()).await.unwrap();
        let second = svc.get_current_user(&user.id.to_string()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(fakes.users.find_by_id_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fakes.cache.set_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fakes.cache.get_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cache_failure_falls_back_to_db() {
        let fakes = Fakes::new();
        let user = seed_user(&fakes, "ada@example.com").await;
        fakes.cache.fail.store(true, Ordering::SeqCst);

        let got = fakes.user_service().get_current_user(&user.id.to_string()).await.unwrap();
        assert_eq!(got.email, "ada@example.com");
        assert_eq!(fakes.users.find_by_id_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_or_unknown_id() {
        let fakes = Fakes::new();
        let svc = fakes.user_service();

        let err = svc.get_current_user("not-a-uuid").await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = svc.get_current_user(&Uuid::new_v4().to_string()).await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(fakes.cache.set_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn update_merges_only_provided_fields_and_invalidates() {
        let fakes = Fakes::new();
        let user = seed_user(&fakes, "ada@example.com").await;
        let svc = fakes.user_service();
        svc.get_current_user(&user.id.to_string()).await.unwrap();

        let patch = UpdateUserRequest {
            city: "Paris".into(),
            ..Default::default()
        };
        let updated = svc.update(user.id, patch).await.unwrap();

        assert_eq!(updated.city.as_deref(), Some("Paris"));
        assert_eq!(updated.first_name, user.first_name);
        assert_eq!(updated.last_name, user.last_name);
        assert_eq!(updated.email, user.email);
        assert_eq!(fakes.cache.delete_calls.load(Ordering::SeqCst), 1);

        // next read goes back to the database
        let fresh = svc.get_current_user(&user.id.to_string()).await.unwrap();
        assert_eq!(fresh.city.as_deref(), Some("Paris"));
        assert_eq!(fakes.users.find_by_id_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn update_to_taken_email_conflicts() {
        let fakes = Fakes::new();
        let ada = seed_user(&fakes, "ada@example.com").await;
        seed_user(&fakes, "grace@example.com").await;

        let patch = UpdateUserRequest {
            email: " Grace@Example.com ".into(),
            ..Default::default()
        };
        let err = fakes.user_service().update(ada.id, patch).await.unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.message, EMAIL_ALREADY_EXISTS_MSG);
    }

    #[tokio::test]
    async fn avatar_upload_stores_object_and_links_url() {
        let fakes = Fakes::new();
        let user = seed_user(&fakes, "ada@example.com").await;
        let upload = AvatarUpload::new(
            "avatars".into(),
            "me.png",
            "image/png",
            Bytes::from_static(PNG),
        )
        .unwrap();

        let updated = fakes.user_service().upload_avatar(user.id, upload).await.unwrap();

        let url = updated.avatar.unwrap();
        assert!(url.starts_with(&format!("http://cdn.test/avatars/avatars/{}/", user.id)));
        assert_eq!(fakes.storage.objects().len(), 1);
        assert_eq!(fakes.cache.delete_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn avatar_object_is_removed_when_user_is_gone() {
        let fakes = Fakes::new();
        let upload =
            AvatarUpload::new("avatars".into(), "me.png", "image/png", Bytes::from_static(PNG))
                .unwrap();

        let err = fakes
            .user_service()
            .upload_avatar(Uuid::new_v4(), upload)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert!(fakes.storage.objects().is_empty());
    }
}
