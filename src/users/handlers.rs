use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::avatar::{AvatarUpload, MAX_AVATAR_BYTES};
use super::dto::{AvatarQuery, UpdateUserRequest, UserResponse};
use crate::auth::extractors::{require_auth, AuthUser};
use crate::error::{AppError, AppResult, BAD_REQUEST_MSG, MAX_FILE_SIZE_MSG};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::ValidJson;

const AVATAR_FIELD: &str = "avatar";

pub fn me_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/user/me", get(me).patch(update_me))
        .route(
            "/user/avatar",
            // headroom over the 1 MiB file cap for multipart framing
            post(upload_avatar).layer(DefaultBodyLimit::max(2 * MAX_AVATAR_BYTES)),
        )
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    let me = state.users.get_current_user(&user.id.to_string()).await?;
    Ok(Json(ApiResponse::new(StatusCode::OK, me)))
}

#[instrument(skip(state, body), fields(user_id = %user.id))]
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(body): ValidJson<UpdateUserRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    let updated = state.users.update(user.id, body).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::new(StatusCode::ACCEPTED, updated)),
    ))
}

/// POST /user/avatar?bucket=... (multipart field `avatar`)
#[instrument(skip(state, query, mp), fields(user_id = %user.id))]
pub async fn upload_avatar(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AvatarQuery>,
    mut mp: Multipart,
) -> AppResult<(StatusCode, Json<ApiResponse<String>>)> {
    let bucket = query
        .bucket
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty())
        .ok_or_else(|| {
            AppError::bad_request(BAD_REQUEST_MSG)
                .with_cause(anyhow::anyhow!("bucket query param is required"))
        })?;

    let mut upload = None;
    while let Some(field) = mp.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(AVATAR_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let body = field.bytes().await.map_err(multipart_error)?;
        upload = Some(AvatarUpload::new(bucket.clone(), &file_name, &content_type, body)?);
        break;
    }
    let upload = upload.ok_or_else(|| {
        AppError::bad_request(BAD_REQUEST_MSG)
            .with_cause(anyhow::anyhow!("multipart field `{}` is required", AVATAR_FIELD))
    })?;

    let updated = state.users.upload_avatar(user.id, upload).await?;
    let url = updated.avatar.unwrap_or_default();
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(StatusCode::CREATED, url)),
    ))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::bad_request(MAX_FILE_SIZE_MSG).with_cause(err)
    } else {
        AppError::bad_request(BAD_REQUEST_MSG).with_cause(err)
    }
}
