use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::instrument;

use super::dto::{LoginRequest, RefreshRequest, RegisterRequest, TokenPair};
use crate::error::AppResult;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::users::dto::UserResponse;
use crate::validation::ValidJson;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/user/register", post(register))
        .route("/user/login", post(login))
        .route("/user/refresh", post(refresh))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    let user = state.auth.register(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(StatusCode::CREATED, user)),
    ))
}

/// Returns the token pair and also sets the access token as an HttpOnly cookie.
#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> AppResult<(CookieJar, Json<ApiResponse<TokenPair>>)> {
    let pair = state.auth.login(payload).await?;
    let cookie = Cookie::build((state.config.jwt.cookie_name.clone(), pair.access_token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(state.config.jwt.ttl_minutes));
    Ok((jar.add(cookie), Json(ApiResponse::new(StatusCode::OK, pair))))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RefreshRequest>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    let pair = state.auth.refresh(&payload.refresh_token).await?;
    Ok(Json(ApiResponse::new(StatusCode::OK, pair)))
}
