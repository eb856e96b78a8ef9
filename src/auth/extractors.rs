use anyhow::anyhow;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::RequestId;
use crate::state::AppState;

/// Identity of the caller, placed in request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

/// Finds the bearer credential: the `Authorization` header if present,
/// otherwise the auth cookie.
pub(crate) fn bearer_token(
    headers: &HeaderMap,
    jar: &CookieJar,
    cookie_name: &str,
) -> Result<String, AppError> {
    if let Some(value) = headers.get(AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|e| AppError::unauthorized(anyhow!("Authorization header: {}", e)))?;
        let mut parts = value.split_whitespace();
        return match (parts.next(), parts.next(), parts.next()) {
            (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => {
                Ok(token.to_string())
            }
            _ => Err(AppError::unauthorized(anyhow!("malformed Authorization header"))),
        };
    }

    jar.get(cookie_name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::unauthorized(anyhow!("no bearer token in header or cookie")))
}

/// Rejects the request unless it carries a valid access token.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers(), &jar, &state.config.jwt.cookie_name)?;
    let claims = state.jwt.verify_access(&token).map_err(AppError::invalid_token)?;
    debug!(user_id = %claims.sub, "request authenticated");
    req.extensions_mut().insert(AuthUser {
        id: claims.sub,
        email: claims.email,
    });
    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthUser>().cloned().ok_or_else(|| {
            let request_id = parts
                .extensions
                .get::<RequestId>()
                .map(|r| r.0.as_str())
                .unwrap_or("-");
            error!(path = %parts.uri.path(), request_id, "AuthUser extracted on a route without require_auth");
            AppError::internal(anyhow!("authenticated identity missing from request"))
        })
    }
}
