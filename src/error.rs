//! Error taxonomy and the JSON error envelope.
//!
//! Every failure that reaches a client is an [`AppError`]. The `cause` is
//! logged by the request middleware together with the request id and is never
//! serialized.

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

pub const EMAIL_ALREADY_EXISTS_MSG: &str = "User with given email already exists";
pub const INVALID_EMAIL_OR_PASSWORD_MSG: &str = "Invalid email or password";
pub const INVALID_JWT_TOKEN_MSG: &str = "Invalid JWT token";
pub const MAX_FILE_SIZE_MSG: &str = "File size exceeds 1MB";
pub const NOT_ALLOWED_IMAGE_HEADER_MSG: &str = "Not allowed image header";
pub const NOT_ALLOWED_FILE_EXTENSION_MSG: &str = "Not allowed file extension";

pub const BAD_REQUEST_MSG: &str = "Bad request";
pub const UNAUTHORIZED_MSG: &str = "Unauthorized";
pub const NOT_FOUND_MSG: &str = "Not found";
pub const METHOD_NOT_ALLOWED_MSG: &str = "Method not allowed";
pub const REQUEST_TIMEOUT_MSG: &str = "Request timeout";
pub const INTERNAL_SERVER_ERROR_MSG: &str = "Internal server error";

pub type AppResult<T> = Result<T, AppError>;

/// Coarse, machine-readable reason attached to a rejected field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reason {
    Required,
    EmailFormat,
    TooLong,
    TooShort,
    MustAlpha,
    MustNumeric,
    MustUuid,
    GreaterThan,
    OneOf,
    DateFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubError {
    pub field: String,
    pub rejected_value: serde_json::Value,
    pub message: Reason,
}

impl SubError {
    pub fn new(field: &str, rejected_value: impl Into<serde_json::Value>, message: Reason) -> Self {
        Self {
            field: field.to_string(),
            rejected_value: rejected_value.into(),
            message,
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub sub_errors: Option<Vec<SubError>>,
    pub cause: Option<anyhow::Error>,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            sub_errors: None,
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<anyhow::Error>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn validation(sub_errors: Vec<SubError>) -> Self {
        Self {
            sub_errors: Some(sub_errors),
            ..Self::new(StatusCode::BAD_REQUEST, BAD_REQUEST_MSG)
        }
    }

    pub fn unauthorized(cause: impl Into<anyhow::Error>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, UNAUTHORIZED_MSG).with_cause(cause)
    }

    pub fn invalid_token(cause: impl Into<anyhow::Error>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, INVALID_JWT_TOKEN_MSG).with_cause(cause)
    }

    pub fn not_found(cause: impl Into<anyhow::Error>) -> Self {
        Self::new(StatusCode::NOT_FOUND, NOT_FOUND_MSG).with_cause(cause)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal(cause: impl Into<anyhow::Error>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_SERVER_ERROR_MSG).with_cause(cause)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status: {} - message: {}", self.status.as_u16(), self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, " - causes: {:#}", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|c| c.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_errors: Option<Vec<SubError>>,
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorInfo,
    pub request_id: Option<String>,
}

/// Attached to error responses so the request middleware can stamp the
/// request id into the body and log the cause.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub info: ErrorInfo,
    pub cause: Option<String>,
}

impl ErrorReport {
    /// Report for an error response that a layer or the router produced
    /// without going through `AppError`.
    pub fn from_status(status: StatusCode) -> Self {
        let message = match status {
            StatusCode::NOT_FOUND => NOT_FOUND_MSG,
            StatusCode::METHOD_NOT_ALLOWED => METHOD_NOT_ALLOWED_MSG,
            StatusCode::REQUEST_TIMEOUT => REQUEST_TIMEOUT_MSG,
            StatusCode::PAYLOAD_TOO_LARGE => MAX_FILE_SIZE_MSG,
            s if s.is_server_error() => INTERNAL_SERVER_ERROR_MSG,
            s => s.canonical_reason().unwrap_or(BAD_REQUEST_MSG),
        };
        ErrorReport {
            info: ErrorInfo {
                status: status.as_u16(),
                message: message.to_string(),
                sub_errors: None,
            },
            cause: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let info = ErrorInfo {
            status: self.status.as_u16(),
            message: self.message,
            sub_errors: self.sub_errors,
        };
        let report = ErrorReport {
            info: info.clone(),
            cause: self.cause.map(|c| format!("{:#}", c)),
        };

        let mut res = (
            self.status,
            Json(ErrorEnvelope {
                error: info,
                request_id: None,
            }),
        )
            .into_response();
        res.extensions_mut().insert(report);
        res
    }
}
