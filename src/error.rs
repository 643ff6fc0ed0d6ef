//! Central error taxonomy — every request handler and worker task returns `AppError`
//! (or a type that converts into it), and a single `IntoResponse` impl maps each
//! variant to a status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::upstream::UpstreamError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("upstream is rate-limited, wait 30-60 minutes and retry")]
    UpstreamTransient,

    #[error("upstream error: {0}")]
    UpstreamOther(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<UpstreamError> for AppError {
    fn from(e: UpstreamError) -> Self {
        match e {
            UpstreamError::NotConfigured(msg) => AppError::Configuration(msg),
            UpstreamError::RateLimited(_) => AppError::UpstreamTransient,
            UpstreamError::Other { status, message } => {
                AppError::UpstreamOther(format!("{status}: {message}"))
            }
            UpstreamError::Http(e) => AppError::UpstreamOther(e.to_string()),
        }
    }
}

/// Whether to scrub internal detail from 5xx responses. Scrubs by default; only an
/// explicit `ENVIRONMENT=development` opts back into verbose errors.
fn is_production() -> bool {
    std::env::var("ENVIRONMENT")
        .map(|v| v != "development")
        .unwrap_or(true)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Configuration(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::UpstreamTransient => (
                StatusCode::SERVICE_UNAVAILABLE,
                "upstream rate limit reached, wait 30-60 minutes and retry".to_string(),
            ),
            AppError::UpstreamOther(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let scrubbed = if status.is_server_error() && is_production() {
            "an internal error occurred".to_string()
        } else {
            message
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %scrubbed, "request failed");
        } else {
            tracing::warn!(status = %status, error = %scrubbed, "request rejected");
        }

        (status, Json(json!({ "error": scrubbed }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
