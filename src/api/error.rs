//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::db::DatabaseError;
use crate::identity::IdentityError;
use crate::pipeline::extraction::ExtractionError;
use crate::pipeline::processor::{ErrorCategory, ProcessingError};

/// Used when the extraction service rate-limits without a `Retry-After`.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("No indicators: {0}")]
    NoIndicators(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Rate limit exceeded")]
    RateLimited { retry_after: u64 },
    #[error("Upstream timeout: {0}")]
    UpstreamTimeout(String),
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::BadRequest(detail) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                detail.clone(),
            ),
            ApiError::NoIndicators(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "NO_INDICATORS",
                detail.clone(),
            ),
            ApiError::NotFound(detail) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                detail.clone(),
            ),
            ApiError::RateLimited { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                format!("Extraction service is rate limited. Retry after {retry_after}s"),
            ),
            ApiError::UpstreamTimeout(detail) => (
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_TIMEOUT",
                detail.clone(),
            ),
            ApiError::Upstream(detail) => (
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
                detail.clone(),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };

        let mut response = (status, Json(body)).into_response();
        if let ApiError::RateLimited { retry_after } = &self {
            if let Ok(val) = axum::http::HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("Retry-After", val);
            }
        }
        response
    }
}

impl From<ProcessingError> for ApiError {
    fn from(err: ProcessingError) -> Self {
        match (&err, err.category()) {
            (ProcessingError::Extraction(ExtractionError::RateLimited { retry_after }), _) => {
                ApiError::RateLimited {
                    retry_after: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
                }
            }
            (ProcessingError::Parse(_), _) => ApiError::NoIndicators(err.to_string()),
            (
                ProcessingError::DeadlineExceeded
                | ProcessingError::Extraction(ExtractionError::Timeout(_)),
                _,
            ) => ApiError::UpstreamTimeout(err.to_string()),
            (_, ErrorCategory::Input) => ApiError::BadRequest(err.to_string()),
            (_, ErrorCategory::Upstream) => ApiError::Upstream(err.to_string()),
            (_, ErrorCategory::Storage) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Database(e) => ApiError::from(e),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("blocking task failed: {err}"))
    }
}
