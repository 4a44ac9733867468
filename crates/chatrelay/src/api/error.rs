//! Unified API error handling with structured responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::auth::AuthError;

/// API error type with structured responses.
///
/// Only used before a stream starts; once the SSE response is open, failures
/// travel as `error` events instead.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// HTTP status and machine-readable code.
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Categorize an anyhow error by its message.
    ///
    /// - "not found" -> NotFound
    /// - "invalid" / "must be" / "required" -> BadRequest
    /// - "unavailable" / "connection refused" -> ServiceUnavailable
    /// - anything else -> Internal
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        let msg = err.to_string();
        let lower = msg.to_lowercase();
        let mentions = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if mentions(&["not found"]) {
            ApiError::NotFound(msg)
        } else if mentions(&["invalid", "must be", "required"]) {
            ApiError::BadRequest(msg)
        } else if mentions(&["unavailable", "connection refused"]) {
            ApiError::ServiceUnavailable(msg)
        } else {
            // Keep the whole chain for the log line.
            ApiError::Internal(format!("{err:#}"))
        }
    }
}

/// Structured error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();

        let error = match &self {
            ApiError::Internal(detail) => {
                error!(code, detail = %detail, "request failed");
                // Storage details stay in the log.
                "Internal server error".to_string()
            }
            ApiError::ServiceUnavailable(detail) => {
                warn!(code, detail = %detail, "dependency unavailable");
                self.to_string()
            }
            _ => {
                debug!(code, error = %self, "rejected request");
                self.to_string()
            }
        };

        (status, Json(ErrorResponse { error, code })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::from_anyhow(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Internal(detail) => ApiError::Internal(format!("auth: {detail}")),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
