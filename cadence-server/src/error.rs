//! Error types for cadence-server
//!
//! [`ApiError`] is the single error surface for HTTP handlers: every expected
//! failure maps to a status code and a JSON `{"error": ...}` body. Side-effect
//! failures never appear here; they are logged by the effects layer and the
//! already-committed state change stands.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Convenience Result type for handler code
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// HTTP-facing error taxonomy
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing/malformed fields, or an invalid state for the requested
    /// transition
    #[error("{0}")]
    Validation(String),

    /// Caller identity could not be resolved
    #[error("{0}")]
    Unauthenticated(String),

    /// Caller is the wrong role or the wrong party for this action
    #[error("{0}")]
    Forbidden(String),

    /// Unknown id
    #[error("{0}")]
    NotFound(String),

    /// Double-booking; message names the colliding party
    #[error("{0}")]
    Conflict(String),

    /// Database or other internal failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {}", self);
        }
        let body = Json(json!({
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(format!("database error: {}", e))
    }
}

impl From<cadence_common::Error> for ApiError {
    fn from(e: cadence_common::Error) -> Self {
        use cadence_common::Error;
        match e {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::InvalidInput(msg) => ApiError::Validation(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
