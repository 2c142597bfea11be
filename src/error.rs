//! Error types for the inspection engine
//!
//! Provides the per-call error taxonomy and the HTTP-surface error type,
//! both built with thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

// == Error Kind ==
/// Serializable tag for every failure the engine can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    AuthError,
    NotFound,
    RateLimited,
    TransientError,
    InvalidUrl,
    QuotaExceeded,
}

impl ErrorKind {
    /// Whether a failure of this kind may succeed on a later attempt.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::RateLimited | ErrorKind::TransientError)
    }
}

// == Inspect Error ==
/// Failure of a single remote inspection call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InspectError {
    /// Credential rejected; fatal for the whole run
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Property or URL not accessible
    #[error("Not found: {0}")]
    NotFound(String),

    /// Remote throttling despite local admission
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    /// Network failure, timeout or 5xx
    #[error("Transient error: {0}")]
    Transient(String),

    /// Malformed input URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl InspectError {
    /// Returns the serializable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            InspectError::Auth(_) => ErrorKind::AuthError,
            InspectError::NotFound(_) => ErrorKind::NotFound,
            InspectError::RateLimited { .. } => ErrorKind::RateLimited,
            InspectError::Transient(_) => ErrorKind::TransientError,
            InspectError::InvalidUrl(_) => ErrorKind::InvalidUrl,
        }
    }
}

// == Api Error ==
/// Errors surfaced by the HTTP layer.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Unknown run id
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the HTTP layer.
pub type Result<T> = std::result::Result<T, ApiError>;
