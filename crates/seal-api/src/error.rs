//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps seal-core domain errors and sqlx failures to HTTP status codes.
//! Returns JSON error bodies with a machine-readable code and message.
//! Internal error details are logged, never returned to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured JSON error response body.
///
/// All error responses use this format across the API surface.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "INVALID_TRANSITION").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`].
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found — seal, technician, or user (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Authentication failure — missing or invalid token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authorization failure — role or ownership mismatch (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Lifecycle violation — no edge for the attempted operation from
    /// the seal's current state (409).
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// A generated or created seal number already exists (409).
    #[error("duplicate seal number: {0}")]
    DuplicateSealNumber(String),

    /// Storage failure (500). Message is logged but not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status code and machine-readable code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::InvalidTransition(_) => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
            Self::DuplicateSealNumber(_) => (StatusCode::CONFLICT, "DUPLICATE_SEAL_NUMBER"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Storage failures surface as 500 after the transaction rolls back.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Capability rejections from the lifecycle rules are 403.
impl From<seal_core::AccessError> for AppError {
    fn from(err: seal_core::AccessError) -> Self {
        Self::Forbidden(err.to_string())
    }
}

/// Malformed bulk-generation requests are validation errors.
impl From<seal_core::NumberingError> for AppError {
    fn from(err: seal_core::NumberingError) -> Self {
        Self::Validation(err.to_string())
    }
}
