//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! Every engine/core error is translated into `{ code, message }` JSON with
//! a matching HTTP status before it leaves a handler. Two distinctions the
//! clients rely on:
//!
//! - `CONFLICT` (409) means the inventory is genuinely taken — show
//!   "not enough units available".
//! - `TEMPORARY_FAILURE` (503) means the request lost an infrastructure
//!   race and may simply be retried — show "please try again", never
//!   "sold out".

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use marquee_core::CoreError;
use marquee_db::{DbError, EngineError};

/// API error returned from HTTP handlers.
///
/// ## Serialization
/// ```json
/// {
///   "code": "CONFLICT",
///   "message": "Not enough units of sku-castle available: requested 2, available 1"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed (422)
    ValidationError,

    /// Not enough units available (409)
    Conflict,

    /// Resource not found (404)
    NotFound,

    /// Hold expired before promotion (410)
    Expired,

    /// Reservation state forbids the operation (409)
    NotPromotable,

    /// Transient infrastructure failure; safe to retry (503)
    TemporaryFailure,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    fn status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Expired => StatusCode::GONE,
            ErrorCode::NotPromotable => StatusCode::CONFLICT,
            ErrorCode::TemporaryFailure => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }
}

/// Converts engine errors to API errors.
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match &err {
            EngineError::InvalidInput(_) => ApiError::validation(err.to_string()),
            EngineError::Conflict { .. } => ApiError::new(ErrorCode::Conflict, err.to_string()),
            EngineError::NotFound(_)
            | EngineError::BusinessNotFound(_)
            | EngineError::SkuNotFound(_) => ApiError::new(ErrorCode::NotFound, err.to_string()),
            EngineError::Expired(_) => ApiError::new(ErrorCode::Expired, err.to_string()),
            EngineError::NotPromotable { .. } => {
                ApiError::new(ErrorCode::NotPromotable, err.to_string())
            }
            EngineError::Transient(_) => {
                ApiError::new(ErrorCode::TemporaryFailure, "Please try again")
            }
            EngineError::Internal(db_err) => {
                // Log the actual error but return a generic message
                tracing::error!(error = %db_err, "Engine internal error");
                ApiError::new(ErrorCode::Internal, "Internal error")
            }
        }
    }
}

/// Converts core errors (time normalization, validation) to API errors.
///
/// Everything the pure logic can reject is a malformed request by the time
/// it reaches a handler.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::validation(err.to_string())
    }
}

/// Converts database errors (collaborator reads) to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match &err {
            DbError::NotFound { entity, id } => ApiError::not_found(entity, id),
            other => {
                tracing::error!(error = %other, "Database error");
                ApiError::new(ErrorCode::Internal, "Database operation failed")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
