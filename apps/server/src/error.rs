//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Tally                                  │
//! │                                                                         │
//! │  ValidationError ──► CoreError ──► DbError ──► ApiError ──► HTTP        │
//! │                                                                         │
//! │  handler returns Result<Json<T>, ApiError>                              │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  401 INVALID_CREDENTIALS / UNAUTHORIZED                                 │
//! │  403 FORBIDDEN                                                          │
//! │  404 NOT_FOUND                                                          │
//! │  400 VALIDATION_ERROR                                                   │
//! │  409 CONFLICT / INSUFFICIENT_STOCK                                      │
//! │  500 STORAGE_ERROR  (logged, generic message + details)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Response Body
//! ```json
//! {
//!   "code": "NOT_FOUND",
//!   "message": "Product not found: 6f1c...",
//!   "details": null
//! }
//! ```

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tally_core::{CoreError, ValidationError};
use tally_db::DbError;

/// API error returned from every handler.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Underlying error text, for storage failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad username or password (401)
    InvalidCredentials,

    /// Missing or invalid token (401)
    Unauthorized,

    /// Valid token, missing permission (403)
    Forbidden,

    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Blocked by existing rows or by document state (409)
    Conflict,

    /// Paying would drive stock below zero (409)
    InsufficientStock,

    /// Database or filesystem failure (500)
    StorageError,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::InvalidCredentials | ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Conflict | ErrorCode::InsufficientStock => StatusCode::CONFLICT,
            ErrorCode::StorageError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Same message for unknown users and wrong passwords.
    pub fn invalid_credentials() -> Self {
        ApiError::new(ErrorCode::InvalidCredentials, "Invalid username or password")
    }

    pub fn unauthorized() -> Self {
        ApiError::new(ErrorCode::Unauthorized, "Authentication required")
    }

    pub fn forbidden(code: &str) -> Self {
        ApiError::new(ErrorCode::Forbidden, format!("Missing permission: {}", code))
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Conflict, message)
    }

    /// Storage failure: logged here, generic message plus the error text.
    pub fn storage(message: impl Into<String>, err: impl fmt::Display) -> Self {
        let message = message.into();
        let details = err.to_string();
        tracing::error!(error = %details, "{}", message);
        ApiError {
            code: ErrorCode::StorageError,
            message,
            details: Some(details),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => {
                ApiError::conflict(format!("{} '{}' already exists", field, value))
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!(%message, "Referential constraint blocked the operation");
                ApiError {
                    details: Some(message),
                    ..ApiError::conflict("Record is referenced by other records")
                }
            }
            DbError::Domain(core) => ApiError::from(core),
            DbError::ConnectionFailed(e) => ApiError::storage("Database connection failed", e),
            DbError::MigrationFailed(e) => ApiError::storage("Database migration failed", e),
            DbError::PoolExhausted => {
                ApiError::storage("Database operation failed", "connection pool exhausted")
            }
            DbError::QueryFailed(e) | DbError::Internal(e) => {
                ApiError::storage("Database operation failed", e)
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            CoreError::InvalidDocumentState { .. } => ApiError::conflict(err.to_string()),
            CoreError::Import { .. } => ApiError::validation(err.to_string()),
            CoreError::Forbidden(code) => ApiError::forbidden(&code),
            CoreError::Validation(e) => ApiError::from(e),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

/// Result alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
