//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                        │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                     │
//! │                                                                         │
//! │  tally-server errors                                                    │
//! │  └── ApiError         - HTTP status + JSON body                         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Not enough stock to mark a sale paid.
    ///
    /// ## When This Occurs
    /// Only when negative stock is disallowed by configuration and an
    /// invoice transitions to paid.
    /// ```text
    /// POST /invoices/:id/pay
    ///      │
    ///      ▼
    /// Widget: on hand 2, line wants 5
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Widget", available: 2, requested: 5 }
    ///      │
    ///      ▼
    /// whole pay transition rolled back
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Document is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Converting something that is not a quotation
    /// - Paying a quotation, or an already paid or cancelled invoice
    /// - Changing an invoice's type through a plain update
    #[error("Document {id} cannot be changed: {reason}")]
    InvalidDocumentState { id: String, reason: String },

    /// A tabular import could not be parsed.
    ///
    /// `line` is the 1-based line in the uploaded file (the header is line 1).
    #[error("Import failed at line {line}: {reason}")]
    Import { line: usize, reason: String },

    /// The caller's resolved permission set lacks a required code.
    #[error("Missing permission: {0}")]
    Forbidden(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised at the edge, before any statement reaches the store.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g. unparseable amount or date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
