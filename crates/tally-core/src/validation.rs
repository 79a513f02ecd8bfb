//! # Validation Module
//!
//! Input validation helpers shared by every `*Input` type.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP boundary (axum)                                         │
//! │  └── Deserialization into one explicit input schema                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  └── Required fields, lengths, signs, ranges                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                        │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE constraints (usernames, role names, permission codes)      │
//! │  └── Foreign keys (customer / supplier deletion)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted name-like field.
pub const MAX_NAME_LEN: usize = 255;

/// Longest accepted free-text field (notes, descriptions, addresses).
pub const MAX_TEXT_LEN: usize = 10_000;

/// Largest quantity accepted on a single document line.
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;

// =============================================================================
// String Validators
// =============================================================================

/// Requires a non-blank string no longer than `max` characters.
///
/// ## Example
/// ```rust
/// use tally_core::validation::require_text;
///
/// assert!(require_text("name", "Widget", 255).is_ok());
/// assert!(require_text("name", "   ", 255).is_err());
/// ```
pub fn require_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Length check for an optional string; `None` always passes.
pub fn validate_optional_text(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Validates a login name: non-blank, no whitespace inside.
pub fn validate_username(username: &str) -> ValidationResult<()> {
    require_text("username", username, 64)?;

    if username.trim().chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must not contain spaces".to_string(),
        });
    }

    Ok(())
}

/// Validates a new password.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::required("password"));
    }

    if password.chars().count() < 6 {
        return Err(ValidationError::InvalidFormat {
            field: "password".to_string(),
            reason: "must be at least 6 characters".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a document line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed [`MAX_LINE_QUANTITY`]
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Rejects negative amounts. Zero is allowed (free items, no discount).
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a raw percentage (0 to 100 inclusive, finite).
pub fn validate_percentage(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_text() {
        assert!(require_text("name", "Widget", 10).is_ok());
        assert!(require_text("name", "", 10).is_err());
        assert!(require_text("name", "   ", 10).is_err());
        assert!(require_text("name", &"A".repeat(11), 10).is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("admin").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("john doe").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("admin123").is_ok());
        assert!(validate_password("").is_err());
        assert!(validate_password("abc").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_non_negative() {
        assert!(validate_non_negative("price", Money::zero()).is_ok());
        assert!(validate_non_negative("price", Money::from_cents(1)).is_ok());
        assert!(validate_non_negative("price", Money::from_cents(-1)).is_err());
    }

    #[test]
    fn test_validate_percentage() {
        assert!(validate_percentage("discountValue", 0.0).is_ok());
        assert!(validate_percentage("discountValue", 100.0).is_ok());
        assert!(validate_percentage("discountValue", 100.5).is_err());
        assert!(validate_percentage("discountValue", f64::NAN).is_err());
    }
}
