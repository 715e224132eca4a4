//! # Error Types
//!
//! Domain-specific error types for marquee-core.
//!
//! ## Error Hierarchy
//! ```text
//! marquee-core errors (this file)
//! ├── CoreError        - Domain errors (time normalization, validation)
//! └── ValidationError  - Input validation failures
//!
//! marquee-db errors (separate crate)
//! ├── DbError          - Database operation failures
//! └── EngineError      - Reservation transaction boundary taxonomy
//!
//! booking-api errors (in app)
//! └── ApiError         - What HTTP clients see (serialized)
//!
//! Flow: ValidationError → CoreError → EngineError → ApiError → client
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These represent domain rule violations raised by the pure logic —
/// chiefly time normalization. The availability/lifecycle outcomes
/// (conflict, expired, not found) are owned by the engine boundary in
/// marquee-db, which is where they are decided.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The supplied IANA zone identifier is not recognized.
    #[error("Unrecognized time zone: {0}")]
    InvalidTimeZone(String),

    /// The supplied local date/time cannot be resolved to a UTC instant.
    ///
    /// Covers out-of-range calendar values and local times that fall inside
    /// a DST spring-forward gap.
    #[error("Invalid date/time: {reason}")]
    InvalidDateTime { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input doesn't meet requirements. They are raised
/// at the boundary, before any transaction is opened.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Too many entries in a collection.
    #[error("{field} cannot have more than {max} entries")]
    TooMany { field: String, max: usize },

    /// Invalid format (e.g., invalid date string, inverted window).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Convenience type alias for Results with ValidationError.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidTimeZone("America/Springfield".to_string());
        assert_eq!(err.to_string(), "Unrecognized time zone: America/Springfield");

        let err = CoreError::InvalidDateTime {
            reason: "2026-03-08 02:30 does not exist".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid date/time: 2026-03-08 02:30 does not exist"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "sku_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
