//! # Validation Module
//!
//! Boundary validation for reservation requests.
//!
//! Validation runs *before* any transaction is opened: a request that fails
//! here never touches the database, so a rejected hold leaves no row behind
//! (and a `quantity = 0` line can never reach the reservation transaction).

use crate::error::{ValidationError, ValidationResult};
use crate::types::HoldLine;
use crate::{MAX_LINE_QUANTITY, MAX_RESERVATION_LINES};

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a per-line quantity: a positive integer within the sanity cap.
///
/// ## Example
/// ```rust
/// use marquee_core::validation::validate_quantity;
///
/// assert!(validate_quantity(3).is_ok());
/// assert!(validate_quantity(0).is_err());
/// assert!(validate_quantity(-2).is_err());
/// ```
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity < 1 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if quantity > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }
    Ok(())
}

/// Validates an entity id reference (non-empty after trimming).
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Request Validators
// =============================================================================

/// Validates the full line set of a hold request.
///
/// ## Rules
/// - At least one line, at most [`MAX_RESERVATION_LINES`].
/// - Every line: non-empty `sku_id`, quantity in range, window not inverted.
///
/// Window inversion is normally unrepresentable (`TimeWindow::new` enforces
/// it), but lines arriving through deserialization are re-checked here.
pub fn validate_hold_lines(lines: &[HoldLine]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        });
    }
    if lines.len() > MAX_RESERVATION_LINES {
        return Err(ValidationError::TooMany {
            field: "lines".to_string(),
            max: MAX_RESERVATION_LINES,
        });
    }

    for line in lines {
        validate_id("sku_id", &line.sku_id)?;
        validate_quantity(line.quantity)?;
        if line.window.start >= line.window.end {
            return Err(ValidationError::InvalidFormat {
                field: "window".to_string(),
                reason: "end must be after start".to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimeWindow;
    use chrono::{TimeZone, Utc};

    fn valid_line(quantity: i64) -> HoldLine {
        HoldLine {
            sku_id: "sku-1".to_string(),
            quantity,
            window: TimeWindow::new(
                Utc.with_ymd_and_hms(2026, 6, 15, 10, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap(),
            )
            .unwrap(),
        }
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-5).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_empty_lines_rejected() {
        assert!(matches!(
            validate_hold_lines(&[]),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_zero_quantity_line_rejected() {
        let lines = vec![valid_line(1), valid_line(0)];
        assert!(matches!(
            validate_hold_lines(&lines),
            Err(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_blank_sku_rejected() {
        let mut line = valid_line(1);
        line.sku_id = "  ".to_string();
        assert!(matches!(
            validate_hold_lines(&[line]),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_too_many_lines_rejected() {
        let lines: Vec<_> = (0..=MAX_RESERVATION_LINES).map(|_| valid_line(1)).collect();
        assert!(matches!(
            validate_hold_lines(&lines),
            Err(ValidationError::TooMany { .. })
        ));
    }

    #[test]
    fn test_valid_lines_accepted() {
        assert!(validate_hold_lines(&[valid_line(2), valid_line(1)]).is_ok());
    }
}
