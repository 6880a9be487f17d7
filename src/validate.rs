//! Input validation helpers.
//!
//! Standardizes validation across the crate using `!is_finite()` to reject
//! NaN, +Inf, and -Inf uniformly.

use crate::error::IvSurfError;

/// Validate that a value is strictly positive and finite (rejects NaN, Inf, zero, negatives).
pub(crate) fn validate_positive(value: f64, name: &str) -> crate::error::Result<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(IvSurfError::InvalidInput {
            message: format!("{name} must be positive and finite, got {value}"),
        });
    }
    Ok(value)
}

/// Validate that a value is finite (rejects NaN and Inf; allows zero and negatives).
pub(crate) fn validate_finite(value: f64, name: &str) -> crate::error::Result<f64> {
    if !value.is_finite() {
        return Err(IvSurfError::InvalidInput {
            message: format!("{name} must be finite, got {value}"),
        });
    }
    Ok(value)
}

/// Validate that a count is non-zero.
pub(crate) fn validate_nonzero(value: usize, name: &str) -> crate::error::Result<usize> {
    if value == 0 {
        return Err(IvSurfError::InvalidInput {
            message: format!("{name} must be greater than zero"),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_rejects_zero_nan_and_inf() {
        assert!(validate_positive(1.0, "spot").is_ok());
        assert!(validate_positive(0.0, "spot").is_err());
        assert!(validate_positive(-1.0, "spot").is_err());
        assert!(validate_positive(f64::NAN, "spot").is_err());
        assert!(validate_positive(f64::INFINITY, "spot").is_err());
    }

    #[test]
    fn finite_allows_negative_rates() {
        assert_eq!(validate_finite(-0.01, "rate").unwrap(), -0.01);
        assert!(validate_finite(f64::NAN, "rate").is_err());
    }

    #[test]
    fn nonzero_rejects_zero() {
        let err = validate_nonzero(0, "resolution").unwrap_err();
        assert!(format!("{err}").contains("resolution"));
        assert_eq!(validate_nonzero(50, "resolution").unwrap(), 50);
    }
}
