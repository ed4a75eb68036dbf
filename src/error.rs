//! Error types for feature engineering and prediction

use thiserror::Error;

/// Failures raised by the synchronous prediction core
///
/// None of these are retried internally. Callers surface them as a generic
/// "prediction unavailable" state
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeatureError {
    /// A vector and its scaler parameters (or expected layout) differ in length
    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A required value is missing, out of range or not finite
    #[error("invalid feature {field}: {reason}")]
    FeatureValidation { field: String, reason: String },

    /// An amount that feeds a logarithm is zero or negative
    #[error("invalid amount {amount}: must be positive")]
    InvalidAmount { amount: f64 },
}

impl FeatureError {
    pub(crate) fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        FeatureError::FeatureValidation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for the prediction core
pub type FeatureResult<T> = std::result::Result<T, FeatureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = FeatureError::DimensionMismatch {
            context: "static scaler",
            expected: 28,
            actual: 27,
        };
        assert_eq!(
            err.to_string(),
            "dimension mismatch in static scaler: expected 28, got 27"
        );

        let err = FeatureError::InvalidAmount { amount: -5.0 };
        assert_eq!(err.to_string(), "invalid amount -5: must be positive");

        let err = FeatureError::validation("amount", "not finite");
        assert_eq!(err.to_string(), "invalid feature amount: not finite");
    }
}
