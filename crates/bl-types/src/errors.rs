use thiserror::Error;

/// Main error type for BayesLab
#[derive(Error, Debug)]
pub enum BlError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Objective error: {0}")]
    Objective(#[from] ObjectiveError),

    #[error("Surrogate error: {0}")]
    Surrogate(#[from] SurrogateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while evaluating a user objective
#[derive(Error, Debug)]
pub enum ObjectiveError {
    #[error("Objective returned a non-finite value {value} at {point:?}")]
    NonFinite { point: Vec<f64>, value: f64 },

    #[error("Point has {actual} coordinates, space has {expected} dimensions")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Unknown parameter: {name}")]
    UnknownParameter { name: String },

    #[error("Missing parameter: {name}")]
    MissingParameter { name: String },
}

/// Errors raised by the Gaussian-process surrogate
#[derive(Error, Debug)]
pub enum SurrogateError {
    #[error("Covariance matrix is not positive definite (jitter reached {jitter:e})")]
    NotPositiveDefinite { jitter: f64 },

    #[error("Training targets contain a non-finite value at index {index}")]
    NonFiniteTarget { index: usize },

    #[error("Training set is empty")]
    Empty,
}

/// Result type alias for BayesLab operations
pub type BlResult<T> = Result<T, BlError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::BlError::Validation(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::BlError::Internal(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::BlError::Config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ObjectiveError::NonFinite {
            point: vec![1.0, 2.0],
            value: f64::NAN,
        };

        assert!(error.to_string().contains("non-finite"));
        assert!(error.to_string().contains("NaN"));
    }

    #[test]
    fn test_error_conversion() {
        let surrogate_error = SurrogateError::NotPositiveDefinite { jitter: 1e-2 };
        let bl_error: BlError = surrogate_error.into();

        match bl_error {
            BlError::Surrogate(_) => (),
            _ => panic!("Expected Surrogate error"),
        }
    }

    #[test]
    fn test_macros() {
        let validation_err = validation_error!("Invalid value: {}", 42);
        assert!(matches!(validation_err, BlError::Validation(_)));
        let _internal_err = internal_error!("Something went wrong");
        let config_err = config_error!("Missing required field: {}", "n_calls");
        assert_eq!(
            config_err.to_string(),
            "Configuration error: Missing required field: n_calls"
        );
    }
}
