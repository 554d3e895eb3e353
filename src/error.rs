//! Error types for the anomaly detection pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, AnomalyError>;

/// Main error type for the pipeline
///
/// `InvalidDataset`, `InvalidConfig` and `Encoding` are the terminal misuse
/// errors of a run; the remaining variants come from the I/O and
/// configuration edges.
#[derive(Error, Debug)]
pub enum AnomalyError {
    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Invalid configuration: {name} = {value}, {reason}")]
    InvalidConfig {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,
}

impl AnomalyError {
    /// Shorthand for an out-of-range configuration value
    pub(crate) fn config(name: &str, value: impl ToString, reason: &str) -> Self {
        AnomalyError::InvalidConfig {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<polars::error::PolarsError> for AnomalyError {
    fn from(err: polars::error::PolarsError) -> Self {
        AnomalyError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for AnomalyError {
    fn from(err: serde_json::Error) -> Self {
        AnomalyError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for AnomalyError {
    fn from(err: ndarray::ShapeError) -> Self {
        AnomalyError::Shape {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AnomalyError::InvalidDataset("dataset has no rows".to_string());
        assert_eq!(err.to_string(), "Invalid dataset: dataset has no rows");
    }

    #[test]
    fn test_config_error_display() {
        let err = AnomalyError::config("ensemble_size", 0, "must be at least 1");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: ensemble_size = 0, must be at least 1"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AnomalyError = io_err.into();
        assert!(matches!(err, AnomalyError::Io(_)));
    }
}
