//! Pipeline error types

use thiserror::Error;

/// Pipeline error type
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Object not found in storage
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// Storage backend failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Input document could not be interpreted
    #[error("Invalid input data: {0}")]
    InputData(String),

    /// Trigger event without a bucket/key
    #[error("Invalid trigger: {0}")]
    InvalidTrigger(String),

    /// Presigned URL request or verification failure
    #[error("Presign error: {0}")]
    Presign(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = PipelineError::NotFound {
            bucket: "reports".into(),
            key: "input/a.json".into(),
        };
        assert_eq!(err.to_string(), "Object not found: reports/input/a.json");
    }

    #[test]
    fn test_input_data_display() {
        let err = PipelineError::InputData("expected object".to_string());
        assert!(err.to_string().contains("Invalid input data"));
        assert!(err.to_string().contains("expected object"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: PipelineError = io_error.into();
        assert!(err.to_string().contains("I/O error"));
        assert!(err.to_string().contains("File not found"));
    }
}
