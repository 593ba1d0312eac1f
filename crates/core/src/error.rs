//! Core Error Types
//!
//! Defines the foundational error types used across the Color It Daily
//! workspace. These are dependency-free (thiserror + std) so the core crate
//! stays lightweight; heavier crates (llm, store, pipeline) define their own
//! error enums and convert into these at the application boundary.

use thiserror::Error;

/// Core error type for the Color It Daily workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Convert CoreError to a string
impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::config("GEMINI_API_KEY is not set");
        assert_eq!(
            err.to_string(),
            "Configuration error: GEMINI_API_KEY is not set"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let core_err: CoreError = io_err.into();
        assert!(matches!(core_err, CoreError::Io(_)));
    }

    #[test]
    fn test_validation_error() {
        let err = CoreError::validation("feedback must not be empty on reject");
        assert!(err.to_string().contains("feedback must not be empty"));
    }

    #[test]
    fn test_error_conversion_to_string() {
        let err = CoreError::not_found("record abc-123");
        let msg: String = err.into();
        assert_eq!(msg, "Not found: record abc-123");
    }
}
