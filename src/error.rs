//! Error types for flatstore.

use thiserror::Error;

/// Common error type for flatstore startup and plumbing.
///
/// Per-request store failures use [`crate::file::StoreError`] instead.
#[derive(Error, Debug)]
pub enum FlatstoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for configuration values.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for flatstore operations.
pub type Result<T> = std::result::Result<T, FlatstoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = FlatstoreError::Validation("chunk_size must be positive".to_string());
        assert_eq!(err.to_string(), "validation error: chunk_size must be positive");
    }

    #[test]
    fn test_config_error_display() {
        let err = FlatstoreError::Config("bad address".to_string());
        assert_eq!(err.to_string(), "configuration error: bad address");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FlatstoreError = io_err.into();
        assert!(matches!(err, FlatstoreError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_result_alias() {
        fn sample_ok() -> Result<u64> {
            Ok(42)
        }

        fn sample_err() -> Result<u64> {
            Err(FlatstoreError::Config("test".to_string()))
        }

        assert_eq!(sample_ok().unwrap(), 42);
        assert!(sample_err().is_err());
    }
}
