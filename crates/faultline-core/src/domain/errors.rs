//! Domain error types
//!
//! Errors raised when host-supplied values cannot be turned into domain
//! values: unknown level or error-type names, empty keys, malformed ids.

use thiserror::Error;

/// Errors that can occur while building domain values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Unknown event or log level name
    #[error("Invalid level: {0}")]
    InvalidLevel(String),

    /// Unknown error type name in a capture mask
    #[error("Invalid error type: {0}")]
    InvalidErrorType(String),

    /// Tag, context or attribute key was empty
    #[error("Empty key for {0}")]
    EmptyKey(&'static str),

    /// DSN could not be parsed
    #[error("Invalid DSN: {0}")]
    InvalidDsn(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidLevel("loud".to_string());
        assert_eq!(err.to_string(), "Invalid level: loud");

        let err = DomainError::EmptyKey("tag");
        assert_eq!(err.to_string(), "Empty key for tag");

        let err = DomainError::InvalidErrorType("LINKER ERROR".to_string());
        assert_eq!(err.to_string(), "Invalid error type: LINKER ERROR");
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(
            DomainError::InvalidDsn("x".into()),
            DomainError::InvalidDsn("x".into())
        );
        assert_ne!(DomainError::EmptyKey("tag"), DomainError::EmptyKey("context"));
    }
}
