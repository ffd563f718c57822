//! Error types for protocol operations
//!
//! Provides error types for encoding frames and validating their shape.

use thiserror::Error;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors that can occur during protocol operations
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// JSON serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A frame did not have the expected shape
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// A frame was missing a field the protocol requires
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::MissingField("request_id");
        assert_eq!(err.to_string(), "missing required field: request_id");

        let err = ProtocolError::InvalidFrame("not an object".to_string());
        assert_eq!(err.to_string(), "invalid frame: not an object");
    }

    #[test]
    fn test_from_serde_error() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ProtocolError = serde_err.into();
        assert!(matches!(err, ProtocolError::Serialization(_)));
    }
}
