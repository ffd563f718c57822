//! Error types for the agent session
//!
//! Errors implement [`ErrorRecovery`], which tells callers whether a retry
//! makes sense and what a user should do. The session itself never retries.

use claudewire_protocol::{ProtocolError, RequestId};
use claudewire_transport::TransportError;
use thiserror::Error;

/// Result type for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Error recovery guidance trait
pub trait ErrorRecovery {
    /// Whether this error should be retried
    fn is_retriable(&self) -> bool;

    /// User-facing action to take
    fn suggested_action(&self) -> &str;
}

/// Errors that can occur in agent operations
#[derive(Debug, Error)]
pub enum AgentError {
    /// The session is not connected
    #[error("not connected")]
    NotConnected,

    /// The CLI executable could not be found
    #[error("claude CLI not found")]
    CliNotFound,

    /// The caller's cancellation token fired before the operation started
    #[error("operation cancelled")]
    Cancelled,

    /// Transport error (spawn, pipes, process exit)
    #[error("transport error: {0}")]
    Transport(TransportError),

    /// Protocol error (frame encoding)
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The CLI answered a control request with an error
    #[error("control request {request_id} failed: {message}")]
    ControlRequestFailed {
        /// Request that failed
        request_id: RequestId,
        /// Error reported by the CLI
        message: String,
    },

    /// The session closed before a control request was answered
    #[error("control request abandoned before a response arrived")]
    ControlRequestAbandoned,

    /// The message stream ended without a result message
    #[error("no result message received")]
    NoResult,

    /// Configuration error (invalid options)
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<TransportError> for AgentError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::NotConnected => Self::NotConnected,
            TransportError::CliNotFound => Self::CliNotFound,
            TransportError::Cancelled => Self::Cancelled,
            other => Self::Transport(other),
        }
    }
}

impl ErrorRecovery for AgentError {
    fn is_retriable(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_retriable(),
            Self::NotConnected | Self::ControlRequestAbandoned | Self::NoResult => true,
            Self::CliNotFound
            | Self::Cancelled
            | Self::Protocol(_)
            | Self::Json(_)
            | Self::ControlRequestFailed { .. }
            | Self::Config(_) => false,
        }
    }

    fn suggested_action(&self) -> &str {
        match self {
            Self::NotConnected => "Call connect() before sending, or reconnect after close()",
            Self::CliNotFound => {
                "Install the CLI with `npm install -g @anthropic-ai/claude-code` or set cli_path"
            }
            Self::Cancelled => "The operation was cancelled by the caller; retry if still needed",
            Self::Transport(_) => "Check the CLI process output and reconnect",
            Self::Protocol(_) | Self::Json(_) => "Report this as a bug with the offending input",
            Self::ControlRequestFailed { .. } => "Check that the CLI version supports this request",
            Self::ControlRequestAbandoned => "The session closed; reconnect and resend",
            Self::NoResult => "The CLI exited mid-query; check its stderr and retry",
            Self::Config(_) => "Fix the client options",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TransportError::NotConnected, "not connected")]
    #[case(TransportError::CliNotFound, "claude CLI not found")]
    #[case(TransportError::Cancelled, "operation cancelled")]
    fn test_transport_errors_lifted(#[case] err: TransportError, #[case] display: &str) {
        let err: AgentError = err.into();
        assert_eq!(err.to_string(), display);
        assert!(!matches!(err, AgentError::Transport(_)));
    }

    #[test]
    fn test_process_exit_stays_transport() {
        let err: AgentError = TransportError::ProcessExited {
            code: Some(1),
            stderr: "oops".to_string(),
        }
        .into();
        assert!(matches!(err, AgentError::Transport(_)));
        assert!(err.is_retriable());
        assert!(err.to_string().contains("oops"));
    }

    #[test]
    fn test_recovery_guidance() {
        assert!(!AgentError::CliNotFound.is_retriable());
        assert!(AgentError::CliNotFound.suggested_action().contains("cli_path"));
        assert!(!AgentError::Config("bad".to_string()).is_retriable());
        assert!(AgentError::NoResult.is_retriable());
    }

    #[test]
    fn test_control_failure_display() {
        let err = AgentError::ControlRequestFailed {
            request_id: RequestId::from_string("req-1"),
            message: "unsupported".to_string(),
        };
        assert_eq!(err.to_string(), "control request req-1 failed: unsupported");
    }
}
