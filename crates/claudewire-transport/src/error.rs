//! Transport error types

use thiserror::Error;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors raised by a transport, either returned from a call or delivered on
/// the transport's error channel
#[derive(Debug, Error)]
pub enum TransportError {
    /// No CLI executable could be located
    #[error("claude CLI not found; install it with `npm install -g @anthropic-ai/claude-code` or set an explicit CLI path")]
    CliNotFound,

    /// The transport is not connected, or stdin is gone
    #[error("transport is not connected")]
    NotConnected,

    /// The transport was closed and cannot be started again
    #[error("transport was closed and cannot be restarted")]
    Closed,

    /// The caller cancelled before the operation started
    #[error("operation cancelled")]
    Cancelled,

    /// The process could not be started
    #[error("failed to start claude process: {0}")]
    Spawn(#[source] std::io::Error),

    /// A stdio pipe was not available after spawn
    #[error("failed to open {0} pipe")]
    Pipe(&'static str),

    /// I/O error on a pipe
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An inbound line did not fit in the read buffer
    #[error("line of {length} bytes exceeds buffer limit of {limit} bytes")]
    LineTooLong {
        /// Configured limit
        limit: usize,
        /// Bytes seen before the line was abandoned
        length: usize,
    },

    /// The process exited unsuccessfully
    #[error("process exited with code {}: {stderr}", display_code(.code))]
    ProcessExited {
        /// Exit code, absent when killed by a signal
        code: Option<i32>,
        /// Tail of the process's stderr
        stderr: String,
    },
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
}

impl TransportError {
    /// Check if this error is worth retrying at the caller's discretion
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::ProcessExited { .. } | Self::NotConnected
        )
    }
}
