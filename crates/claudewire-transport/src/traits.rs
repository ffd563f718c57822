//! The transport abstraction
//!
//! A transport moves raw JSONL lines between the session and the CLI. The
//! session never sees a process handle; tests substitute an in-memory transport.

use crate::error::{Result, TransportError};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A bidirectional line transport
///
/// Both receivers are created with the transport and can be taken once.
/// The message receiver yields one complete line per item, without the
/// trailing newline. The error receiver closes only after the message
/// receiver has closed.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Start the transport; a no-op when already ready
    async fn connect(&self, cancel: &CancellationToken) -> Result<()>;

    /// Write bytes to the peer
    ///
    /// `data` should already be newline-terminated. Concurrent calls do not
    /// interleave.
    async fn send(&self, cancel: &CancellationToken, data: &[u8]) -> Result<()>;

    /// Take the inbound line receiver
    fn take_messages(&self) -> Option<mpsc::Receiver<Vec<u8>>>;

    /// Take the asynchronous error receiver
    fn take_errors(&self) -> Option<mpsc::Receiver<TransportError>>;

    /// Stop the transport; safe to call more than once
    async fn close(&self) -> Result<()>;

    /// Whether the transport is connected
    fn is_ready(&self) -> bool;
}
