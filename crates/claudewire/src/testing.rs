//! Test doubles
//!
//! [`MockTransport`] stands in for the CLI process: tests script the lines
//! the "CLI" writes and inspect the frames the session sent.
//!
//! ```
//! # use claudewire::testing::MockTransport;
//! # use claudewire::{AgentSession, ClientOptions};
//! # use std::sync::Arc;
//! # use tokio_util::sync::CancellationToken;
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(MockTransport::new());
//! let options = ClientOptions::builder().transport(transport.clone()).build()?;
//! let session = AgentSession::new(options);
//! session.connect(&CancellationToken::new()).await?;
//!
//! transport.push_json(serde_json::json!({"type": "result", "subtype": "success"})).await;
//! let message = session.messages().await.unwrap().recv().await.unwrap();
//! assert!(message.is_result());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use claudewire_transport::{Transport, TransportError};
use parking_lot::Mutex;
use serde_json::Value;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

const MOCK_CHANNEL_CAPACITY: usize = 256;

/// In-memory [`Transport`]
pub struct MockTransport {
    ready: AtomicBool,
    fail_sends: AtomicBool,
    fail_connect: AtomicBool,
    inbound: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    errors_tx: Mutex<Option<mpsc::Sender<TransportError>>>,
    messages: Mutex<Option<mpsc::Receiver<Vec<u8>>>>,
    errors: Mutex<Option<mpsc::Receiver<TransportError>>>,
    sent: Mutex<Vec<Vec<u8>>>,
    sent_count: watch::Sender<usize>,
}

impl MockTransport {
    /// Create a disconnected mock
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(MOCK_CHANNEL_CAPACITY);
        let (errors_tx, errors_rx) = mpsc::channel(MOCK_CHANNEL_CAPACITY);
        Self {
            ready: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            fail_connect: AtomicBool::new(false),
            inbound: Mutex::new(Some(inbound_tx)),
            errors_tx: Mutex::new(Some(errors_tx)),
            messages: Mutex::new(Some(inbound_rx)),
            errors: Mutex::new(Some(errors_rx)),
            sent: Mutex::new(Vec::new()),
            sent_count: watch::Sender::new(0),
        }
    }

    /// Queue a raw line as if the CLI had written it
    ///
    /// Returns false once the mock has been finished or closed.
    pub async fn push_line(&self, line: impl Into<Vec<u8>>) -> bool {
        let Some(tx) = self.inbound.lock().clone() else {
            return false;
        };
        tx.send(line.into()).await.is_ok()
    }

    /// Queue a JSON frame
    pub async fn push_json(&self, frame: Value) -> bool {
        self.push_line(frame.to_string()).await
    }

    /// Queue an asynchronous transport error
    pub async fn push_error(&self, error: TransportError) -> bool {
        let Some(tx) = self.errors_tx.lock().clone() else {
            return false;
        };
        tx.send(error).await.is_ok()
    }

    /// End the inbound stream, as if the CLI exited
    pub fn finish(&self) {
        self.inbound.lock().take();
        self.errors_tx.lock().take();
    }

    /// Make every following `send` fail
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Make `connect` fail
    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Raw bytes of every successful send
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }

    /// Every successful send, decoded as JSON
    pub fn sent_json(&self) -> Vec<Value> {
        self.sent
            .lock()
            .iter()
            .filter_map(|bytes| serde_json::from_slice(bytes).ok())
            .collect()
    }

    /// Wait until at least `count` sends have succeeded
    pub async fn wait_for_sent(&self, count: usize) -> Vec<Value> {
        let mut rx = self.sent_count.subscribe();
        // The sender lives in self, so the channel cannot close here.
        let _ = rx.wait_for(|sent| *sent >= count).await;
        self.sent_json()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, cancel: &CancellationToken) -> claudewire_transport::Result<()> {
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(TransportError::Spawn(io::Error::new(
                io::ErrorKind::NotFound,
                "injected connect failure",
            )));
        }
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, cancel: &CancellationToken, data: &[u8]) -> claudewire_transport::Result<()> {
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        if !self.ready.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "injected send failure",
            )));
        }
        let count = {
            let mut sent = self.sent.lock();
            sent.push(data.to_vec());
            sent.len()
        };
        self.sent_count.send_replace(count);
        Ok(())
    }

    fn take_messages(&self) -> Option<mpsc::Receiver<Vec<u8>>> {
        self.messages.lock().take()
    }

    fn take_errors(&self) -> Option<mpsc::Receiver<TransportError>> {
        self.errors.lock().take()
    }

    async fn close(&self) -> claudewire_transport::Result<()> {
        self.ready.store(false, Ordering::SeqCst);
        self.finish();
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("ready", &self.is_ready())
            .field("sent", &self.sent.lock().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_send_requires_connect() {
        let transport = MockTransport::new();
        let cancel = CancellationToken::new();
        assert!(matches!(
            transport.send(&cancel, b"{}\n").await,
            Err(TransportError::NotConnected)
        ));

        transport.connect(&cancel).await.unwrap();
        transport.send(&cancel, b"{\"a\":1}\n").await.unwrap();
        assert_eq!(transport.sent_json(), vec![json!({"a": 1})]);
    }

    #[tokio::test]
    async fn test_close_ends_inbound_and_is_idempotent() {
        let transport = MockTransport::new();
        let mut lines = transport.take_messages().unwrap();
        transport.connect(&CancellationToken::new()).await.unwrap();
        assert!(transport.push_line("x").await);

        transport.close().await.unwrap();
        transport.close().await.unwrap();
        assert!(!transport.is_ready());
        assert!(!transport.push_line("y").await);
        assert_eq!(lines.recv().await, Some(b"x".to_vec()));
        assert_eq!(lines.recv().await, None);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let transport = MockTransport::new();
        let cancel = CancellationToken::new();
        transport.fail_connect(true);
        assert!(transport.connect(&cancel).await.is_err());
        transport.fail_connect(false);
        transport.connect(&cancel).await.unwrap();
        transport.fail_sends(true);
        assert!(matches!(
            transport.send(&cancel, b"{}\n").await,
            Err(TransportError::Io(_))
        ));
        assert!(transport.sent().is_empty());
    }
}
