//! CLI transport implementation
//!
//! Owns one Claude Code CLI process and moves raw JSONL lines to and from it.

use super::process::{self, ERROR_CHANNEL_CAPACITY, ProcessConfig, ProcessSinks};
use crate::error::{Result, TransportError};
use crate::traits::Transport;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::AsyncWriteExt;
use tokio::process::ChildStdin;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

type Senders = (mpsc::Sender<Vec<u8>>, mpsc::Sender<TransportError>);

/// Subprocess transport for the Claude Code CLI
///
/// The line and error channels are created up front so they can be taken
/// before `connect`. A transport runs at most one process; once closed it
/// cannot be connected again.
pub struct CliTransport {
    config: ProcessConfig,
    ready: AtomicBool,
    closing: Arc<AtomicBool>,
    lifecycle: tokio::sync::Mutex<()>,
    stdin: tokio::sync::Mutex<Option<ChildStdin>>,
    kill: Mutex<Option<oneshot::Sender<()>>>,
    senders: Mutex<Option<Senders>>,
    messages: Mutex<Option<mpsc::Receiver<Vec<u8>>>>,
    errors: Mutex<Option<mpsc::Receiver<TransportError>>>,
}

impl CliTransport {
    /// Create a transport; nothing is spawned until `connect`
    pub fn new(config: ProcessConfig) -> Self {
        let (messages_tx, messages_rx) = mpsc::channel(config.channel_capacity.max(1));
        let (errors_tx, errors_rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);

        Self {
            config,
            ready: AtomicBool::new(false),
            closing: Arc::new(AtomicBool::new(false)),
            lifecycle: tokio::sync::Mutex::new(()),
            stdin: tokio::sync::Mutex::new(None),
            kill: Mutex::new(None),
            senders: Mutex::new(Some((messages_tx, errors_tx))),
            messages: Mutex::new(Some(messages_rx)),
            errors: Mutex::new(Some(errors_rx)),
        }
    }

    /// Get the process configuration
    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for CliTransport {
    async fn connect(&self, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        let _guard = self.lifecycle.lock().await;
        if self.ready.load(Ordering::SeqCst) {
            return Ok(());
        }

        let program = self.config.program()?;
        // Clone so a failed spawn leaves the transport connectable.
        let (messages, errors) = self.senders.lock().clone().ok_or(TransportError::Closed)?;
        let running = process::spawn(
            &self.config,
            &program,
            ProcessSinks {
                messages,
                errors,
                closing: Arc::clone(&self.closing),
            },
        )?;

        // The reader now holds the only senders; channels close when it exits.
        self.senders.lock().take();
        *self.stdin.lock().await = Some(running.stdin);
        *self.kill.lock() = Some(running.kill);
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, cancel: &CancellationToken, data: &[u8]) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        if !self.ready.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }

        let mut stdin = self.stdin.lock().await;
        let pipe = stdin.as_mut().ok_or(TransportError::NotConnected)?;
        pipe.write_all(data).await?;
        pipe.flush().await?;
        Ok(())
    }

    fn take_messages(&self) -> Option<mpsc::Receiver<Vec<u8>>> {
        self.messages.lock().take()
    }

    fn take_errors(&self) -> Option<mpsc::Receiver<TransportError>> {
        self.errors.lock().take()
    }

    async fn close(&self) -> Result<()> {
        let _guard = self.lifecycle.lock().await;
        self.ready.store(false, Ordering::SeqCst);
        self.closing.store(true, Ordering::SeqCst);

        // Kill before taking stdin: a writer blocked on a full pipe holds the lock.
        if let Some(kill) = self.kill.lock().take() {
            let _ = kill.send(());
        }
        self.stdin.lock().await.take();
        // A never-connected transport still closes its channels.
        self.senders.lock().take();
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for CliTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliTransport")
            .field("config", &self.config)
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subprocess::resolve::DefaultCliResolver;

    fn unresolvable() -> ProcessConfig {
        let resolver = DefaultCliResolver::for_program("claudewire-no-such-binary")
            .with_fallbacks(Vec::new());
        ProcessConfig::new().with_resolver(Arc::new(resolver))
    }

    #[tokio::test]
    async fn test_send_before_connect_is_not_connected() {
        let transport = CliTransport::new(ProcessConfig::new());
        let err = transport
            .send(&CancellationToken::new(), b"{}\n")
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
        assert!(!transport.is_ready());
    }

    #[tokio::test]
    async fn test_connect_without_cli_fails() {
        let transport = CliTransport::new(unresolvable());
        let err = transport
            .connect(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::CliNotFound));
        assert!(!transport.is_ready());
    }

    #[tokio::test]
    async fn test_cancelled_connect_does_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let transport = CliTransport::new(unresolvable());
        let err = transport.connect(&cancel).await.unwrap_err();
        assert!(matches!(err, TransportError::Cancelled));
    }

    #[tokio::test]
    async fn test_channels_taken_once() {
        let transport = CliTransport::new(ProcessConfig::new());
        assert!(transport.take_messages().is_some());
        assert!(transport.take_messages().is_none());
        assert!(transport.take_errors().is_some());
        assert!(transport.take_errors().is_none());
    }

    #[tokio::test]
    async fn test_close_without_connect_closes_channels() {
        let transport = CliTransport::new(ProcessConfig::new());
        let mut messages = transport.take_messages().unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();
        assert!(messages.recv().await.is_none());
        assert!(!transport.is_ready());
    }
}
