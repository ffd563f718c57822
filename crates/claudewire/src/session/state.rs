//! Connection state and the consumer-facing message stream

use crate::control::ControlEngine;
use claudewire_protocol::Message;
use claudewire_transport::{Transport, TransportError};
use futures::Stream;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

/// Receiving end of a session's conversation messages
///
/// Cloning yields another handle to the same channel; each message is
/// delivered to exactly one receiver. The stream ends when the connection
/// that produced it closes.
#[derive(Debug, Clone)]
pub struct MessageStream {
    rx: Arc<Mutex<mpsc::Receiver<Message>>>,
}

impl MessageStream {
    pub(crate) fn new(rx: mpsc::Receiver<Message>) -> Self {
        Self {
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    /// Receive the next message, or `None` once the connection has closed
    pub async fn recv(&self) -> Option<Message> {
        self.rx.lock().await.recv().await
    }

    /// Receive messages up to and including the next result
    ///
    /// Returns what was received if the stream ends first.
    pub async fn collect_until_result(&self) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Some(message) = self.recv().await {
            let done = message.is_result();
            messages.push(message);
            if done {
                break;
            }
        }
        messages
    }

    /// Adapt into a [`Stream`]
    pub fn into_stream(self) -> impl Stream<Item = Message> + Send + 'static {
        futures::stream::unfold(self, |stream| async move {
            let message = stream.recv().await?;
            Some((message, stream))
        })
    }
}

/// What a live connection holds
pub(crate) struct Connection {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) engine: Arc<ControlEngine>,
    pub(crate) messages: MessageStream,
    pub(crate) errors: Option<mpsc::Receiver<TransportError>>,
    pub(crate) pump: JoinHandle<()>,
}

/// Session connection state, guarded by the session's lock
#[derive(Default)]
pub(crate) struct ConnectionState {
    pub(crate) connection: Option<Connection>,
}

impl ConnectionState {
    pub(crate) fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub(crate) fn transport(&self) -> Option<Arc<dyn Transport>> {
        self.connection
            .as_ref()
            .map(|conn| Arc::clone(&conn.transport))
    }

    pub(crate) fn control(&self) -> Option<(Arc<dyn Transport>, Arc<ControlEngine>)> {
        self.connection
            .as_ref()
            .map(|conn| (Arc::clone(&conn.transport), Arc::clone(&conn.engine)))
    }
}
