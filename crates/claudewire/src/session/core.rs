//! Core session management
//!
//! Provides the AgentSession struct and its connect/close lifecycle.

use crate::config::ClientOptions;
use crate::control::{ControlEngine, PendingControl};
use crate::error::{AgentError, Result};
use crate::hooks::HookRegistry;
use crate::routing::{MessageRouter, ServerInfo};
use crate::session::state::{Connection, ConnectionState, MessageStream};
use claudewire_protocol::ControlRequestBody;
use claudewire_transport::{CliTransport, Transport, TransportError};
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// An interactive session with the Claude Code CLI
///
/// A session is created disconnected. [`connect`](Self::connect) starts the
/// transport and the message pump; [`close`](Self::close) stops both. A closed
/// session may be connected again, which starts a fresh CLI process.
///
/// All methods take `&self` and may be called concurrently.
pub struct AgentSession {
    pub(crate) options: Arc<ClientOptions>,
    pub(crate) hooks: Arc<HookRegistry>,
    pub(crate) state: RwLock<ConnectionState>,
    /// Init snapshot of the latest connection; each pump writes only its own slot
    pub(crate) server_info: parking_lot::RwLock<ServerInfo>,
}

impl AgentSession {
    /// Create a disconnected session
    pub fn new(options: ClientOptions) -> Self {
        Self {
            hooks: Arc::new(options.hooks.clone()),
            options: Arc::new(options),
            state: RwLock::new(ConnectionState::default()),
            server_info: parking_lot::RwLock::new(ServerInfo::default()),
        }
    }

    /// The options this session was created with
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Start the CLI and the message pump
    ///
    /// If hooks are registered, the `initialize` request is sent before this
    /// returns; failing to send it closes the transport and fails the connect.
    /// Connecting an already connected session is a no-op.
    pub async fn connect(&self, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(AgentError::Cancelled);
        }

        let mut state = self.state.write().await;
        if state.is_connected() {
            return Ok(());
        }

        let transport: Arc<dyn Transport> = match &self.options.transport {
            Some(transport) => Arc::clone(transport),
            None => Arc::new(CliTransport::new(self.options.process_config())),
        };
        transport.connect(cancel).await?;

        let Some(lines) = transport.take_messages() else {
            let _ = transport.close().await;
            return Err(AgentError::Transport(TransportError::Closed));
        };
        let errors = transport.take_errors();

        // A pump outliving its connection must not touch the next one's state.
        let engine = Arc::new(ControlEngine::new(Arc::clone(&self.hooks)));
        let server_info = ServerInfo::default();
        *self.server_info.write() = Arc::clone(&server_info);

        let (outbound, inbound) = mpsc::channel(self.options.channel_capacity.max(1));
        let router = MessageRouter {
            transport: Arc::clone(&transport),
            engine: Arc::clone(&engine),
            server_info,
            outbound,
        };
        let pump = tokio::spawn(router.run(lines));

        if let Some(initialize) = engine.initialize_request() {
            // The response arrives through the pump; only the write must succeed.
            if let Err(e) = write_control(&engine, &transport, cancel, initialize).await {
                debug!(error = %e, "initialize failed, closing transport");
                let _ = transport.close().await;
                engine.abandon_all();
                return Err(e);
            }
        }

        state.connection = Some(Connection {
            transport,
            engine,
            messages: MessageStream::new(inbound),
            errors,
            pump,
        });
        debug!(hooks = self.options.hooks.len(), "session connected");
        Ok(())
    }

    /// Stop the CLI
    ///
    /// Idempotent. Pending control requests resolve to
    /// [`AgentError::ControlRequestAbandoned`]. A hook callback that is
    /// already running is not aborted.
    pub async fn close(&self) -> Result<()> {
        let Some(connection) = self.state.write().await.connection.take() else {
            return Ok(());
        };
        let result = connection.transport.close().await;
        connection.engine.abandon_all();
        debug!(pump_finished = connection.pump.is_finished(), "session closed");
        result.map_err(AgentError::from)
    }

    /// Whether the session is connected
    pub async fn is_connected(&self) -> bool {
        self.state.read().await.is_connected()
    }

    pub(crate) async fn transport(&self) -> Result<Arc<dyn Transport>> {
        self.state
            .read()
            .await
            .transport()
            .ok_or(AgentError::NotConnected)
    }

    /// Send a control request and register it as pending
    pub(crate) async fn send_control(
        &self,
        cancel: &CancellationToken,
        body: ControlRequestBody,
    ) -> Result<PendingControl> {
        if cancel.is_cancelled() {
            return Err(AgentError::Cancelled);
        }
        let (transport, engine) = self
            .state
            .read()
            .await
            .control()
            .ok_or(AgentError::NotConnected)?;
        write_control(&engine, &transport, cancel, body).await
    }
}

async fn write_control(
    engine: &ControlEngine,
    transport: &Arc<dyn Transport>,
    cancel: &CancellationToken,
    body: ControlRequestBody,
) -> Result<PendingControl> {
    let (line, pending) = engine.prepare(body)?;
    if let Err(e) = transport.send(cancel, &line).await {
        engine.forget(pending.request_id());
        return Err(e.into());
    }
    Ok(pending)
}

impl std::fmt::Debug for AgentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSession")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
