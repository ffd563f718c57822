//! Message pump
//!
//! One task per connection reads raw lines from the transport, decodes them
//! and routes each frame: conversation messages go to the consumer channel,
//! control requests are answered through the [`ControlEngine`], and control
//! responses resolve pending outbound requests. Lines are handled strictly one
//! at a time, so a hook's response is written before the next line is read.

use crate::control::ControlEngine;
use crate::message_parser::{Frame, parse_frame};
use claudewire_protocol::{ControlFrame, Message};
use claudewire_transport::Transport;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Snapshot of the `system`/`init` payload
pub(crate) type ServerInfo = Arc<RwLock<Option<Map<String, Value>>>>;

/// Everything the pump needs for one connection
pub(crate) struct MessageRouter {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) engine: Arc<ControlEngine>,
    pub(crate) server_info: ServerInfo,
    pub(crate) outbound: mpsc::Sender<Message>,
}

impl MessageRouter {
    /// Run until the transport's line channel closes
    ///
    /// Dropping `self` on return closes the consumer channel.
    pub(crate) async fn run(self, mut lines: mpsc::Receiver<Vec<u8>>) {
        while let Some(line) = lines.recv().await {
            trace!(bytes = line.len(), "line received");
            self.route(&line).await;
        }
        self.engine.abandon_all();
        debug!("message pump stopped");
    }

    async fn route(&self, line: &[u8]) {
        let frame = match parse_frame(line) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(error = %e, "dropping undecodable frame");
                return;
            }
        };

        match frame {
            Frame::Message(message) => {
                if let Message::System(system) = &message
                    && system.is_init()
                {
                    *self.server_info.write() = Some(system.data.clone());
                }
                if self.outbound.send(message).await.is_err() {
                    debug!("consumer channel closed, message dropped");
                }
            }
            Frame::ControlRequest(request) => {
                let Some(response) = self.engine.handle_request(request).await else {
                    return;
                };
                let request_id = response.response.request_id().clone();
                let line = match ControlFrame::from(response).to_line() {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(%request_id, error = %e, "failed to encode control response");
                        return;
                    }
                };
                // The peer is waiting on this response; the caller's token must not cancel it.
                if let Err(e) = self.transport.send(&CancellationToken::new(), &line).await {
                    warn!(%request_id, error = %e, "failed to send control response");
                }
            }
            Frame::ControlResponse(response) => self.engine.resolve(response),
        }
    }
}
