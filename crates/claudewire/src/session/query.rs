//! Query execution and message streaming

use crate::error::{AgentError, Result};
use crate::session::core::AgentSession;
use crate::session::state::MessageStream;
use claudewire_protocol::UserTurn;
use claudewire_transport::TransportError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

impl AgentSession {
    /// Send a user prompt
    ///
    /// Returns once the prompt is written. Replies arrive on
    /// [`messages`](Self::messages), ending with a result message.
    pub async fn query(&self, cancel: &CancellationToken, prompt: impl Into<String>) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(AgentError::Cancelled);
        }
        let transport = self.transport().await?;
        let line = UserTurn::new(prompt).to_line()?;
        transport.send(cancel, &line).await?;
        Ok(())
    }

    /// The conversation message stream, or `None` when not connected
    pub async fn messages(&self) -> Option<MessageStream> {
        self.state
            .read()
            .await
            .connection
            .as_ref()
            .map(|conn| conn.messages.clone())
    }

    /// Take the transport's asynchronous error channel
    ///
    /// Available once per connection. Line-length violations and the process
    /// exit status arrive here; the channel closes after the message stream
    /// has ended.
    pub async fn take_errors(&self) -> Option<mpsc::Receiver<TransportError>> {
        self.state
            .write()
            .await
            .connection
            .as_mut()
            .and_then(|conn| conn.errors.take())
    }
}
