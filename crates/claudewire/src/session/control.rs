//! Runtime control: interrupts, permission mode and model changes
//!
//! Every request is written immediately and returns a [`PendingControl`].
//! Drop it to fire and forget, or await it for the CLI's answer.

use crate::control::PendingControl;
use crate::error::Result;
use crate::session::core::AgentSession;
use claudewire_protocol::{ControlRequestBody, PermissionMode};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

impl AgentSession {
    /// Interrupt the current turn
    pub async fn interrupt(&self, cancel: &CancellationToken) -> Result<PendingControl> {
        self.send_control(cancel, ControlRequestBody::Interrupt).await
    }

    /// Change the permission mode
    pub async fn set_permission_mode(
        &self,
        cancel: &CancellationToken,
        mode: PermissionMode,
    ) -> Result<PendingControl> {
        self.send_control(cancel, ControlRequestBody::SetPermissionMode { mode })
            .await
    }

    /// Change the model; `None` restores the CLI default
    pub async fn set_model(
        &self,
        cancel: &CancellationToken,
        model: Option<&str>,
    ) -> Result<PendingControl> {
        self.send_control(
            cancel,
            ControlRequestBody::SetModel {
                model: model.map(str::to_string),
            },
        )
        .await
    }

    /// Rewind files the agent changed to their state at a user message
    ///
    /// Requires [`ClientOptionsBuilder::enable_file_checkpointing`]. The ids of
    /// user messages are only reported with the `replay-user-messages` flag.
    ///
    /// [`ClientOptionsBuilder::enable_file_checkpointing`]: crate::ClientOptionsBuilder::enable_file_checkpointing
    pub async fn rewind_files(
        &self,
        cancel: &CancellationToken,
        user_message_id: impl Into<String>,
    ) -> Result<PendingControl> {
        self.send_control(
            cancel,
            ControlRequestBody::RewindFiles {
                user_message_id: user_message_id.into(),
            },
        )
        .await
    }

    /// The payload of the CLI's `system`/`init` message, once received
    pub fn server_info(&self) -> Option<Map<String, Value>> {
        self.server_info.read().read().clone()
    }
}
