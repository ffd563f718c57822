//! Control protocol engine
//!
//! Owns both directions of the `control_request` / `control_response`
//! side channel:
//!
//! - **Outbound**: requests built here are registered in a pending table
//!   before they are written, so the matching response can be routed back to
//!   the [`PendingControl`] handle the caller holds. Dropping the handle makes
//!   the request fire-and-forget.
//! - **Inbound**: `hook_callback` requests are dispatched to the
//!   [`HookRegistry`] and answered with exactly one success response. Other
//!   subtypes are ignored without a response.

use crate::error::{AgentError, Result};
use crate::hooks::{HookDispatch, HookRegistry};
use claudewire_protocol::{
    ControlFrame, ControlRequest, ControlRequestBody, ControlResponse, ControlResponsePayload,
    HookCallbackResponse, HookDecision, HookEvent, HookOutput, HookSpecificOutput, RequestId,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

type Completion = oneshot::Sender<Result<Option<Value>>>;

/// Handle to an outbound control request awaiting its response
///
/// Await [`PendingControl::wait`] to receive the CLI's answer, or drop the
/// handle to ignore it.
#[derive(Debug)]
pub struct PendingControl {
    request_id: RequestId,
    rx: oneshot::Receiver<Result<Option<Value>>>,
}

impl PendingControl {
    /// Id of the request on the wire
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Wait for the matching `control_response`
    ///
    /// Resolves to the response payload on success,
    /// [`AgentError::ControlRequestFailed`] if the CLI answered with an error,
    /// or [`AgentError::ControlRequestAbandoned`] if the session closed first.
    pub async fn wait(self) -> Result<Option<Value>> {
        self.rx
            .await
            .unwrap_or(Err(AgentError::ControlRequestAbandoned))
    }
}

/// Correlates control requests and responses for one session
pub(crate) struct ControlEngine {
    hooks: Arc<HookRegistry>,
    pending: Mutex<HashMap<RequestId, Completion>>,
}

impl ControlEngine {
    pub(crate) fn new(hooks: Arc<HookRegistry>) -> Self {
        Self {
            hooks,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// The initialize request, if any hooks are registered
    pub(crate) fn initialize_request(&self) -> Option<ControlRequestBody> {
        if self.hooks.is_empty() {
            return None;
        }
        Some(ControlRequestBody::Initialize {
            hooks: self.hooks.initialize_payload(),
        })
    }

    /// Encode an outbound request and register it as pending
    ///
    /// If the write then fails, the caller must [`forget`](Self::forget) it.
    pub(crate) fn prepare(&self, body: ControlRequestBody) -> Result<(Vec<u8>, PendingControl)> {
        let request = ControlRequest::new(body);
        let line = ControlFrame::from(request.clone()).to_line()?;
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(request.request_id.clone(), tx);
        Ok((
            line,
            PendingControl {
                request_id: request.request_id,
                rx,
            },
        ))
    }

    /// Drop a pending entry whose request was never written
    pub(crate) fn forget(&self, request_id: &RequestId) {
        self.pending.lock().remove(request_id);
    }

    /// Route an inbound response to its pending handle
    pub(crate) fn resolve(&self, response: ControlResponse) {
        let request_id = response.response.request_id().clone();
        let Some(tx) = self.pending.lock().remove(&request_id) else {
            debug!(%request_id, "control response for unknown request");
            return;
        };
        debug!(%request_id, "control response received");
        let outcome = match response.response {
            ControlResponsePayload::Success { response, .. } => Ok(response),
            ControlResponsePayload::Error { request_id, error } => {
                Err(AgentError::ControlRequestFailed {
                    request_id,
                    message: error,
                })
            }
        };
        // The caller may have dropped its handle.
        let _ = tx.send(outcome);
    }

    /// Fail every outstanding request with `ControlRequestAbandoned`
    pub(crate) fn abandon_all(&self) {
        for (_, tx) in self.pending.lock().drain() {
            let _ = tx.send(Err(AgentError::ControlRequestAbandoned));
        }
    }

    /// Number of requests awaiting a response
    pub(crate) fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Handle a request from the CLI, returning the response to send, if any
    pub(crate) async fn handle_request(&self, request: ControlRequest) -> Option<ControlResponse> {
        let ControlRequest {
            request_id,
            request,
        } = request;

        let (callback_id, input, tool_use_id) = match request {
            ControlRequestBody::HookCallback {
                callback_id,
                input,
                tool_use_id,
            } => (callback_id, input, tool_use_id),
            other => {
                debug!(
                    %request_id,
                    subtype = other.subtype(),
                    "ignoring unsupported control request"
                );
                return None;
            }
        };

        let response = match self.hooks.dispatch(&callback_id, input, tool_use_id).await? {
            HookDispatch::Completed { event, output } => hook_response(event, output),
            HookDispatch::FailedOpen => HookCallbackResponse::proceed(),
        };

        let payload = match serde_json::to_value(&response) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(%request_id, error = %e, "failed to encode hook response");
                serde_json::json!({"continue": true})
            }
        };
        Some(ControlResponse::success(request_id, Some(payload)))
    }
}

/// Translate a hook's output into the wire response
pub(crate) fn hook_response(event: HookEvent, output: HookOutput) -> HookCallbackResponse {
    let HookOutput {
        decision,
        reason,
        system_message,
        additional_context,
        updated_input,
        continue_,
        stop_reason,
        suppress_output,
    } = output;

    let hook_specific_output = match decision {
        Some(decision) => Some(HookSpecificOutput {
            hook_event_name: event,
            permission_decision: Some(decision),
            permission_decision_reason: match decision {
                HookDecision::Deny => reason.clone(),
                HookDecision::Allow => None,
            },
            updated_input,
            additional_context,
        }),
        None => additional_context.map(|context| HookSpecificOutput {
            hook_event_name: event,
            permission_decision: None,
            permission_decision_reason: None,
            updated_input: None,
            additional_context: Some(context),
        }),
    };

    HookCallbackResponse {
        continue_: continue_.unwrap_or(true),
        suppress_output,
        stop_reason,
        system_message,
        reason,
        hook_specific_output,
    }
}
