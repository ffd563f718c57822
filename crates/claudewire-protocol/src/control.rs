//! Control protocol frames
//!
//! Besides conversation messages, client and CLI exchange `control_request` and
//! `control_response` frames on the same JSONL stream. Requests flow in both
//! directions; each carries a request id that its response echoes back.

use crate::error::Result;
use crate::hooks::{HookEvent, HookMatcherConfig};
use crate::types::PermissionMode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Unique identifier for a control request
///
/// Format: `req-` followed by 16 hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a new random request ID
    pub fn new() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(format!("req-{}", &hex[..16]))
    }

    /// Create from raw string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Body of a control request, keyed by `subtype`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "subtype", rename_all = "snake_case")]
pub enum ControlRequestBody {
    /// Stop the current turn
    Interrupt,

    /// Ask whether a tool may run
    CanUseTool {
        /// Tool name
        tool_name: String,
        /// Tool parameters
        #[serde(default)]
        input: Map<String, Value>,
        /// Permission suggestions offered by the CLI
        #[serde(default, skip_serializing_if = "Option::is_none")]
        permission_suggestions: Option<Vec<Value>>,
        /// Path that triggered the request, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        blocked_path: Option<String>,
    },

    /// Register hooks at startup
    Initialize {
        /// Matchers grouped by event
        hooks: BTreeMap<HookEvent, Vec<HookMatcherConfig>>,
    },

    /// Change the permission mode
    SetPermissionMode {
        /// New mode
        mode: PermissionMode,
    },

    /// Change the model; `None` restores the default
    SetModel {
        /// New model
        model: Option<String>,
    },

    /// Invoke a registered hook
    HookCallback {
        /// Registered callback id
        #[serde(default)]
        callback_id: String,
        /// Event-specific hook input
        #[serde(default, alias = "hook_input")]
        input: Value,
        /// Tool use the hook fired for
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_use_id: Option<String>,
    },

    /// Message for an in-process MCP server
    McpMessage {
        /// Target server
        server_name: String,
        /// JSON-RPC payload
        message: Value,
    },

    /// Rewind tracked files to the state at a user message
    RewindFiles {
        /// User message to rewind to
        user_message_id: String,
    },
}

impl ControlRequestBody {
    /// The wire subtype of this request
    pub fn subtype(&self) -> &'static str {
        match self {
            Self::Interrupt => "interrupt",
            Self::CanUseTool { .. } => "can_use_tool",
            Self::Initialize { .. } => "initialize",
            Self::SetPermissionMode { .. } => "set_permission_mode",
            Self::SetModel { .. } => "set_model",
            Self::HookCallback { .. } => "hook_callback",
            Self::McpMessage { .. } => "mcp_message",
            Self::RewindFiles { .. } => "rewind_files",
        }
    }
}

/// A control request envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlRequest {
    /// Correlation id
    pub request_id: RequestId,

    /// Request body
    pub request: ControlRequestBody,
}

impl ControlRequest {
    /// Wrap a body with a fresh request id
    pub fn new(request: ControlRequestBody) -> Self {
        Self {
            request_id: RequestId::new(),
            request,
        }
    }
}

/// Payload of a control response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "subtype", rename_all = "snake_case")]
pub enum ControlResponsePayload {
    /// The request succeeded
    Success {
        /// Id of the request being answered
        request_id: RequestId,
        /// Result data
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response: Option<Value>,
    },

    /// The request failed
    Error {
        /// Id of the request being answered
        request_id: RequestId,
        /// Error message
        #[serde(default)]
        error: String,
    },
}

impl ControlResponsePayload {
    /// Id of the request being answered
    pub fn request_id(&self) -> &RequestId {
        match self {
            Self::Success { request_id, .. } | Self::Error { request_id, .. } => request_id,
        }
    }
}

/// A control response envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlResponse {
    /// Response payload
    pub response: ControlResponsePayload,
}

impl ControlResponse {
    /// Build a success response
    pub fn success(request_id: RequestId, response: Option<Value>) -> Self {
        Self {
            response: ControlResponsePayload::Success {
                request_id,
                response,
            },
        }
    }

    /// Build an error response
    pub fn error(request_id: RequestId, error: impl Into<String>) -> Self {
        Self {
            response: ControlResponsePayload::Error {
                request_id,
                error: error.into(),
            },
        }
    }
}

/// A control frame as it appears on the wire, keyed by `type`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlFrame {
    /// A request
    ControlRequest(ControlRequest),
    /// A response
    ControlResponse(ControlResponse),
}

impl ControlFrame {
    /// Encode as one JSONL line, newline included
    pub fn to_line(&self) -> Result<Vec<u8>> {
        to_line(self)
    }
}

impl From<ControlRequest> for ControlFrame {
    fn from(request: ControlRequest) -> Self {
        Self::ControlRequest(request)
    }
}

impl From<ControlResponse> for ControlFrame {
    fn from(response: ControlResponse) -> Self {
        Self::ControlResponse(response)
    }
}

/// The `message` part of an outbound user turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserTurnMessage {
    /// Always `user`
    pub role: String,
    /// Prompt text
    pub content: String,
}

/// An outbound user turn
///
/// Serializes as
/// `{"type":"user","message":{"role":"user","content":..},"parent_tool_use_id":null,"session_id":"default"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserTurn {
    #[serde(rename = "type")]
    kind: String,

    /// Prompt message
    pub message: UserTurnMessage,

    /// Always null for turns sent by the client
    pub parent_tool_use_id: Option<String>,

    /// Session scope
    pub session_id: String,
}

impl UserTurn {
    /// Build a turn for the default session scope
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            kind: "user".to_string(),
            message: UserTurnMessage {
                role: "user".to_string(),
                content: prompt.into(),
            },
            parent_tool_use_id: None,
            session_id: "default".to_string(),
        }
    }

    /// Encode as one JSONL line, newline included
    pub fn to_line(&self) -> Result<Vec<u8>> {
        to_line(self)
    }
}

fn to_line<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    Ok(line)
}
