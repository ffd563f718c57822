//! Conversation message types
//!
//! The five kinds of conversation frame the CLI emits on stdout. Decoding from
//! raw JSON lives with the session (it is lenient and has side effects); this
//! module owns the typed shapes and their wire encoding.

use crate::content::ContentBlock;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};

/// A conversation message received from the CLI
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Echo of a user turn (including tool results fed back to the model)
    User(UserMessage),

    /// A model response
    Assistant(AssistantMessage),

    /// A system event such as `init`
    System(SystemMessage),

    /// The terminal summary of a query
    Result(ResultMessage),

    /// A raw partial update for incremental rendering
    StreamEvent(StreamEvent),
}

/// Content of a user message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UserContent {
    /// Plain prompt text
    Text(String),

    /// Structured blocks, typically tool results
    Blocks(Vec<ContentBlock>),
}

impl Default for UserContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

/// User message echoed back by the CLI
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserMessage {
    /// Message content
    pub content: UserContent,

    /// Identifier of this message, used for file rewinds
    pub uuid: Option<String>,

    /// Tool use this message belongs to, when emitted by a subagent
    pub parent_tool_use_id: Option<String>,
}

/// Assistant response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantMessage {
    /// Content blocks in emission order
    pub content: Vec<ContentBlock>,

    /// Model that produced the response
    pub model: String,

    /// Tool use this message belongs to, when emitted by a subagent
    pub parent_tool_use_id: Option<String>,

    /// Error tag (for example `rate_limit` or `authentication_failed`)
    pub error: Option<String>,
}

/// System event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemMessage {
    /// Event subtype, e.g. `init`
    pub subtype: String,

    /// Opaque event payload
    pub data: Map<String, Value>,
}

/// Terminal summary of a query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultMessage {
    /// Subtype of the result message (`success`, `error_max_turns`, ...)
    pub subtype: String,

    /// Duration in milliseconds
    pub duration_ms: u64,

    /// API duration in milliseconds
    pub duration_api_ms: u64,

    /// Whether the result is an error
    pub is_error: bool,

    /// Number of turns in the conversation
    pub num_turns: u32,

    /// Session identifier
    pub session_id: String,

    /// Total cost in USD (if available)
    pub total_cost_usd: Option<f64>,

    /// Token usage information
    pub usage: Option<Value>,

    /// Final result text
    pub result: Option<String>,

    /// Output validated against the requested JSON schema
    pub structured_output: Option<Value>,
}

/// Partial message update, emitted when partial messages are enabled
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamEvent {
    /// Event identifier
    pub uuid: String,

    /// Session identifier
    pub session_id: String,

    /// Raw streaming event payload
    pub event: Value,

    /// Tool use this event belongs to, when emitted by a subagent
    pub parent_tool_use_id: Option<String>,
}

impl Message {
    /// The wire discriminator for this message
    pub fn kind(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Assistant(_) => "assistant",
            Self::System(_) => "system",
            Self::Result(_) => "result",
            Self::StreamEvent(_) => "stream_event",
        }
    }

    /// Check if this is the terminal result of a query
    pub fn is_result(&self) -> bool {
        matches!(self, Self::Result(_))
    }

    /// Get the result if this is a result message
    pub fn as_result(&self) -> Option<&ResultMessage> {
        match self {
            Self::Result(result) => Some(result),
            _ => None,
        }
    }

    /// Encode the message in the shape the CLI emits it
    pub fn to_value(&self) -> Value {
        match self {
            Self::User(m) => {
                let mut obj = json!({
                    "type": "user",
                    "message": {"role": "user", "content": m.content},
                });
                insert_opt(&mut obj, "uuid", m.uuid.as_ref());
                insert_opt(&mut obj, "parent_tool_use_id", m.parent_tool_use_id.as_ref());
                obj
            }
            Self::Assistant(m) => {
                let mut obj = json!({
                    "type": "assistant",
                    "message": {"model": m.model, "content": m.content},
                });
                insert_opt(&mut obj, "parent_tool_use_id", m.parent_tool_use_id.as_ref());
                insert_opt(&mut obj, "error", m.error.as_ref());
                obj
            }
            Self::System(m) => {
                let mut obj = json!({"type": "system", "subtype": m.subtype});
                if !m.data.is_empty() {
                    insert_opt(&mut obj, "data", Some(&m.data));
                }
                obj
            }
            Self::Result(m) => {
                let mut obj = json!({
                    "type": "result",
                    "subtype": m.subtype,
                    "duration_ms": m.duration_ms,
                    "duration_api_ms": m.duration_api_ms,
                    "is_error": m.is_error,
                    "num_turns": m.num_turns,
                    "session_id": m.session_id,
                });
                insert_opt(&mut obj, "total_cost_usd", m.total_cost_usd.as_ref());
                insert_opt(&mut obj, "usage", m.usage.as_ref());
                insert_opt(&mut obj, "result", m.result.as_ref());
                insert_opt(&mut obj, "structured_output", m.structured_output.as_ref());
                obj
            }
            Self::StreamEvent(m) => {
                let mut obj = json!({
                    "type": "stream_event",
                    "uuid": m.uuid,
                    "session_id": m.session_id,
                    "event": m.event,
                });
                insert_opt(&mut obj, "parent_tool_use_id", m.parent_tool_use_id.as_ref());
                obj
            }
        }
    }
}

fn insert_opt<T: Serialize>(obj: &mut Value, key: &str, value: Option<&T>) {
    if let (Value::Object(map), Some(value)) = (obj, value) {
        // Serializing plain data into a Value cannot fail.
        if let Ok(value) = serde_json::to_value(value) {
            map.insert(key.to_string(), value);
        }
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl UserMessage {
    /// Create a plain-text user message
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: UserContent::Text(text.into()),
            ..Default::default()
        }
    }
}

impl AssistantMessage {
    /// Concatenate all text blocks
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("")
    }

    /// Get all tool use requests as (id, name, input)
    pub fn tool_uses(&self) -> Vec<(&str, &str, &Value)> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => {
                    Some((id.as_str(), name.as_str(), input))
                }
                _ => None,
            })
            .collect()
    }
}

impl SystemMessage {
    /// Check if this is the session `init` event
    pub fn is_init(&self) -> bool {
        self.subtype == "init"
    }
}
