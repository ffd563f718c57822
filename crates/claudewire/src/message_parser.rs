//! Message parsing for the CLI's stream-json output.
//!
//! Every line the CLI writes is one JSON object with a top-level `type`. Five
//! types are conversation messages; `control_request` and `control_response`
//! belong to the control protocol. Parsing is deliberately lenient: unknown
//! fields are ignored, missing fields take defaults, and malformed content
//! blocks are skipped while their siblings are kept.
//!
//! # Example
//!
//! ```ignore
//! use claudewire::message_parser::{parse_frame, Frame};
//!
//! let frame = parse_frame(br#"{"type":"result","subtype":"success","num_turns":1.0}"#)?;
//! assert!(matches!(frame, Frame::Message(m) if m.is_result()));
//! ```

use claudewire_protocol::{
    AssistantMessage, ContentBlock, ControlRequest, ControlResponse, Message, ResultMessage,
    StreamEvent, SystemMessage, UserContent, UserMessage,
};
use serde_json::{Map, Value};

/// Errors that can occur during message parsing
#[derive(Debug, thiserror::Error)]
pub enum MessageParseError {
    /// The line is not a JSON object
    #[error("Invalid message format: {0}")]
    InvalidFormat(String),

    /// The `type` field is missing
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Unknown message type
    #[error("Unknown message type: {0}")]
    UnknownType(String),

    /// JSON deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One classified inbound line
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// A conversation message for the consumer
    Message(Message),

    /// A request from the CLI
    ControlRequest(ControlRequest),

    /// The CLI's answer to one of our requests
    ControlResponse(ControlResponse),
}

/// Parse one raw line
pub fn parse_frame(line: &[u8]) -> Result<Frame, MessageParseError> {
    let value: Value = serde_json::from_slice(line)?;
    parse_frame_value(value)
}

/// Parse one JSON value
pub fn parse_frame_value(data: Value) -> Result<Frame, MessageParseError> {
    match message_type(&data)? {
        "control_request" => Ok(Frame::ControlRequest(serde_json::from_value(data)?)),
        "control_response" => Ok(Frame::ControlResponse(serde_json::from_value(data)?)),
        _ => parse_message(data).map(Frame::Message),
    }
}

/// Parse a JSON value into a conversation message
pub fn parse_message(data: Value) -> Result<Message, MessageParseError> {
    let message = match message_type(&data)? {
        "user" => Message::User(parse_user_message(&data)),
        "assistant" => Message::Assistant(parse_assistant_message(&data)),
        "system" => Message::System(parse_system_message(&data)),
        "result" => Message::Result(parse_result_message(&data)),
        "stream_event" => Message::StreamEvent(parse_stream_event(&data)),
        other => return Err(MessageParseError::UnknownType(other.to_string())),
    };
    Ok(message)
}

fn message_type(data: &Value) -> Result<&str, MessageParseError> {
    if !data.is_object() {
        return Err(MessageParseError::InvalidFormat(format!(
            "Expected object, got {}",
            data
        )));
    }
    data.get("type")
        .and_then(Value::as_str)
        .ok_or(MessageParseError::MissingField("type"))
}

fn parse_user_message(data: &Value) -> UserMessage {
    let content = match data.get("message").and_then(|m| m.get("content")) {
        Some(Value::String(text)) => UserContent::Text(text.clone()),
        Some(blocks @ Value::Array(_)) => UserContent::Blocks(parse_content_blocks(blocks)),
        _ => UserContent::default(),
    };

    UserMessage {
        content,
        uuid: get_string(data, "uuid"),
        parent_tool_use_id: get_string(data, "parent_tool_use_id"),
    }
}

fn parse_assistant_message(data: &Value) -> AssistantMessage {
    let message = data.get("message");
    AssistantMessage {
        content: message
            .and_then(|m| m.get("content"))
            .map(parse_content_blocks)
            .unwrap_or_default(),
        model: message
            .and_then(|m| get_string(m, "model"))
            .unwrap_or_default(),
        parent_tool_use_id: get_string(data, "parent_tool_use_id"),
        error: get_string(data, "error"),
    }
}

fn parse_system_message(data: &Value) -> SystemMessage {
    SystemMessage {
        subtype: get_string(data, "subtype").unwrap_or_default(),
        data: data
            .get("data")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
    }
}

fn parse_result_message(data: &Value) -> ResultMessage {
    ResultMessage {
        subtype: get_string(data, "subtype").unwrap_or_default(),
        duration_ms: get_counter(data, "duration_ms"),
        duration_api_ms: get_counter(data, "duration_api_ms"),
        is_error: data.get("is_error").and_then(Value::as_bool).unwrap_or(false),
        num_turns: u32::try_from(get_counter(data, "num_turns")).unwrap_or(u32::MAX),
        session_id: get_string(data, "session_id").unwrap_or_default(),
        total_cost_usd: data.get("total_cost_usd").and_then(Value::as_f64),
        usage: data.get("usage").filter(|v| !v.is_null()).cloned(),
        result: get_string(data, "result"),
        structured_output: data
            .get("structured_output")
            .filter(|v| !v.is_null())
            .cloned(),
    }
}

fn parse_stream_event(data: &Value) -> StreamEvent {
    StreamEvent {
        uuid: get_string(data, "uuid").unwrap_or_default(),
        session_id: get_string(data, "session_id").unwrap_or_default(),
        event: data
            .get("event")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new())),
        parent_tool_use_id: get_string(data, "parent_tool_use_id"),
    }
}

/// Parse a content list; entries that are not valid blocks are skipped
fn parse_content_blocks(content: &Value) -> Vec<ContentBlock> {
    content
        .as_array()
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|block| serde_json::from_value(block.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

fn get_string(data: &Value, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(String::from)
}

/// Read an integral counter that may arrive as a float
fn get_counter(data: &Value, key: &str) -> u64 {
    match data.get(key) {
        Some(v) => v
            .as_u64()
            .or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        None => 0,
    }
}
