//! Shared helpers for session tests

#![allow(dead_code)]

use claudewire::testing::MockTransport;
use claudewire::{AgentSession, ClientOptions, Hook, Message, MessageStream};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const WAIT: Duration = Duration::from_secs(5);

/// A session wired to a fresh mock transport, not yet connected
pub fn mock_session(hooks: Vec<Hook>) -> (AgentSession, Arc<MockTransport>) {
    let transport = Arc::new(MockTransport::new());
    let mut builder = ClientOptions::builder().transport(transport.clone());
    for hook in hooks {
        builder = builder.hook(hook);
    }
    let options = builder.build().expect("valid options");
    (AgentSession::new(options), transport)
}

/// A connected session and its mock transport
pub async fn connected_session(hooks: Vec<Hook>) -> (AgentSession, Arc<MockTransport>) {
    let (session, transport) = mock_session(hooks);
    session
        .connect(&CancellationToken::new())
        .await
        .expect("connect");
    (session, transport)
}

/// Next message, failing the test after a timeout
pub async fn next(stream: &MessageStream) -> Message {
    tokio::time::timeout(WAIT, stream.recv())
        .await
        .expect("timed out waiting for a message")
        .expect("message stream closed")
}

pub fn assistant_text(text: &str) -> Value {
    json!({
        "type": "assistant",
        "message": {"model": "claude-sonnet-4-5", "content": [{"type": "text", "text": text}]}
    })
}

pub fn result_frame(result: &str) -> Value {
    json!({
        "type": "result",
        "subtype": "success",
        "duration_ms": 1200.0,
        "duration_api_ms": 900,
        "is_error": false,
        "num_turns": 1,
        "session_id": "sess-1",
        "total_cost_usd": 0.002,
        "result": result
    })
}

pub fn hook_callback(request_id: &str, callback_id: &str, input: Value) -> Value {
    json!({
        "type": "control_request",
        "request_id": request_id,
        "request": {"subtype": "hook_callback", "callback_id": callback_id, "input": input}
    })
}

/// Text of an assistant message
pub fn text_of(message: &Message) -> Option<String> {
    match message {
        Message::Assistant(assistant) => Some(assistant.text()),
        _ => None,
    }
}

/// Sent frames of the given `type`
pub fn sent_of_type(transport: &MockTransport, kind: &str) -> Vec<Value> {
    transport
        .sent_json()
        .into_iter()
        .filter(|frame| frame["type"] == kind)
        .collect()
}
