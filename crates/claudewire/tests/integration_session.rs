//! Session lifecycle against a mock transport

mod common;

use claudewire::testing::MockTransport;
use claudewire::{
    AgentError, AgentSession, ClientOptions, Hook, HookContext, HookOutput, PermissionMode,
    StopInput, Transport, TransportError,
};
use common::*;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

async fn keep_going(_: StopInput, _: HookContext) -> anyhow::Result<HookOutput> {
    Ok(HookOutput::default())
}

// ============================================================================
// NOT-CONNECTED GUARD
// ============================================================================

async fn assert_all_not_connected(session: &AgentSession) {
    let cancel = CancellationToken::new();
    assert!(matches!(
        session.query(&cancel, "hello").await,
        Err(AgentError::NotConnected)
    ));
    assert!(matches!(
        session.interrupt(&cancel).await,
        Err(AgentError::NotConnected)
    ));
    assert!(matches!(
        session.set_permission_mode(&cancel, PermissionMode::Plan).await,
        Err(AgentError::NotConnected)
    ));
    assert!(matches!(
        session.set_model(&cancel, Some("claude-opus-4-1")).await,
        Err(AgentError::NotConnected)
    ));
}

#[tokio::test]
async fn test_operations_before_connect_fail() {
    let (session, transport) = mock_session(vec![]);
    assert_all_not_connected(&session).await;
    assert!(session.messages().await.is_none());
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_operations_after_close_fail() {
    let (session, transport) = connected_session(vec![]).await;
    session.close().await.unwrap();
    assert_all_not_connected(&session).await;
    assert!(session.messages().await.is_none());
    assert!(transport.sent().is_empty());
}

// ============================================================================
// CONNECT / CLOSE
// ============================================================================

#[tokio::test]
async fn test_close_is_idempotent() {
    let (session, transport) = connected_session(vec![]).await;
    assert!(session.is_connected().await);

    session.close().await.unwrap();
    assert!(!session.is_connected().await);
    assert!(!transport.is_ready());
    session.close().await.unwrap();
    assert!(!session.is_connected().await);
}

#[tokio::test]
async fn test_close_without_connect() {
    let (session, _) = mock_session(vec![]);
    session.close().await.unwrap();
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_connect_twice_is_noop() {
    let (session, _) = connected_session(vec![]).await;
    session.connect(&CancellationToken::new()).await.unwrap();
    assert!(session.is_connected().await);
}

#[tokio::test]
async fn test_cancelled_connect_does_nothing() {
    let (session, transport) = mock_session(vec![]);
    let cancel = CancellationToken::new();
    cancel.cancel();
    assert!(matches!(
        session.connect(&cancel).await,
        Err(AgentError::Cancelled)
    ));
    assert!(!session.is_connected().await);
    assert!(!transport.is_ready());
}

#[tokio::test]
async fn test_connect_failure_propagates() {
    let (session, transport) = mock_session(vec![]);
    transport.fail_connect(true);
    let err = session
        .connect(&CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::Transport(TransportError::Spawn(_))));
    assert!(!session.is_connected().await);
}

#[tokio::test]
async fn test_no_initialize_without_hooks() {
    let (_session, transport) = connected_session(vec![]).await;
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_initialize_sent_with_hooks() {
    let hooks = vec![
        Hook::stop(keep_going),
        Hook::subagent_stop(keep_going).with_timeout(std::time::Duration::from_secs(45)),
    ];
    let (_session, transport) = connected_session(hooks).await;

    let sent = transport.sent_json();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["type"], "control_request");
    assert!(sent[0]["request_id"].as_str().unwrap().starts_with("req-"));
    assert_eq!(
        sent[0]["request"],
        json!({
            "subtype": "initialize",
            "hooks": {
                "Stop": [{"matcher": "", "hookCallbackIds": ["hook_0"]}],
                "SubagentStop": [{"matcher": "", "hookCallbackIds": ["hook_1"], "timeout": 45}]
            }
        })
    );
}

#[tokio::test]
async fn test_initialize_failure_aborts_connect() {
    let (session, transport) = mock_session(vec![Hook::stop(keep_going)]);
    transport.fail_sends(true);

    let err = session
        .connect(&CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::Transport(TransportError::Io(_))));
    assert!(!session.is_connected().await);
    assert!(!transport.is_ready());
}

#[tokio::test]
async fn test_injected_transport_cannot_reconnect() {
    let (session, _) = connected_session(vec![]).await;
    session.close().await.unwrap();
    let err = session
        .connect(&CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::Transport(TransportError::Closed)));
}

// ============================================================================
// QUERY
// ============================================================================

#[tokio::test]
async fn test_query_writes_user_turn() {
    let (session, transport) = connected_session(vec![]).await;
    session
        .query(&CancellationToken::new(), "What is 2+2?")
        .await
        .unwrap();

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].last(), Some(&b'\n'));
    assert_eq!(
        transport.sent_json()[0],
        json!({
            "type": "user",
            "message": {"role": "user", "content": "What is 2+2?"},
            "parent_tool_use_id": null,
            "session_id": "default"
        })
    );
}

#[tokio::test]
async fn test_cancelled_query_writes_nothing() {
    let (session, transport) = connected_session(vec![]).await;
    let cancel = CancellationToken::new();
    cancel.cancel();
    assert!(matches!(
        session.query(&cancel, "hello").await,
        Err(AgentError::Cancelled)
    ));
    assert!(matches!(
        session.interrupt(&cancel).await,
        Err(AgentError::Cancelled)
    ));
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_messages_stream_ends_when_cli_exits() {
    let (session, transport) = connected_session(vec![]).await;
    let messages = session.messages().await.unwrap();
    transport.push_json(result_frame("done")).await;
    transport.finish();

    assert!(next(&messages).await.is_result());
    let end = tokio::time::timeout(WAIT, messages.recv()).await.unwrap();
    assert!(end.is_none());
}

// ============================================================================
// SERVER INFO AND ERRORS
// ============================================================================

#[tokio::test]
async fn test_server_info_captured_from_init() {
    let (session, transport) = connected_session(vec![]).await;
    assert!(session.server_info().is_none());

    let messages = session.messages().await.unwrap();
    transport
        .push_json(json!({"type": "system", "subtype": "status", "data": {"ignored": true}}))
        .await;
    transport
        .push_json(json!({
            "type": "system",
            "subtype": "init",
            "data": {"model": "claude-sonnet-4-5", "tools": ["Bash", "Read"]}
        }))
        .await;

    next(&messages).await;
    let init = next(&messages).await;
    assert!(matches!(init, claudewire::Message::System(ref s) if s.is_init()));

    let info = session.server_info().unwrap();
    assert_eq!(info["model"], "claude-sonnet-4-5");
    assert_eq!(info["tools"], json!(["Bash", "Read"]));
}

#[tokio::test]
async fn test_take_errors_once() {
    let (session, transport) = connected_session(vec![]).await;
    let mut errors = session.take_errors().await.unwrap();
    assert!(session.take_errors().await.is_none());

    transport
        .push_error(TransportError::LineTooLong {
            limit: 1024,
            length: 4096,
        })
        .await;
    let err = tokio::time::timeout(WAIT, errors.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(err, TransportError::LineTooLong { limit: 1024, .. }));
}

#[tokio::test]
async fn test_options_are_visible() {
    let transport = Arc::new(MockTransport::new());
    let options = ClientOptions::builder()
        .model("claude-sonnet-4-5")
        .transport(transport)
        .build()
        .unwrap();
    let session = AgentSession::new(options);
    assert_eq!(session.options().model.as_deref(), Some("claude-sonnet-4-5"));
}

#[tokio::test]
async fn test_zero_channel_capacity_in_literal_options() {
    let transport = Arc::new(MockTransport::new());
    let options = ClientOptions {
        channel_capacity: 0,
        transport: Some(transport.clone() as Arc<dyn Transport>),
        ..Default::default()
    };
    let session = AgentSession::new(options);
    session.connect(&CancellationToken::new()).await.unwrap();

    let messages = session.messages().await.unwrap();
    assert!(transport.push_json(assistant_text("still flowing")).await);
    assert!(transport.push_json(result_frame("done")).await);
    assert_eq!(next(&messages).await.kind(), "assistant");
    assert!(next(&messages).await.is_result());
    session.close().await.unwrap();
}
