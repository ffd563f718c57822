//! Drive the Claude Code CLI from Rust
//!
//! `claudewire` runs the CLI as a long-lived child process and talks to it in
//! its stream-json mode: one JSON object per line in each direction.
//!
//! # Key Features
//!
//! - **Sessions**: connect once, send prompts, stream typed messages back
//! - **Hooks**: typed callbacks the CLI invokes before and after tool use,
//!   on prompt submit, on stop and before compaction; failures fail open
//! - **Runtime control**: interrupt, switch permission mode or model, rewind files
//! - **One-shot queries**: [`query`] and [`query_result`] for request/response callers
//! - **Testing**: [`testing::MockTransport`] replaces the process in tests
//!
//! # Architecture
//!
//! 1. **Protocol Layer** (`claudewire-protocol`): wire types, no I/O
//! 2. **Transport Layer** (`claudewire-transport`): the CLI subprocess
//! 3. **Session Layer** (this crate): decoding, control protocol, public API
//!
//! # Usage Example
//!
//! ```no_run
//! use claudewire::{AgentSession, ClientOptions, Hook, HookOutput};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let options = ClientOptions::builder()
//!         .model("claude-sonnet-4-5")
//!         .hook(Hook::pre_tool_use("Bash", |input, _ctx| async move {
//!             let command = input.tool_input.get("command").and_then(|c| c.as_str());
//!             let output = if command.is_some_and(|c| c.contains("rm -rf")) {
//!                 HookOutput::deny("destructive command")
//!             } else {
//!                 HookOutput::allow()
//!             };
//!             Ok::<_, anyhow::Error>(output)
//!         }))
//!         .build()?;
//!
//!     let cancel = CancellationToken::new();
//!     let session = AgentSession::new(options);
//!     session.connect(&cancel).await?;
//!     session.query(&cancel, "Clean up the build directory").await?;
//!
//!     if let Some(messages) = session.messages().await {
//!         for message in messages.collect_until_result().await {
//!             println!("{:?}", message);
//!         }
//!     }
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod control;
pub mod error;
pub mod hooks;
pub mod message_parser;
pub mod query;
mod routing;
pub mod session;
pub mod testing;

// Re-export commonly used types
pub use config::{ClientOptions, ClientOptionsBuilder};
pub use control::PendingControl;
pub use error::{AgentError, ErrorRecovery, Result};
pub use hooks::{CallbackId, Hook, HookCallback, HookContext, HookFuture, HookRegistry};
pub use message_parser::{Frame, MessageParseError, parse_frame, parse_message};
pub use query::{query, query_result};
pub use session::{AgentSession, MessageStream};

pub use claudewire_protocol::{
    AgentDefinition, AssistantMessage, ContentBlock, HookDecision, HookEvent, HookInput,
    HookOutput, HookSession, Message, PermissionMode, PostToolUseInput, PreCompactInput,
    PreToolUseInput, ResultMessage, SandboxNetworkConfig, SandboxSettings, SettingSource, StopInput, StreamEvent, SystemMessage,
    UserContent, UserMessage, UserPromptSubmitInput,
};
pub use claudewire_transport::{
    CliResolver, DefaultCliResolver, FixedCliResolver, Transport, TransportError,
};
