//! Wire types for the Claude Code CLI stream-json protocol
//!
//! The CLI speaks newline-delimited JSON over stdin/stdout. This crate holds the
//! typed shapes of every frame exchanged with it, with no I/O of its own.
//!
//! # Type Organization
//!
//! - **Content types**: [`content`] - text, thinking, tool use/results
//! - **Message types**: [`message`] - the five conversation message kinds
//! - **Control frames**: [`control`] - requests, responses, outbound user turns
//! - **Hooks**: [`hooks`] - hook events, inputs, outputs and responses
//! - **Common types**: [`types`], [`agent`] - permission modes, setting sources, subagents
//! - **Error types**: [`error`]

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod agent;
pub mod content;
pub mod control;
pub mod error;
pub mod hooks;
pub mod message;
pub mod types;

// Re-export commonly used types at crate level
pub use agent::AgentDefinition;
pub use content::ContentBlock;
pub use control::{
    ControlFrame, ControlRequest, ControlRequestBody, ControlResponse, ControlResponsePayload,
    RequestId, UserTurn,
};
pub use error::{ProtocolError, Result};
pub use hooks::{
    HookCallbackResponse, HookDecision, HookEvent, HookInput, HookMatcherConfig, HookOutput,
    HookSession, HookSpecificOutput, PostToolUseInput, PreCompactInput, PreToolUseInput,
    StopInput, UserPromptSubmitInput,
};
pub use message::{
    AssistantMessage, Message, ResultMessage, StreamEvent, SystemMessage, UserContent,
    UserMessage,
};
pub use types::{PermissionMode, SandboxNetworkConfig, SandboxSettings, SettingSource};
