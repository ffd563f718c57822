//! Hook wire types
//!
//! Hooks are registered by the client at initialize time and invoked by the CLI
//! through `hook_callback` control requests. This module holds the event names,
//! the typed inputs the CLI sends, the output a callback produces, and the
//! response shape sent back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Lifecycle events a hook can be registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HookEvent {
    /// Before a tool executes
    PreToolUse,
    /// After a tool executes
    PostToolUse,
    /// When the user submits a prompt
    UserPromptSubmit,
    /// When the main agent finishes responding
    Stop,
    /// When a subagent finishes responding
    SubagentStop,
    /// Before the conversation is compacted
    PreCompact,
}

impl HookEvent {
    /// The event name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreToolUse => "PreToolUse",
            Self::PostToolUse => "PostToolUse",
            Self::UserPromptSubmit => "UserPromptSubmit",
            Self::Stop => "Stop",
            Self::SubagentStop => "SubagentStop",
            Self::PreCompact => "PreCompact",
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission decision returned by a hook
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HookDecision {
    /// Let the tool call proceed
    Allow,
    /// Block the tool call
    Deny,
}

impl HookDecision {
    /// The decision string used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

/// Input for a `PreToolUse` hook
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PreToolUseInput {
    /// Name of the tool about to run
    #[serde(default)]
    pub tool_name: String,

    /// Tool parameters
    #[serde(default)]
    pub tool_input: Map<String, Value>,

    /// Identifier of this tool use
    #[serde(default)]
    pub tool_use_id: Option<String>,
}

/// Input for a `PostToolUse` hook
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PostToolUseInput {
    /// Name of the tool that ran
    #[serde(default)]
    pub tool_name: String,

    /// Tool parameters
    #[serde(default)]
    pub tool_input: Map<String, Value>,

    /// Identifier of this tool use
    #[serde(default)]
    pub tool_use_id: Option<String>,

    /// Tool output
    #[serde(default)]
    pub tool_response: Value,

    /// Whether the tool failed
    #[serde(default)]
    pub is_error: bool,
}

/// Input for a `UserPromptSubmit` hook
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserPromptSubmitInput {
    /// The submitted prompt
    #[serde(default)]
    pub prompt: String,
}

/// Input for a `Stop` or `SubagentStop` hook
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StopInput {
    /// Whether a stop hook is already keeping the agent running
    #[serde(default)]
    pub stop_hook_active: bool,
}

/// Input for a `PreCompact` hook
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PreCompactInput {
    /// `manual` or `auto`
    #[serde(default)]
    pub trigger: String,

    /// Instructions given to `/compact`
    #[serde(default)]
    pub custom_instructions: Option<String>,
}

/// A hook input as sent by the CLI, keyed by `hook_event_name`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "hook_event_name")]
pub enum HookInput {
    /// `PreToolUse` input
    PreToolUse(PreToolUseInput),
    /// `PostToolUse` input
    PostToolUse(PostToolUseInput),
    /// `UserPromptSubmit` input
    UserPromptSubmit(UserPromptSubmitInput),
    /// `Stop` input
    Stop(StopInput),
    /// `SubagentStop` input
    SubagentStop(StopInput),
    /// `PreCompact` input
    PreCompact(PreCompactInput),
}

impl HookInput {
    /// The event this input belongs to
    pub fn event(&self) -> HookEvent {
        match self {
            Self::PreToolUse(_) => HookEvent::PreToolUse,
            Self::PostToolUse(_) => HookEvent::PostToolUse,
            Self::UserPromptSubmit(_) => HookEvent::UserPromptSubmit,
            Self::Stop(_) => HookEvent::Stop,
            Self::SubagentStop(_) => HookEvent::SubagentStop,
            Self::PreCompact(_) => HookEvent::PreCompact,
        }
    }
}

/// Fields the CLI includes with every hook input
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HookSession {
    /// Session identifier
    #[serde(default)]
    pub session_id: Option<String>,

    /// Path to the conversation transcript
    #[serde(default)]
    pub transcript_path: Option<String>,

    /// Working directory of the CLI
    #[serde(default)]
    pub cwd: Option<String>,

    /// Current permission mode
    #[serde(default)]
    pub permission_mode: Option<String>,
}

/// What a hook callback wants the CLI to do
///
/// `HookOutput::default()` means "no opinion": the CLI continues as if no
/// hook were registered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookOutput {
    /// Permission decision, if any
    pub decision: Option<HookDecision>,

    /// Explanation shown to the model
    pub reason: Option<String>,

    /// Message injected into the conversation
    pub system_message: Option<String>,

    /// Extra context for the model
    pub additional_context: Option<String>,

    /// Replacement tool input
    pub updated_input: Option<Map<String, Value>>,

    /// Whether to continue; defaults to true
    pub continue_: Option<bool>,

    /// Why execution stopped, when `continue_` is false
    pub stop_reason: Option<String>,

    /// Hide the hook's output from the transcript
    pub suppress_output: bool,
}

impl HookOutput {
    /// Allow the tool call
    pub fn allow() -> Self {
        Self {
            decision: Some(HookDecision::Allow),
            ..Default::default()
        }
    }

    /// Deny the tool call with a reason
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            decision: Some(HookDecision::Deny),
            reason: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Stop the agent
    pub fn stop(reason: impl Into<String>) -> Self {
        Self {
            continue_: Some(false),
            stop_reason: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Set the reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Set the system message
    pub fn with_system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = Some(message.into());
        self
    }

    /// Set additional context
    pub fn with_additional_context(mut self, context: impl Into<String>) -> Self {
        self.additional_context = Some(context.into());
        self
    }

    /// Replace the tool input
    pub fn with_updated_input(mut self, input: Map<String, Value>) -> Self {
        self.updated_input = Some(input);
        self
    }

    /// Hide the hook's output
    pub fn suppressed(mut self) -> Self {
        self.suppress_output = true;
        self
    }
}

/// One matcher entry of the initialize payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HookMatcherConfig {
    /// Tool name pattern; empty matches everything
    pub matcher: String,

    /// Callback ids to invoke when the matcher fires
    #[serde(rename = "hookCallbackIds")]
    pub hook_callback_ids: Vec<String>,

    /// Timeout in seconds, enforced by the CLI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Response to a `hook_callback` control request
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HookCallbackResponse {
    /// Whether to continue execution
    #[serde(rename = "continue")]
    pub continue_: bool,

    /// Hide the hook's output
    #[serde(
        rename = "suppressOutput",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub suppress_output: bool,

    /// Why execution stopped
    #[serde(rename = "stopReason", skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,

    /// Message injected into the conversation
    #[serde(rename = "systemMessage", skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,

    /// Explanation shown to the model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Event-specific output
    #[serde(rename = "hookSpecificOutput", skip_serializing_if = "Option::is_none")]
    pub hook_specific_output: Option<HookSpecificOutput>,
}

impl HookCallbackResponse {
    /// Plain "carry on" response
    pub fn proceed() -> Self {
        Self {
            continue_: true,
            ..Default::default()
        }
    }
}

/// Event-specific part of a hook response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HookSpecificOutput {
    /// Event that produced this output
    #[serde(rename = "hookEventName")]
    pub hook_event_name: HookEvent,

    /// `allow` or `deny`
    #[serde(rename = "permissionDecision", skip_serializing_if = "Option::is_none")]
    pub permission_decision: Option<HookDecision>,

    /// Reason for a deny
    #[serde(
        rename = "permissionDecisionReason",
        skip_serializing_if = "Option::is_none"
    )]
    pub permission_decision_reason: Option<String>,

    /// Replacement tool input
    #[serde(rename = "updatedInput", skip_serializing_if = "Option::is_none")]
    pub updated_input: Option<Map<String, Value>>,

    /// Extra context for the model
    #[serde(rename = "additionalContext", skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}
