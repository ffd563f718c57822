//! Hook registration and dispatch
//!
//! A [`Hook`] binds one callback to one event kind. Registering it in a
//! [`HookRegistry`] assigns a [`CallbackId`]; the registry is sent to the CLI
//! at initialize time and consulted when the CLI sends a `hook_callback`
//! control request. The registry is immutable once the session is built.

use claudewire_protocol::{
    HookEvent, HookInput, HookMatcherConfig, HookOutput, HookSession, PostToolUseInput,
    PreCompactInput, PreToolUseInput, StopInput, UserPromptSubmitInput,
};
use futures::FutureExt;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Future returned by a hook callback
pub type HookFuture = Pin<Box<dyn Future<Output = anyhow::Result<HookOutput>> + Send>>;

type Callback<I> = Arc<dyn Fn(I, HookContext) -> HookFuture + Send + Sync>;

/// Context passed to every hook callback
#[derive(Debug, Clone, Default)]
pub struct HookContext {
    /// Session fields the CLI sent with the hook input
    pub session: HookSession,

    /// Tool use the hook fired for, if any
    pub tool_use_id: Option<String>,

    /// Token for the callback's own work
    ///
    /// Independent of any caller token: the CLI is waiting on the answer, so
    /// cancelling a query never cancels a running hook.
    pub cancel: CancellationToken,
}

/// A hook callback, one variant per event kind
#[derive(Clone)]
pub enum HookCallback {
    /// Runs before a tool executes
    PreToolUse(Callback<PreToolUseInput>),
    /// Runs after a tool executes
    PostToolUse(Callback<PostToolUseInput>),
    /// Runs when a prompt is submitted
    UserPromptSubmit(Callback<UserPromptSubmitInput>),
    /// Runs when the agent stops
    Stop(Callback<StopInput>),
    /// Runs when a subagent stops
    SubagentStop(Callback<StopInput>),
    /// Runs before compaction
    PreCompact(Callback<PreCompactInput>),
}

impl HookCallback {
    /// The event this callback handles
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

    /// Start the callback, or `None` when the input is for another event
    fn call(&self, input: HookInput, context: HookContext) -> Option<HookFuture> {
        match (self, input) {
            (Self::PreToolUse(f), HookInput::PreToolUse(i)) => Some(f(i, context)),
            (Self::PostToolUse(f), HookInput::PostToolUse(i)) => Some(f(i, context)),
            (Self::UserPromptSubmit(f), HookInput::UserPromptSubmit(i)) => Some(f(i, context)),
            (Self::Stop(f), HookInput::Stop(i)) => Some(f(i, context)),
            (Self::SubagentStop(f), HookInput::SubagentStop(i)) => Some(f(i, context)),
            (Self::PreCompact(f), HookInput::PreCompact(i)) => Some(f(i, context)),
            _ => None,
        }
    }
}

impl fmt::Debug for HookCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HookCallback::{}", self.event())
    }
}

fn boxed<I, F, Fut>(f: F) -> Callback<I>
where
    F: Fn(I, HookContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<HookOutput>> + Send + 'static,
{
    Arc::new(move |input, context| Box::pin(f(input, context)))
}

/// A hook waiting to be registered
///
/// ```ignore
/// let hook = Hook::pre_tool_use("Bash", |input, _ctx| async move {
///     if input.tool_input.get("command").and_then(|c| c.as_str()) == Some("rm -rf /") {
///         return Ok(HookOutput::deny("blocked"));
///     }
///     Ok(HookOutput::default())
/// })
/// .with_timeout(Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct Hook {
    matcher: String,
    timeout: Option<Duration>,
    callback: HookCallback,
}

impl Hook {
    /// Hook run before tools whose name matches `matcher` (empty matches all)
    pub fn pre_tool_use<F, Fut>(matcher: impl Into<String>, f: F) -> Self
    where
        F: Fn(PreToolUseInput, HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<HookOutput>> + Send + 'static,
    {
        Self::new(matcher, HookCallback::PreToolUse(boxed(f)))
    }

    /// Hook run after tools whose name matches `matcher` (empty matches all)
    pub fn post_tool_use<F, Fut>(matcher: impl Into<String>, f: F) -> Self
    where
        F: Fn(PostToolUseInput, HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<HookOutput>> + Send + 'static,
    {
        Self::new(matcher, HookCallback::PostToolUse(boxed(f)))
    }

    /// Hook run when the user submits a prompt
    pub fn user_prompt_submit<F, Fut>(f: F) -> Self
    where
        F: Fn(UserPromptSubmitInput, HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<HookOutput>> + Send + 'static,
    {
        Self::new("", HookCallback::UserPromptSubmit(boxed(f)))
    }

    /// Hook run when the agent finishes responding
    pub fn stop<F, Fut>(f: F) -> Self
    where
        F: Fn(StopInput, HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<HookOutput>> + Send + 'static,
    {
        Self::new("", HookCallback::Stop(boxed(f)))
    }

    /// Hook run when a subagent finishes responding
    pub fn subagent_stop<F, Fut>(f: F) -> Self
    where
        F: Fn(StopInput, HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<HookOutput>> + Send + 'static,
    {
        Self::new("", HookCallback::SubagentStop(boxed(f)))
    }

    /// Hook run before the conversation is compacted
    pub fn pre_compact<F, Fut>(f: F) -> Self
    where
        F: Fn(PreCompactInput, HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<HookOutput>> + Send + 'static,
    {
        Self::new("", HookCallback::PreCompact(boxed(f)))
    }

    fn new(matcher: impl Into<String>, callback: HookCallback) -> Self {
        Self {
            matcher: matcher.into(),
            timeout: None,
            callback,
        }
    }

    /// Declare a timeout to the CLI
    ///
    /// Sent as whole seconds; the CLI enforces it, not this library.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The event this hook handles
    pub fn event(&self) -> HookEvent {
        self.callback.event()
    }
}

/// Identifier the CLI uses to call back a registered hook
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(String);

impl CallbackId {
    fn nth(n: usize) -> Self {
        Self(format!("hook_{}", n))
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
struct MatcherEntry {
    matcher: String,
    callback_id: CallbackId,
    timeout: Option<Duration>,
}

/// Outcome of dispatching a `hook_callback` request
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HookDispatch {
    /// The callback ran and produced output
    Completed {
        /// Event of the input that was handled
        event: HookEvent,
        /// What the callback returned
        output: HookOutput,
    },
    /// The callback could not run or failed; answer with a plain continue
    FailedOpen,
}

/// Registry of hooks, keyed by callback id
#[derive(Clone, Default)]
pub struct HookRegistry {
    callbacks: HashMap<CallbackId, HookCallback>,
    matchers: BTreeMap<HookEvent, Vec<MatcherEntry>>,
}

impl HookRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook, returning the id assigned to it
    ///
    /// Ids are `hook_0`, `hook_1`, ... in registration order.
    pub fn register(&mut self, hook: Hook) -> CallbackId {
        let id = CallbackId::nth(self.callbacks.len());
        let event = hook.event();
        self.callbacks.insert(id.clone(), hook.callback);
        self.matchers.entry(event).or_default().push(MatcherEntry {
            matcher: hook.matcher,
            callback_id: id.clone(),
            timeout: hook.timeout,
        });
        id
    }

    /// Whether any hooks are registered
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Number of registered hooks
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Look up a callback by id
    pub fn get(&self, id: &str) -> Option<&HookCallback> {
        self.callbacks.get(&CallbackId(id.to_string()))
    }

    /// The `hooks` table of the initialize request
    pub fn initialize_payload(&self) -> BTreeMap<HookEvent, Vec<HookMatcherConfig>> {
        self.matchers
            .iter()
            .map(|(event, entries)| {
                let configs = entries
                    .iter()
                    .map(|entry| HookMatcherConfig {
                        matcher: entry.matcher.clone(),
                        hook_callback_ids: vec![entry.callback_id.to_string()],
                        timeout: entry.timeout.map(|t| t.as_secs()),
                    })
                    .collect();
                (*event, configs)
            })
            .collect()
    }

    /// Run the callback registered under `callback_id`
    ///
    /// Returns `None` when no such callback exists. Every other path returns
    /// an outcome: malformed input, an input for a different event, a callback
    /// error and a callback panic all fail open.
    pub(crate) async fn dispatch(
        &self,
        callback_id: &str,
        input: Value,
        tool_use_id: Option<String>,
    ) -> Option<HookDispatch> {
        let Some(callback) = self.get(callback_id) else {
            debug!(callback_id, "no hook registered under callback id");
            return None;
        };

        let session: HookSession = serde_json::from_value(input.clone()).unwrap_or_default();
        let input: HookInput = match serde_json::from_value(input) {
            Ok(input) => input,
            Err(e) => {
                debug!(callback_id, error = %e, "unrecognized hook input");
                return Some(HookDispatch::FailedOpen);
            }
        };
        let event = input.event();
        let context = HookContext {
            session,
            tool_use_id,
            cancel: CancellationToken::new(),
        };

        let future = match std::panic::catch_unwind(AssertUnwindSafe(|| {
            callback.call(input, context)
        })) {
            Ok(Some(future)) => future,
            Ok(None) => {
                warn!(
                    callback_id,
                    %event,
                    registered = %callback.event(),
                    "hook input does not match registered event"
                );
                return Some(HookDispatch::FailedOpen);
            }
            Err(_) => {
                warn!(callback_id, %event, "hook callback panicked");
                return Some(HookDispatch::FailedOpen);
            }
        };

        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(output)) => Some(HookDispatch::Completed { event, output }),
            Ok(Err(e)) => {
                warn!(callback_id, %event, error = %e, "hook callback failed");
                Some(HookDispatch::FailedOpen)
            }
            Err(_) => {
                warn!(callback_id, %event, "hook callback panicked");
                Some(HookDispatch::FailedOpen)
            }
        }
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.callbacks.len())
            .field("events", &self.matchers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claudewire_protocol::HookDecision;
    use serde_json::json;

    fn deny_bash() -> Hook {
        Hook::pre_tool_use("Bash", |input, _ctx| async move {
            if input.tool_name == "Bash" {
                Ok(HookOutput::deny("blocked"))
            } else {
                Ok(HookOutput::default())
            }
        })
    }

    async fn failing_stop(_: StopInput, _: HookContext) -> anyhow::Result<HookOutput> {
        anyhow::bail!("policy crashed")
    }

    async fn panicking_stop(_: StopInput, _: HookContext) -> anyhow::Result<HookOutput> {
        panic!("hook bug")
    }

    #[test]
    fn test_ids_follow_registration_order() {
        let mut registry = HookRegistry::new();
        let first = registry.register(deny_bash());
        let second = registry.register(Hook::stop(|_, _| async { Ok(HookOutput::default()) }));
        assert_eq!(first.as_str(), "hook_0");
        assert_eq!(second.as_str(), "hook_1");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("hook_1").unwrap().event(), HookEvent::Stop);
        assert!(registry.get("hook_9").is_none());
    }

    #[test]
    fn test_initialize_payload_shape() {
        let mut registry = HookRegistry::new();
        registry.register(deny_bash().with_timeout(Duration::from_secs(30)));
        registry.register(Hook::pre_tool_use("Write", |_, _| async {
            Ok(HookOutput::allow())
        }));
        registry.register(Hook::post_tool_use("", |_, _| async {
            Ok(HookOutput::default())
        }));

        let payload = serde_json::to_value(registry.initialize_payload()).unwrap();
        assert_eq!(
            payload,
            json!({
                "PreToolUse": [
                    {"matcher": "Bash", "hookCallbackIds": ["hook_0"], "timeout": 30},
                    {"matcher": "Write", "hookCallbackIds": ["hook_1"]}
                ],
                "PostToolUse": [
                    {"matcher": "", "hookCallbackIds": ["hook_2"]}
                ]
            })
        );
    }

    #[tokio::test]
    async fn test_dispatch_typed_input() {
        let mut registry = HookRegistry::new();
        registry.register(deny_bash());

        let outcome = registry
            .dispatch(
                "hook_0",
                json!({
                    "hook_event_name": "PreToolUse",
                    "session_id": "sess-1",
                    "tool_name": "Bash",
                    "tool_input": {"command": "rm -rf /"}
                }),
                Some("toolu_1".to_string()),
            )
            .await;

        match outcome {
            Some(HookDispatch::Completed { event, output }) => {
                assert_eq!(event, HookEvent::PreToolUse);
                assert_eq!(output.decision, Some(HookDecision::Deny));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_context_carries_session_fields() {
        let mut registry = HookRegistry::new();
        registry.register(Hook::user_prompt_submit(|input, ctx| async move {
            assert!(!ctx.cancel.is_cancelled());
            Ok(HookOutput::default().with_additional_context(format!(
                "{}:{}",
                ctx.session.session_id.unwrap_or_default(),
                input.prompt
            )))
        }));

        let outcome = registry
            .dispatch(
                "hook_0",
                json!({"hook_event_name": "UserPromptSubmit", "session_id": "s1", "prompt": "hi"}),
                None,
            )
            .await;
        match outcome {
            Some(HookDispatch::Completed { output, .. }) => {
                assert_eq!(output.additional_context.as_deref(), Some("s1:hi"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_callback_is_none() {
        let registry = HookRegistry::new();
        let outcome = registry
            .dispatch("hook_0", json!({"hook_event_name": "Stop"}), None)
            .await;
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn test_mismatched_event_fails_open() {
        let mut registry = HookRegistry::new();
        registry.register(deny_bash());
        let outcome = registry
            .dispatch(
                "hook_0",
                json!({"hook_event_name": "PostToolUse", "tool_name": "Bash"}),
                None,
            )
            .await;
        assert_eq!(outcome, Some(HookDispatch::FailedOpen));
    }

    #[tokio::test]
    async fn test_error_and_panic_fail_open() {
        let mut registry = HookRegistry::new();
        registry.register(Hook::stop(failing_stop));
        registry.register(Hook::stop(panicking_stop));
        let input = json!({"hook_event_name": "Stop", "stop_hook_active": false});

        assert_eq!(
            registry.dispatch("hook_0", input.clone(), None).await,
            Some(HookDispatch::FailedOpen)
        );
        assert_eq!(
            registry.dispatch("hook_1", input, None).await,
            Some(HookDispatch::FailedOpen)
        );
    }
}
