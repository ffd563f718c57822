//! Client options
//!
//! [`ClientOptions`] describes how the CLI is launched and which hooks the
//! session registers. Build it with [`ClientOptions::builder`]; the value is
//! immutable afterwards.

use crate::error::{AgentError, Result};
use crate::hooks::{Hook, HookRegistry};
use claudewire_protocol::{AgentDefinition, PermissionMode, SandboxSettings, SettingSource};
use claudewire_transport::subprocess::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_BUFFER_SIZE};
use claudewire_transport::{CliResolver, ProcessConfig, Transport};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Environment switch that turns on file checkpointing in the CLI
pub const FILE_CHECKPOINTING_ENV: &str = "CLAUDE_CODE_ENABLE_SDK_FILE_CHECKPOINTING";

/// Options for an [`AgentSession`](crate::AgentSession)
#[derive(Clone)]
pub struct ClientOptions {
    /// Model to use
    pub model: Option<String>,

    /// Model to fall back to when the primary is overloaded
    pub fallback_model: Option<String>,

    /// Maximum agent turns; 0 leaves the CLI default
    pub max_turns: u32,

    /// Spending cap in USD
    pub max_budget_usd: Option<f64>,

    /// Initial permission mode
    pub permission_mode: Option<PermissionMode>,

    /// System prompt override
    pub system_prompt: Option<String>,

    /// Tools the agent may use without asking
    pub allowed_tools: Vec<String>,

    /// Tools the agent may never use
    pub disallowed_tools: Vec<String>,

    /// Working directory of the CLI process
    pub cwd: Option<PathBuf>,

    /// Explicit CLI executable, bypassing lookup
    pub cli_path: Option<PathBuf>,

    /// Environment overrides for the CLI process
    pub env: HashMap<String, String>,

    /// Continue the most recent conversation
    pub continue_conversation: bool,

    /// Session id to resume
    pub resume: Option<String>,

    /// Thinking token budget; 0 leaves the CLI default
    pub max_thinking_tokens: u32,

    /// MCP server configuration (path or JSON)
    pub mcp_config: Option<String>,

    /// Fork the resumed session instead of continuing it
    pub fork_session: bool,

    /// Extra `--key [value]` flags, emitted in key order
    pub extra_args: BTreeMap<String, Option<String>>,

    /// Additional directories the agent may access
    pub add_dirs: Vec<PathBuf>,

    /// Settings file path or JSON
    pub settings: Option<String>,

    /// Beta features to enable
    pub betas: Vec<String>,

    /// Custom subagents keyed by name
    pub agents: BTreeMap<String, AgentDefinition>,

    /// Which settings files the CLI loads
    pub setting_sources: Vec<SettingSource>,

    /// Local plugin directories
    pub plugin_dirs: Vec<PathBuf>,

    /// JSON schema for structured output
    pub json_schema: Option<Value>,

    /// Emit `stream_event` partial messages
    pub include_partial_messages: bool,

    /// Bash sandboxing
    pub sandbox: Option<SandboxSettings>,

    /// Track file changes so they can be rewound
    pub enable_file_checkpointing: bool,

    /// Longest accepted stdout line, in bytes
    pub max_buffer_size: usize,

    /// Capacity of the inbound message channel
    pub channel_capacity: usize,

    /// Custom executable lookup
    pub resolver: Option<Arc<dyn CliResolver>>,

    /// Transport to use instead of spawning the CLI
    pub transport: Option<Arc<dyn Transport>>,

    /// Registered hooks
    pub hooks: HookRegistry,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            model: None,
            fallback_model: None,
            max_turns: 0,
            max_budget_usd: None,
            permission_mode: None,
            system_prompt: None,
            allowed_tools: Vec::new(),
            disallowed_tools: Vec::new(),
            cwd: None,
            cli_path: None,
            env: HashMap::new(),
            continue_conversation: false,
            resume: None,
            max_thinking_tokens: 0,
            mcp_config: None,
            fork_session: false,
            extra_args: BTreeMap::new(),
            add_dirs: Vec::new(),
            settings: None,
            betas: Vec::new(),
            agents: BTreeMap::new(),
            setting_sources: Vec::new(),
            plugin_dirs: Vec::new(),
            json_schema: None,
            include_partial_messages: false,
            sandbox: None,
            enable_file_checkpointing: false,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            resolver: None,
            transport: None,
            hooks: HookRegistry::new(),
        }
    }
}

impl ClientOptions {
    /// Create a builder
    pub fn builder() -> ClientOptionsBuilder {
        ClientOptionsBuilder::default()
    }

    /// Command-line arguments for the CLI
    pub fn cli_args(&self) -> Vec<String> {
        let mut args = vec![
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--verbose".to_string(),
        ];

        push_opt(&mut args, "--system-prompt", self.system_prompt.as_deref());
        push_opt(&mut args, "--model", self.model.as_deref());
        push_opt(&mut args, "--fallback-model", self.fallback_model.as_deref());
        if self.max_turns > 0 {
            push(&mut args, "--max-turns", self.max_turns.to_string());
        }
        if let Some(budget) = self.max_budget_usd.filter(|b| *b > 0.0) {
            push(&mut args, "--max-budget-usd", budget.to_string());
        }
        if let Some(mode) = self.permission_mode {
            push(&mut args, "--permission-mode", mode.as_str());
        }
        if !self.allowed_tools.is_empty() {
            push(&mut args, "--allowedTools", self.allowed_tools.join(","));
        }
        if !self.disallowed_tools.is_empty() {
            push(&mut args, "--disallowedTools", self.disallowed_tools.join(","));
        }

        if self.continue_conversation {
            args.push("--continue".to_string());
        }
        push_opt(&mut args, "--resume", self.resume.as_deref());
        if self.max_thinking_tokens > 0 {
            push(
                &mut args,
                "--max-thinking-tokens",
                self.max_thinking_tokens.to_string(),
            );
        }
        push_opt(&mut args, "--mcp-config", self.mcp_config.as_deref());
        if self.fork_session {
            args.push("--fork-session".to_string());
        }

        for (key, value) in &self.extra_args {
            args.push(format!("--{key}"));
            if let Some(value) = value {
                args.push(value.clone());
            }
        }
        for dir in &self.add_dirs {
            push(&mut args, "--add-dir", dir.display().to_string());
        }
        push_opt(&mut args, "--settings", self.settings.as_deref());
        if !self.betas.is_empty() {
            push(&mut args, "--betas", self.betas.join(","));
        }
        if !self.agents.is_empty() {
            // AgentDefinition holds only strings, so encoding cannot fail.
            if let Ok(agents) = serde_json::to_string(&self.agents) {
                push(&mut args, "--agents", agents);
            }
        }
        let sources: Vec<&str> = self.setting_sources.iter().map(|s| s.as_str()).collect();
        push(&mut args, "--setting-sources", sources.join(","));
        for dir in &self.plugin_dirs {
            push(&mut args, "--plugin-dir", dir.display().to_string());
        }

        if let Some(schema) = &self.json_schema {
            push(&mut args, "--json-schema", schema.to_string());
        }
        if self.include_partial_messages {
            args.push("--include-partial-messages".to_string());
        }
        if let Some(sandbox) = &self.sandbox {
            push_sandbox(&mut args, sandbox);
        }

        push(&mut args, "--input-format", "stream-json");
        args
    }

    /// Process configuration for the default subprocess transport
    pub fn process_config(&self) -> ProcessConfig {
        let mut config = ProcessConfig::new()
            .with_args(self.cli_args())
            .with_max_buffer_size(self.max_buffer_size)
            .with_channel_capacity(self.channel_capacity);
        if let Some(path) = &self.cli_path {
            config = config.with_cli_path(path.clone());
        }
        if let Some(cwd) = &self.cwd {
            config = config.with_cwd(cwd.clone());
        }
        if let Some(resolver) = &self.resolver {
            config = config.with_resolver(Arc::clone(resolver));
        }
        for (key, value) in &self.env {
            config = config.with_env(key.clone(), value.clone());
        }
        if self.enable_file_checkpointing {
            config = config.with_env(FILE_CHECKPOINTING_ENV, "true");
        }
        config
    }
}

fn push_sandbox(args: &mut Vec<String>, sandbox: &SandboxSettings) {
    if sandbox.enabled {
        args.push("--sandbox".to_string());
    }
    if sandbox.auto_allow_bash_if_sandboxed {
        args.push("--sandbox-auto-allow-bash".to_string());
    }
    for command in &sandbox.excluded_commands {
        push(args, "--sandbox-exclude-command", command.as_str());
    }
    if sandbox.allow_unsandboxed_commands {
        args.push("--sandbox-allow-unsandboxed".to_string());
    }
    if let Some(network) = &sandbox.network {
        for socket in &network.allow_unix_sockets {
            push(args, "--sandbox-allow-unix-socket", socket.as_str());
        }
        if network.allow_all_unix_sockets {
            args.push("--sandbox-allow-all-unix-sockets".to_string());
        }
        if network.allow_local_binding {
            args.push("--sandbox-allow-local-binding".to_string());
        }
    }
    if sandbox.enable_weaker_nested_sandbox {
        args.push("--sandbox-weaker-nested".to_string());
    }
}

fn push(args: &mut Vec<String>, flag: &str, value: impl Into<String>) {
    args.push(flag.to_string());
    args.push(value.into());
}

fn push_opt(args: &mut Vec<String>, flag: &str, value: Option<&str>) {
    if let Some(value) = value {
        push(args, flag, value);
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("model", &self.model)
            .field("permission_mode", &self.permission_mode)
            .field("cwd", &self.cwd)
            .field("cli_path", &self.cli_path)
            .field("args", &self.cli_args())
            .field("hooks", &self.hooks)
            .field("custom_transport", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ClientOptions`]
#[derive(Debug, Default)]
pub struct ClientOptionsBuilder {
    options: ClientOptions,
}

impl ClientOptionsBuilder {
    /// Set the model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.options.model = Some(model.into());
        self
    }

    /// Set the fallback model
    pub fn fallback_model(mut self, model: impl Into<String>) -> Self {
        self.options.fallback_model = Some(model.into());
        self
    }

    /// Set the maximum number of turns
    pub fn max_turns(mut self, turns: u32) -> Self {
        self.options.max_turns = turns;
        self
    }

    /// Set the spending cap in USD
    pub fn max_budget_usd(mut self, budget: f64) -> Self {
        self.options.max_budget_usd = Some(budget);
        self
    }

    /// Set the initial permission mode
    pub fn permission_mode(mut self, mode: PermissionMode) -> Self {
        self.options.permission_mode = Some(mode);
        self
    }

    /// Set the system prompt
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.options.system_prompt = Some(prompt.into());
        self
    }

    /// Allow a tool
    pub fn allowed_tool(mut self, tool: impl Into<String>) -> Self {
        self.options.allowed_tools.push(tool.into());
        self
    }

    /// Disallow a tool
    pub fn disallowed_tool(mut self, tool: impl Into<String>) -> Self {
        self.options.disallowed_tools.push(tool.into());
        self
    }

    /// Set the working directory
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.options.cwd = Some(cwd.into());
        self
    }

    /// Set the CLI path
    pub fn cli_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.cli_path = Some(path.into());
        self
    }

    /// Set an environment variable for the CLI
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.env.insert(key.into(), value.into());
        self
    }

    /// Continue the most recent conversation
    pub fn continue_conversation(mut self, enabled: bool) -> Self {
        self.options.continue_conversation = enabled;
        self
    }

    /// Resume a session by id
    pub fn resume(mut self, session_id: impl Into<String>) -> Self {
        self.options.resume = Some(session_id.into());
        self
    }

    /// Set the thinking token budget
    pub fn max_thinking_tokens(mut self, tokens: u32) -> Self {
        self.options.max_thinking_tokens = tokens;
        self
    }

    /// Set the MCP server configuration
    pub fn mcp_config(mut self, config: impl Into<String>) -> Self {
        self.options.mcp_config = Some(config.into());
        self
    }

    /// Fork the resumed session
    pub fn fork_session(mut self, enabled: bool) -> Self {
        self.options.fork_session = enabled;
        self
    }

    /// Pass an extra `--key value` flag
    pub fn extra_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options
            .extra_args
            .insert(key.into(), Some(value.into()));
        self
    }

    /// Pass an extra `--key` flag without a value
    pub fn extra_flag(mut self, key: impl Into<String>) -> Self {
        self.options.extra_args.insert(key.into(), None);
        self
    }

    /// Grant access to another directory
    pub fn add_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.add_dirs.push(dir.into());
        self
    }

    /// Set the settings file or JSON
    pub fn settings(mut self, settings: impl Into<String>) -> Self {
        self.options.settings = Some(settings.into());
        self
    }

    /// Enable a beta feature
    pub fn beta(mut self, beta: impl Into<String>) -> Self {
        self.options.betas.push(beta.into());
        self
    }

    /// Define a subagent
    pub fn agent(mut self, name: impl Into<String>, agent: AgentDefinition) -> Self {
        self.options.agents.insert(name.into(), agent);
        self
    }

    /// Set which settings files the CLI loads
    pub fn setting_sources(mut self, sources: Vec<SettingSource>) -> Self {
        self.options.setting_sources = sources;
        self
    }

    /// Load a local plugin
    pub fn plugin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.plugin_dirs.push(dir.into());
        self
    }

    /// Request structured output matching a JSON schema
    pub fn json_schema(mut self, schema: Value) -> Self {
        self.options.json_schema = Some(schema);
        self
    }

    /// Emit partial message stream events
    pub fn include_partial_messages(mut self, enabled: bool) -> Self {
        self.options.include_partial_messages = enabled;
        self
    }

    /// Sandbox bash commands
    pub fn sandbox(mut self, settings: SandboxSettings) -> Self {
        self.options.sandbox = Some(settings);
        self
    }

    /// Track file changes so they can be rewound
    ///
    /// See [`AgentSession::rewind_files`](crate::AgentSession::rewind_files).
    pub fn enable_file_checkpointing(mut self, enabled: bool) -> Self {
        self.options.enable_file_checkpointing = enabled;
        self
    }

    /// Set the longest accepted stdout line
    pub fn max_buffer_size(mut self, size: usize) -> Self {
        self.options.max_buffer_size = size;
        self
    }

    /// Set the inbound message channel capacity
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.options.channel_capacity = capacity;
        self
    }

    /// Use a custom executable lookup
    pub fn resolver(mut self, resolver: Arc<dyn CliResolver>) -> Self {
        self.options.resolver = Some(resolver);
        self
    }

    /// Use this transport instead of spawning the CLI
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.options.transport = Some(transport);
        self
    }

    /// Register a hook
    pub fn hook(mut self, hook: Hook) -> Self {
        self.options.hooks.register(hook);
        self
    }

    /// Build the options
    pub fn build(self) -> Result<ClientOptions> {
        let options = self.options;
        if options.max_buffer_size == 0 {
            return Err(AgentError::Config(
                "max_buffer_size must be greater than zero".to_string(),
            ));
        }
        if options.channel_capacity == 0 {
            return Err(AgentError::Config(
                "channel_capacity must be greater than zero".to_string(),
            ));
        }
        if let Some(schema) = &options.json_schema
            && !schema.is_object()
        {
            return Err(AgentError::Config(
                "json_schema must be a JSON object".to_string(),
            ));
        }
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::HookContext;
    use claudewire_protocol::{HookOutput, PreToolUseInput, SandboxNetworkConfig};
    use rstest::rstest;
    use serde_json::json;

    async fn allow_all(_: PreToolUseInput, _: HookContext) -> anyhow::Result<HookOutput> {
        Ok(HookOutput::allow())
    }

    fn position(args: &[String], flag: &str) -> usize {
        args.iter()
            .position(|a| a == flag)
            .unwrap_or_else(|| panic!("{flag} missing from {args:?}"))
    }

    #[test]
    fn test_default_args() {
        let args = ClientOptions::default().cli_args();
        assert_eq!(
            args,
            vec![
                "--output-format",
                "stream-json",
                "--verbose",
                "--setting-sources",
                "",
                "--input-format",
                "stream-json",
            ]
        );
    }

    #[test]
    fn test_full_args_order() {
        let options = ClientOptions::builder()
            .system_prompt("be brief")
            .model("claude-sonnet-4-5")
            .fallback_model("claude-haiku-4-5")
            .max_turns(3)
            .max_budget_usd(1.5)
            .permission_mode(PermissionMode::AcceptEdits)
            .allowed_tool("Read")
            .allowed_tool("Grep")
            .disallowed_tool("Bash")
            .continue_conversation(true)
            .resume("sess-1")
            .max_thinking_tokens(8000)
            .mcp_config("mcp.json")
            .fork_session(true)
            .extra_flag("replay-user-messages")
            .add_dir("/data")
            .settings("settings.json")
            .beta("context-1m")
            .agent("reviewer", AgentDefinition::new("Reviews code", "You review code"))
            .setting_sources(vec![SettingSource::User, SettingSource::Project])
            .plugin_dir("/plugins/lint")
            .json_schema(json!({"type": "object"}))
            .include_partial_messages(true)
            .sandbox(SandboxSettings::enabled())
            .build()
            .unwrap();
        let args = options.cli_args();

        let order = [
            "--verbose",
            "--system-prompt",
            "--model",
            "--fallback-model",
            "--max-turns",
            "--max-budget-usd",
            "--permission-mode",
            "--allowedTools",
            "--disallowedTools",
            "--continue",
            "--resume",
            "--max-thinking-tokens",
            "--mcp-config",
            "--fork-session",
            "--replay-user-messages",
            "--add-dir",
            "--settings",
            "--betas",
            "--agents",
            "--setting-sources",
            "--plugin-dir",
            "--json-schema",
            "--include-partial-messages",
            "--sandbox",
            "--input-format",
        ];
        let positions: Vec<usize> = order.iter().map(|f| position(&args, f)).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{args:?}");

        assert_eq!(args[position(&args, "--max-budget-usd") + 1], "1.5");
        assert_eq!(args[position(&args, "--permission-mode") + 1], "acceptEdits");
        assert_eq!(args[position(&args, "--allowedTools") + 1], "Read,Grep");
        assert_eq!(args[position(&args, "--setting-sources") + 1], "user,project");
        assert_eq!(args.last().map(String::as_str), Some("stream-json"));

        let agents: Value =
            serde_json::from_str(&args[position(&args, "--agents") + 1]).unwrap();
        assert_eq!(agents["reviewer"]["description"], "Reviews code");
        assert!(agents["reviewer"].get("model").is_none());
    }

    #[test]
    fn test_sandbox_flags() {
        let sandbox = SandboxSettings {
            auto_allow_bash_if_sandboxed: true,
            excluded_commands: vec!["git".to_string(), "docker".to_string()],
            allow_unsandboxed_commands: true,
            network: Some(SandboxNetworkConfig {
                allow_unix_sockets: vec!["/tmp/ssh-agent.sock".to_string()],
                allow_all_unix_sockets: true,
                allow_local_binding: true,
            }),
            enable_weaker_nested_sandbox: true,
            ..SandboxSettings::enabled()
        };
        let args = ClientOptions::builder()
            .include_partial_messages(true)
            .sandbox(sandbox)
            .build()
            .unwrap()
            .cli_args();

        let start = position(&args, "--include-partial-messages") + 1;
        let end = position(&args, "--input-format");
        assert_eq!(
            &args[start..end],
            [
                "--sandbox",
                "--sandbox-auto-allow-bash",
                "--sandbox-exclude-command",
                "git",
                "--sandbox-exclude-command",
                "docker",
                "--sandbox-allow-unsandboxed",
                "--sandbox-allow-unix-socket",
                "/tmp/ssh-agent.sock",
                "--sandbox-allow-all-unix-sockets",
                "--sandbox-allow-local-binding",
                "--sandbox-weaker-nested",
            ]
        );
    }

    #[test]
    fn test_disabled_sandbox_emits_only_set_flags() {
        let sandbox = SandboxSettings {
            excluded_commands: vec!["git".to_string()],
            ..Default::default()
        };
        let args = ClientOptions::builder()
            .sandbox(sandbox)
            .build()
            .unwrap()
            .cli_args();
        assert!(!args.contains(&"--sandbox".to_string()));
        assert_eq!(args[position(&args, "--sandbox-exclude-command") + 1], "git");
    }

    #[test]
    fn test_file_checkpointing_sets_env() {
        let config = ClientOptions::builder()
            .enable_file_checkpointing(true)
            .build()
            .unwrap()
            .process_config();
        assert_eq!(
            config.env.get(FILE_CHECKPOINTING_ENV).map(String::as_str),
            Some("true")
        );
        assert!(
            !ClientOptions::default()
                .process_config()
                .env
                .contains_key(FILE_CHECKPOINTING_ENV)
        );
    }

    #[test]
    fn test_zero_limits_are_omitted() {
        let args = ClientOptions::builder()
            .max_turns(0)
            .max_budget_usd(0.0)
            .max_thinking_tokens(0)
            .build()
            .unwrap()
            .cli_args();
        assert!(!args.contains(&"--max-turns".to_string()));
        assert!(!args.contains(&"--max-budget-usd".to_string()));
        assert!(!args.contains(&"--max-thinking-tokens".to_string()));
    }

    #[test]
    fn test_extra_arg_with_value() {
        let args = ClientOptions::builder()
            .extra_arg("debug-to-stderr", "1")
            .build()
            .unwrap()
            .cli_args();
        let at = position(&args, "--debug-to-stderr");
        assert_eq!(args[at + 1], "1");
    }

    #[rstest]
    #[case(ClientOptions::builder().max_buffer_size(0))]
    #[case(ClientOptions::builder().channel_capacity(0))]
    #[case(ClientOptions::builder().json_schema(json!("not a schema")))]
    fn test_invalid_options_rejected(#[case] builder: ClientOptionsBuilder) {
        assert!(matches!(builder.build(), Err(AgentError::Config(_))));
    }

    #[test]
    fn test_process_config_carries_options() {
        let options = ClientOptions::builder()
            .cli_path("/opt/claude")
            .cwd("/work")
            .env("ANTHROPIC_LOG", "debug")
            .max_buffer_size(4096)
            .channel_capacity(8)
            .hook(Hook::pre_tool_use("Bash", allow_all))
            .build()
            .unwrap();
        let config = options.process_config();
        assert_eq!(config.cli_path, Some(PathBuf::from("/opt/claude")));
        assert_eq!(config.cwd, Some(PathBuf::from("/work")));
        assert_eq!(config.env.get("ANTHROPIC_LOG").map(String::as_str), Some("debug"));
        assert_eq!(config.max_buffer_size, 4096);
        assert_eq!(config.channel_capacity, 8);
        assert_eq!(config.args, options.cli_args());
        assert_eq!(options.hooks.len(), 1);
    }
}
