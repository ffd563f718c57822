//! Common types shared by configuration and control requests

use serde::{Deserialize, Serialize};
use std::fmt;

/// Permission mode for tool use in agent sessions
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    /// Default: ask for permission for each tool use
    #[default]
    Default,

    /// Automatically accept edits without asking
    AcceptEdits,

    /// Plan only, do not execute tools
    Plan,

    /// Bypass permission checks entirely
    BypassPermissions,
}

impl PermissionMode {
    /// The string the CLI expects for this mode
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::AcceptEdits => "acceptEdits",
            Self::Plan => "plan",
            Self::BypassPermissions => "bypassPermissions",
        }
    }
}

impl fmt::Display for PermissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A settings location the CLI should load
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SettingSource {
    /// `~/.claude/settings.json`
    User,

    /// `.claude/settings.json` in the project
    Project,

    /// `.claude/settings.local.json` in the project
    Local,
}

impl SettingSource {
    /// The string the CLI expects for this source
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Project => "project",
            Self::Local => "local",
        }
    }
}

/// Bash sandboxing for the CLI (macOS and Linux)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SandboxSettings {
    /// Run bash commands in the sandbox
    #[serde(default)]
    pub enabled: bool,

    /// Approve bash commands without asking while sandboxed
    #[serde(default)]
    pub auto_allow_bash_if_sandboxed: bool,

    /// Commands that run outside the sandbox
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_commands: Vec<String>,

    /// Let commands ask to bypass the sandbox
    #[serde(default)]
    pub allow_unsandboxed_commands: bool,

    /// Network access from inside the sandbox
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<SandboxNetworkConfig>,

    /// Weaker sandbox for unprivileged containers (Linux only)
    #[serde(default)]
    pub enable_weaker_nested_sandbox: bool,
}

impl SandboxSettings {
    /// Sandboxing switched on, everything else default
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }
}

/// Network access granted to sandboxed commands
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SandboxNetworkConfig {
    /// Unix socket paths reachable from the sandbox, such as an SSH agent
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_unix_sockets: Vec<String>,

    /// Allow every Unix socket
    #[serde(default)]
    pub allow_all_unix_sockets: bool,

    /// Allow binding localhost ports (macOS only)
    #[serde(default)]
    pub allow_local_binding: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(PermissionMode::Default, "default")]
    #[case(PermissionMode::AcceptEdits, "acceptEdits")]
    #[case(PermissionMode::Plan, "plan")]
    #[case(PermissionMode::BypassPermissions, "bypassPermissions")]
    fn test_permission_mode_wire_names(#[case] mode: PermissionMode, #[case] expected: &str) {
        assert_eq!(mode.as_str(), expected);
        assert_eq!(
            serde_json::to_value(mode).unwrap(),
            serde_json::Value::String(expected.to_string())
        );
    }

    #[test]
    fn test_setting_source_serialization() {
        let json = serde_json::to_string(&SettingSource::Project).unwrap();
        assert_eq!(json, r#""project""#);
        assert_eq!(SettingSource::Local.as_str(), "local");
    }

    #[test]
    fn test_sandbox_settings_camel_case() {
        let settings = SandboxSettings {
            auto_allow_bash_if_sandboxed: true,
            network: Some(SandboxNetworkConfig {
                allow_local_binding: true,
                ..Default::default()
            }),
            ..SandboxSettings::enabled()
        };
        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(value["enabled"], true);
        assert_eq!(value["autoAllowBashIfSandboxed"], true);
        assert_eq!(value["network"]["allowLocalBinding"], true);
        assert!(value.get("excludedCommands").is_none());

        let back: SandboxSettings = serde_json::from_value(value).unwrap();
        assert_eq!(back, settings);
    }
}
