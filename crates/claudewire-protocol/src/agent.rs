//! Custom subagent definitions passed to the CLI via `--agents`

use serde::{Deserialize, Serialize};

/// Agent definition for a specialized subagent persona
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentDefinition {
    /// When the main agent should delegate to this one
    pub description: String,

    /// System prompt for the agent
    pub prompt: String,

    /// Tools the agent may use; all tools when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,

    /// Model to use for this agent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl AgentDefinition {
    /// Create a new agent definition
    pub fn new(description: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            prompt: prompt.into(),
            tools: None,
            model: None,
        }
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set allowed tools
    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = Some(tools.into_iter().map(Into::into).collect());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_agent_definition_omits_unset_fields() {
        let agent = AgentDefinition::new("Reviews code", "You review code.");
        assert_eq!(
            serde_json::to_value(&agent).unwrap(),
            json!({"description": "Reviews code", "prompt": "You review code."})
        );
    }

    #[test]
    fn test_agent_definition_builder() {
        let agent = AgentDefinition::new("d", "p")
            .with_model("sonnet")
            .with_tools(["Read", "Grep"]);
        let value = serde_json::to_value(&agent).unwrap();
        assert_eq!(value["model"], "sonnet");
        assert_eq!(value["tools"], json!(["Read", "Grep"]));
    }
}
