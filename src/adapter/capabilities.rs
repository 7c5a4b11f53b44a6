use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// What a target integration can do with an agent definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationCapabilities {
    /// Display name, e.g. "Claude Code".
    pub name: String,
    /// Can spawn an independent sub-task with its own tools and model.
    #[serde(default)]
    pub supports_task: bool,
    /// Can take agent context injected into the current conversation.
    #[serde(default)]
    pub supports_agents: bool,
}

impl IntegrationCapabilities {
    pub fn new(name: &str, supports_task: bool, supports_agents: bool) -> Self {
        Self {
            name: name.to_string(),
            supports_task,
            supports_agents,
        }
    }
}

/// Lookup of integration capabilities by identifier.
pub trait CapabilitySource: Send + Sync {
    fn capabilities(&self, integration: &str) -> Option<IntegrationCapabilities>;

    /// Known integration identifiers, sorted.
    fn integrations(&self) -> Vec<String>;
}

/// Capability table for the supported AI coding assistants, optionally
/// extended or overridden from configuration.
pub struct BuiltinCapabilities {
    table: HashMap<String, IntegrationCapabilities>,
}

impl Default for BuiltinCapabilities {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltinCapabilities {
    pub fn new() -> Self {
        let entries = [
            ("claude-code", "Claude Code", true, true),
            ("opencode", "OpenCode", true, true),
            ("cursor", "Cursor", false, true),
            ("cline", "Cline", false, true),
            ("roo-code", "Roo Code", true, true),
            ("codex", "OpenAI Codex", false, true),
            ("copilot", "GitHub Copilot", false, true),
            ("windsurf", "Windsurf", false, true),
            ("gemini-cli", "Gemini CLI", false, true),
            ("antigravity", "Google Antigravity", false, false),
        ];

        let table = entries
            .into_iter()
            .map(|(id, name, task, agents)| {
                (id.to_string(), IntegrationCapabilities::new(name, task, agents))
            })
            .collect();

        Self { table }
    }

    /// Add or replace entries.
    pub fn with_overrides(mut self, overrides: HashMap<String, IntegrationCapabilities>) -> Self {
        self.table.extend(overrides);
        self
    }
}

impl CapabilitySource for BuiltinCapabilities {
    fn capabilities(&self, integration: &str) -> Option<IntegrationCapabilities> {
        self.table.get(integration).cloned()
    }

    fn integrations(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.table.keys().cloned().collect();
        ids.sort();
        ids
    }
}
