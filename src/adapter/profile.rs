use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// Role given to agents that are only known by name from a workflow step.
pub const WORKFLOW_STEP_ROLE: &str = "workflow-step";

/// Agent definition as declared in AGENT.md front matter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentProfile {
    pub name: String,
    pub description: Option<String>,
    pub role: Option<String>,
    pub model: Option<String>,
    #[serde(
        rename = "allowed-tools",
        alias = "allowed_tools",
        deserialize_with = "string_list"
    )]
    pub allowed_tools: Vec<String>,
    #[serde(
        rename = "disallowed-tools",
        alias = "disallowed_tools",
        deserialize_with = "string_list"
    )]
    pub disallowed_tools: Vec<String>,
    #[serde(deserialize_with = "string_list")]
    pub skills: Vec<String>,
    #[serde(deserialize_with = "string_list")]
    pub expertise: Vec<String>,
    pub triggers: Triggers,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Triggers {
    #[serde(deserialize_with = "string_list")]
    pub keywords: Vec<String>,
}

impl AgentProfile {
    /// Minimal profile for an agent known only by name.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            role: Some(WORKFLOW_STEP_ROLE.to_string()),
            ..Self::default()
        }
    }

    pub fn role(&self) -> &str {
        self.role.as_deref().unwrap_or("specialist")
    }
}

/// Lookup of agent definitions by name.
pub trait AgentSource: Send + Sync {
    fn profile(&self, name: &str) -> Option<AgentProfile>;
}

/// Reads agent definitions from `<dir>/<name>.md` or `<dir>/<name>/AGENT.md`.
pub struct AgentCatalog {
    dir: PathBuf,
}

impl AgentCatalog {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl AgentSource for AgentCatalog {
    fn profile(&self, name: &str) -> Option<AgentProfile> {
        let candidates = [
            self.dir.join(format!("{}.md", name)),
            self.dir.join(name).join("AGENT.md"),
        ];

        let content = candidates
            .iter()
            .find_map(|path| std::fs::read_to_string(path).ok())?;

        let mut profile = parse_front_matter(&content)?;
        if profile.name.is_empty() {
            profile.name = name.to_string();
        }
        Some(profile)
    }
}

/// Parse the `---` delimited YAML header of an agent document.
pub fn parse_front_matter(content: &str) -> Option<AgentProfile> {
    let body = content.trim_start().strip_prefix("---")?;
    let end = body.find("\n---")?;
    let header = &body[..end];

    match serde_yml::from_str::<AgentProfile>(header) {
        Ok(profile) => Some(profile),
        Err(e) => {
            debug!(error = %e, "Agent front matter did not parse");
            None
        }
    }
}

/// Normalize `"[Read, Grep]"`, `"Read, Grep"` or a YAML list into tool names.
pub fn parse_tool_list(text: &str) -> Vec<String> {
    let text = text.trim();
    let text = text.strip_prefix('[').unwrap_or(text);
    let text = text.strip_suffix(']').unwrap_or(text);

    text.split(',')
        .map(|t| t.trim().trim_matches('"').trim_matches('\'').to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrText {
        List(Vec<String>),
        Text(String),
        Missing(()),
    }

    Ok(match ListOrText::deserialize(deserializer)? {
        ListOrText::List(items) => items,
        ListOrText::Text(text) => parse_tool_list(&text),
        ListOrText::Missing(()) => Vec::new(),
    })
}
