//! Translates an abstract "run this agent" request into the invocation shape a
//! target integration can actually carry out.

pub mod capabilities;
pub mod profile;

use std::sync::Arc;

use serde::Serialize;

use capabilities::CapabilitySource;
use profile::AgentProfile;

/// Longest task description an integration accepts.
pub const MAX_TASK_DESCRIPTION: usize = 50;

const DEFAULT_SUBAGENT: &str = "general-purpose";
const DEFAULT_MODEL: &str = "sonnet";
const DEFAULT_TASK_DESCRIPTION: &str = "Workflow agent";

/// How an agent step is carried out, ordered by capability richness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationMode {
    /// Spawn an independent sub-task with its own tools and model.
    Task,
    /// Merge agent context into the current conversation.
    Inline,
    /// Hand the user instructions to apply by hand.
    Manual,
}

impl std::fmt::Display for InvocationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvocationMode::Task => write!(f, "task"),
            InvocationMode::Inline => write!(f, "inline"),
            InvocationMode::Manual => write!(f, "manual"),
        }
    }
}

/// Sub-task request for integrations that can spawn agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDescriptor {
    pub subagent_type: String,
    pub description: String,
    pub model: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_tools: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disallowed_tools: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skill_dependencies: Vec<String>,
}

/// Mode-specific payload for one agent invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum AgentInvocation {
    Task(TaskDescriptor),
    Inline { context_block: String },
    Manual { instructions: String },
}

impl AgentInvocation {
    pub fn mode(&self) -> InvocationMode {
        match self {
            AgentInvocation::Task(_) => InvocationMode::Task,
            AgentInvocation::Inline { .. } => InvocationMode::Inline,
            AgentInvocation::Manual { .. } => InvocationMode::Manual,
        }
    }

    /// Text shown to the user for this invocation.
    pub fn render(&self) -> String {
        match self {
            AgentInvocation::Task(task) => {
                let mut lines = vec![
                    format!("Use the Task tool to spawn a {} agent:", task.subagent_type),
                    format!("  subagent_type: \"{}\"", task.subagent_type),
                    format!("  description: \"{}\"", task.description),
                    format!("  model: \"{}\"", task.model),
                ];
                if !task.allowed_tools.is_empty() {
                    lines.push(format!("  allowed tools: {}", task.allowed_tools.join(", ")));
                }
                if !task.disallowed_tools.is_empty() {
                    lines.push(format!(
                        "  disallowed tools: {}",
                        task.disallowed_tools.join(", ")
                    ));
                }
                if !task.skill_dependencies.is_empty() {
                    lines.push(format!("  skills: {}", task.skill_dependencies.join(", ")));
                }
                lines.join("\n")
            }
            AgentInvocation::Inline { context_block } => context_block.clone(),
            AgentInvocation::Manual { instructions } => instructions.clone(),
        }
    }
}

/// Which agent features a target integration will honor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibilityFeatures {
    pub task_execution: bool,
    pub tool_permissions: bool,
    pub skill_dependencies: bool,
    pub triggers: bool,
}

/// Advisory report; never blocks execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibilityReport {
    pub compatible: bool,
    pub mode: InvocationMode,
    pub warnings: Vec<String>,
    pub features: CompatibilityFeatures,
}

/// One row of the integration listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrationInfo {
    pub id: String,
    pub name: String,
    pub mode: InvocationMode,
    pub supports_task: bool,
    pub supports_agents: bool,
}

/// Stateless mapping from integration capabilities to invocation payloads.
#[derive(Clone)]
pub struct InvocationAdapter {
    capabilities: Arc<dyn CapabilitySource>,
}

impl InvocationAdapter {
    pub fn new(capabilities: Arc<dyn CapabilitySource>) -> Self {
        Self { capabilities }
    }

    /// Display name of an integration, or the identifier when unknown.
    pub fn display_name(&self, integration: &str) -> String {
        self.capabilities
            .capabilities(integration)
            .map(|c| c.name)
            .unwrap_or_else(|| integration.to_string())
    }

    /// Task if the integration spawns sub-tasks, else Inline if it accepts agent
    /// context, else Manual. Unknown integrations get Manual.
    pub fn mode_for(&self, integration: &str) -> InvocationMode {
        match self.capabilities.capabilities(integration) {
            Some(c) if c.supports_task => InvocationMode::Task,
            Some(c) if c.supports_agents => InvocationMode::Inline,
            _ => InvocationMode::Manual,
        }
    }

    pub fn adapt(&self, profile: &AgentProfile, integration: &str) -> AgentInvocation {
        match self.mode_for(integration) {
            InvocationMode::Task => AgentInvocation::Task(task_descriptor(profile)),
            InvocationMode::Inline => AgentInvocation::Inline {
                context_block: inline_context_block(profile),
            },
            InvocationMode::Manual => AgentInvocation::Manual {
                instructions: manual_instructions(profile),
            },
        }
    }

    pub fn check_compatibility(&self, profile: &AgentProfile, integration: &str) -> CompatibilityReport {
        let mode = self.mode_for(integration);
        let is_task = mode == InvocationMode::Task;
        let mut warnings = Vec::new();

        if !is_task {
            if !profile.allowed_tools.is_empty() || !profile.disallowed_tools.is_empty() {
                warnings.push("Tool permissions will be ignored (inline/manual mode)".to_string());
            }
            if profile.model.is_some() {
                warnings.push("Model preference will be ignored (inline/manual mode)".to_string());
            }
            if !profile.skills.is_empty() {
                warnings.push(
                    "Skill dependencies require manual loading (inline/manual mode)".to_string(),
                );
            }
        }

        CompatibilityReport {
            compatible: true,
            mode,
            warnings,
            features: CompatibilityFeatures {
                task_execution: is_task,
                tool_permissions: is_task,
                skill_dependencies: is_task,
                triggers: true,
            },
        }
    }

    /// Every known integration with its invocation mode.
    pub fn integrations(&self) -> Vec<IntegrationInfo> {
        self.capabilities
            .integrations()
            .into_iter()
            .filter_map(|id| {
                let caps = self.capabilities.capabilities(&id)?;
                Some(IntegrationInfo {
                    mode: self.mode_for(&id),
                    name: caps.name,
                    supports_task: caps.supports_task,
                    supports_agents: caps.supports_agents,
                    id,
                })
            })
            .collect()
    }
}

fn task_descriptor(profile: &AgentProfile) -> TaskDescriptor {
    TaskDescriptor {
        subagent_type: if profile.name.is_empty() {
            DEFAULT_SUBAGENT.to_string()
        } else {
            profile.name.clone()
        },
        description: truncate_description(profile.description.as_deref()),
        model: profile
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        allowed_tools: profile.allowed_tools.clone(),
        disallowed_tools: profile.disallowed_tools.clone(),
        skill_dependencies: profile.skills.clone(),
    }
}

fn inline_context_block(profile: &AgentProfile) -> String {
    let mut lines = vec![
        format!("<!-- guideflow agent: {} -->", profile.name),
        format!("<!-- Role: {} -->", profile.role()),
        String::new(),
    ];

    if !profile.expertise.is_empty() {
        lines.push(format!("## Agent Expertise: {}", profile.expertise.join(", ")));
        lines.push(String::new());
    }

    if let Some(description) = &profile.description {
        lines.push("## Agent Purpose".to_string());
        lines.push(clean_description(description));
        lines.push(String::new());
    }

    if !profile.allowed_tools.is_empty() {
        lines.push(format!(
            "## Allowed Operations: {}",
            profile.allowed_tools.join(", ")
        ));
    }
    if !profile.disallowed_tools.is_empty() {
        lines.push(format!(
            "## Restricted Operations: {}",
            profile.disallowed_tools.join(", ")
        ));
    }

    lines.push(String::new());
    lines.push("---".to_string());
    lines.push(String::new());
    lines.join("\n")
}

fn manual_instructions(profile: &AgentProfile) -> String {
    let mut lines = vec![
        format!("# {} Agent Instructions", profile.name),
        String::new(),
        "## How to Use This Agent Manually".to_string(),
        String::new(),
        "1. Copy the agent content below into your AI assistant's context".to_string(),
        "2. Provide your task after the agent instructions".to_string(),
        "3. The AI will act according to the agent's role and expertise".to_string(),
        String::new(),
        "## Agent Information".to_string(),
        String::new(),
        format!("- **Name**: {}", profile.name),
        format!("- **Role**: {}", profile.role()),
    ];

    if !profile.expertise.is_empty() {
        lines.push(format!("- **Expertise**: {}", profile.expertise.join(", ")));
    }

    if let Some(description) = &profile.description {
        lines.push(String::new());
        lines.push("## Purpose".to_string());
        lines.push(clean_description(description));
    }

    if !profile.triggers.keywords.is_empty() {
        lines.push(String::new());
        lines.push("## Trigger Keywords".to_string());
        lines.push(format!(
            "Use this agent when: {}",
            profile.triggers.keywords.join(", ")
        ));
    }

    lines.join("\n")
}

/// Strip a leading YAML block pipe and collapse whitespace.
pub fn clean_description(description: &str) -> String {
    let text = description.trim_start();
    let text = text.strip_prefix('|').unwrap_or(text);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One-line description capped at [`MAX_TASK_DESCRIPTION`] characters.
pub fn truncate_description(description: Option<&str>) -> String {
    let cleaned = description.map(clean_description).unwrap_or_default();
    if cleaned.is_empty() {
        return DEFAULT_TASK_DESCRIPTION.to_string();
    }

    if cleaned.chars().count() <= MAX_TASK_DESCRIPTION {
        return cleaned;
    }

    let head: String = cleaned.chars().take(MAX_TASK_DESCRIPTION - 3).collect();
    format!("{}...", head)
}
