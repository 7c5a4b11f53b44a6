use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, anyhow, bail};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::engine::types::*;

/// File suffix of workflow definition documents.
pub const WORKFLOW_EXTENSION: &str = ".workflow.yaml";

/// Source of workflow definition documents.
pub trait DefinitionProvider: Send + Sync {
    /// Raw definition text for a workflow name, if one exists.
    fn definition_content(&self, name: &str) -> Option<String>;

    /// Parse definition text. Never fails: malformed input yields an empty definition.
    fn parse_definition(&self, content: &str) -> RawWorkflow {
        RawWorkflow::parse(content)
    }

    /// Names of all workflows this provider can serve, sorted.
    fn available(&self) -> Vec<String>;
}

/// Serves `<dir>/<name>.workflow.yaml` files.
pub struct DirectoryProvider {
    dir: PathBuf,
}

impl DirectoryProvider {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn definition_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}{}", name, WORKFLOW_EXTENSION))
    }
}

impl DefinitionProvider for DirectoryProvider {
    fn definition_content(&self, name: &str) -> Option<String> {
        let path = self.definition_path(name);
        match std::fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Workflow definition not readable");
                None
            }
        }
    }

    fn available(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| {
                let file_name = entry.file_name().to_string_lossy().to_string();
                file_name
                    .strip_suffix(WORKFLOW_EXTENSION)
                    .map(|name| name.to_string())
            })
            .collect();
        names.sort();
        names
    }
}

/// Workflow document as written, before validation. Every field is optional so
/// that the validator can report what is missing instead of the parser failing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawWorkflow {
    pub name: Option<Value>,
    pub version: Option<Value>,
    pub description: Option<Value>,
    pub steps: Option<Value>,
    #[serde(rename = "context-strategy", alias = "context_strategy")]
    pub context_strategy: Option<RawContextStrategy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawContextStrategy {
    #[serde(rename = "enable-rlm", alias = "enable_rlm")]
    pub enable_rlm: Option<Value>,
    #[serde(rename = "max-context-per-step", alias = "max_context_per_step")]
    pub max_context_per_step: Option<Value>,
    #[serde(rename = "context-inheritance", alias = "context_inheritance")]
    pub context_inheritance: Option<Value>,
}

/// One step as written in a workflow document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawStep {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub step_type: Option<String>,
    pub agent: Option<String>,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub phase: Option<String>,
    pub inputs: Vec<StepInput>,
    pub outputs: Vec<String>,
    pub checklist: Vec<String>,
    pub condition: Option<String>,
    pub then_branch: Option<Value>,
    pub else_branch: Option<Value>,
    pub decisions: Option<serde_json::Map<String, Value>>,
    pub foreach: Option<String>,
    #[serde(rename = "context-mode", alias = "context_mode")]
    pub context_mode: Option<String>,
    #[serde(rename = "merge-strategy", alias = "merge_strategy")]
    pub merge_strategy: Option<String>,
}

impl RawWorkflow {
    /// Parse YAML text, falling back to an empty document on any error.
    pub fn parse(content: &str) -> Self {
        let value: Value = match serde_yml::from_str(content) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "Workflow YAML did not parse");
                return Self::default();
            }
        };

        if !value.is_object() {
            return Self::default();
        }

        serde_json::from_value(value).unwrap_or_else(|e| {
            debug!(error = %e, "Workflow document has an unexpected shape");
            Self::default()
        })
    }

    pub fn name(&self) -> Option<String> {
        self.name.as_ref().and_then(scalar_string)
    }

    pub fn version(&self) -> Option<String> {
        self.version.as_ref().and_then(scalar_string)
    }

    pub fn description(&self) -> Option<String> {
        self.description.as_ref().and_then(scalar_string)
    }

    /// The `steps` sequence, or `None` when missing or not a sequence.
    pub fn step_values(&self) -> Option<&Vec<Value>> {
        self.steps.as_ref().and_then(|s| s.as_array())
    }

    /// Convert into a typed definition. Call only after validation succeeded.
    pub fn to_definition(&self) -> Result<WorkflowDefinition> {
        let name = self.name().ok_or_else(|| anyhow!("Workflow has no name"))?;
        let version = self
            .version()
            .ok_or_else(|| anyhow!("Workflow '{}' has no version", name))?;
        let step_values = self
            .step_values()
            .ok_or_else(|| anyhow!("Workflow '{}' has no steps sequence", name))?;

        let mut steps = Vec::with_capacity(step_values.len());
        for (index, value) in step_values.iter().enumerate() {
            let raw: RawStep = serde_json::from_value(value.clone())
                .with_context(|| format!("Step {} is malformed", index + 1))?;
            steps.push(raw.to_step()?);
        }

        let context_strategy = self.context_strategy.as_ref().map(|cs| ContextStrategy {
            enable_rlm: cs.enable_rlm.as_ref().and_then(Value::as_bool).unwrap_or(false),
            max_context_per_step: cs.max_context_per_step.as_ref().and_then(numeric_u64),
            context_inheritance: cs
                .context_inheritance
                .as_ref()
                .and_then(Value::as_str)
                .and_then(ContextInheritance::parse),
        });

        Ok(WorkflowDefinition {
            name,
            version,
            description: self.description(),
            steps,
            context_strategy,
        })
    }
}

impl RawStep {
    pub fn to_step(&self) -> Result<Step> {
        let id = self
            .id
            .clone()
            .ok_or_else(|| anyhow!("Step is missing an id"))?;
        let step_type = self
            .step_type
            .as_deref()
            .ok_or_else(|| anyhow!("Step '{}' is missing a type", id))?;
        let context_mode = self.context_mode.as_deref().and_then(ContextMode::parse);

        let kind = match step_type {
            "agent" => StepKind::Agent {
                agent: self.required_agent(&id)?,
                context_mode,
            },
            "manual" => StepKind::Manual {
                agent: self.agent.clone(),
                instructions: self.instructions.clone(),
                checklist: self.checklist.clone(),
            },
            "conditional" => StepKind::Conditional {
                condition: self.condition.clone(),
                then_branch: self.then_branch.clone(),
                else_branch: self.else_branch.clone(),
                decisions: self.decision_list(),
            },
            "parallel-agents" => StepKind::ParallelAgents {
                agent: self.required_agent(&id)?,
                foreach: self
                    .foreach
                    .clone()
                    .ok_or_else(|| anyhow!("Step '{}' is missing 'foreach'", id))?,
                context_mode,
                merge_strategy: self
                    .merge_strategy
                    .as_deref()
                    .and_then(MergeStrategy::parse)
                    .unwrap_or_default(),
            },
            other => bail!("Step '{}' has unknown type '{}'", id, other),
        };

        Ok(Step {
            name: self.name.clone().unwrap_or_else(|| id.clone()),
            id,
            description: self.description.clone(),
            phase: self.phase.clone(),
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            kind,
        })
    }

    fn required_agent(&self, id: &str) -> Result<String> {
        self.agent
            .clone()
            .ok_or_else(|| anyhow!("Step '{}' is missing 'agent'", id))
    }

    fn decision_list(&self) -> Vec<Decision> {
        let Some(decisions) = &self.decisions else {
            return Vec::new();
        };

        decisions
            .iter()
            .map(|(name, value)| Decision {
                name: name.clone(),
                condition: match value {
                    Value::String(s) => Some(s.clone()),
                    other => other
                        .get("condition")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                },
            })
            .collect()
    }
}

/// Render a YAML scalar (string, number, bool) as text.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Accept `4000` as well as `"4000"`.
pub(crate) fn numeric_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
