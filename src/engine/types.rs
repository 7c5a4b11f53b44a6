use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Accumulated step outputs, shared with later steps.
pub type Context = BTreeMap<String, serde_json::Value>;

/// Outputs produced by a single step, merged into the run context on completion.
pub type StepOutputs = HashMap<String, serde_json::Value>;

/// Free-form run metadata (target integration, project path, run id).
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Status of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    NotStarted,
    InProgress,
    Paused,
    Completed,
    Failed,
}

impl WorkflowStatus {
    /// Only interrupted runs can be picked up again.
    pub fn is_resumable(self) -> bool {
        matches!(self, WorkflowStatus::InProgress | WorkflowStatus::Paused)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowStatus::Completed | WorkflowStatus::Failed)
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowStatus::NotStarted => write!(f, "not_started"),
            WorkflowStatus::InProgress => write!(f, "in_progress"),
            WorkflowStatus::Paused => write!(f, "paused"),
            WorkflowStatus::Completed => write!(f, "completed"),
            WorkflowStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Status of an individual step within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

impl StepStatus {
    /// Completed and skipped steps are never executed again.
    pub fn is_settled(self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Skipped)
    }

    /// Steps move pending → in_progress → completed/failed/skipped. An in-progress
    /// step may be re-entered (retry or resume after interruption) and a failed
    /// step may be retried.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (StepStatus::Pending, StepStatus::InProgress)
                | (StepStatus::InProgress, StepStatus::InProgress)
                | (StepStatus::InProgress, StepStatus::Completed)
                | (StepStatus::InProgress, StepStatus::Failed)
                | (StepStatus::InProgress, StepStatus::Skipped)
                | (StepStatus::Failed, StepStatus::InProgress)
        )
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepStatus::Pending => write!(f, "pending"),
            StepStatus::InProgress => write!(f, "in_progress"),
            StepStatus::Completed => write!(f, "completed"),
            StepStatus::Failed => write!(f, "failed"),
            StepStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Persisted state of one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepState {
    pub status: StepStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub outputs: StepOutputs,
    pub error: Option<String>,
}

impl Default for StepState {
    fn default() -> Self {
        Self {
            status: StepStatus::Pending,
            started_at: None,
            completed_at: None,
            outputs: StepOutputs::new(),
            error: None,
        }
    }
}

/// Persisted progress of one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionState {
    pub workflow_name: String,
    pub workflow_version: String,
    pub status: WorkflowStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub current_step_id: Option<String>,
    /// Step ids in definition order.
    #[serde(default)]
    pub step_order: Vec<String>,
    pub steps: BTreeMap<String, StepState>,
    #[serde(default)]
    pub context: Context,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ExecutionState {
    /// Step ids in definition order, falling back to key order for documents
    /// written without `stepOrder`.
    pub fn ordered_step_ids(&self) -> Vec<String> {
        if self.step_order.is_empty() {
            self.steps.keys().cloned().collect()
        } else {
            self.step_order
                .iter()
                .filter(|id| self.steps.contains_key(*id))
                .cloned()
                .collect()
        }
    }
}

/// Step counts reported for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub pending: usize,
    pub skipped: usize,
    pub in_progress: usize,
    pub percentage: u32,
}

/// Snapshot of a run used for resume and completion reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
    pub workflow_name: String,
    pub status: WorkflowStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub current_step_id: Option<String>,
    pub progress: Progress,
}

// --- Workflow definitions ---

/// How much of the accumulated context an agent step receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextMode {
    Minimal,
    Focused,
    Full,
}

impl ContextMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "minimal" => Some(ContextMode::Minimal),
            "focused" => Some(ContextMode::Focused),
            "full" => Some(ContextMode::Full),
            _ => None,
        }
    }
}

/// How per-item results of a parallel-agents step are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    #[default]
    Aggregate,
    Sequential,
    Summary,
}

impl MergeStrategy {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "aggregate" => Some(MergeStrategy::Aggregate),
            "sequential" => Some(MergeStrategy::Sequential),
            "summary" => Some(MergeStrategy::Summary),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MergeStrategy::Aggregate => "aggregate",
            MergeStrategy::Sequential => "sequential",
            MergeStrategy::Summary => "summary",
        }
    }
}

/// Workflow-wide default for how context flows into steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextInheritance {
    Full,
    Selective,
    Summary,
}

impl ContextInheritance {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "full" => Some(ContextInheritance::Full),
            "selective" => Some(ContextInheritance::Selective),
            "summary" => Some(ContextInheritance::Summary),
            _ => None,
        }
    }

    /// Per-step context mode implied by this inheritance setting.
    pub fn as_context_mode(self) -> ContextMode {
        match self {
            ContextInheritance::Full => ContextMode::Full,
            ContextInheritance::Selective => ContextMode::Minimal,
            ContextInheritance::Summary => ContextMode::Focused,
        }
    }
}

/// Workflow-level large-context handling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextStrategy {
    pub enable_rlm: bool,
    /// Token budget for the context rendered into one step.
    pub max_context_per_step: Option<u64>,
    pub context_inheritance: Option<ContextInheritance>,
}

/// A declared step input: a bare context key or a key with a fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepInput {
    Name(String),
    WithDefault {
        name: String,
        #[serde(default)]
        default: Option<serde_json::Value>,
    },
}

impl StepInput {
    pub fn name(&self) -> &str {
        match self {
            StepInput::Name(name) => name,
            StepInput::WithDefault { name, .. } => name,
        }
    }

    pub fn default_value(&self) -> Option<&serde_json::Value> {
        match self {
            StepInput::Name(_) => None,
            StepInput::WithDefault { default, .. } => default.as_ref(),
        }
    }
}

/// A named alternative offered by a conditional step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub name: String,
    pub condition: Option<String>,
}

/// Type-specific part of a step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    Agent {
        agent: String,
        context_mode: Option<ContextMode>,
    },
    Manual {
        agent: Option<String>,
        instructions: Option<String>,
        checklist: Vec<String>,
    },
    Conditional {
        condition: Option<String>,
        then_branch: Option<serde_json::Value>,
        else_branch: Option<serde_json::Value>,
        decisions: Vec<Decision>,
    },
    ParallelAgents {
        agent: String,
        foreach: String,
        context_mode: Option<ContextMode>,
        merge_strategy: MergeStrategy,
    },
}

/// One step of a validated workflow definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub phase: Option<String>,
    pub inputs: Vec<StepInput>,
    pub outputs: Vec<String>,
    pub kind: StepKind,
}

impl Step {
    /// The step type as written in workflow files.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            StepKind::Agent { .. } => "agent",
            StepKind::Manual { .. } => "manual",
            StepKind::Conditional { .. } => "conditional",
            StepKind::ParallelAgents { .. } => "parallel-agents",
        }
    }

    pub fn agent(&self) -> Option<&str> {
        match &self.kind {
            StepKind::Agent { agent, .. } | StepKind::ParallelAgents { agent, .. } => {
                Some(agent.as_str())
            }
            StepKind::Manual { agent, .. } => agent.as_deref(),
            StepKind::Conditional { .. } => None,
        }
    }

    pub fn context_mode(&self) -> Option<ContextMode> {
        match self.kind {
            StepKind::Agent { context_mode, .. } | StepKind::ParallelAgents { context_mode, .. } => {
                context_mode
            }
            _ => None,
        }
    }
}

/// Complete workflow definition, immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowDefinition {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub steps: Vec<Step>,
    pub context_strategy: Option<ContextStrategy>,
}

impl WorkflowDefinition {
    /// Step ids in canonical execution order.
    pub fn step_order(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.id.clone()).collect()
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }
}
