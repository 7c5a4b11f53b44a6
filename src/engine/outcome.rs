use serde::Serialize;
use thiserror::Error;

use crate::engine::types::{ExecutionSummary, Step, StepInput, WorkflowStatus};

/// Why a run could not start or continue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("Workflow not found: {0}")]
    NotFound(String),

    #[error("Invalid workflow definition: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("No saved state found for workflow: {0}")]
    NoSavedState(String),

    #[error("Workflow cannot be resumed (status: {0})")]
    NotResumable(WorkflowStatus),
}

/// One line of a dry-run plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedStep {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub step_type: String,
    pub agent: Option<String>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl From<&Step> for PlannedStep {
    fn from(step: &Step) -> Self {
        Self {
            id: step.id.clone(),
            name: step.name.clone(),
            step_type: step.type_name().to_string(),
            agent: step.agent().map(str::to_string),
            inputs: step.inputs.iter().map(StepInput::name).map(str::to_string).collect(),
            outputs: step.outputs.clone(),
        }
    }
}

/// Result of `execute` or `resume`. Expected failures land here instead of in `Err`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub workflow_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkflowStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<String>,
    pub paused: bool,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<PlannedStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ExecutionSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<String>,
    pub persistence_failures: u32,
}

impl ExecutionOutcome {
    pub fn rejected(workflow_name: &str, error: WorkflowError) -> Self {
        let validation_errors = match &error {
            WorkflowError::Invalid(errors) => errors.clone(),
            _ => Vec::new(),
        };
        let status = match &error {
            WorkflowError::NotResumable(status) => Some(*status),
            _ => None,
        };

        Self {
            success: false,
            error: Some(error.to_string()),
            workflow_name: workflow_name.to_string(),
            status,
            validation_errors,
            ..Self::default()
        }
    }

    pub fn dry_run(workflow_name: &str, steps: Vec<PlannedStep>) -> Self {
        Self {
            success: true,
            workflow_name: workflow_name.to_string(),
            dry_run: true,
            steps,
            ..Self::default()
        }
    }
}
