use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::engine::types::*;
use crate::storage::StateBackend;

/// Durable progress tracking for one workflow run.
///
/// Every mutation is flushed to the backend immediately. Persistence problems
/// never surface as errors: they are logged, counted, and reported as `false`
/// so the caller decides how to react.
pub struct ExecutionStateStore {
    workflow_name: String,
    project_path: String,
    backend: Arc<dyn StateBackend>,
    state: Option<ExecutionState>,
    save_failures: u32,
}

impl ExecutionStateStore {
    pub fn new(
        workflow_name: impl Into<String>,
        project_path: impl Into<String>,
        backend: Arc<dyn StateBackend>,
    ) -> Self {
        Self {
            workflow_name: workflow_name.into(),
            project_path: project_path.into(),
            backend,
            state: None,
            save_failures: 0,
        }
    }

    pub fn workflow_name(&self) -> &str {
        &self.workflow_name
    }

    /// Build fresh state with every step pending. Does not persist.
    pub fn initialize(&mut self, definition: &WorkflowDefinition) -> &ExecutionState {
        let steps: BTreeMap<String, StepState> = definition
            .steps
            .iter()
            .map(|step| (step.id.clone(), StepState::default()))
            .collect();

        let mut metadata = Metadata::new();
        metadata.insert("integration".to_string(), serde_json::Value::Null);
        metadata.insert(
            "projectPath".to_string(),
            serde_json::Value::String(self.project_path.clone()),
        );
        metadata.insert(
            "runId".to_string(),
            serde_json::Value::String(Uuid::new_v4().to_string()),
        );

        self.state.insert(ExecutionState {
            workflow_name: self.workflow_name.clone(),
            workflow_version: definition.version.clone(),
            status: WorkflowStatus::NotStarted,
            started_at: None,
            updated_at: Some(Utc::now()),
            completed_at: None,
            current_step_id: None,
            step_order: definition.step_order(),
            steps,
            context: Context::new(),
            metadata,
        })
    }

    /// Match the held state to the definition's steps: unknown steps are added
    /// as pending, steps the definition no longer has are dropped.
    pub fn align_with(&mut self, definition: &WorkflowDefinition) {
        if let Some(state) = self.state.as_mut() {
            state.steps.retain(|id, _| definition.step(id).is_some());
            for step in &definition.steps {
                state.steps.entry(step.id.clone()).or_default();
            }
            state.step_order = definition.step_order();
            if state
                .current_step_id
                .as_deref()
                .is_some_and(|id| definition.step(id).is_none())
            {
                state.current_step_id = None;
            }
        }
    }

    /// Read persisted state. Unreadable or malformed documents count as absent.
    pub async fn load(&mut self) -> Option<ExecutionState> {
        match self.backend.read(&self.workflow_name).await {
            Ok(Some(state)) => {
                self.state = Some(state.clone());
                Some(state)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(
                    workflow = %self.workflow_name,
                    error = %format!("{:#}", e),
                    "Ignoring unreadable execution state"
                );
                None
            }
        }
    }

    /// Persist current state, stamping `updatedAt`.
    pub async fn save(&mut self) -> bool {
        let Some(state) = self.state.as_mut() else {
            return false;
        };
        state.updated_at = Some(Utc::now());

        match self.backend.write(&self.workflow_name, state).await {
            Ok(()) => true,
            Err(e) => {
                self.save_failures += 1;
                warn!(
                    workflow = %self.workflow_name,
                    location = %self.backend.location(&self.workflow_name),
                    failures = self.save_failures,
                    error = %format!("{:#}", e),
                    "Failed to persist execution state"
                );
                false
            }
        }
    }

    /// Delete persisted state and drop in-memory state. Idempotent.
    pub async fn clear(&mut self) -> bool {
        self.state = None;
        match self.backend.remove(&self.workflow_name).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    workflow = %self.workflow_name,
                    error = %format!("{:#}", e),
                    "Failed to clear execution state"
                );
                false
            }
        }
    }

    /// Whether a state document is persisted for this workflow.
    pub async fn exists(&self) -> bool {
        self.backend.contains(&self.workflow_name).await
    }

    /// True only for in-progress or paused runs. Loads state if none is held.
    pub async fn can_resume(&mut self) -> bool {
        if self.state.is_none() {
            self.load().await;
        }
        self.state
            .as_ref()
            .is_some_and(|s| s.status.is_resumable())
    }

    /// The in-progress step if any, else the first pending step in definition order.
    pub fn get_resume_point(&self) -> Option<String> {
        let state = self.state.as_ref()?;
        let order = state.ordered_step_ids();

        let with_status = |wanted: StepStatus| {
            order
                .iter()
                .find(|id| state.steps.get(*id).is_some_and(|s| s.status == wanted))
                .cloned()
        };

        with_status(StepStatus::InProgress).or_else(|| with_status(StepStatus::Pending))
    }

    pub fn step_status(&self, step_id: &str) -> Option<StepStatus> {
        self.state
            .as_ref()
            .and_then(|s| s.steps.get(step_id))
            .map(|s| s.status)
    }

    pub fn step_outputs(&self, step_id: &str) -> StepOutputs {
        self.state
            .as_ref()
            .and_then(|s| s.steps.get(step_id))
            .map(|s| s.outputs.clone())
            .unwrap_or_default()
    }

    /// Update one step, fold its outputs into the run context, and persist.
    pub async fn set_step_status(
        &mut self,
        step_id: &str,
        status: StepStatus,
        outputs: Option<StepOutputs>,
        error: Option<String>,
    ) -> bool {
        let Some(state) = self.state.as_mut() else {
            return false;
        };
        let Some(step_state) = state.steps.get_mut(step_id) else {
            warn!(workflow = %self.workflow_name, step = %step_id, "Unknown step id");
            return false;
        };

        if !step_state.status.can_transition_to(status) {
            warn!(
                workflow = %self.workflow_name,
                step = %step_id,
                from = %step_state.status,
                to = %status,
                "Rejected step status transition"
            );
            return false;
        }

        let now = Utc::now();
        step_state.status = status;

        match status {
            StepStatus::InProgress => {
                step_state.started_at = Some(now);
                step_state.completed_at = None;
                step_state.error = None;
                state.current_step_id = Some(step_id.to_string());
            }
            StepStatus::Completed | StepStatus::Failed | StepStatus::Skipped => {
                step_state.completed_at = Some(now);
            }
            StepStatus::Pending => {}
        }

        if let Some(outputs) = outputs {
            for (key, value) in &outputs {
                state.context.insert(key.clone(), value.clone());
            }
            step_state.outputs = outputs;
        }

        if let Some(error) = error {
            step_state.error = Some(error);
        }

        debug!(workflow = %self.workflow_name, step = %step_id, status = %status, "Step status updated");
        self.save().await
    }

    /// Accumulated context of the run.
    pub fn get_context(&self) -> Context {
        self.state
            .as_ref()
            .map(|s| s.context.clone())
            .unwrap_or_default()
    }

    /// Set one context value in memory; persisted by the next save.
    pub fn set_context(&mut self, key: impl Into<String>, value: serde_json::Value) {
        if let Some(state) = self.state.as_mut() {
            state.context.insert(key.into(), value);
        }
    }

    pub async fn set_workflow_status(&mut self, status: WorkflowStatus) -> bool {
        let Some(state) = self.state.as_mut() else {
            return false;
        };

        state.status = status;
        if status == WorkflowStatus::InProgress && state.started_at.is_none() {
            state.started_at = Some(Utc::now());
        }
        if status.is_terminal() {
            state.completed_at = Some(Utc::now());
        }

        self.save().await
    }

    pub async fn set_metadata(&mut self, key: impl Into<String>, value: serde_json::Value) -> bool {
        let Some(state) = self.state.as_mut() else {
            return false;
        };
        state.metadata.insert(key.into(), value);
        self.save().await
    }

    /// Step counts and completion percentage. `None` when no state is held.
    pub fn get_summary(&self) -> Option<ExecutionSummary> {
        let state = self.state.as_ref()?;
        let mut progress = Progress {
            total: state.steps.len(),
            ..Progress::default()
        };

        for step in state.steps.values() {
            match step.status {
                StepStatus::Completed => progress.completed += 1,
                StepStatus::Failed => progress.failed += 1,
                StepStatus::Pending => progress.pending += 1,
                StepStatus::Skipped => progress.skipped += 1,
                StepStatus::InProgress => progress.in_progress += 1,
            }
        }

        progress.percentage = if progress.total == 0 {
            0
        } else {
            let done = (progress.completed + progress.skipped) as f64;
            (done * 100.0 / progress.total as f64).round() as u32
        };

        Some(ExecutionSummary {
            workflow_name: state.workflow_name.clone(),
            status: state.status,
            started_at: state.started_at,
            completed_at: state.completed_at,
            current_step_id: state.current_step_id.clone(),
            progress,
        })
    }

    pub fn state(&self) -> Option<&ExecutionState> {
        self.state.as_ref()
    }

    /// Number of saves that failed since this store was created.
    pub fn save_failures(&self) -> u32 {
        self.save_failures
    }
}
