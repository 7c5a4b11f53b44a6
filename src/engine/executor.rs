use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::adapter::InvocationAdapter;
use crate::adapter::capabilities::BuiltinCapabilities;
use crate::adapter::profile::AgentSource;
use crate::definitions::DefinitionProvider;
use crate::engine::outcome::{ExecutionOutcome, PlannedStep, WorkflowError};
use crate::engine::types::*;
use crate::engine::validate::validate;
use crate::interaction::{Choice, Interaction};
use crate::steps::{StepOutcome, StepRuntime, run_step};
use crate::storage::{ExecutionStateStore, StateBackend};

/// Integration used when none is configured.
pub const DEFAULT_INTEGRATION: &str = "claude-code";

/// Executor-wide settings, fixed for the executor's lifetime.
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Target integration identifier, e.g. `claude-code`.
    pub integration: String,
    /// Whether interaction points prompt. When false every prompt takes its default.
    pub interactive: bool,
    pub verbose: bool,
    /// Project root recorded in run metadata.
    pub project_path: PathBuf,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            integration: DEFAULT_INTEGRATION.to_string(),
            interactive: true,
            verbose: false,
            project_path: PathBuf::from("."),
        }
    }
}

/// Per-call options for `execute`.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Values folded into the run context before the first step.
    pub initial_context: Context,
    /// Discard any saved progress without asking.
    pub restart: bool,
    /// Return the step plan without touching saved state.
    pub dry_run: bool,
}

/// What to do after a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecoveryAction {
    Retry,
    Skip,
    Pause,
    Abort,
}

impl RecoveryAction {
    fn parse(value: &str) -> Self {
        match value {
            "retry" => RecoveryAction::Retry,
            "skip" => RecoveryAction::Skip,
            "pause" => RecoveryAction::Pause,
            _ => RecoveryAction::Abort,
        }
    }
}

/// Drives workflow runs step by step.
///
/// Every `execute`/`resume` call works on its own `ExecutionStateStore`, so
/// nothing carries over between runs apart from what was persisted.
pub struct WorkflowExecutor {
    provider: Arc<dyn DefinitionProvider>,
    agents: Option<Arc<dyn AgentSource>>,
    adapter: InvocationAdapter,
    backend: Arc<dyn StateBackend>,
    interaction: Arc<dyn Interaction>,
    options: ExecutorOptions,
}

impl WorkflowExecutor {
    pub fn new(
        provider: Arc<dyn DefinitionProvider>,
        backend: Arc<dyn StateBackend>,
        interaction: Arc<dyn Interaction>,
        options: ExecutorOptions,
    ) -> Self {
        Self {
            provider,
            agents: None,
            adapter: InvocationAdapter::new(Arc::new(BuiltinCapabilities::new())),
            backend,
            interaction,
            options,
        }
    }

    /// Use agent definitions from this source when rendering agent steps.
    pub fn with_agents(mut self, agents: Arc<dyn AgentSource>) -> Self {
        self.agents = Some(agents);
        self
    }

    pub fn with_adapter(mut self, adapter: InvocationAdapter) -> Self {
        self.adapter = adapter;
        self
    }

    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    pub fn adapter(&self) -> &InvocationAdapter {
        &self.adapter
    }

    /// A fresh state store for one workflow, bound to this executor's backend.
    pub fn state_store(&self, workflow_name: &str) -> ExecutionStateStore {
        ExecutionStateStore::new(
            workflow_name,
            self.options.project_path.display().to_string(),
            self.backend.clone(),
        )
    }

    /// Fetch, validate and convert a definition.
    pub fn load_definition(&self, name: &str) -> Result<WorkflowDefinition, WorkflowError> {
        let content = self
            .provider
            .definition_content(name)
            .ok_or_else(|| WorkflowError::NotFound(name.to_string()))?;

        let raw = self.provider.parse_definition(&content);
        let report = validate(&raw);
        if !report.valid {
            return Err(WorkflowError::Invalid(report.errors));
        }
        for warning in &report.warnings {
            warn!(workflow = %name, "{}", warning);
        }

        raw.to_definition()
            .map_err(|e| WorkflowError::Invalid(vec![format!("{:#}", e)]))
    }

    /// Run a workflow from the start, or from saved progress when the user agrees.
    pub async fn execute(&self, name: &str, run: RunOptions) -> ExecutionOutcome {
        let definition = match self.load_definition(name) {
            Ok(definition) => definition,
            Err(e) => {
                warn!(workflow = %name, error = %e, "Workflow rejected");
                return ExecutionOutcome::rejected(name, e);
            }
        };

        if run.dry_run {
            info!(workflow = %name, steps = definition.steps.len(), "Dry run");
            let plan = definition.steps.iter().map(PlannedStep::from).collect();
            return ExecutionOutcome::dry_run(name, plan);
        }

        let mut store = self.state_store(name);
        let prior = store.load().await;

        let resume = match &prior {
            Some(state) if state.status.is_resumable() && !run.restart => {
                self.ask_resume(name, &store).await
            }
            Some(state) => {
                debug!(workflow = %name, status = %state.status, "Discarding saved state");
                false
            }
            None => false,
        };

        if resume {
            store.align_with(&definition);
        } else {
            if prior.is_some() {
                store.clear().await;
            }
            store.initialize(&definition);
        }

        self.present_header(&definition).await;

        for (key, value) in run.initial_context {
            store.set_context(key, value);
        }
        store
            .set_metadata("integration", json!(self.options.integration))
            .await;

        info!(
            workflow = %name,
            integration = %self.options.integration,
            resumed = resume,
            "Starting workflow execution"
        );
        self.run_steps(&definition, &mut store).await
    }

    /// Continue a paused or interrupted run.
    pub async fn resume(&self, name: &str) -> ExecutionOutcome {
        let definition = match self.load_definition(name) {
            Ok(definition) => definition,
            Err(e) => {
                warn!(workflow = %name, error = %e, "Workflow rejected");
                return ExecutionOutcome::rejected(name, e);
            }
        };

        let mut store = self.state_store(name);
        let Some(state) = store.load().await else {
            return ExecutionOutcome::rejected(name, WorkflowError::NoSavedState(name.to_string()));
        };
        if !state.status.is_resumable() {
            return ExecutionOutcome::rejected(name, WorkflowError::NotResumable(state.status));
        }

        store.align_with(&definition);
        self.present_header(&definition).await;

        if let Some(summary) = store.get_summary() {
            let from = store.get_resume_point().unwrap_or_default();
            self.interaction
                .present(&format!(
                    "Resuming from '{}' ({}/{} steps done, {}%)",
                    from,
                    summary.progress.completed + summary.progress.skipped,
                    summary.progress.total,
                    summary.progress.percentage
                ))
                .await;
        }

        store
            .set_metadata("integration", json!(self.options.integration))
            .await;

        info!(workflow = %name, integration = %self.options.integration, "Resuming workflow execution");
        self.run_steps(&definition, &mut store).await
    }

    async fn ask_resume(&self, name: &str, store: &ExecutionStateStore) -> bool {
        let progress = store
            .get_summary()
            .map(|s| {
                format!(
                    "{}/{} steps done, status {}",
                    s.progress.completed + s.progress.skipped,
                    s.progress.total,
                    s.status
                )
            })
            .unwrap_or_default();
        self.interaction
            .present(&format!("Found saved progress for '{}' ({})", name, progress))
            .await;

        if !self.options.interactive {
            return true;
        }

        let choices = [
            Choice::new("Resume from where you left off", "resume"),
            Choice::new("Start over", "restart"),
        ];
        self.interaction
            .select("What would you like to do?", &choices, 0)
            .await
            == "resume"
    }

    async fn present_header(&self, definition: &WorkflowDefinition) {
        let mut lines = vec![format!("# {} v{}", definition.name, definition.version)];
        if let Some(description) = &definition.description {
            lines.push(description.trim().to_string());
        }
        lines.push(format!(
            "Integration: {} ({} mode)",
            self.adapter.display_name(&self.options.integration),
            self.adapter.mode_for(&self.options.integration)
        ));
        self.interaction.present(&lines.join("\n")).await;
    }

    async fn run_steps(
        &self,
        definition: &WorkflowDefinition,
        store: &mut ExecutionStateStore,
    ) -> ExecutionOutcome {
        store.set_workflow_status(WorkflowStatus::InProgress).await;

        for step_id in definition.step_order() {
            if store.step_status(&step_id).is_some_and(StepStatus::is_settled) {
                debug!(step = %step_id, "Step already settled, passing over");
                continue;
            }

            let Some(step) = definition.step(&step_id) else {
                warn!(step = %step_id, "Step definition missing");
                continue;
            };

            store
                .set_step_status(&step_id, StepStatus::InProgress, None, None)
                .await;
            info!(workflow = %definition.name, step = %step_id, kind = step.type_name(), "Running step");

            let mut outcome = self.run_one(definition, step, store).await;
            let mut retried = false;

            loop {
                match outcome {
                    StepOutcome::Completed(outputs) => {
                        store
                            .set_step_status(&step_id, StepStatus::Completed, Some(outputs), None)
                            .await;
                        info!(step = %step_id, "Step completed");
                        break;
                    }
                    StepOutcome::Skipped => {
                        store
                            .set_step_status(&step_id, StepStatus::Skipped, None, None)
                            .await;
                        info!(step = %step_id, "Step skipped");
                        break;
                    }
                    StepOutcome::Paused => return self.pause(store, &step_id).await,
                    StepOutcome::Failed(message) => {
                        error!(step = %step_id, error = %message, "Step failed");
                        self.interaction
                            .present(&format!("Step failed: {}", message))
                            .await;

                        let action = if retried {
                            RecoveryAction::Abort
                        } else {
                            self.recovery_action().await
                        };

                        match action {
                            RecoveryAction::Retry => {
                                retried = true;
                                info!(step = %step_id, "Retrying step");
                                store
                                    .set_step_status(&step_id, StepStatus::InProgress, None, None)
                                    .await;
                                outcome = self.run_one(definition, step, store).await;
                            }
                            RecoveryAction::Skip => {
                                store
                                    .set_step_status(&step_id, StepStatus::Skipped, None, Some(message))
                                    .await;
                                info!(step = %step_id, "Failed step skipped");
                                break;
                            }
                            RecoveryAction::Pause => return self.pause(store, &step_id).await,
                            RecoveryAction::Abort => {
                                return self.fail(store, &step_id, message).await;
                            }
                        }
                    }
                }
            }
        }

        self.complete(store).await
    }

    async fn run_one(
        &self,
        definition: &WorkflowDefinition,
        step: &Step,
        store: &ExecutionStateStore,
    ) -> StepOutcome {
        let context = store.get_context();
        let rt = StepRuntime {
            definition,
            context: &context,
            interaction: self.interaction.as_ref(),
            interactive: self.options.interactive,
            verbose: self.options.verbose,
            adapter: &self.adapter,
            agents: self.agents.as_deref(),
            integration: &self.options.integration,
        };
        run_step(step, &rt).await
    }

    async fn recovery_action(&self) -> RecoveryAction {
        if !self.options.interactive {
            return RecoveryAction::Abort;
        }

        let choices = [
            Choice::new("Retry this step", "retry"),
            Choice::new("Skip and continue", "skip"),
            Choice::new("Pause (resume later)", "pause"),
            Choice::new("Abort workflow", "abort"),
        ];
        let answer = self
            .interaction
            .select("How would you like to proceed?", &choices, 3)
            .await;
        RecoveryAction::parse(&answer)
    }

    async fn pause(&self, store: &mut ExecutionStateStore, step_id: &str) -> ExecutionOutcome {
        store.set_workflow_status(WorkflowStatus::Paused).await;
        info!(workflow = %store.workflow_name(), step = %step_id, "Workflow paused");
        self.interaction
            .present(&format!(
                "Workflow paused at '{}'. Resume with: guideflow resume {}",
                step_id,
                store.workflow_name()
            ))
            .await;

        ExecutionOutcome {
            success: false,
            workflow_name: store.workflow_name().to_string(),
            status: Some(WorkflowStatus::Paused),
            paused_at: Some(step_id.to_string()),
            paused: true,
            summary: store.get_summary(),
            persistence_failures: store.save_failures(),
            ..ExecutionOutcome::default()
        }
    }

    async fn fail(
        &self,
        store: &mut ExecutionStateStore,
        step_id: &str,
        message: String,
    ) -> ExecutionOutcome {
        store
            .set_step_status(step_id, StepStatus::Failed, None, Some(message.clone()))
            .await;
        store.set_workflow_status(WorkflowStatus::Failed).await;
        error!(workflow = %store.workflow_name(), step = %step_id, "Workflow failed");

        ExecutionOutcome {
            success: false,
            error: Some(format!("Step '{}' failed: {}", step_id, message)),
            workflow_name: store.workflow_name().to_string(),
            status: Some(WorkflowStatus::Failed),
            failed_step: Some(step_id.to_string()),
            summary: store.get_summary(),
            persistence_failures: store.save_failures(),
            ..ExecutionOutcome::default()
        }
    }

    async fn complete(&self, store: &mut ExecutionStateStore) -> ExecutionOutcome {
        store.set_workflow_status(WorkflowStatus::Completed).await;
        let summary = store.get_summary();
        let persistence_failures = store.save_failures();
        let workflow_name = store.workflow_name().to_string();

        if let Some(summary) = &summary {
            self.interaction
                .present(&format!(
                    "Workflow completed: {} completed, {} skipped, {} total",
                    summary.progress.completed, summary.progress.skipped, summary.progress.total
                ))
                .await;
        }

        store.clear().await;
        info!(workflow = %workflow_name, "Workflow execution complete");

        ExecutionOutcome {
            success: true,
            workflow_name,
            status: Some(WorkflowStatus::Completed),
            summary,
            persistence_failures,
            ..ExecutionOutcome::default()
        }
    }
}
