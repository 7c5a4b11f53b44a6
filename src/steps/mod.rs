pub mod agent;
pub mod conditional;
pub mod manual;
pub mod parallel;

use tracing::debug;

use crate::adapter::InvocationAdapter;
use crate::adapter::profile::{AgentProfile, AgentSource};
use crate::engine::interpolate::interpolate;
use crate::engine::types::{Context, Step, StepKind, StepOutputs, WorkflowDefinition};
use crate::interaction::Interaction;

/// Result of executing one step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Completed(StepOutputs),
    /// The user chose to skip the step.
    Skipped,
    /// The user chose to stop here and resume later.
    Paused,
    Failed(String),
}

/// Everything a step handler may read or talk to during one run.
pub struct StepRuntime<'a> {
    pub definition: &'a WorkflowDefinition,
    pub context: &'a Context,
    pub interaction: &'a dyn Interaction,
    pub interactive: bool,
    pub verbose: bool,
    pub adapter: &'a InvocationAdapter,
    pub agents: Option<&'a dyn AgentSource>,
    pub integration: &'a str,
}

impl StepRuntime<'_> {
    /// Profile from the agent catalog, or a bare one when the agent is not catalogued.
    pub fn profile(&self, agent: &str) -> AgentProfile {
        match self.agents.and_then(|source| source.profile(agent)) {
            Some(profile) => profile,
            None => {
                debug!(agent = %agent, "No agent definition found, using name only");
                AgentProfile::named(agent)
            }
        }
    }
}

/// Execute a step. Handler errors become a failed outcome.
pub async fn run_step(step: &Step, rt: &StepRuntime<'_>) -> StepOutcome {
    let result = match &step.kind {
        StepKind::Agent { agent, .. } => agent::run(step, agent, rt).await,
        StepKind::Manual {
            agent,
            instructions,
            checklist,
        } => manual::run(step, agent.as_deref(), instructions.as_deref(), checklist, rt).await,
        StepKind::Conditional {
            condition,
            then_branch,
            else_branch,
            decisions,
        } => {
            conditional::run(
                condition.as_deref(),
                then_branch.is_some(),
                else_branch.is_some(),
                decisions,
                rt,
            )
            .await
        }
        StepKind::ParallelAgents {
            agent,
            foreach,
            merge_strategy,
            ..
        } => parallel::run(step, agent, foreach, *merge_strategy, rt).await,
    };

    match result {
        Ok(outcome) => outcome,
        Err(e) => StepOutcome::Failed(format!("{:#}", e)),
    }
}

/// Title line plus interpolated description, shared by every step type.
pub(crate) fn step_header(step: &Step, ctx: &Context) -> Vec<String> {
    let mut lines = vec![format!("## {} ({})", step.name, step.id)];
    if let Some(phase) = &step.phase {
        lines.push(format!("Phase: {}", phase));
    }
    if let Some(description) = &step.description {
        lines.push(interpolate(description.trim(), ctx));
    }
    lines
}
