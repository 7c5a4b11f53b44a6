use anyhow::Result;
use tracing::warn;

use super::{StepOutcome, StepRuntime, step_header};
use crate::adapter::profile::WORKFLOW_STEP_ROLE;
use crate::engine::context::{render_context_view, resolve_inputs};
use crate::engine::interpolate::interpolate;
use crate::engine::types::{Context, Step, StepOutputs};

pub async fn run(step: &Step, agent: &str, rt: &StepRuntime<'_>) -> Result<StepOutcome> {
    let mut lines = step_header(step, rt.context);
    lines.extend(agent_payload(step, agent, rt.context, rt));
    rt.interaction.present(&lines.join("\n")).await;

    if !rt.interactive {
        return Ok(StepOutcome::Completed(StepOutputs::new()));
    }

    if !rt
        .interaction
        .confirm("Has the agent completed this task?", true)
        .await
    {
        return Ok(StepOutcome::Failed(format!(
            "Agent '{}' did not complete the task",
            agent
        )));
    }

    Ok(StepOutcome::Completed(collect_outputs(step, rt).await))
}

/// Mode line, compatibility warnings, invocation payload and context view for
/// one agent invocation against `ctx`.
pub(crate) fn agent_payload(
    step: &Step,
    agent: &str,
    ctx: &Context,
    rt: &StepRuntime<'_>,
) -> Vec<String> {
    let mut profile = rt.profile(agent);
    if let Some(description) = &step.description {
        profile.description = Some(interpolate(description.trim(), ctx));
    }
    if profile.role.is_none() {
        profile.role = Some(WORKFLOW_STEP_ROLE.to_string());
    }

    let invocation = rt.adapter.adapt(&profile, rt.integration);
    let report = rt.adapter.check_compatibility(&profile, rt.integration);

    let mut lines = vec![format!(
        "Agent: {} (mode: {}, integration: {})",
        agent,
        invocation.mode(),
        rt.adapter.display_name(rt.integration)
    )];

    if rt.verbose {
        let inputs = resolve_inputs(&step.inputs, ctx);
        if !inputs.is_empty() {
            let names: Vec<&str> = inputs.keys().map(String::as_str).collect();
            lines.push(format!("Inputs: {}", names.join(", ")));
        }
    }

    for warning in &report.warnings {
        warn!(step = %step.id, agent = %agent, integration = %rt.integration, "{}", warning);
        lines.push(format!("Warning: {}", warning));
    }

    lines.push(String::new());
    lines.push(invocation.render());

    let view = render_context_view(step, ctx, rt.definition.context_strategy.as_ref());
    if !view.is_empty() {
        lines.push(String::new());
        lines.push(view);
    }
    lines
}

/// Optionally ask for a value per declared output. Empty answers are left out.
pub(crate) async fn collect_outputs(step: &Step, rt: &StepRuntime<'_>) -> StepOutputs {
    let mut outputs = StepOutputs::new();
    if step.outputs.is_empty() {
        return outputs;
    }

    if !rt
        .interaction
        .confirm("Would you like to record any outputs?", false)
        .await
    {
        return outputs;
    }

    for name in &step.outputs {
        let value = rt
            .interaction
            .input(&format!("Enter value for \"{}\" (or leave empty):", name))
            .await;
        if !value.is_empty() {
            outputs.insert(name.clone(), serde_json::Value::String(value));
        }
    }
    outputs
}
