use anyhow::Result;

use super::{StepOutcome, StepRuntime, step_header};
use crate::engine::interpolate::interpolate;
use crate::engine::types::{Step, StepOutputs};
use crate::interaction::Choice;

pub async fn run(
    step: &Step,
    agent: Option<&str>,
    instructions: Option<&str>,
    checklist: &[String],
    rt: &StepRuntime<'_>,
) -> Result<StepOutcome> {
    let mut lines = step_header(step, rt.context);

    if let Some(agent) = agent {
        lines.push(format!("Suggested agent: {}", agent));
    }

    if let Some(instructions) = instructions {
        lines.push(String::new());
        lines.push("Instructions:".to_string());
        for line in interpolate(instructions.trim(), rt.context).lines() {
            lines.push(format!("  {}", line.trim()));
        }
    }

    if !checklist.is_empty() {
        lines.push(String::new());
        lines.push("Checklist:".to_string());
        for item in checklist {
            lines.push(format!("  [ ] {}", item));
        }
    }

    rt.interaction.present(&lines.join("\n")).await;

    if !rt.interactive
        || rt
            .interaction
            .confirm("Have you completed this step?", true)
            .await
    {
        return Ok(StepOutcome::Completed(StepOutputs::new()));
    }

    let choices = [
        Choice::new("Mark as complete anyway", "complete"),
        Choice::new("Skip this step", "skip"),
        Choice::new("Pause workflow", "pause"),
    ];
    let action = rt
        .interaction
        .select("What would you like to do?", &choices, 0)
        .await;

    Ok(match action.as_str() {
        "skip" => StepOutcome::Skipped,
        "pause" => StepOutcome::Paused,
        _ => StepOutcome::Completed(StepOutputs::new()),
    })
}
