use anyhow::Result;
use serde_json::json;

use super::{StepOutcome, StepRuntime};
use crate::engine::condition::evaluate_condition;
use crate::engine::types::{Decision, StepOutputs};
use crate::interaction::Choice;

/// Evaluate the condition and record which branch applies. Branches annotate the
/// step outputs only; later steps run either way.
pub async fn run(
    condition: Option<&str>,
    has_then: bool,
    has_else: bool,
    decisions: &[Decision],
    rt: &StepRuntime<'_>,
) -> Result<StepOutcome> {
    if let Some(condition) = condition {
        let met = evaluate_condition(condition, rt.context);
        let verdict = if met { "met" } else { "not met" };
        rt.interaction
            .present(&format!("Condition {}: {}", verdict, condition))
            .await;

        if met && has_then {
            return Ok(branch("then"));
        }
        if !met && has_else {
            return Ok(branch("else"));
        }
    }

    if rt.interactive && !decisions.is_empty() {
        let choices: Vec<Choice> = decisions
            .iter()
            .map(|d| {
                let label = format!(
                    "{}: {}",
                    d.name,
                    d.condition.as_deref().unwrap_or("No condition")
                );
                Choice::new(label, d.name.clone())
            })
            .collect();

        let decision = rt
            .interaction
            .select("Select decision:", &choices, 0)
            .await;

        let mut outputs = StepOutputs::new();
        outputs.insert("decision".to_string(), json!(decision));
        return Ok(StepOutcome::Completed(outputs));
    }

    Ok(StepOutcome::Completed(StepOutputs::new()))
}

fn branch(name: &str) -> StepOutcome {
    let mut outputs = StepOutputs::new();
    outputs.insert("next_branch".to_string(), json!(name));
    StepOutcome::Completed(outputs)
}
