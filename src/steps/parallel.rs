use anyhow::{Result, bail};
use serde_json::{Value, json};
use tracing::debug;

use super::agent::{agent_payload, collect_outputs};
use super::{StepOutcome, StepRuntime};
use crate::engine::condition::lookup;
use crate::engine::types::{Context, MergeStrategy, Step, StepOutputs};

/// Fan an agent out over a context collection, one item at a time, and merge the
/// per-item outputs.
pub async fn run(
    step: &Step,
    agent: &str,
    foreach: &str,
    strategy: MergeStrategy,
    rt: &StepRuntime<'_>,
) -> Result<StepOutcome> {
    let items = resolve_items(foreach, rt.context)?;
    let total = items.len();

    rt.interaction
        .present(&format!(
            "## {} ({})\nRunning {} over {} item(s) from '{}' (merge: {})",
            step.name,
            step.id,
            agent,
            total,
            foreach,
            strategy.as_str()
        ))
        .await;

    let mut per_item: Vec<StepOutputs> = Vec::with_capacity(total);
    let mut carried = StepOutputs::new();

    for (index, item) in items.into_iter().enumerate() {
        let mut ctx = rt.context.clone();
        if strategy == MergeStrategy::Sequential {
            ctx.extend(carried.clone());
        }
        ctx.insert("item".to_string(), item.clone());
        ctx.insert("item_index".to_string(), json!(index));

        let mut lines = vec![format!("### Item {}/{}: {}", index + 1, total, display(&item))];
        lines.extend(agent_payload(step, agent, &ctx, rt));
        rt.interaction.present(&lines.join("\n")).await;

        let outputs = if rt.interactive {
            let question = format!("Has the agent completed item {} of {}?", index + 1, total);
            if !rt.interaction.confirm(&question, true).await {
                return Ok(StepOutcome::Failed(format!(
                    "Agent '{}' did not complete item {} of {}",
                    agent,
                    index + 1,
                    total
                )));
            }
            collect_outputs(step, rt).await
        } else {
            StepOutputs::new()
        };

        debug!(step = %step.id, item = index, outputs = outputs.len(), "Fan-out item done");
        if strategy == MergeStrategy::Sequential {
            carried.extend(outputs.clone());
        }
        per_item.push(outputs);
    }

    Ok(StepOutcome::Completed(merge(step, strategy, per_item)))
}

/// Items named by a `foreach` expression: `key`, `${key}` or `context.key`.
/// Arrays are used as-is and strings are split on commas and newlines.
pub fn resolve_items(foreach: &str, ctx: &Context) -> Result<Vec<Value>> {
    let expr = foreach.trim();
    let key = expr
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .unwrap_or(expr)
        .trim();

    match lookup(key, ctx) {
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(Value::String(text)) => Ok(text
            .split([',', '\n'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Value::String(s.to_string()))
            .collect()),
        Some(other) => bail!("foreach value '{}' is not a list (got {})", key, other),
        None => bail!("foreach key '{}' not found in context", key),
    }
}

/// Combine per-item outputs according to the merge strategy. Aggregated arrays
/// keep one slot per item, null where the item recorded no value.
pub fn merge(step: &Step, strategy: MergeStrategy, per_item: Vec<StepOutputs>) -> StepOutputs {
    let total = per_item.len();
    let items_key = format!("{}_items", step.id);
    let mut merged = StepOutputs::new();

    match strategy {
        MergeStrategy::Aggregate => {
            for name in &step.outputs {
                let values: Vec<Value> = per_item
                    .iter()
                    .map(|outputs| outputs.get(name).cloned().unwrap_or(Value::Null))
                    .collect();
                merged.insert(name.clone(), Value::Array(values));
            }
            merged.insert(items_key, json!(total));
        }
        MergeStrategy::Sequential => {
            for outputs in per_item {
                merged.extend(outputs);
            }
        }
        MergeStrategy::Summary => {
            let recorded = per_item.iter().filter(|outputs| !outputs.is_empty()).count();
            merged.insert(
                format!("{}_summary", step.id),
                json!(format!(
                    "{} items completed, {} with recorded outputs",
                    total, recorded
                )),
            );
            merged.insert(items_key, json!(total));
        }
    }
    merged
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
