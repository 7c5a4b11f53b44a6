use crate::engine::types::{Context, ContextMode, ContextStrategy, Step, StepInput};

/// Rough characters-per-token ratio used for context budgets.
pub const CHARS_PER_TOKEN: usize = 4;

/// Resolve declared inputs against context. A missing or null value falls back to
/// the declared default, then to null.
pub fn resolve_inputs(inputs: &[StepInput], ctx: &Context) -> Context {
    inputs
        .iter()
        .map(|input| {
            let value = ctx
                .get(input.name())
                .filter(|v| !v.is_null())
                .or(input.default_value())
                .cloned()
                .unwrap_or(serde_json::Value::Null);
            (input.name().to_string(), value)
        })
        .collect()
}

/// Step mode wins; otherwise the workflow inheritance setting; otherwise full.
pub fn effective_mode(step: &Step, strategy: Option<&ContextStrategy>) -> ContextMode {
    step.context_mode()
        .or_else(|| {
            strategy
                .and_then(|s| s.context_inheritance)
                .map(|i| i.as_context_mode())
        })
        .unwrap_or(ContextMode::Full)
}

/// Render the slice of context an agent step receives. Empty when there is nothing to show.
pub fn render_context_view(step: &Step, ctx: &Context, strategy: Option<&ContextStrategy>) -> String {
    let inputs = resolve_inputs(&step.inputs, ctx);
    let mut lines = Vec::new();

    match effective_mode(step, strategy) {
        ContextMode::Minimal => {
            for (key, value) in &inputs {
                lines.push(format!("- {}: {}", key, render_value(value)));
            }
        }
        ContextMode::Focused => {
            for (key, value) in &inputs {
                lines.push(format!("- {}: {}", key, render_value(value)));
            }
            let others: Vec<&str> = ctx
                .keys()
                .filter(|k| !inputs.contains_key(*k))
                .map(String::as_str)
                .collect();
            if !others.is_empty() {
                lines.push(format!("Other available context: {}", others.join(", ")));
            }
        }
        ContextMode::Full => {
            let mut merged = ctx.clone();
            for (key, value) in inputs {
                merged.entry(key).or_insert(value);
            }
            for (key, value) in &merged {
                lines.push(format!("- {}: {}", key, render_value(value)));
            }
        }
    }

    if lines.is_empty() {
        return String::new();
    }

    let text = format!("## Context\n{}", lines.join("\n"));
    match strategy {
        Some(ContextStrategy {
            enable_rlm: true,
            max_context_per_step: Some(max_tokens),
            ..
        }) => apply_budget(&text, *max_tokens as usize),
        _ => text,
    }
}

/// Cap text at the character equivalent of `max_tokens`, marking what was cut.
pub fn apply_budget(text: &str, max_tokens: usize) -> String {
    let cap = max_tokens.saturating_mul(CHARS_PER_TOKEN);
    let total = text.chars().count();
    if total <= cap {
        return text.to_string();
    }

    let cut = text
        .char_indices()
        .nth(cap)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    let omitted = (total - cap).div_ceil(CHARS_PER_TOKEN);

    format!(
        "{}\n... (truncated, ~{} tokens omitted)",
        &text[..cut],
        omitted
    )
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
