use serde_json::Value;

use crate::engine::types::Context;

/// Evaluate a conditional-step expression against context.
/// Supports: `key exists`, `key == value`, `key != value`, and a bare `key` (truthiness).
pub fn evaluate_condition(condition: &str, ctx: &Context) -> bool {
    let condition = condition.trim();

    if let Some(key) = condition.strip_suffix(" exists") {
        return lookup(key.trim(), ctx).is_some();
    }

    for op in ["==", "!="] {
        if let Some(pos) = condition.find(op) {
            let left = condition[..pos].trim();
            let right = condition[pos + op.len()..].trim();
            let literal = right.trim_matches('"').trim_matches('\'');

            return match (lookup(left, ctx), op) {
                (Some(value), "==") => coerce(value) == literal,
                (Some(value), _) => coerce(value) != literal,
                (None, "==") => false,
                (None, _) => true,
            };
        }
    }

    lookup(condition, ctx).is_some_and(is_truthy)
}

/// Resolve a key, first verbatim, then as a dotted path into nested objects.
pub(crate) fn lookup<'a>(key: &str, ctx: &'a Context) -> Option<&'a Value> {
    let key = key.strip_prefix("context.").unwrap_or(key);

    if let Some(value) = ctx.get(key) {
        return Some(value);
    }

    let mut parts = key.split('.');
    let mut current = ctx.get(parts.next()?)?;
    for part in parts {
        current = current.get(part)?;
    }
    Some(current)
}

fn coerce(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
