use crate::engine::condition::lookup;
use crate::engine::types::Context;

/// Interpolate `${key}`, `${context.key}` and `${key.nested}` patterns in step text.
/// Unknown keys are left in place so the reader can see what was expected.
pub fn interpolate(template: &str, ctx: &Context) -> String {
    let mut result = template.to_string();
    let mut start = 0;

    loop {
        let open = match result[start..].find("${") {
            Some(pos) => start + pos,
            None => break,
        };

        let close = match result[open..].find('}') {
            Some(pos) => open + pos,
            None => break,
        };

        let path = result[open + 2..close].trim().to_string();
        let Some(value) = lookup(&path, ctx) else {
            start = close + 1;
            continue;
        };

        let rendered = match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        };

        result.replace_range(open..=close, &rendered);
        start = open + rendered.len();
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_interpolation() {
        let mut ctx = Context::new();
        ctx.insert("feature".to_string(), serde_json::json!("login"));

        assert_eq!(interpolate("Implement ${feature} now", &ctx), "Implement login now");
        assert_eq!(interpolate("Implement ${context.feature}", &ctx), "Implement login");
    }

    #[test]
    fn test_nested_interpolation() {
        let mut ctx = Context::new();
        ctx.insert(
            "design".to_string(),
            serde_json::json!({"path": "docs/design.md"}),
        );

        assert_eq!(interpolate("Read ${design.path}", &ctx), "Read docs/design.md");
    }

    #[test]
    fn test_missing_key_left_in_place() {
        let ctx = Context::new();
        assert_eq!(interpolate("Hello ${missing}!", &ctx), "Hello ${missing}!");
    }

    #[test]
    fn test_no_interpolation() {
        let ctx = Context::new();
        assert_eq!(interpolate("plain text", &ctx), "plain text");
    }
}
