use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;

use crate::definitions::{RawStep, RawWorkflow, numeric_u64};
use crate::engine::types::{ContextInheritance, ContextMode, MergeStrategy};

/// Step types a workflow document may declare.
pub const STEP_TYPES: [&str; 4] = ["agent", "manual", "conditional", "parallel-agents"];

/// Result of checking a workflow document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Check required fields, step types and enumerated values of a workflow document.
pub fn validate(workflow: &RawWorkflow) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if workflow.name().is_none() {
        errors.push("Missing required field: name".to_string());
    }
    if workflow.version().is_none() {
        errors.push("Missing required field: version".to_string());
    }

    match (&workflow.steps, workflow.step_values()) {
        (None, _) => errors.push("Missing required field: steps".to_string()),
        (Some(_), None) => errors.push("Field 'steps' must be an array".to_string()),
        (Some(_), Some(steps)) => {
            if steps.is_empty() {
                warnings.push("Workflow has no steps".to_string());
            }
            let mut seen = HashSet::new();
            for (index, value) in steps.iter().enumerate() {
                validate_step(index, value, &mut seen, &mut errors);
            }
        }
    }

    if let Some(strategy) = &workflow.context_strategy {
        if let Some(inheritance) = &strategy.context_inheritance {
            let known = inheritance
                .as_str()
                .and_then(ContextInheritance::parse)
                .is_some();
            if !known {
                errors.push(format!(
                    "Invalid context-strategy.context-inheritance '{}' (expected full, selective or summary)",
                    display_value(inheritance)
                ));
            }
        }
        if let Some(max) = &strategy.max_context_per_step
            && numeric_u64(max).is_none()
        {
            warnings.push(format!(
                "context-strategy.max-context-per-step should be numeric, got '{}'",
                display_value(max)
            ));
        }
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

fn validate_step(index: usize, value: &Value, seen: &mut HashSet<String>, errors: &mut Vec<String>) {
    let position = index + 1;

    if !value.is_object() {
        errors.push(format!("Step #{} must be a mapping", position));
        return;
    }

    let step: RawStep = match serde_json::from_value(value.clone()) {
        Ok(step) => step,
        Err(e) => {
            errors.push(format!("Step #{} is malformed: {}", position, e));
            return;
        }
    };

    let label = match &step.id {
        Some(id) => {
            if !seen.insert(id.clone()) {
                errors.push(format!("Step '{}': duplicate step id", id));
            }
            id.clone()
        }
        None => {
            errors.push(format!("Step #{}: missing required field 'id'", position));
            format!("#{}", position)
        }
    };

    match step.step_type.as_deref() {
        None => errors.push(format!("Step '{}': missing required field 'type'", label)),
        Some(step_type) if !STEP_TYPES.contains(&step_type) => errors.push(format!(
            "Step '{}': invalid type '{}' (expected one of: {})",
            label,
            step_type,
            STEP_TYPES.join(", ")
        )),
        Some(step_type) => {
            let needs_agent = matches!(step_type, "agent" | "parallel-agents");
            if needs_agent && step.agent.is_none() {
                errors.push(format!(
                    "Step '{}': {} steps require an 'agent' field",
                    label, step_type
                ));
            }
            if step_type == "parallel-agents" && step.foreach.is_none() {
                errors.push(format!(
                    "Step '{}': parallel-agents steps require a 'foreach' field",
                    label
                ));
            }
        }
    }

    if let Some(mode) = &step.context_mode
        && ContextMode::parse(mode).is_none()
    {
        errors.push(format!(
            "Step '{}': invalid context-mode '{}' (expected minimal, focused or full)",
            label, mode
        ));
    }

    if let Some(strategy) = &step.merge_strategy
        && MergeStrategy::parse(strategy).is_none()
    {
        errors.push(format!(
            "Step '{}': invalid merge-strategy '{}' (expected aggregate, sequential or summary)",
            label, strategy
        ));
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
