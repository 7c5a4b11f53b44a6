//! Tests for the invocation adapter, capability table and agent catalog.

use std::collections::HashMap;
use std::sync::Arc;

use guideflow::adapter::capabilities::{BuiltinCapabilities, CapabilitySource, IntegrationCapabilities};
use guideflow::adapter::profile::{AgentCatalog, AgentProfile, AgentSource};
use guideflow::adapter::{AgentInvocation, InvocationAdapter, InvocationMode, truncate_description};
use tempfile::TempDir;

fn adapter() -> InvocationAdapter {
    InvocationAdapter::new(Arc::new(BuiltinCapabilities::new()))
}

fn reviewer() -> AgentProfile {
    AgentProfile {
        name: "code-reviewer".to_string(),
        description: Some(
            "|\n  Reviews pull requests for correctness, style and security problems across the codebase"
                .to_string(),
        ),
        role: Some("reviewer".to_string()),
        model: Some("opus".to_string()),
        allowed_tools: vec!["Read".to_string(), "Grep".to_string()],
        disallowed_tools: vec!["Bash".to_string()],
        skills: vec!["testing-guide".to_string()],
        expertise: vec!["security".to_string(), "rust".to_string()],
        ..AgentProfile::default()
    }
}

// --- Mode selection ---

#[test]
fn mode_follows_capabilities() {
    let adapter = adapter();
    assert_eq!(adapter.mode_for("claude-code"), InvocationMode::Task);
    assert_eq!(adapter.mode_for("opencode"), InvocationMode::Task);
    assert_eq!(adapter.mode_for("cursor"), InvocationMode::Inline);
    assert_eq!(adapter.mode_for("antigravity"), InvocationMode::Manual);
}

#[test]
fn unknown_integration_is_manual() {
    let adapter = adapter();
    assert_eq!(adapter.mode_for("notepad"), InvocationMode::Manual);
    assert_eq!(adapter.display_name("notepad"), "notepad");
    assert_eq!(adapter.display_name("claude-code"), "Claude Code");
}

#[test]
fn overrides_change_modes() {
    let mut overrides = HashMap::new();
    overrides.insert(
        "cursor".to_string(),
        IntegrationCapabilities::new("Cursor Agents", true, true),
    );
    overrides.insert(
        "house-tool".to_string(),
        IntegrationCapabilities::new("House Tool", false, true),
    );
    let caps = BuiltinCapabilities::new().with_overrides(overrides);
    assert!(caps.integrations().contains(&"house-tool".to_string()));

    let adapter = InvocationAdapter::new(Arc::new(caps));
    assert_eq!(adapter.mode_for("cursor"), InvocationMode::Task);
    assert_eq!(adapter.mode_for("house-tool"), InvocationMode::Inline);
}

#[test]
fn integrations_listing_is_sorted() {
    let list = adapter().integrations();
    assert_eq!(list.len(), 10);
    let ids: Vec<&str> = list.iter().map(|i| i.id.as_str()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
    let claude = list.iter().find(|i| i.id == "claude-code").unwrap();
    assert_eq!(claude.mode, InvocationMode::Task);
}

// --- Payloads ---

#[test]
fn task_descriptor_carries_agent_settings() {
    match adapter().adapt(&reviewer(), "claude-code") {
        AgentInvocation::Task(task) => {
            assert_eq!(task.subagent_type, "code-reviewer");
            assert_eq!(task.model, "opus");
            assert_eq!(task.allowed_tools, vec!["Read", "Grep"]);
            assert_eq!(task.disallowed_tools, vec!["Bash"]);
            assert_eq!(task.skill_dependencies, vec!["testing-guide"]);
            assert_eq!(task.description.chars().count(), 50);
            assert!(task.description.starts_with("Reviews pull requests"));
            assert!(task.description.ends_with("..."));
        }
        other => panic!("expected task invocation, got {:?}", other),
    }
}

#[test]
fn task_descriptor_defaults() {
    match adapter().adapt(&AgentProfile::named("helper"), "claude-code") {
        AgentInvocation::Task(task) => {
            assert_eq!(task.model, "sonnet");
            assert_eq!(task.description, "Workflow agent");
            assert!(task.allowed_tools.is_empty());
        }
        other => panic!("expected task invocation, got {:?}", other),
    }
}

#[test]
fn inline_block_has_marker_and_sections() {
    let invocation = adapter().adapt(&reviewer(), "cursor");
    assert_eq!(invocation.mode(), InvocationMode::Inline);

    let text = invocation.render();
    assert!(text.starts_with("<!-- guideflow agent: code-reviewer -->"));
    assert!(text.contains("<!-- Role: reviewer -->"));
    assert!(text.contains("## Agent Expertise: security, rust"));
    assert!(text.contains("## Agent Purpose\nReviews pull requests"));
    assert!(text.contains("## Allowed Operations: Read, Grep"));
    assert!(text.contains("## Restricted Operations: Bash"));
}

#[test]
fn manual_instructions_describe_agent() {
    let mut profile = reviewer();
    profile.triggers.keywords = vec!["review".to_string(), "pr".to_string()];

    let text = adapter().adapt(&profile, "antigravity").render();
    assert!(text.starts_with("# code-reviewer Agent Instructions"));
    assert!(text.contains("- **Role**: reviewer"));
    assert!(text.contains("- **Expertise**: security, rust"));
    assert!(text.contains("Use this agent when: review, pr"));
}

// --- Compatibility ---

#[test]
fn compatibility_warnings_for_non_task_modes() {
    let adapter = adapter();

    let report = adapter.check_compatibility(&reviewer(), "cursor");
    assert!(report.compatible);
    assert_eq!(report.mode, InvocationMode::Inline);
    assert_eq!(
        report.warnings,
        vec![
            "Tool permissions will be ignored (inline/manual mode)",
            "Model preference will be ignored (inline/manual mode)",
            "Skill dependencies require manual loading (inline/manual mode)",
        ]
    );
    assert!(!report.features.task_execution);

    let report = adapter.check_compatibility(&reviewer(), "claude-code");
    assert!(report.warnings.is_empty());
    assert!(report.features.tool_permissions);
}

#[test]
fn no_warnings_for_plain_agent() {
    let report = adapter().check_compatibility(&AgentProfile::named("helper"), "antigravity");
    assert_eq!(report.mode, InvocationMode::Manual);
    assert!(report.warnings.is_empty());
}

// --- Description truncation ---

#[test]
fn truncation_boundary() {
    let exact = "x".repeat(50);
    assert_eq!(truncate_description(Some(&exact)), exact);

    let over = "y".repeat(51);
    assert_eq!(truncate_description(Some(&over)), format!("{}...", "y".repeat(47)));

    assert_eq!(truncate_description(Some("   ")), "Workflow agent");
}

// --- Agent catalog ---

#[test]
fn catalog_reads_both_layouts() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("planner.md"),
        "---\nname: planner\ndescription: Plans work\nmodel: haiku\n---\n# Planner\n",
    )
    .unwrap();
    std::fs::create_dir_all(dir.path().join("tester")).unwrap();
    std::fs::write(
        dir.path().join("tester/AGENT.md"),
        "---\ndescription: Writes tests\nallowed-tools: \"[Read, Write]\"\n---\nbody\n",
    )
    .unwrap();

    let catalog = AgentCatalog::new(dir.path());

    let planner = catalog.profile("planner").unwrap();
    assert_eq!(planner.model.as_deref(), Some("haiku"));

    let tester = catalog.profile("tester").unwrap();
    assert_eq!(tester.name, "tester");
    assert_eq!(tester.allowed_tools, vec!["Read", "Write"]);

    assert!(catalog.profile("ghost").is_none());
}
