//! Tests for the workflow executor: run lifecycle, recovery, resume, step types.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use guideflow::definitions::DirectoryProvider;
use guideflow::engine::executor::{ExecutorOptions, RunOptions, WorkflowExecutor};
use guideflow::engine::types::*;
use guideflow::interaction::{Choice, Interaction};
use guideflow::storage::json_store::JsonStateBackend;
use guideflow::storage::memory_store::MemoryStateBackend;
use guideflow::storage::{ExecutionStateStore, StateBackend};
use serde_json::json;
use tempfile::TempDir;

// --- Scripted interaction ---

#[derive(Debug)]
enum Answer {
    Confirm(bool),
    Select(&'static str),
    Input(&'static str),
}

/// Replays queued answers and records everything shown.
struct Scripted {
    answers: Mutex<VecDeque<Answer>>,
    transcript: Mutex<Vec<String>>,
}

impl Scripted {
    fn new(answers: Vec<Answer>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into()),
            transcript: Mutex::new(Vec::new()),
        })
    }

    fn transcript(&self) -> String {
        self.transcript.lock().unwrap().join("\n")
    }

    /// The presented block starting with `prefix`.
    fn block(&self, prefix: &str) -> String {
        self.transcript
            .lock()
            .unwrap()
            .iter()
            .find(|entry| entry.starts_with(prefix))
            .cloned()
            .unwrap_or_else(|| panic!("nothing presented starting with '{}'", prefix))
    }

    fn remaining(&self) -> usize {
        self.answers.lock().unwrap().len()
    }

    fn record(&self, text: String) {
        self.transcript.lock().unwrap().push(text);
    }

    fn next(&self) -> Option<Answer> {
        self.answers.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl Interaction for Scripted {
    async fn present(&self, text: &str) {
        self.record(text.to_string());
    }

    async fn confirm(&self, message: &str, default: bool) -> bool {
        self.record(format!("? {}", message));
        match self.next() {
            Some(Answer::Confirm(answer)) => answer,
            None => default,
            Some(other) => panic!("expected confirm for '{}', got {:?}", message, other),
        }
    }

    async fn select(&self, message: &str, choices: &[Choice], default: usize) -> String {
        self.record(format!("? {}", message));
        match self.next() {
            Some(Answer::Select(value)) => {
                assert!(
                    choices.iter().any(|c| c.value == value),
                    "'{}' is not a choice for '{}'",
                    value,
                    message
                );
                value.to_string()
            }
            None => choices[default].value.clone(),
            Some(other) => panic!("expected select for '{}', got {:?}", message, other),
        }
    }

    async fn input(&self, message: &str) -> String {
        self.record(format!("? {}", message));
        match self.next() {
            Some(Answer::Input(value)) => value.to_string(),
            None => String::new(),
            Some(other) => panic!("expected input for '{}', got {:?}", message, other),
        }
    }
}

// --- Helpers ---

const THREE_MANUAL: &str = r#"
name: wf
version: "1.0.0"
steps:
  - id: s1
    type: manual
  - id: s2
    type: manual
  - id: s3
    type: manual
"#;

const FAILING: &str = r#"
name: wf
version: "1.0.0"
steps:
  - id: s1
    type: manual
  - id: fan
    type: parallel-agents
    agent: reviewer
    foreach: missing_list
  - id: s3
    type: manual
"#;

const SINGLE_AGENT: &str = r#"
name: wf
version: "1.0.0"
steps:
  - id: a
    type: agent
    agent: planner
"#;

fn project(workflow: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    let workflows = dir.path().join("workflows");
    std::fs::create_dir_all(&workflows).unwrap();
    std::fs::write(workflows.join("wf.workflow.yaml"), workflow).unwrap();
    dir
}

fn executor_with(
    dir: &Path,
    backend: Arc<dyn StateBackend>,
    interaction: Arc<dyn Interaction>,
    interactive: bool,
    integration: &str,
) -> WorkflowExecutor {
    WorkflowExecutor::new(
        Arc::new(DirectoryProvider::new(dir.join("workflows"))),
        backend,
        interaction,
        ExecutorOptions {
            integration: integration.to_string(),
            interactive,
            verbose: false,
            project_path: dir.to_path_buf(),
        },
    )
}

fn executor(dir: &TempDir, interaction: Arc<dyn Interaction>, interactive: bool) -> WorkflowExecutor {
    executor_with(
        dir.path(),
        Arc::new(JsonStateBackend::new(dir.path())),
        interaction,
        interactive,
        "claude-code",
    )
}

fn store(dir: &TempDir) -> ExecutionStateStore {
    ExecutionStateStore::new(
        "wf",
        dir.path().display().to_string(),
        Arc::new(JsonStateBackend::new(dir.path())),
    )
}

async fn saved_state(dir: &TempDir) -> ExecutionState {
    store(dir).load().await.expect("saved state")
}

fn run_options(pairs: &[(&str, serde_json::Value)]) -> RunOptions {
    RunOptions {
        initial_context: pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
        ..RunOptions::default()
    }
}

/// Run THREE_MANUAL interactively, pausing at s2.
async fn pause_at_s2(dir: &TempDir) {
    let script = Scripted::new(vec![
        Answer::Confirm(true),
        Answer::Confirm(false),
        Answer::Select("pause"),
    ]);
    let outcome = executor(dir, script.clone(), true)
        .execute("wf", RunOptions::default())
        .await;

    assert!(outcome.paused);
    assert_eq!(outcome.paused_at.as_deref(), Some("s2"));
    assert_eq!(script.remaining(), 0);
}

// --- Lookup and validation ---

#[tokio::test]
async fn unknown_workflow_fails_cleanly() {
    let dir = project(THREE_MANUAL);
    let outcome = executor(&dir, Scripted::new(vec![]), false)
        .execute("ghost", RunOptions::default())
        .await;

    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("not found"));
}

#[tokio::test]
async fn invalid_workflow_never_starts() {
    let dir = project("name: wf\nversion: '1'\nsteps:\n  - id: x\n    type: agent\n");
    let outcome = executor(&dir, Scripted::new(vec![]), false)
        .execute("wf", RunOptions::default())
        .await;

    assert!(!outcome.success);
    assert!(!outcome.validation_errors.is_empty());
    assert!(outcome.validation_errors[0].contains("'x'"));
    assert!(!store(&dir).exists().await);
}

// --- Dry run ---

#[tokio::test]
async fn dry_run_leaves_no_trace() {
    let dir = project(FAILING);
    let outcome = executor(&dir, Scripted::new(vec![]), false)
        .execute(
            "wf",
            RunOptions {
                dry_run: true,
                ..RunOptions::default()
            },
        )
        .await;

    assert!(outcome.success);
    assert!(outcome.dry_run);
    let ids: Vec<&str> = outcome.steps.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["s1", "fan", "s3"]);
    assert_eq!(outcome.steps[1].step_type, "parallel-agents");
    assert_eq!(outcome.steps[1].agent.as_deref(), Some("reviewer"));
    assert!(!store(&dir).exists().await);
}

#[tokio::test]
async fn dry_run_keeps_saved_progress() {
    let dir = project(THREE_MANUAL);
    pause_at_s2(&dir).await;
    let before = saved_state(&dir).await;

    let outcome = executor(&dir, Scripted::new(vec![]), true)
        .execute(
            "wf",
            RunOptions {
                dry_run: true,
                restart: true,
                ..RunOptions::default()
            },
        )
        .await;

    assert!(outcome.dry_run);
    assert_eq!(saved_state(&dir).await, before);
}

// --- Completion ---

#[tokio::test]
async fn completed_run_clears_state() {
    let dir = project(THREE_MANUAL);
    let script = Scripted::new(vec![]);
    let outcome = executor(&dir, script.clone(), false)
        .execute("wf", RunOptions::default())
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.status, Some(WorkflowStatus::Completed));
    let summary = outcome.summary.unwrap();
    assert_eq!(summary.progress.completed, 3);
    assert_eq!(summary.progress.percentage, 100);
    assert_eq!(outcome.persistence_failures, 0);
    assert!(!store(&dir).exists().await);
    assert!(!script.transcript().contains("? "));
}

#[tokio::test]
async fn save_failures_do_not_stop_the_run() {
    let dir = project(THREE_MANUAL);
    let backend = Arc::new(MemoryStateBackend::new());
    backend.set_read_only(true);

    let outcome = executor_with(dir.path(), backend, Scripted::new(vec![]), false, "claude-code")
        .execute("wf", RunOptions::default())
        .await;

    assert!(outcome.success);
    assert!(outcome.persistence_failures > 0);
}

// --- Failure and recovery ---

#[tokio::test]
async fn non_interactive_failure_aborts() {
    let dir = project(FAILING);
    let outcome = executor(&dir, Scripted::new(vec![]), false)
        .execute("wf", RunOptions::default())
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.failed_step.as_deref(), Some("fan"));
    assert_eq!(outcome.status, Some(WorkflowStatus::Failed));
    assert!(outcome.error.unwrap().contains("missing_list"));

    let state = saved_state(&dir).await;
    assert_eq!(state.status, WorkflowStatus::Failed);
    assert_eq!(state.steps["s1"].status, StepStatus::Completed);
    assert_eq!(state.steps["fan"].status, StepStatus::Failed);
    assert!(state.steps["fan"].error.is_some());
    assert_eq!(state.steps["s3"].status, StepStatus::Pending);
}

#[tokio::test]
async fn retry_runs_step_exactly_once_more() {
    let dir = project(SINGLE_AGENT);
    let script = Scripted::new(vec![
        Answer::Confirm(false),
        Answer::Select("retry"),
        Answer::Confirm(false),
    ]);

    let outcome = executor(&dir, script.clone(), true)
        .execute("wf", RunOptions::default())
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.failed_step.as_deref(), Some("a"));
    assert_eq!(script.transcript().matches("## a (a)").count(), 2);
    assert_eq!(script.transcript().matches("? How would you like to proceed?").count(), 1);
    assert_eq!(saved_state(&dir).await.steps["a"].status, StepStatus::Failed);
}

#[tokio::test]
async fn retry_can_recover() {
    let dir = project(SINGLE_AGENT);
    let script = Scripted::new(vec![
        Answer::Confirm(false),
        Answer::Select("retry"),
        Answer::Confirm(true),
    ]);

    let outcome = executor(&dir, script.clone(), true)
        .execute("wf", RunOptions::default())
        .await;

    assert!(outcome.success);
    assert_eq!(script.remaining(), 0);
}

#[tokio::test]
async fn recovery_skip_continues() {
    let dir = project(FAILING);
    let script = Scripted::new(vec![
        Answer::Confirm(true),
        Answer::Select("skip"),
        Answer::Confirm(true),
    ]);

    let outcome = executor(&dir, script.clone(), true)
        .execute("wf", RunOptions::default())
        .await;

    assert!(outcome.success);
    let progress = outcome.summary.unwrap().progress;
    assert_eq!(progress.completed, 2);
    assert_eq!(progress.skipped, 1);
    assert_eq!(progress.percentage, 100);
}

#[tokio::test]
async fn recovery_pause_keeps_resumable_state() {
    let dir = project(SINGLE_AGENT);
    let script = Scripted::new(vec![Answer::Confirm(false), Answer::Select("pause")]);

    let outcome = executor(&dir, script, true)
        .execute("wf", RunOptions::default())
        .await;

    assert!(!outcome.success);
    assert!(outcome.paused);
    assert_eq!(outcome.paused_at.as_deref(), Some("a"));
    assert_eq!(outcome.status, Some(WorkflowStatus::Paused));

    let mut store = store(&dir);
    assert!(store.can_resume().await);
    assert_eq!(store.get_resume_point().as_deref(), Some("a"));
}

// --- Resume ---

#[tokio::test]
async fn resume_does_not_redo_completed_steps() {
    let dir = project(THREE_MANUAL);
    pause_at_s2(&dir).await;

    let script = Scripted::new(vec![Answer::Confirm(true), Answer::Confirm(true)]);
    let outcome = executor(&dir, script.clone(), true).resume("wf").await;

    assert!(outcome.success, "{:?}", outcome.error);
    let transcript = script.transcript();
    assert!(!transcript.contains("## s1 (s1)"));
    assert!(transcript.contains("## s2 (s2)"));
    assert!(transcript.contains("## s3 (s3)"));
    assert!(!store(&dir).exists().await);
}

#[tokio::test]
async fn resume_without_state_fails() {
    let dir = project(THREE_MANUAL);
    let outcome = executor(&dir, Scripted::new(vec![]), true).resume("wf").await;

    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("No saved state"));
}

#[tokio::test]
async fn resume_of_failed_run_is_rejected() {
    let dir = project(FAILING);
    executor(&dir, Scripted::new(vec![]), false)
        .execute("wf", RunOptions::default())
        .await;

    let outcome = executor(&dir, Scripted::new(vec![]), true).resume("wf").await;
    assert!(!outcome.success);
    assert_eq!(outcome.status, Some(WorkflowStatus::Failed));
    assert!(outcome.error.unwrap().contains("failed"));
}

#[tokio::test]
async fn execute_offers_resume_of_saved_progress() {
    let dir = project(THREE_MANUAL);
    pause_at_s2(&dir).await;

    let script = Scripted::new(vec![
        Answer::Select("resume"),
        Answer::Confirm(true),
        Answer::Confirm(true),
    ]);
    let outcome = executor(&dir, script.clone(), true)
        .execute("wf", RunOptions::default())
        .await;

    assert!(outcome.success);
    assert!(!script.transcript().contains("## s1 (s1)"));
    assert_eq!(script.remaining(), 0);
}

#[tokio::test]
async fn execute_can_start_over() {
    let dir = project(THREE_MANUAL);
    pause_at_s2(&dir).await;

    let script = Scripted::new(vec![
        Answer::Select("restart"),
        Answer::Confirm(true),
        Answer::Confirm(true),
        Answer::Confirm(true),
    ]);
    let outcome = executor(&dir, script.clone(), true)
        .execute("wf", RunOptions::default())
        .await;

    assert!(outcome.success);
    assert!(script.transcript().contains("## s1 (s1)"));
}

#[tokio::test]
async fn non_interactive_execute_resumes_by_default() {
    let dir = project(THREE_MANUAL);
    pause_at_s2(&dir).await;

    let script = Scripted::new(vec![]);
    let outcome = executor(&dir, script.clone(), false)
        .execute("wf", RunOptions::default())
        .await;

    assert!(outcome.success);
    let transcript = script.transcript();
    assert!(transcript.contains("Found saved progress"));
    assert!(!transcript.contains("## s1 (s1)"));
}

#[tokio::test]
async fn restart_flag_skips_the_question() {
    let dir = project(THREE_MANUAL);
    pause_at_s2(&dir).await;

    let script = Scripted::new(vec![]);
    let outcome = executor(&dir, script.clone(), false)
        .execute(
            "wf",
            RunOptions {
                restart: true,
                ..RunOptions::default()
            },
        )
        .await;

    assert!(outcome.success);
    let transcript = script.transcript();
    assert!(!transcript.contains("Found saved progress"));
    assert!(transcript.contains("## s1 (s1)"));
}

#[tokio::test]
async fn terminal_state_is_started_over() {
    let dir = project(FAILING);
    executor(&dir, Scripted::new(vec![]), false)
        .execute("wf", RunOptions::default())
        .await;

    let script = Scripted::new(vec![]);
    let outcome = executor(&dir, script.clone(), false)
        .execute("wf", RunOptions::default())
        .await;

    assert_eq!(outcome.failed_step.as_deref(), Some("fan"));
    let transcript = script.transcript();
    assert!(!transcript.contains("Found saved progress"));
    assert!(transcript.contains("## s1 (s1)"));
}

// --- Step types ---

#[tokio::test]
async fn manual_skip_marks_step_skipped() {
    let dir = project(THREE_MANUAL);
    let script = Scripted::new(vec![
        Answer::Confirm(true),
        Answer::Confirm(false),
        Answer::Select("skip"),
        Answer::Confirm(true),
    ]);

    let outcome = executor(&dir, script, true)
        .execute("wf", RunOptions::default())
        .await;

    assert!(outcome.success);
    let progress = outcome.summary.unwrap().progress;
    assert_eq!(progress.skipped, 1);
    assert_eq!(progress.completed, 2);
}

#[tokio::test]
async fn manual_complete_anyway() {
    let dir = project(SINGLE_AGENT.replace("type: agent", "type: manual").as_str());
    let script = Scripted::new(vec![Answer::Confirm(false), Answer::Select("complete")]);

    let outcome = executor(&dir, script, true)
        .execute("wf", RunOptions::default())
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.summary.unwrap().progress.completed, 1);
}

#[tokio::test]
async fn agent_outputs_flow_into_context() {
    let dir = project(
        r#"
name: wf
version: "1.0.0"
steps:
  - id: plan
    type: agent
    agent: planner
    description: Plan ${ticket}
    outputs: [plan_doc, risks]
  - id: gate
    type: conditional
    condition: plan_doc exists
    then_branch: build
    else_branch: rethink
  - id: checkpoint
    type: manual
"#,
    );
    let script = Scripted::new(vec![
        Answer::Confirm(true),
        Answer::Confirm(true),
        Answer::Input("docs/plan.md"),
        Answer::Input(""),
        Answer::Confirm(false),
        Answer::Select("pause"),
    ]);

    let outcome = executor_with(
        dir.path(),
        Arc::new(JsonStateBackend::new(dir.path())),
        script.clone(),
        true,
        "cursor",
    )
    .execute("wf", run_options(&[("ticket", json!("ABC-1"))]))
    .await;

    assert_eq!(outcome.paused_at.as_deref(), Some("checkpoint"));

    let transcript = script.transcript();
    assert!(transcript.contains("Plan ABC-1"));
    assert!(transcript.contains("<!-- guideflow agent: planner -->"));
    assert!(transcript.contains("Enter value for \"plan_doc\""));

    let state = saved_state(&dir).await;
    assert_eq!(state.context["ticket"], json!("ABC-1"));
    assert_eq!(state.context["plan_doc"], json!("docs/plan.md"));
    assert!(!state.context.contains_key("risks"));
    assert_eq!(state.context["next_branch"], json!("then"));
    assert_eq!(state.metadata["integration"], json!("cursor"));
}

#[tokio::test]
async fn non_interactive_agent_succeeds_with_task_payload() {
    let dir = project(SINGLE_AGENT);
    let script = Scripted::new(vec![]);

    let outcome = executor(&dir, script.clone(), false)
        .execute("wf", RunOptions::default())
        .await;

    assert!(outcome.success);
    let transcript = script.transcript();
    assert!(transcript.contains("subagent_type: \"planner\""));
    assert!(transcript.contains("model: \"sonnet\""));
}

#[tokio::test]
async fn conditional_else_branch_is_recorded() {
    let dir = project(
        r#"
name: wf
version: "1.0.0"
steps:
  - id: gate
    type: conditional
    condition: approved == true
    then_branch: ship
    else_branch: rework
  - id: checkpoint
    type: manual
"#,
    );
    let script = Scripted::new(vec![Answer::Confirm(false), Answer::Select("pause")]);

    executor(&dir, script.clone(), true)
        .execute("wf", run_options(&[("approved", json!(false))]))
        .await;

    assert!(script.transcript().contains("Condition not met: approved == true"));
    let state = saved_state(&dir).await;
    assert_eq!(state.context["next_branch"], json!("else"));
    assert_eq!(state.steps["checkpoint"].status, StepStatus::InProgress);
}

#[tokio::test]
async fn conditional_decision_is_recorded() {
    let dir = project(
        r#"
name: wf
version: "1.0.0"
steps:
  - id: choose
    type: conditional
    decisions:
      ship:
        condition: all green
      hold: {}
  - id: checkpoint
    type: manual
"#,
    );
    let script = Scripted::new(vec![
        Answer::Select("hold"),
        Answer::Confirm(false),
        Answer::Select("pause"),
    ]);

    executor(&dir, script, true)
        .execute("wf", RunOptions::default())
        .await;

    let state = saved_state(&dir).await;
    assert_eq!(state.context["decision"], json!("hold"));
    assert_eq!(state.steps["choose"].status, StepStatus::Completed);
}

#[tokio::test]
async fn parallel_agents_aggregate_outputs() {
    let dir = project(
        r#"
name: wf
version: "1.0.0"
steps:
  - id: fan
    type: parallel-agents
    agent: reviewer
    foreach: files
    outputs: [finding]
  - id: checkpoint
    type: manual
"#,
    );
    let script = Scripted::new(vec![
        Answer::Confirm(true),
        Answer::Confirm(true),
        Answer::Input("f1"),
        Answer::Confirm(true),
        Answer::Confirm(true),
        Answer::Input("f2"),
        Answer::Confirm(false),
        Answer::Select("pause"),
    ]);

    executor(&dir, script.clone(), true)
        .execute("wf", run_options(&[("files", json!(["a.rs", "b.rs"]))]))
        .await;

    assert!(script.transcript().contains("### Item 1/2: a.rs"));
    assert!(script.transcript().contains("### Item 2/2: b.rs"));

    let state = saved_state(&dir).await;
    assert_eq!(state.context["finding"], json!(["f1", "f2"]));
    assert_eq!(state.context["fan_items"], json!(2));
}

#[tokio::test]
async fn parallel_agents_sequential_carries_outputs() {
    let dir = project(
        r#"
name: wf
version: "1.0.0"
steps:
  - id: fan
    type: parallel-agents
    agent: reviewer
    foreach: files
    merge-strategy: sequential
    outputs: [finding]
  - id: checkpoint
    type: manual
"#,
    );
    let script = Scripted::new(vec![
        Answer::Confirm(true),
        Answer::Confirm(true),
        Answer::Input("f1"),
        Answer::Confirm(true),
        Answer::Confirm(true),
        Answer::Input("f2"),
        Answer::Confirm(false),
        Answer::Select("pause"),
    ]);

    executor(&dir, script.clone(), true)
        .execute("wf", run_options(&[("files", json!(["a.rs", "b.rs"]))]))
        .await;

    assert!(!script.block("### Item 1/2").contains("- finding:"));
    assert!(script.block("### Item 2/2").contains("- finding: f1"));

    let state = saved_state(&dir).await;
    assert_eq!(state.context["finding"], json!("f2"));
    assert!(!state.context.contains_key("fan_items"));
}

#[tokio::test]
async fn parallel_agents_description_shown_once_per_item() {
    let dir = project(
        r#"
name: wf
version: "1.0.0"
steps:
  - id: fan
    type: parallel-agents
    agent: reviewer
    description: Review ${item}
    foreach: files
"#,
    );
    let script = Scripted::new(vec![]);

    let outcome = executor(&dir, script.clone(), false)
        .execute("wf", run_options(&[("files", json!(["a.rs"]))]))
        .await;

    assert!(outcome.success);
    assert_eq!(script.block("### Item 1/1").matches("Review a.rs").count(), 1);
}

#[tokio::test]
async fn parallel_agents_summary_non_interactive() {
    let dir = project(
        r#"
name: wf
version: "1.0.0"
steps:
  - id: fan
    type: parallel-agents
    agent: reviewer
    foreach: "${modules}"
    merge-strategy: summary
"#,
    );
    let script = Scripted::new(vec![]);

    let outcome = executor(&dir, script.clone(), false)
        .execute("wf", run_options(&[("modules", json!("core, cli"))]))
        .await;

    assert!(outcome.success);
    assert_eq!(script.transcript().matches("### Item").count(), 2);
}

#[tokio::test]
async fn parallel_item_not_completed_fails_step() {
    let dir = project(
        r#"
name: wf
version: "1.0.0"
steps:
  - id: fan
    type: parallel-agents
    agent: reviewer
    foreach: files
"#,
    );
    let script = Scripted::new(vec![
        Answer::Confirm(true),
        Answer::Confirm(false),
        Answer::Select("abort"),
    ]);

    let outcome = executor(&dir, script, true)
        .execute("wf", run_options(&[("files", json!(["a", "b", "c"]))]))
        .await;

    assert_eq!(outcome.failed_step.as_deref(), Some("fan"));
    assert!(outcome.error.unwrap().contains("item 2 of 3"));
}
