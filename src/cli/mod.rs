pub mod config;

pub use config::GuideflowConfig;

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};

use crate::adapter::InvocationAdapter;
use crate::adapter::capabilities::{BuiltinCapabilities, IntegrationCapabilities};
use crate::adapter::profile::{AgentCatalog, AgentProfile, AgentSource};
use crate::definitions::{DefinitionProvider, DirectoryProvider, RawWorkflow};
use crate::engine::executor::{DEFAULT_INTEGRATION, ExecutorOptions, RunOptions, WorkflowExecutor};
use crate::engine::outcome::ExecutionOutcome;
use crate::engine::types::Context;
use crate::engine::validate::validate;
use crate::interaction::{Interaction, NonInteractive, OutputStream, TerminalInteraction};
use crate::storage::json_store::JsonStateBackend;

#[derive(Parser)]
#[command(name = "guideflow", version, about = "Guided, resumable AI workflow runner")]
pub struct Cli {
    /// Path to a guideflow.yaml config file (default: auto-detect in cwd)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to a .env file to load (default: auto-detect .env in cwd)
    #[arg(long, global = true)]
    pub dotenv: Option<PathBuf>,

    /// Directory of <name>.workflow.yaml files
    #[arg(long, global = true, env = "GUIDEFLOW_WORKFLOWS_DIR")]
    workflows_dir: Option<PathBuf>,

    /// Directory of agent definitions
    #[arg(long, global = true, env = "GUIDEFLOW_AGENTS_DIR")]
    agents_dir: Option<PathBuf>,

    /// Project root; saved progress lives under <project>/.guideflow/state
    #[arg(long, global = true, env = "GUIDEFLOW_PROJECT_DIR")]
    project_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    /// Where guided step text goes so the final result stays parseable.
    pub fn guided_output(self) -> OutputStream {
        match self {
            OutputFormat::Text => OutputStream::Stdout,
            OutputFormat::Json => OutputStream::Stderr,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a workflow, resuming saved progress if there is any
    Run {
        /// Workflow name
        workflow: String,

        /// Initial context as JSON object
        #[arg(short, long)]
        context: Option<String>,

        /// Target integration (e.g. claude-code, cursor)
        #[arg(short, long, env = "GUIDEFLOW_INTEGRATION")]
        integration: Option<String>,

        /// Discard saved progress and start over
        #[arg(long)]
        restart: bool,

        /// Show the step plan without running anything
        #[arg(long)]
        dry_run: bool,

        /// Never prompt; take the default answer everywhere
        #[arg(short, long)]
        yes: bool,

        /// Output format for the final result
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Continue a paused or interrupted run
    Resume {
        /// Workflow name
        workflow: String,

        /// Target integration (e.g. claude-code, cursor)
        #[arg(short, long, env = "GUIDEFLOW_INTEGRATION")]
        integration: Option<String>,

        /// Never prompt; take the default answer everywhere
        #[arg(short, long)]
        yes: bool,

        /// Output format for the final result
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show saved progress for a workflow
    Status {
        /// Workflow name
        workflow: String,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete saved progress for a workflow
    Reset {
        /// Workflow name
        workflow: String,
    },

    /// Validate a workflow by name or file path
    Validate {
        /// Workflow name or path to a .workflow.yaml file
        target: String,
    },

    /// List available workflows
    List,

    /// Show the steps of a workflow
    Info {
        /// Workflow name
        workflow: String,
    },

    /// List known integrations and how agents run on each
    Integrations,

    /// Check how an agent definition maps onto an integration
    CheckAgent {
        /// Agent name
        agent: String,

        /// Target integration (e.g. claude-code, cursor)
        #[arg(short, long, env = "GUIDEFLOW_INTEGRATION")]
        integration: Option<String>,
    },
}

/// Settings after layering CLI flags, environment and config file.
struct Settings {
    workflows_dir: PathBuf,
    agents_dir: Option<PathBuf>,
    project_dir: PathBuf,
    integration: String,
    interactive: bool,
    verbose: bool,
    integrations: HashMap<String, IntegrationCapabilities>,
}

impl Settings {
    fn resolve(cli: &Cli) -> Result<Self> {
        let config = GuideflowConfig::load(cli.config.as_deref())?;

        let project_dir = match cli.project_dir.clone().or(config.project_dir.map(PathBuf::from)) {
            Some(dir) => dir,
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };

        Ok(Self {
            workflows_dir: cli
                .workflows_dir
                .clone()
                .or(config.workflows_dir.map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("workflows")),
            agents_dir: cli.agents_dir.clone().or(config.agents_dir.map(PathBuf::from)),
            project_dir,
            integration: config
                .integration
                .unwrap_or_else(|| DEFAULT_INTEGRATION.to_string()),
            interactive: config.interactive.unwrap_or(true),
            verbose: cli.verbose,
            integrations: config.integrations.unwrap_or_default(),
        })
    }

    fn adapter(&self) -> InvocationAdapter {
        let capabilities = BuiltinCapabilities::new().with_overrides(self.integrations.clone());
        InvocationAdapter::new(Arc::new(capabilities))
    }

    fn agents(&self) -> Option<Arc<dyn AgentSource>> {
        self.agents_dir
            .as_ref()
            .map(|dir| Arc::new(AgentCatalog::new(dir)) as Arc<dyn AgentSource>)
    }

    fn executor(
        &self,
        integration: Option<String>,
        yes: bool,
        format: OutputFormat,
    ) -> WorkflowExecutor {
        let interactive = self.interactive && !yes;
        let output = format.guided_output();
        let interaction: Arc<dyn Interaction> = if interactive {
            Arc::new(TerminalInteraction::new().with_output(output))
        } else {
            Arc::new(NonInteractive::new(output))
        };

        let options = ExecutorOptions {
            integration: integration.unwrap_or_else(|| self.integration.clone()),
            interactive,
            verbose: self.verbose,
            project_path: self.project_dir.clone(),
        };

        let executor = WorkflowExecutor::new(
            Arc::new(DirectoryProvider::new(&self.workflows_dir)),
            Arc::new(JsonStateBackend::new(&self.project_dir)),
            interaction,
            options,
        )
        .with_adapter(self.adapter());

        match self.agents() {
            Some(agents) => executor.with_agents(agents),
            None => executor,
        }
    }
}

/// Run a parsed command. `.env` must already be loaded (see [`load_dotenv`]).
pub async fn run_cli(cli: Cli) -> Result<()> {
    let settings = Settings::resolve(&cli)?;

    match cli.command {
        Commands::Run {
            workflow,
            context,
            integration,
            restart,
            dry_run,
            yes,
            format,
        } => {
            let initial_context = parse_context(context.as_deref())?;
            let executor = settings.executor(integration, yes, format);
            let outcome = executor
                .execute(
                    &workflow,
                    RunOptions {
                        initial_context,
                        restart,
                        dry_run,
                    },
                )
                .await;
            report_outcome(&outcome, format)
        }
        Commands::Resume {
            workflow,
            integration,
            yes,
            format,
        } => {
            let executor = settings.executor(integration, yes, format);
            let outcome = executor.resume(&workflow).await;
            report_outcome(&outcome, format)
        }
        Commands::Status { workflow, format } => cmd_status(&settings, &workflow, format).await,
        Commands::Reset { workflow } => cmd_reset(&settings, &workflow).await,
        Commands::Validate { target } => cmd_validate(&settings, &target),
        Commands::List => cmd_list(&settings),
        Commands::Info { workflow } => cmd_info(&settings, &workflow),
        Commands::Integrations => cmd_integrations(&settings),
        Commands::CheckAgent { agent, integration } => {
            cmd_check_agent(&settings, &agent, integration)
        }
    }
}

/// The `--dotenv` value from raw arguments. Read ahead of clap parsing so that
/// `.env` values can back the `env = ...` fallbacks of the CLI flags.
pub fn dotenv_arg<I, S>(args: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut args = args.into_iter().map(Into::into);
    while let Some(arg) = args.next() {
        if arg == "--" {
            break;
        }
        if arg == "--dotenv" {
            return args.next().map(PathBuf::from);
        }
        if let Some(value) = arg.to_str().and_then(|a| a.strip_prefix("--dotenv=")) {
            return Some(PathBuf::from(value));
        }
    }
    None
}

/// Load environment variables from a .env file and return the file loaded.
/// If an explicit path is given, load from that path (warn if missing).
/// Otherwise, auto-detect .env in the current working directory (silently skip if absent).
/// Variables already set in the process environment are kept.
pub fn load_dotenv(explicit_path: Option<&Path>) -> Option<PathBuf> {
    match explicit_path {
        Some(path) => match dotenvy::from_path(path) {
            Ok(()) => Some(path.to_path_buf()),
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load dotenv file '{}': {}",
                    path.display(),
                    e
                );
                None
            }
        },
        None => match dotenvy::dotenv() {
            Ok(path) => Some(path),
            Err(dotenvy::Error::Io(_)) => None,
            Err(e) => {
                eprintln!("Warning: Failed to parse .env file: {}", e);
                None
            }
        },
    }
}

fn parse_context(json: Option<&str>) -> Result<Context> {
    match json {
        Some(json) => serde_json::from_str(json).context("Failed to parse --context JSON"),
        None => Ok(Context::new()),
    }
}

fn report_outcome(outcome: &ExecutionOutcome, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(outcome)?),
        OutputFormat::Text => print_outcome(outcome),
    }

    if outcome.success || outcome.paused {
        Ok(())
    } else {
        bail!(
            "{}",
            outcome
                .error
                .clone()
                .unwrap_or_else(|| "Workflow failed".to_string())
        )
    }
}

fn print_outcome(outcome: &ExecutionOutcome) {
    if outcome.dry_run {
        println!("Dry run: {} ({} steps)\n", outcome.workflow_name, outcome.steps.len());
        for (i, step) in outcome.steps.iter().enumerate() {
            let agent = step.agent.as_deref().unwrap_or("-");
            println!("  {}. {} [{}] agent: {}", i + 1, step.id, step.step_type, agent);
            println!("     {}", step.name);
            if !step.inputs.is_empty() {
                println!("     inputs: {}", step.inputs.join(", "));
            }
            if !step.outputs.is_empty() {
                println!("     outputs: {}", step.outputs.join(", "));
            }
        }
        return;
    }

    for error in &outcome.validation_errors {
        println!("  - {}", error);
    }

    if let Some(summary) = &outcome.summary {
        let p = &summary.progress;
        println!(
            "\nStatus: {} ({}%, {} completed, {} skipped, {} failed of {})",
            summary.status, p.percentage, p.completed, p.skipped, p.failed, p.total
        );
    }

    if let Some(step) = &outcome.paused_at {
        println!("Paused at: {}", step);
    }
    if let Some(step) = &outcome.failed_step {
        println!("Failed step: {}", step);
    }
    if outcome.persistence_failures > 0 {
        println!(
            "Warning: {} state save(s) failed; progress may not be resumable",
            outcome.persistence_failures
        );
    }
}

async fn cmd_status(settings: &Settings, workflow: &str, format: OutputFormat) -> Result<()> {
    let executor = settings.executor(None, true, OutputFormat::Text);
    let mut store = executor.state_store(workflow);

    if store.load().await.is_none() {
        println!("No saved state for '{}'.", workflow);
        return Ok(());
    }

    let summary = store
        .get_summary()
        .ok_or_else(|| anyhow!("No saved state for '{}'", workflow))?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let p = &summary.progress;
    println!("Workflow: {}", summary.workflow_name);
    println!("Status:   {}", summary.status);
    println!(
        "Progress: {}% ({} completed, {} skipped, {} failed, {} pending of {})",
        p.percentage, p.completed, p.skipped, p.failed, p.pending, p.total
    );
    if let Some(step) = &summary.current_step_id {
        println!("Current:  {}", step);
    }
    if let Some(started) = summary.started_at {
        println!("Started:  {}", started.format("%Y-%m-%d %H:%M:%S"));
    }
    if store.can_resume().await {
        println!("\nResume with: guideflow resume {}", workflow);
    }
    Ok(())
}

async fn cmd_reset(settings: &Settings, workflow: &str) -> Result<()> {
    let executor = settings.executor(None, true, OutputFormat::Text);
    let mut store = executor.state_store(workflow);

    if !store.exists().await {
        println!("No saved state for '{}'.", workflow);
        return Ok(());
    }

    if !store.clear().await {
        bail!("Failed to clear saved state for '{}'", workflow);
    }
    println!("Cleared saved state for '{}'.", workflow);
    Ok(())
}

fn cmd_validate(settings: &Settings, target: &str) -> Result<()> {
    let provider = DirectoryProvider::new(&settings.workflows_dir);
    let path = Path::new(target);

    let content = if path.is_file() {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read workflow file: {}", path.display()))?
    } else {
        provider
            .definition_content(target)
            .ok_or_else(|| anyhow!("Workflow not found: {}", target))?
    };

    let raw = provider.parse_definition(&content);
    let report = validate(&raw);

    println!("Workflow: {}", raw.name().unwrap_or_else(|| target.to_string()));
    for warning in &report.warnings {
        println!("  warning: {}", warning);
    }

    if report.valid {
        println!("Validation: OK");
        return Ok(());
    }

    println!("Validation: FAILED");
    for error in &report.errors {
        println!("  - {}", error);
    }
    bail!("{} validation error(s) found", report.errors.len());
}

fn cmd_list(settings: &Settings) -> Result<()> {
    let provider = DirectoryProvider::new(&settings.workflows_dir);
    let names = provider.available();

    if names.is_empty() {
        println!("No workflows found in {}.", provider.dir().display());
        return Ok(());
    }

    println!("{:<28} {:<6} DESCRIPTION", "WORKFLOW", "STEPS");
    println!("{}", "-".repeat(80));

    for name in &names {
        let raw = provider
            .definition_content(name)
            .map(|content| provider.parse_definition(&content))
            .unwrap_or_else(RawWorkflow::default);
        let steps = raw.step_values().map(Vec::len).unwrap_or(0);
        let description = raw
            .description()
            .and_then(|d| d.lines().next().map(str::trim).map(str::to_string))
            .unwrap_or_default();
        println!("{:<28} {:<6} {}", name, steps, description);
    }

    println!("\nTotal: {} workflow(s)", names.len());
    Ok(())
}

fn cmd_info(settings: &Settings, workflow: &str) -> Result<()> {
    let executor = settings.executor(None, true, OutputFormat::Text);
    let definition = executor.load_definition(workflow)?;

    println!("Workflow: {} v{}", definition.name, definition.version);
    if let Some(description) = &definition.description {
        println!("{}", description.trim());
    }
    if let Some(strategy) = &definition.context_strategy {
        println!(
            "Context strategy: rlm {}, max per step {}, inheritance {}",
            if strategy.enable_rlm { "on" } else { "off" },
            strategy
                .max_context_per_step
                .map(|n| format!("{} tokens", n))
                .unwrap_or_else(|| "-".to_string()),
            strategy
                .context_inheritance
                .map(|i| format!("{:?}", i).to_lowercase())
                .unwrap_or_else(|| "-".to_string())
        );
    }

    println!("\n{:<24} {:<16} {:<24} NAME", "STEP", "TYPE", "AGENT");
    println!("{}", "-".repeat(90));
    for step in &definition.steps {
        println!(
            "{:<24} {:<16} {:<24} {}",
            step.id,
            step.type_name(),
            step.agent().unwrap_or("-"),
            step.name
        );
    }

    let mut agents: Vec<&str> = definition.steps.iter().filter_map(|s| s.agent()).collect();
    agents.sort();
    agents.dedup();
    if !agents.is_empty() {
        println!("\nAgents: {}", agents.join(", "));
    }
    Ok(())
}

fn cmd_integrations(settings: &Settings) -> Result<()> {
    let adapter = settings.adapter();

    println!("{:<16} {:<22} MODE", "ID", "NAME");
    println!("{}", "-".repeat(50));
    for entry in adapter.integrations() {
        let marker = if entry.id == settings.integration { " *" } else { "" };
        println!("{:<16} {:<22} {}{}", entry.id, entry.name, entry.mode, marker);
    }
    Ok(())
}

fn cmd_check_agent(settings: &Settings, agent: &str, integration: Option<String>) -> Result<()> {
    let integration = integration.unwrap_or_else(|| settings.integration.clone());
    let adapter = settings.adapter();
    let profile = settings
        .agents()
        .and_then(|source| source.profile(agent))
        .unwrap_or_else(|| AgentProfile::named(agent));

    let report = adapter.check_compatibility(&profile, &integration);

    println!("Agent:       {}", profile.name);
    println!(
        "Integration: {} ({})",
        adapter.display_name(&integration),
        integration
    );
    println!("Mode:        {}", report.mode);
    println!(
        "Features:    task {}, tool permissions {}, skills {}",
        yes_no(report.features.task_execution),
        yes_no(report.features.tool_permissions),
        yes_no(report.features.skill_dependencies)
    );

    if report.warnings.is_empty() {
        println!("\nNo compatibility warnings.");
    } else {
        println!("\nWarnings:");
        for warning in &report.warnings {
            println!("  - {}", warning);
        }
    }
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
