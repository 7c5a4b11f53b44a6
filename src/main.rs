use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use guideflow::cli::{Cli, dotenv_arg, load_dotenv};

#[tokio::main]
async fn main() {
    // .env goes into the process environment before clap reads GUIDEFLOW_* fallbacks
    let dotenv = load_dotenv(dotenv_arg(std::env::args_os().skip(1)).as_deref());
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the guided output
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(path) = dotenv {
        info!("Loaded env from {}", path.display());
    }

    if let Err(e) = guideflow::cli::run_cli(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
