use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use common::{init_structured_logging, HasSeverity};
use infrastructure::config::{ConfigError, ConfigLoader, ConfigSource, DeskConfig};
use links::LinkError;
use network::NetworkError;
use std::path::PathBuf;
use storage::StorageError;
use todo::TaskError;
use tracing::debug;

mod commands;
mod context;

use commands::{ConfigCommand, LinksCommand, NetworkCommand, StorageCommand, TasksCommand};
use context::AppContext;

#[derive(Parser)]
#[command(name = "deskpad")]
#[command(about = "Tasks, quick links and connectivity checks from the terminal")]
#[command(version)]
struct Cli {
    /// Config file to use instead of searching the usual locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    /// Keep data in memory for this run only
    #[arg(long, global = true)]
    memory: bool,

    /// Override the configured log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the task list
    Tasks(TasksCommand),
    /// Manage quick links
    Links(LinksCommand),
    /// Inspect or wipe stored data
    Storage(StorageCommand),
    /// Connection heuristics and latency probes
    Network(NetworkCommand),
    /// Show, create or validate configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        log_failure(&e);
        eprintln!("{} {:#}", "✗".red(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let loader = ConfigLoader::new();
    let (config, source) = match &cli.config {
        Some(path) => {
            let config = loader
                .load_from(path)
                .await
                .with_context(|| format!("Failed to load config {}", path.display()))?;
            (config, ConfigSource::File(path.clone()))
        }
        None => loader.load_with_source().await?,
    };

    init_logging(&cli, &config)?;
    debug!(?source, "configuration resolved");

    match cli.command {
        Commands::Config(cmd) => cmd.execute(&config, &source).await,
        Commands::Tasks(cmd) => cmd.execute(&AppContext::open(config, cli.memory)?).await,
        Commands::Links(cmd) => cmd.execute(&AppContext::open(config, cli.memory)?).await,
        Commands::Storage(cmd) => cmd.execute(&AppContext::open(config, cli.memory)?).await,
        Commands::Network(cmd) => cmd.execute(&config).await,
    }
}

/// Logs the first domain error in the chain at its severity. Task and link
/// services log their own failures.
fn log_failure(err: &anyhow::Error) {
    for cause in err.chain() {
        if cause.is::<TaskError>() || cause.is::<LinkError>() {
            return;
        }
        if let Some(e) = cause.downcast_ref::<ConfigError>() {
            e.log();
            return;
        }
        if let Some(e) = cause.downcast_ref::<NetworkError>() {
            e.log();
            return;
        }
        if let Some(e) = cause.downcast_ref::<StorageError>() {
            e.log();
            return;
        }
    }
}

fn init_logging(cli: &Cli, config: &DeskConfig) -> Result<()> {
    let mut settings = config.logging.clone();
    if let Some(level) = &cli.log_level {
        settings.level = level.clone();
    }
    settings.json |= cli.json_logs;

    init_structured_logging(settings.to_logging_config()).context("Failed to initialise logging")
}
