//! apcdeploy CLI - declarative deployments for AWS AppConfig
//!
//! This CLI lets operators keep AppConfig content in a local file and:
//! - Scaffold a project from existing resources
//! - Preview changes against the deployed version
//! - Deploy only when the content changed, optionally waiting for rollout
//! - Inspect deployment status and deployed content
//! - Roll back an in-flight deployment

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod client;
mod commands;
mod config;
mod error;
mod output;
mod prompt;

use commands::{diff, get, init, rollback, run, status, Context};
use config::{CliConfig, DEFAULT_PROJECT_FILE};
use error::CliResult;

/// apcdeploy CLI application
#[derive(Parser)]
#[command(name = "apcdeploy")]
#[command(about = "Declarative deployments for AWS AppConfig", long_about = None)]
#[command(version)]
struct Cli {
    /// Project file path
    #[arg(short, long, env = "APCDEPLOY_CONFIG", default_value = DEFAULT_PROJECT_FILE, global = true)]
    config: PathBuf,

    /// Suppress informational output
    #[arg(short, long, global = true)]
    silent: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Create a project file from existing AppConfig resources
    Init(init::InitArgs),

    /// Show differences between the local file and the deployed version
    Diff(diff::DiffArgs),

    /// Deploy the local file when it changed
    #[command(alias = "deploy")]
    Run(run::RunArgs),

    /// Show deployment status
    Status(status::StatusArgs),

    /// Print the deployed configuration
    Get(get::GetArgs),

    /// Stop the in-progress deployment
    Rollback(rollback::RollbackArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            output::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> CliResult<ExitCode> {
    let user = CliConfig::load(None)?;
    let ctx = Context {
        project_path: cli.config,
        user,
        output: output::Output::new(cli.silent),
    };

    match cli.command {
        Commands::Init(args) => init::execute(args, &ctx).await,
        Commands::Diff(args) => diff::execute(args, &ctx).await,
        Commands::Run(args) => run::execute(args, &ctx).await,
        Commands::Status(args) => status::execute(args, &ctx).await,
        Commands::Get(args) => get::execute(args, &ctx).await,
        Commands::Rollback(args) => rollback::execute(args, &ctx).await,
    }
}
