//! Rollback command

use super::Context;
use crate::client::Services;
use crate::error::CliResult;
use crate::prompt::TerminalPrompter;
use apcdeploy_engine::{EngineError, Prompter, RollbackController, SKIP_CONFIRMATION_FLAG};
use clap::Args;
use std::process::ExitCode;
use std::sync::Arc;

/// Rollback arguments
#[derive(Args, Debug)]
pub struct RollbackArgs {
    /// Skip confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Execute the rollback command
pub async fn execute(args: RollbackArgs, ctx: &Context) -> CliResult<ExitCode> {
    let settings = ctx.settings(None)?;
    let prompter = TerminalPrompter::detect();

    // Fail before touching AWS when consent cannot be asked for
    if !args.yes && !prompter.is_interactive() {
        return Err(EngineError::NotInteractive {
            flag: SKIP_CONFIRMATION_FLAG,
        }
        .into());
    }

    let services = Services::connect(settings.region.clone()).await?;
    let controller = RollbackController::new(
        services.resolver.clone(),
        services.api.clone(),
        Arc::new(prompter),
    );

    let project = &settings.project;
    let stopped = controller
        .rollback(&project.application, &project.environment, args.yes)
        .await?;
    ctx.output.success(&format!(
        "Deployment #{} stopped ({}); {} is reverting to the previous version",
        stopped.number, stopped.state, project.environment
    ));
    Ok(ExitCode::SUCCESS)
}
