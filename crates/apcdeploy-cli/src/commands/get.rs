//! Get command

use super::Context;
use crate::client::Services;
use crate::error::CliResult;
use crate::prompt::TerminalPrompter;
use apcdeploy_engine::{EngineError, Prompter, ResourceType, SKIP_CONFIRMATION_FLAG};
use clap::Args;
use std::io::Write;
use std::process::ExitCode;

/// Get arguments
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Print the content without asking, even while a deployment is in progress
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Execute the get command
pub async fn execute(args: GetArgs, ctx: &Context) -> CliResult<ExitCode> {
    let settings = ctx.settings(None)?;
    let services = Services::connect(settings.region.clone()).await?;
    let resolved = services.resolve(&settings).await?;
    let orchestrator = services.orchestrator(&settings);

    let deployed = orchestrator
        .fetch_deployed(&resolved)
        .await?
        .ok_or_else(|| EngineError::NotFound {
            resource_type: ResourceType::Deployment,
            name: resolved.profile.name.clone(),
        })?;

    let deployment = &deployed.deployment;
    if deployment.state.is_in_progress() && !args.yes {
        let prompter = TerminalPrompter::detect();
        if !prompter.is_interactive() {
            return Err(EngineError::NotInteractive {
                flag: SKIP_CONFIRMATION_FLAG,
            }
            .into());
        }
        let question = format!(
            "Deployment #{} is still {}; its content may not be served everywhere yet. Show it anyway?",
            deployment.number, deployment.state
        );
        let confirmed = prompter
            .confirm(&question)
            .map_err(|e| EngineError::Prompt(e.to_string()))?;
        if !confirmed {
            return Err(EngineError::UserDeclined.into());
        }
    }

    ctx.output.info(&format!(
        "Version {} (deployment #{}, {})",
        deployed.version.version_number, deployment.number, deployment.state
    ));
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&deployed.version.content)?;
    if !deployed.version.content.ends_with(b"\n") {
        stdout.write_all(b"\n")?;
    }
    Ok(ExitCode::SUCCESS)
}
