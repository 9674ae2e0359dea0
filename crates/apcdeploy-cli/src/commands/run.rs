//! Run command

use super::Context;
use crate::client::Services;
use crate::error::CliResult;
use crate::output::{print_diff, SpinnerObserver};
use apcdeploy_engine::{DeployOptions, DeployOutcome, EngineError, WaitMode};
use apcdeploy_types::ContentFormat;
use clap::Args;
use std::process::ExitCode;
use std::sync::Arc;

/// Run arguments
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Wait until the rollout finishes (BAKING or later)
    #[arg(long, conflicts_with = "wait_bake")]
    pub wait_deploy: bool,

    /// Wait until baking finishes (COMPLETE)
    #[arg(long)]
    pub wait_bake: bool,

    /// Deploy even when the content is unchanged
    #[arg(short, long)]
    pub force: bool,

    /// Wait timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Description for the version and deployment
    #[arg(short, long)]
    pub description: Option<String>,
}

/// Execute the run command
pub async fn execute(args: RunArgs, ctx: &Context) -> CliResult<ExitCode> {
    let settings = ctx.settings(args.timeout)?;
    let content = settings.read_data()?;
    let format = ContentFormat::from_path(&settings.data_path);
    let wait = WaitMode::from_flags(args.wait_deploy, args.wait_bake);

    let services = Services::connect(settings.region.clone()).await?;
    let resolved = services.resolve(&settings).await?;

    let options = DeployOptions {
        force: args.force,
        wait,
        timeout: Some(settings.timeout),
        description: args.description,
    };

    // Show the diff before anything can fail on the deploy side
    let orchestrator = services.orchestrator(&settings);
    let report = orchestrator
        .plan(&resolved, &content, format, &options)
        .await?;
    if report.diff.has_changes && !ctx.output.silent {
        print_diff(&report.diff);
    }

    let spinner = match wait {
        WaitMode::None => None,
        _ => Some(Arc::new(SpinnerObserver::new(
            ctx.output.spinner("Deploying..."),
        ))),
    };
    let orchestrator = match &spinner {
        Some(spinner) => orchestrator.with_observer(spinner.clone()),
        None => orchestrator,
    };

    let outcome = match orchestrator
        .deploy_report(&resolved, report, &content, format, &options)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Some(spinner) = &spinner {
                spinner.abandon();
            }
            if matches!(e, EngineError::Timeout { .. }) {
                ctx.output.warning(
                    "The deployment continues remotely; check it with `apcdeploy status`",
                );
            }
            return Err(e.into());
        }
    };

    match outcome {
        DeployOutcome::Skipped { .. } => {
            if let Some(spinner) = &spinner {
                spinner.abandon();
            }
            ctx.output
                .info("No changes detected, skipping deployment (use --force to deploy anyway)");
        }
        DeployOutcome::Deployed {
            version_number,
            deployment,
            wait: waited,
            ..
        } => {
            if let (Some(spinner), Some(waited)) = (&spinner, &waited) {
                spinner.finish(&format!(
                    "Deployment #{} reached {}",
                    waited.deployment.number, waited.deployment.state
                ));
            }
            ctx.output.success(&format!(
                "Deployment #{} started with version {}",
                deployment.number, version_number
            ));
        }
    }
    Ok(ExitCode::SUCCESS)
}
