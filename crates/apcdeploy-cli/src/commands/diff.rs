//! Diff command

use super::Context;
use crate::client::Services;
use crate::error::CliResult;
use crate::output::print_diff;
use apcdeploy_types::ContentFormat;
use clap::Args;
use std::process::ExitCode;

/// Diff arguments
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Exit with status 1 when there are changes
    #[arg(long)]
    pub exit_nonzero: bool,
}

/// Execute the diff command
pub async fn execute(args: DiffArgs, ctx: &Context) -> CliResult<ExitCode> {
    let settings = ctx.settings(None)?;
    let content = settings.read_data()?;
    let format = ContentFormat::from_path(&settings.data_path);

    let services = Services::connect(settings.region.clone()).await?;
    let resolved = services.resolve(&settings).await?;
    let orchestrator = services.orchestrator(&settings);

    let report = orchestrator.diff(&resolved, &content, format).await?;
    match &report.deployed {
        Some(deployed) => ctx.output.info(&format!(
            "Comparing {} with version {} (deployment #{})",
            settings.data_path.display(),
            deployed.version.version_number,
            deployed.deployment.number
        )),
        None => ctx
            .output
            .info("No deployment found; the whole file would be deployed"),
    }

    if report.diff.has_changes {
        print_diff(&report.diff);
    } else {
        ctx.output.success("No changes");
    }

    let (ongoing, latest) = orchestrator
        .check_ongoing_deployment(&resolved.application_id, &resolved.environment_id)
        .await?;
    if let (true, Some(latest)) = (ongoing, latest) {
        ctx.output.warning(&format!(
            "Deployment #{} is in progress ({}); `run` will fail until it finishes",
            latest.number, latest.state
        ));
    }

    if args.exit_nonzero && report.diff.has_changes {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
