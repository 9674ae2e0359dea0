//! Status command

use super::Context;
use crate::client::Services;
use crate::error::CliResult;
use crate::output::{print_fields, FieldRow};
use apcdeploy_types::Deployment;
use chrono::{DateTime, Utc};
use clap::Args;
use std::process::ExitCode;

/// Status arguments
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Deployment number (defaults to the latest for the profile)
    #[arg(short, long)]
    pub deployment: Option<i32>,
}

/// Execute the status command
pub async fn execute(args: StatusArgs, ctx: &Context) -> CliResult<ExitCode> {
    let settings = ctx.settings(None)?;
    let services = Services::connect(settings.region.clone()).await?;
    let resolved = services.resolve(&settings).await?;
    let orchestrator = services.orchestrator(&settings);

    let deployment = orchestrator.status(&resolved, args.deployment).await?;
    print_fields(status_rows(&deployment));
    Ok(ExitCode::SUCCESS)
}

fn status_rows(deployment: &Deployment) -> Vec<FieldRow> {
    let mut rows = vec![
        FieldRow::new("Deployment", format!("#{}", deployment.number)),
        FieldRow::new("State", deployment.state.to_string()),
        FieldRow::new(
            "Progress",
            format!("{:.0}%", deployment.percentage_complete),
        ),
        FieldRow::new("Version", deployment.configuration_version.clone()),
        FieldRow::new("Strategy", deployment.strategy_id.clone()),
        FieldRow::new("Started", format_time(deployment.started_at)),
    ];
    if deployment.completed_at.is_some() {
        rows.push(FieldRow::new("Completed", format_time(deployment.completed_at)));
    }
    if let Some(description) = &deployment.description {
        rows.push(FieldRow::new("Description", description.clone()));
    }
    rows
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}
