//! Init command
//!
//! Scaffolds `apcdeploy.yml` and a data file from resources that already
//! exist. The data file holds the deployed content when there is one.

use super::Context;
use crate::client::Services;
use crate::config::ProjectConfig;
use crate::error::{CliError, CliResult};
use crate::prompt::TerminalPrompter;
use apcdeploy_engine::{normalize, EngineError, OrchestratorConfig, Prompter, DeploymentOrchestrator};
use apcdeploy_types::{ContentFormat, ProfileKind, ResolvedResourceSet, DEFAULT_STRATEGY};
use clap::Args;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Init arguments
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Application name
    #[arg(short, long)]
    pub app: Option<String>,

    /// Configuration profile name
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Environment name
    #[arg(short, long)]
    pub env: Option<String>,

    /// AWS region
    #[arg(short, long)]
    pub region: Option<String>,

    /// Data file to write, relative to the project file (defaults to data.<ext>)
    #[arg(short, long)]
    pub output_data: Option<PathBuf>,

    /// Overwrite existing files
    #[arg(short, long)]
    pub force: bool,
}

/// Execute the init command
pub async fn execute(args: InitArgs, ctx: &Context) -> CliResult<ExitCode> {
    if ctx.project_path.exists() && !args.force {
        return Err(CliError::InvalidInput(format!(
            "{} already exists; use --force to overwrite",
            ctx.project_path.display()
        )));
    }

    let prompter = TerminalPrompter::detect();
    let region = args.region.clone().or_else(|| ctx.user.region.clone());
    let services = Services::connect(region.clone()).await?;
    let resolver = &services.resolver;

    // Application
    let application = match &args.app {
        Some(name) => name.clone(),
        None => {
            let names = resolver
                .list_applications()
                .await?
                .into_iter()
                .map(|a| a.name)
                .collect();
            choose(&prompter, "Application", "--app", names)?
        }
    };
    let application_id = resolver.resolve_application(&application).await?;

    // Configuration profile
    let profile_name = match &args.profile {
        Some(name) => name.clone(),
        None => {
            let names = resolver
                .list_configuration_profiles(&application_id)
                .await?
                .into_iter()
                .map(|p| p.name)
                .collect();
            choose(&prompter, "Configuration profile", "--profile", names)?
        }
    };
    let profile = resolver
        .resolve_configuration_profile(&application_id, &profile_name)
        .await?;

    // Environment
    let environment = match &args.env {
        Some(name) => name.clone(),
        None => {
            let names = resolver
                .list_environments(&application_id)
                .await?
                .into_iter()
                .map(|e| e.name)
                .collect();
            choose(&prompter, "Environment", "--env", names)?
        }
    };
    let environment_id = resolver
        .resolve_environment(&application_id, &environment)
        .await?;

    let resolved = ResolvedResourceSet {
        application_id,
        profile,
        environment_id,
        strategy_id: None,
    };

    // Deployed content, or a starter file
    let orchestrator =
        DeploymentOrchestrator::new(services.api.clone(), OrchestratorConfig::default());
    let (format, content) = match orchestrator.fetch_deployed(&resolved).await? {
        Some(deployed) => {
            let format = deployed.version.format().unwrap_or(ContentFormat::Text);
            let content = scaffold_content(&deployed.version.content, format, resolved.profile.kind)?;
            ctx.output.info(&format!(
                "Using version {} from deployment #{}",
                deployed.version.version_number, deployed.deployment.number
            ));
            (format, content)
        }
        None => {
            ctx.output
                .info("No deployment found; writing a starter data file");
            (ContentFormat::Json, starter_content(resolved.profile.kind))
        }
    };

    let data_path = data_file_path(&ctx.project_path, args.output_data.as_deref(), format);
    if data_path.exists() && !args.force {
        return Err(CliError::InvalidInput(format!(
            "{} already exists; use --force to overwrite",
            data_path.display()
        )));
    }
    std::fs::write(&data_path, content)?;

    let project = ProjectConfig {
        application,
        configuration_profile: profile_name,
        environment,
        deployment_strategy: DEFAULT_STRATEGY.to_string(),
        data_file: relative_data_file(&ctx.project_path, &data_path),
        region,
    };
    project.save(&ctx.project_path)?;

    ctx.output.success(&format!(
        "Wrote {} and {}",
        ctx.project_path.display(),
        data_path.display()
    ));
    Ok(ExitCode::SUCCESS)
}

/// Ask the operator to pick one name
fn choose(
    prompter: &dyn Prompter,
    label: &str,
    flag: &'static str,
    mut names: Vec<String>,
) -> CliResult<String> {
    if !prompter.is_interactive() {
        return Err(EngineError::NotInteractive { flag }.into());
    }
    if names.is_empty() {
        return Err(CliError::InvalidInput(format!("no {} found", label.to_lowercase())));
    }
    names.sort();
    names.dedup();
    let index = prompter
        .select(&format!("Select {}", label.to_lowercase()), &names)
        .map_err(|e| EngineError::Prompt(e.to_string()))?;
    Ok(names.swap_remove(index))
}

/// Canonical form of deployed content for the local file
fn scaffold_content(content: &[u8], format: ContentFormat, kind: ProfileKind) -> CliResult<Vec<u8>> {
    match format {
        ContentFormat::Text => Ok(content.to_vec()),
        _ => Ok(normalize(content, format, kind)?.into_bytes()),
    }
}

fn starter_content(kind: ProfileKind) -> Vec<u8> {
    match kind {
        ProfileKind::FeatureFlags => {
            b"{\n  \"flags\": {},\n  \"values\": {},\n  \"version\": \"1\"\n}\n".to_vec()
        }
        ProfileKind::Freeform => b"{}\n".to_vec(),
    }
}

fn project_dir(project_path: &Path) -> &Path {
    project_path.parent().unwrap_or_else(|| Path::new(""))
}

/// Where to write the data file.
///
/// Relative paths are taken from the project file's directory, the same way
/// `data_file` is resolved when the project is loaded.
fn data_file_path(project_path: &Path, output_data: Option<&Path>, format: ContentFormat) -> PathBuf {
    let base = project_dir(project_path);
    match output_data {
        Some(path) => base.join(path),
        None => base.join(format!("data.{}", format.extension())),
    }
}

/// Data file path as stored in the project file
fn relative_data_file(project_path: &Path, data_path: &Path) -> String {
    let base = project_dir(project_path);
    data_path
        .strip_prefix(base)
        .unwrap_or(data_path)
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use apcdeploy_engine::ScriptedPrompter;

    #[test]
    fn test_choose_requires_terminal() {
        let prompter = ScriptedPrompter::non_interactive();
        let err = choose(&prompter, "Application", "--app", vec!["web".into()]).unwrap_err();
        assert!(err.to_string().contains("--app"));
    }

    #[test]
    fn test_choose_sorted_names() {
        let prompter = ScriptedPrompter::interactive(true).with_selection(1);
        let picked = choose(
            &prompter,
            "Environment",
            "--env",
            vec!["staging".into(), "prod".into(), "dev".into()],
        )
        .unwrap();
        assert_eq!(picked, "prod");
    }

    #[test]
    fn test_scaffold_strips_flag_timestamps() {
        let content = br#"{"values":{"beta":{"enabled":true,"_updatedAt":"2024-01-01T00:00:00Z"}},"flags":{"beta":{"name":"beta"}},"version":"1"}"#;
        let scaffolded =
            scaffold_content(content, ContentFormat::Json, ProfileKind::FeatureFlags).unwrap();
        let text = String::from_utf8(scaffolded).unwrap();
        assert!(!text.contains("_updatedAt"));
        assert!(text.starts_with("{\n  \"flags\""));
    }

    #[test]
    fn test_scaffold_keeps_text_verbatim() {
        let scaffolded =
            scaffold_content(b"a\r\nb", ContentFormat::Text, ProfileKind::Freeform).unwrap();
        assert_eq!(scaffolded, b"a\r\nb".to_vec());
    }

    #[test]
    fn test_relative_data_file() {
        assert_eq!(
            relative_data_file(Path::new("/work/apcdeploy.yml"), Path::new("/work/data.json")),
            "data.json"
        );
        assert_eq!(
            relative_data_file(Path::new("apcdeploy.yml"), Path::new("config/data.yaml")),
            "config/data.yaml"
        );
    }

    #[test]
    fn test_output_data_follows_project_dir() {
        let project = Path::new("sub/apcdeploy.yml");
        let data_path = data_file_path(project, Some(Path::new("data.json")), ContentFormat::Json);
        assert_eq!(data_path, Path::new("sub/data.json"));
        assert_eq!(relative_data_file(project, &data_path), "data.json");
    }

    #[test]
    fn test_default_and_absolute_data_paths() {
        let project = Path::new("sub/apcdeploy.yml");
        assert_eq!(
            data_file_path(project, None, ContentFormat::Yaml),
            Path::new("sub/data.yaml")
        );
        let absolute = data_file_path(project, Some(Path::new("/tmp/cfg.json")), ContentFormat::Json);
        assert_eq!(absolute, Path::new("/tmp/cfg.json"));
        assert_eq!(relative_data_file(project, &absolute), "/tmp/cfg.json");
    }
}
