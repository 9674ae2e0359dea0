//! CLI configuration
//!
//! Two files feed a command: the per-project `apcdeploy.yml` and the
//! optional per-user `config.toml`. Values are layered as
//! flag > project file > user defaults > built-in defaults.

use crate::error::{CliError, CliResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default project file name
pub const DEFAULT_PROJECT_FILE: &str = "apcdeploy.yml";

/// Built-in wait budget
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 600;

/// Built-in poll interval
pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 5;

/// Per-user defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CliConfig {
    /// AWS region used when neither flag nor project names one
    pub region: Option<String>,

    /// Wait timeout in seconds
    pub timeout_seconds: Option<u64>,

    /// Delay between deployment polls in seconds
    pub poll_interval_seconds: Option<u64>,
}

impl CliConfig {
    /// Load configuration from file
    pub fn load(path: Option<&str>) -> CliResult<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let config: CliConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(CliConfig::default())
        }
    }

    /// Get the default configuration file path
    fn default_config_path() -> CliResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CliError::Config("Cannot find config directory".into()))?;
        Ok(config_dir.join("apcdeploy").join("config.toml"))
    }
}

/// Project file describing one deployment target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub application: String,
    pub configuration_profile: String,
    pub environment: String,

    /// Strategy name; empty means the service default
    #[serde(default)]
    pub deployment_strategy: String,

    /// Data file, relative to the project file
    pub data_file: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl ProjectConfig {
    /// Load and validate a project file
    pub fn load(path: &Path) -> CliResult<Self> {
        if !path.exists() {
            return Err(CliError::Config(format!(
                "project file {} not found; run `apcdeploy init` first",
                path.display()
            )));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: ProjectConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the project file
    pub fn save(&self, path: &Path) -> CliResult<()> {
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    fn validate(&self) -> CliResult<()> {
        let required = [
            ("application", &self.application),
            ("configuration_profile", &self.configuration_profile),
            ("environment", &self.environment),
            ("data_file", &self.data_file),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CliError::Config(format!("{} must not be empty", field)));
            }
        }
        Ok(())
    }
}

/// Effective settings for one invocation
#[derive(Debug, Clone)]
pub struct Settings {
    pub project: ProjectConfig,
    /// Absolute or CWD-relative path of the data file
    pub data_path: PathBuf,
    pub region: Option<String>,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Settings {
    /// Load the project file and layer the user defaults under it
    pub fn load(
        project_path: &Path,
        user: &CliConfig,
        timeout_flag: Option<u64>,
    ) -> CliResult<Self> {
        let project = ProjectConfig::load(project_path)?;
        Ok(Self::layer(project_path, project, user, timeout_flag))
    }

    fn layer(
        project_path: &Path,
        project: ProjectConfig,
        user: &CliConfig,
        timeout_flag: Option<u64>,
    ) -> Self {
        let base_dir = project_path.parent().unwrap_or_else(|| Path::new(""));
        let data_path = base_dir.join(&project.data_file);
        let region = project.region.clone().or_else(|| user.region.clone());
        let timeout = timeout_flag
            .or(user.timeout_seconds)
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS);
        let poll_interval = user
            .poll_interval_seconds
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECONDS);

        Self {
            project,
            data_path,
            region,
            timeout: Duration::from_secs(timeout),
            poll_interval: Duration::from_secs(poll_interval.max(1)),
        }
    }

    /// Read the data file
    pub fn read_data(&self) -> CliResult<Vec<u8>> {
        std::fs::read(&self.data_path).map_err(|e| {
            CliError::Config(format!(
                "cannot read data file {}: {}",
                self.data_path.display(),
                e
            ))
        })
    }
}
