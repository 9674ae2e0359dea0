//! Deployments and hosted configuration versions

use crate::content::ContentFormat;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Deployment state as reported by the service.
///
/// The nominal lifecycle is `Deploying -> Baking -> Complete`, with
/// `RolledBack` reachable from `Deploying` or `Baking`. States the engine does
/// not model are kept verbatim in `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeploymentState {
    Validating,
    Deploying,
    Baking,
    Complete,
    RollingBack,
    RolledBack,
    Reverted,
    Unknown(String),
}

impl DeploymentState {
    pub fn as_str(&self) -> &str {
        match self {
            DeploymentState::Validating => "VALIDATING",
            DeploymentState::Deploying => "DEPLOYING",
            DeploymentState::Baking => "BAKING",
            DeploymentState::Complete => "COMPLETE",
            DeploymentState::RollingBack => "ROLLING_BACK",
            DeploymentState::RolledBack => "ROLLED_BACK",
            DeploymentState::Reverted => "REVERTED",
            DeploymentState::Unknown(raw) => raw,
        }
    }

    /// Deployment still occupies the environment (`DEPLOYING` or `BAKING`)
    pub fn is_in_progress(&self) -> bool {
        matches!(self, DeploymentState::Deploying | DeploymentState::Baking)
    }

    /// No further transitions will happen
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeploymentState::Complete | DeploymentState::RolledBack | DeploymentState::Reverted
        )
    }

    /// Rollout finished and the deployment reached `BAKING` or `COMPLETE`
    pub fn has_reached_baking(&self) -> bool {
        matches!(self, DeploymentState::Baking | DeploymentState::Complete)
    }

    /// Deployment ended in a rollback
    pub fn is_rolled_back(&self) -> bool {
        matches!(self, DeploymentState::RolledBack | DeploymentState::Reverted)
    }
}

impl From<&str> for DeploymentState {
    fn from(s: &str) -> Self {
        match s {
            "VALIDATING" => DeploymentState::Validating,
            "DEPLOYING" => DeploymentState::Deploying,
            "BAKING" => DeploymentState::Baking,
            "COMPLETE" => DeploymentState::Complete,
            "ROLLING_BACK" => DeploymentState::RollingBack,
            "ROLLED_BACK" => DeploymentState::RolledBack,
            "REVERTED" => DeploymentState::Reverted,
            other => DeploymentState::Unknown(other.to_string()),
        }
    }
}

impl From<String> for DeploymentState {
    fn from(s: String) -> Self {
        DeploymentState::from(s.as_str())
    }
}

impl From<DeploymentState> for String {
    fn from(state: DeploymentState) -> Self {
        state.as_str().to_string()
    }
}

impl std::fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deployment of one configuration version to one environment.
///
/// Owned by the remote service; the engine reads it and requests
/// transitions, never edits fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    /// Monotonically increasing per (application, environment)
    pub number: i32,
    pub state: DeploymentState,
    pub percentage_complete: f32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub configuration_profile_id: String,
    /// Hosted configuration version number, as a string
    pub configuration_version: String,
    pub strategy_id: String,
    pub description: Option<String>,
}

/// A deployment as returned by a listing call.
///
/// Listings identify the profile only by name; the full [`Deployment`] carries
/// the profile ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentSummary {
    pub number: i32,
    pub state: DeploymentState,
    pub percentage_complete: f32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub configuration_name: String,
    pub configuration_version: String,
}

/// An immutable hosted configuration version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationVersion {
    pub version_number: i32,
    pub content_type: String,
    pub content: Vec<u8>,
}

impl ConfigurationVersion {
    /// Format implied by the stored content type, if recognizable
    pub fn format(&self) -> Option<ContentFormat> {
        ContentFormat::from_content_type(&self.content_type)
    }
}
