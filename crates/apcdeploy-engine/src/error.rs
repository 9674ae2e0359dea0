//! Engine error types

use apcdeploy_types::{ContentFormat, DeploymentState};
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// Kind of resource a name was resolved against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    /// AppConfig application
    Application,
    /// Configuration profile of an application
    ConfigurationProfile,
    /// Environment of an application
    Environment,
    /// Deployment strategy, predefined or custom
    DeploymentStrategy,
    /// Deployment of a profile to an environment
    Deployment,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::Application => write!(f, "application"),
            ResourceType::ConfigurationProfile => write!(f, "configuration profile"),
            ResourceType::Environment => write!(f, "environment"),
            ResourceType::DeploymentStrategy => write!(f, "deployment strategy"),
            ResourceType::Deployment => write!(f, "deployment"),
        }
    }
}

/// Errors reported by a provider adapter.
///
/// Adapters classify their native errors into these variants; only
/// `Transient` is ever retried, and only inside the wait loop.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Requested resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Throttling, timeouts and server-side failures
    #[error("transient error: {0}")]
    Transient(String),

    /// Request rejected, including validator failures
    #[error("{0}")]
    Validation(String),

    /// Conflicting state on the provider side
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other provider error
    #[error("{0}")]
    Other(String),
}

impl ApiError {
    /// Can the request be retried as-is?
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Transient(_))
    }
}

/// Result type for provider calls
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Errors returned by engine workflows
#[derive(Debug, Error)]
pub enum EngineError {
    /// No resource with the given name
    #[error("{resource_type} not found: {name}")]
    NotFound {
        /// Kind of resource looked up
        resource_type: ResourceType,
        /// Name that was looked up
        name: String,
    },

    /// Several resources share the given name
    #[error("{resource_type} name {name:?} is ambiguous, matching IDs: {}", candidate_ids.join(", "))]
    Ambiguous {
        /// Kind of resource looked up
        resource_type: ResourceType,
        /// Name that was looked up
        name: String,
        /// IDs of every match
        candidate_ids: Vec<String>,
    },

    /// Content could not be parsed in its format
    #[error("failed to parse {format} content: {detail}")]
    Parse {
        /// Format the content was parsed as
        format: ContentFormat,
        /// Parser message, with its location
        detail: String,
    },

    /// Provider validator rejected the content
    #[error("configuration rejected by validator: {0}")]
    Validation(String),

    /// Another deployment is running in the environment
    #[error("deployment #{number} is already in progress (state: {state}{})",
        started_at.as_ref().map(|t| format!(", started at {}", t.to_rfc3339())).unwrap_or_default())]
    Conflict {
        /// Number of the running deployment
        number: i32,
        /// Its state when checked
        state: DeploymentState,
        /// When it started, if known
        started_at: Option<DateTime<Utc>>,
    },

    /// Wait deadline passed; the deployment keeps running
    #[error("timed out after {}s waiting for deployment (last observed state: {})",
        timeout.as_secs(),
        last_observed_state.as_ref().map(|s| s.as_str()).unwrap_or("none"))]
    Timeout {
        /// Last state seen before the deadline
        last_observed_state: Option<DeploymentState>,
        /// Wait budget that was exhausted
        timeout: Duration,
    },

    /// Deployment was rolled back while waiting
    #[error("deployment #{number} was rolled back (state: {state})")]
    RolledBack {
        /// Deployment number
        number: i32,
        /// Rollback state observed
        state: DeploymentState,
    },

    /// User answered no to a confirmation
    #[error("operation cancelled by user")]
    UserDeclined,

    /// A confirmation is needed but there is no terminal
    #[error("confirmation required but no interactive terminal is available; re-run with {flag} to skip the prompt")]
    NotInteractive {
        /// Flag that skips the prompt
        flag: &'static str,
    },

    /// Nothing to roll back
    #[error("no ongoing deployment found")]
    NoOngoingDeployment,

    /// Prompt I/O failed
    #[error("prompt failed: {0}")]
    Prompt(String),

    /// Provider call failed
    #[error("{operation} failed: {source}")]
    Api {
        /// Operation that was attempted
        operation: &'static str,
        /// Classified provider error
        #[source]
        source: ApiError,
    },
}

impl EngineError {
    /// Wrap a provider error with the operation that produced it.
    ///
    /// Validator rejections are surfaced verbatim as `Validation`.
    pub fn api(operation: &'static str, source: ApiError) -> Self {
        match source {
            ApiError::Validation(message) => EngineError::Validation(message),
            source => EngineError::Api { operation, source },
        }
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_message_lists_candidates() {
        let err = EngineError::Ambiguous {
            resource_type: ResourceType::Application,
            name: "web".into(),
            candidate_ids: vec!["a1".into(), "a2".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("application"));
        assert!(msg.contains("\"web\""));
        assert!(msg.contains("a1, a2"));
    }

    #[test]
    fn test_validation_is_unwrapped() {
        let err = EngineError::api(
            "create configuration version",
            ApiError::Validation("JSON schema mismatch at /limit".into()),
        );
        assert!(matches!(err, EngineError::Validation(ref m) if m == "JSON schema mismatch at /limit"));
    }

    #[test]
    fn test_timeout_message() {
        let err = EngineError::Timeout {
            last_observed_state: Some(DeploymentState::Deploying),
            timeout: Duration::from_secs(600),
        };
        assert_eq!(
            err.to_string(),
            "timed out after 600s waiting for deployment (last observed state: DEPLOYING)"
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(ApiError::Transient("throttled".into()).is_transient());
        assert!(!ApiError::Other("boom".into()).is_transient());
    }
}
