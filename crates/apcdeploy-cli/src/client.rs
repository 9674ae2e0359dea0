//! Provider wiring for commands

use crate::config::Settings;
use crate::error::CliResult;
use apcdeploy_aws::AwsAppConfig;
use apcdeploy_engine::{DeploymentOrchestrator, OrchestratorConfig, ResourceResolver};
use apcdeploy_types::ResolvedResourceSet;
use std::sync::Arc;
use tracing::debug;

/// Connected AppConfig services
pub struct Services {
    pub api: Arc<AwsAppConfig>,
    pub resolver: Arc<ResourceResolver>,
}

impl Services {
    /// Create an AWS client for the region
    pub async fn connect(region: Option<String>) -> CliResult<Self> {
        let api = Arc::new(AwsAppConfig::new(region).await?);
        let resolver = Arc::new(ResourceResolver::new(api.clone()));
        Ok(Self { api, resolver })
    }

    /// Resolve the project's names to IDs
    pub async fn resolve(&self, settings: &Settings) -> CliResult<ResolvedResourceSet> {
        let project = &settings.project;
        let resolved = self
            .resolver
            .resolve_all(
                &project.application,
                &project.configuration_profile,
                &project.environment,
                &project.deployment_strategy,
            )
            .await?;
        debug!(?resolved, "Resolved project resources");
        Ok(resolved)
    }

    /// Orchestrator configured from the effective settings
    pub fn orchestrator(&self, settings: &Settings) -> DeploymentOrchestrator {
        DeploymentOrchestrator::new(
            self.api.clone(),
            OrchestratorConfig {
                poll_interval: settings.poll_interval,
                default_timeout: settings.timeout,
            },
        )
    }
}
