//! Resource Resolver - name to provider ID resolution
//!
//! Every workflow starts here. Names are matched exactly and case-sensitively
//! against the provider's listings; zero matches and multiple matches are
//! distinct errors so the operator can tell a typo from a naming collision.

use crate::api::ResourceCatalog;
use crate::error::{EngineError, ResourceType, Result};
use apcdeploy_types::{
    Application, DeploymentStrategy, Environment, ProfileSummary, ResolvedProfile,
    ResolvedResourceSet,
};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Anything listed with an ID and a name
trait Named {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
}

macro_rules! impl_named {
    ($($ty:ty),*) => {
        $(impl Named for $ty {
            fn id(&self) -> &str {
                &self.id
            }

            fn name(&self) -> &str {
                &self.name
            }
        })*
    };
}

impl_named!(Application, Environment, ProfileSummary, DeploymentStrategy);

/// Pick the single item named `name`
fn select_unique<'a, T: Named>(
    items: &'a [T],
    resource_type: ResourceType,
    name: &str,
) -> Result<&'a T> {
    let matches: Vec<&T> = items.iter().filter(|item| item.name() == name).collect();

    match matches.as_slice() {
        [] => Err(EngineError::NotFound {
            resource_type,
            name: name.to_string(),
        }),
        [single] => Ok(*single),
        _ => {
            let mut candidate_ids: Vec<String> =
                matches.iter().map(|item| item.id().to_string()).collect();
            candidate_ids.sort();
            Err(EngineError::Ambiguous {
                resource_type,
                name: name.to_string(),
                candidate_ids,
            })
        }
    }
}

/// Resolves human-readable names to provider IDs
pub struct ResourceResolver {
    catalog: Arc<dyn ResourceCatalog>,
}

impl ResourceResolver {
    /// Create a resolver over a resource catalog
    pub fn new(catalog: Arc<dyn ResourceCatalog>) -> Self {
        Self { catalog }
    }

    /// Resolve an application name to its ID
    #[instrument(skip(self))]
    pub async fn resolve_application(&self, name: &str) -> Result<String> {
        let applications = self.list_applications().await?;
        let app = select_unique(&applications, ResourceType::Application, name)?;
        debug!(application_id = %app.id, "Resolved application");
        Ok(app.id.clone())
    }

    /// Resolve an environment name within an application
    #[instrument(skip(self))]
    pub async fn resolve_environment(&self, application_id: &str, name: &str) -> Result<String> {
        let environments = self.list_environments(application_id).await?;
        let env = select_unique(&environments, ResourceType::Environment, name)?;
        debug!(environment_id = %env.id, "Resolved environment");
        Ok(env.id.clone())
    }

    /// Resolve a configuration profile name and describe its kind
    #[instrument(skip(self))]
    pub async fn resolve_configuration_profile(
        &self,
        application_id: &str,
        name: &str,
    ) -> Result<ResolvedProfile> {
        let profiles = self.list_configuration_profiles(application_id).await?;
        let summary = select_unique(&profiles, ResourceType::ConfigurationProfile, name)?;

        let profile = self
            .catalog
            .get_configuration_profile(application_id, &summary.id)
            .await
            .map_err(|e| EngineError::api("get configuration profile", e))?;

        debug!(profile_id = %profile.id, kind = %profile.kind, "Resolved configuration profile");
        Ok(ResolvedProfile {
            id: profile.id,
            name: profile.name,
            kind: profile.kind,
        })
    }

    /// Resolve a deployment strategy name.
    ///
    /// Predefined strategies are used directly; their ID is their name.
    #[instrument(skip(self))]
    pub async fn resolve_deployment_strategy(&self, name: &str) -> Result<String> {
        if DeploymentStrategy::is_predefined(name) {
            debug!("Using predefined deployment strategy");
            return Ok(name.to_string());
        }

        let strategies = self.list_deployment_strategies().await?;
        let strategy = select_unique(&strategies, ResourceType::DeploymentStrategy, name)?;
        debug!(strategy_id = %strategy.id, "Resolved deployment strategy");
        Ok(strategy.id.clone())
    }

    /// Resolve everything a command needs, stopping at the first failure.
    ///
    /// An empty `strategy` skips strategy resolution.
    #[instrument(skip(self))]
    pub async fn resolve_all(
        &self,
        application: &str,
        profile: &str,
        environment: &str,
        strategy: &str,
    ) -> Result<ResolvedResourceSet> {
        let application_id = self.resolve_application(application).await?;
        let profile = self
            .resolve_configuration_profile(&application_id, profile)
            .await?;
        let environment_id = self
            .resolve_environment(&application_id, environment)
            .await?;
        let strategy_id = if strategy.is_empty() {
            None
        } else {
            Some(self.resolve_deployment_strategy(strategy).await?)
        };

        Ok(ResolvedResourceSet {
            application_id,
            profile,
            environment_id,
            strategy_id,
        })
    }

    // --- Listings, used by scaffolding ---

    /// List every application
    pub async fn list_applications(&self) -> Result<Vec<Application>> {
        self.catalog
            .list_applications()
            .await
            .map_err(|e| EngineError::api("list applications", e))
    }

    /// List environments of an application
    pub async fn list_environments(&self, application_id: &str) -> Result<Vec<Environment>> {
        self.catalog
            .list_environments(application_id)
            .await
            .map_err(|e| EngineError::api("list environments", e))
    }

    /// List configuration profiles of an application
    pub async fn list_configuration_profiles(
        &self,
        application_id: &str,
    ) -> Result<Vec<ProfileSummary>> {
        self.catalog
            .list_configuration_profiles(application_id)
            .await
            .map_err(|e| EngineError::api("list configuration profiles", e))
    }

    /// List deployment strategies
    pub async fn list_deployment_strategies(&self) -> Result<Vec<DeploymentStrategy>> {
        self.catalog
            .list_deployment_strategies()
            .await
            .map_err(|e| EngineError::api("list deployment strategies", e))
    }
}
