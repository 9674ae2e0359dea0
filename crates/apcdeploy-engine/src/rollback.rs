//! Rollback Controller - stop an in-progress deployment
//!
//! Stopping is the only way to roll back: the service reverts the
//! environment to the previous version. Completed deployments cannot be
//! stopped, so rollback applies to `DEPLOYING` and `BAKING` only.

use crate::api::DeploymentApi;
use crate::error::{EngineError, Result};
use crate::prompt::Prompter;
use crate::resolver::ResourceResolver;
use apcdeploy_types::Deployment;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Flag that skips the rollback confirmation
pub const SKIP_CONFIRMATION_FLAG: &str = "--yes";

/// Rolls back in-progress deployments
pub struct RollbackController {
    resolver: Arc<ResourceResolver>,
    api: Arc<dyn DeploymentApi>,
    prompter: Arc<dyn Prompter>,
}

impl RollbackController {
    pub fn new(
        resolver: Arc<ResourceResolver>,
        api: Arc<dyn DeploymentApi>,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        Self {
            resolver,
            api,
            prompter,
        }
    }

    /// Find the in-progress deployment of an environment
    #[instrument(skip(self))]
    pub async fn find_ongoing_deployment(
        &self,
        application_id: &str,
        environment_id: &str,
    ) -> Result<Deployment> {
        let mut deployments = self
            .api
            .list_deployments(application_id, environment_id)
            .await
            .map_err(|e| EngineError::api("list deployments", e))?;
        deployments.sort_by(|a, b| b.number.cmp(&a.number));

        let ongoing = deployments
            .into_iter()
            .find(|d| d.state.is_in_progress())
            .ok_or(EngineError::NoOngoingDeployment)?;

        self.api
            .get_deployment(application_id, environment_id, ongoing.number)
            .await
            .map_err(|e| EngineError::api("get deployment", e))
    }

    /// Stop a deployment
    #[instrument(skip(self))]
    pub async fn stop_deployment(
        &self,
        application_id: &str,
        environment_id: &str,
        number: i32,
    ) -> Result<Deployment> {
        let stopped = self
            .api
            .stop_deployment(application_id, environment_id, number)
            .await
            .map_err(|e| EngineError::api("stop deployment", e))?;
        info!(number, state = %stopped.state, "Stopped deployment");
        Ok(stopped)
    }

    /// Roll back the ongoing deployment of an environment, by name.
    ///
    /// Without `skip_confirmation` the operator must confirm; a session with
    /// no terminal fails before anything is resolved or stopped.
    #[instrument(skip(self))]
    pub async fn rollback(
        &self,
        application: &str,
        environment: &str,
        skip_confirmation: bool,
    ) -> Result<Deployment> {
        if !skip_confirmation && !self.prompter.is_interactive() {
            return Err(EngineError::NotInteractive {
                flag: SKIP_CONFIRMATION_FLAG,
            });
        }

        let application_id = self.resolver.resolve_application(application).await?;
        let environment_id = self
            .resolver
            .resolve_environment(&application_id, environment)
            .await?;

        let ongoing = self
            .find_ongoing_deployment(&application_id, &environment_id)
            .await?;

        if !skip_confirmation {
            let question = format!(
                "Roll back deployment #{} ({}, {:.0}% complete) in {}/{}?",
                ongoing.number,
                ongoing.state,
                ongoing.percentage_complete,
                application,
                environment
            );
            let confirmed = self
                .prompter
                .confirm(&question)
                .map_err(|e| EngineError::Prompt(e.to_string()))?;
            if !confirmed {
                warn!(number = ongoing.number, "Rollback declined");
                return Err(EngineError::UserDeclined);
            }
        }

        self.stop_deployment(&application_id, &environment_id, ongoing.number)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryAppConfig;
    use crate::prompt::ScriptedPrompter;
    use apcdeploy_types::{DeploymentState, ProfileKind};

    struct Fixture {
        store: Arc<InMemoryAppConfig>,
        app: String,
        env: String,
        profile: String,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryAppConfig::new());
        let app = store.add_application("app");
        let env = store.add_environment(&app, "prod");
        let profile = store.add_profile(&app, "cfg", ProfileKind::Freeform);
        Fixture {
            store,
            app,
            env,
            profile,
        }
    }

    impl Fixture {
        fn seed(&self, state: DeploymentState) -> i32 {
            self.store
                .seed_deployment(&self.app, &self.env, &self.profile, b"x", "text/plain", state)
        }

        fn controller(&self, prompter: Arc<dyn Prompter>) -> RollbackController {
            RollbackController::new(
                Arc::new(ResourceResolver::new(self.store.clone())),
                self.store.clone(),
                prompter,
            )
        }
    }

    #[tokio::test]
    async fn test_rollback_with_confirmation() {
        let f = fixture();
        f.seed(DeploymentState::Complete);
        let number = f.seed(DeploymentState::Baking);
        let prompter = Arc::new(ScriptedPrompter::interactive(true));

        let stopped = f
            .controller(prompter.clone())
            .rollback("app", "prod", false)
            .await
            .unwrap();

        assert_eq!(stopped.number, number);
        assert_eq!(stopped.state, DeploymentState::RolledBack);
        assert_eq!(prompter.prompt_count(), 1);
    }

    #[tokio::test]
    async fn test_rollback_skip_confirmation_never_prompts() {
        let f = fixture();
        f.seed(DeploymentState::Deploying);
        let prompter = Arc::new(ScriptedPrompter::non_interactive());

        let stopped = f
            .controller(prompter.clone())
            .rollback("app", "prod", true)
            .await
            .unwrap();

        assert_eq!(stopped.state, DeploymentState::RolledBack);
        assert_eq!(prompter.prompt_count(), 0);
    }

    #[tokio::test]
    async fn test_rollback_declined() {
        let f = fixture();
        f.seed(DeploymentState::Deploying);

        let err = f
            .controller(Arc::new(ScriptedPrompter::interactive(false)))
            .rollback("app", "prod", false)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::UserDeclined));
        assert_eq!(f.store.call_count("stop_deployment"), 0);
    }

    #[tokio::test]
    async fn test_rollback_requires_terminal_without_yes() {
        let f = fixture();
        f.seed(DeploymentState::Deploying);

        let err = f
            .controller(Arc::new(ScriptedPrompter::non_interactive()))
            .rollback("app", "prod", false)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::NotInteractive { flag: "--yes" }));
        assert_eq!(f.store.call_count("list_applications"), 0);
        assert_eq!(f.store.call_count("stop_deployment"), 0);
    }

    #[tokio::test]
    async fn test_rollback_without_ongoing_deployment() {
        let f = fixture();
        f.seed(DeploymentState::Complete);

        let err = f
            .controller(Arc::new(ScriptedPrompter::interactive(true)))
            .rollback("app", "prod", true)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::NoOngoingDeployment));
        assert_eq!(f.store.call_count("stop_deployment"), 0);
    }
}
