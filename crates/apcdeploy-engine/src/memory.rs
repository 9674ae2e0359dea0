//! In-memory implementation of the provider traits
//!
//! Suitable for development and testing. Besides behaving like the remote
//! service it can script deployment state sequences, inject failures and
//! count calls per operation.

use crate::api::{CreateVersionRequest, DeploymentApi, ResourceCatalog, StartDeploymentRequest};
use crate::error::{ApiError, ApiResult};
use apcdeploy_types::{
    Application, ConfigurationProfile, ConfigurationVersion, Deployment, DeploymentState,
    DeploymentStrategy, DeploymentSummary, Environment, ProfileKind, ProfileSummary,
    DEFAULT_STRATEGY, PREDEFINED_STRATEGIES,
};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

type EnvKey = (String, String);

/// In-memory AppConfig service
pub struct InMemoryAppConfig {
    next_id: AtomicU64,
    applications: DashMap<String, Application>,
    environments: DashMap<String, Vec<Environment>>,
    profiles: DashMap<String, Vec<ConfigurationProfile>>,
    strategies: DashMap<String, DeploymentStrategy>,
    /// Keyed by (application, profile)
    versions: DashMap<EnvKey, Vec<ConfigurationVersion>>,
    /// Keyed by (application, environment), in number order
    deployments: DashMap<EnvKey, Vec<Deployment>>,
    scripts: DashMap<(String, String, i32), VecDeque<DeploymentState>>,
    failures: DashMap<&'static str, VecDeque<ApiError>>,
    calls: DashMap<&'static str, usize>,
}

impl InMemoryAppConfig {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            applications: DashMap::new(),
            environments: DashMap::new(),
            profiles: DashMap::new(),
            strategies: DashMap::new(),
            versions: DashMap::new(),
            deployments: DashMap::new(),
            scripts: DashMap::new(),
            failures: DashMap::new(),
            calls: DashMap::new(),
        }
    }

    fn generate_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("{}{:06}", prefix, n)
    }

    // --- Setup ---

    /// Add an application, returning its ID
    pub fn add_application(&self, name: &str) -> String {
        let id = self.generate_id("app");
        self.applications.insert(
            id.clone(),
            Application {
                id: id.clone(),
                name: name.to_string(),
            },
        );
        id
    }

    /// Add an environment to an application, returning its ID
    pub fn add_environment(&self, application_id: &str, name: &str) -> String {
        let id = self.generate_id("env");
        self.environments
            .entry(application_id.to_string())
            .or_default()
            .push(Environment {
                id: id.clone(),
                name: name.to_string(),
            });
        id
    }

    /// Add a configuration profile to an application, returning its ID
    pub fn add_profile(&self, application_id: &str, name: &str, kind: ProfileKind) -> String {
        let id = self.generate_id("cp");
        self.profiles
            .entry(application_id.to_string())
            .or_default()
            .push(ConfigurationProfile {
                id: id.clone(),
                name: name.to_string(),
                kind,
            });
        id
    }

    /// Add a user-defined deployment strategy, returning its ID
    pub fn add_strategy(&self, name: &str) -> String {
        let id = self.generate_id("ds");
        self.strategies.insert(
            id.clone(),
            DeploymentStrategy {
                id: id.clone(),
                name: name.to_string(),
            },
        );
        id
    }

    /// Create a version and a deployment of it in the given state.
    ///
    /// Returns the deployment number.
    pub fn seed_deployment(
        &self,
        application_id: &str,
        environment_id: &str,
        profile_id: &str,
        content: &[u8],
        content_type: &str,
        state: DeploymentState,
    ) -> i32 {
        let version = self.push_version(application_id, profile_id, content.to_vec(), content_type);
        let mut deployments = self
            .deployments
            .entry((application_id.to_string(), environment_id.to_string()))
            .or_default();

        let number = deployments.len() as i32 + 1;
        let now = Utc::now();
        deployments.push(Deployment {
            number,
            percentage_complete: if state.has_reached_baking() { 100.0 } else { 0.0 },
            started_at: Some(now),
            completed_at: state.is_terminal().then_some(now),
            configuration_profile_id: profile_id.to_string(),
            configuration_version: version.version_number.to_string(),
            strategy_id: DEFAULT_STRATEGY.to_string(),
            description: None,
            state,
        });
        number
    }

    /// Script the states returned by successive `get_deployment` calls.
    ///
    /// Each call consumes one state; the last one sticks.
    pub fn script_states(
        &self,
        application_id: &str,
        environment_id: &str,
        number: i32,
        states: Vec<DeploymentState>,
    ) {
        self.scripts.insert(
            (application_id.to_string(), environment_id.to_string(), number),
            states.into(),
        );
    }

    /// Fail the next call of `operation` with `error`. Failures queue up.
    pub fn fail_next(&self, operation: &'static str, error: ApiError) {
        self.failures.entry(operation).or_default().push_back(error);
    }

    /// Number of calls made to `operation`, failed ones included
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls.get(operation).map(|c| *c).unwrap_or(0)
    }

    /// Hosted versions of a profile, oldest first
    pub fn versions(&self, application_id: &str, profile_id: &str) -> Vec<ConfigurationVersion> {
        self.versions
            .get(&(application_id.to_string(), profile_id.to_string()))
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    /// Current record of a deployment, without consuming scripted states
    pub fn deployment(
        &self,
        application_id: &str,
        environment_id: &str,
        number: i32,
    ) -> Option<Deployment> {
        self.deployments
            .get(&(application_id.to_string(), environment_id.to_string()))
            .and_then(|d| d.iter().find(|d| d.number == number).cloned())
    }

    // --- Internal helpers ---

    fn record(&self, operation: &'static str) -> ApiResult<()> {
        *self.calls.entry(operation).or_insert(0) += 1;
        let failure = self
            .failures
            .get_mut(operation)
            .and_then(|mut queue| queue.pop_front());
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn push_version(
        &self,
        application_id: &str,
        profile_id: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> ConfigurationVersion {
        let mut versions = self
            .versions
            .entry((application_id.to_string(), profile_id.to_string()))
            .or_default();
        let version = ConfigurationVersion {
            version_number: versions.len() as i32 + 1,
            content_type: content_type.to_string(),
            content,
        };
        versions.push(version.clone());
        version
    }

    fn profile(&self, application_id: &str, profile_id: &str) -> Option<ConfigurationProfile> {
        self.profiles
            .get(application_id)
            .and_then(|p| p.iter().find(|p| p.id == profile_id).cloned())
    }

    fn environment_exists(&self, application_id: &str, environment_id: &str) -> bool {
        self.environments
            .get(application_id)
            .is_some_and(|e| e.iter().any(|e| e.id == environment_id))
    }
}

impl Default for InMemoryAppConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn set_state(deployment: &mut Deployment, state: DeploymentState) {
    if state.has_reached_baking() {
        deployment.percentage_complete = 100.0;
    }
    if state.is_terminal() && deployment.completed_at.is_none() {
        deployment.completed_at = Some(Utc::now());
    }
    deployment.state = state;
}

#[async_trait]
impl ResourceCatalog for InMemoryAppConfig {
    async fn list_applications(&self) -> ApiResult<Vec<Application>> {
        self.record("list_applications")?;
        Ok(self.applications.iter().map(|a| a.value().clone()).collect())
    }

    async fn list_environments(&self, application_id: &str) -> ApiResult<Vec<Environment>> {
        self.record("list_environments")?;
        if !self.applications.contains_key(application_id) {
            return Err(ApiError::NotFound(format!("application {}", application_id)));
        }
        Ok(self
            .environments
            .get(application_id)
            .map(|e| e.clone())
            .unwrap_or_default())
    }

    async fn list_configuration_profiles(
        &self,
        application_id: &str,
    ) -> ApiResult<Vec<ProfileSummary>> {
        self.record("list_configuration_profiles")?;
        if !self.applications.contains_key(application_id) {
            return Err(ApiError::NotFound(format!("application {}", application_id)));
        }
        Ok(self
            .profiles
            .get(application_id)
            .map(|p| {
                p.iter()
                    .map(|p| ProfileSummary {
                        id: p.id.clone(),
                        name: p.name.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_configuration_profile(
        &self,
        application_id: &str,
        profile_id: &str,
    ) -> ApiResult<ConfigurationProfile> {
        self.record("get_configuration_profile")?;
        self.profile(application_id, profile_id)
            .ok_or_else(|| ApiError::NotFound(format!("configuration profile {}", profile_id)))
    }

    async fn list_deployment_strategies(&self) -> ApiResult<Vec<DeploymentStrategy>> {
        self.record("list_deployment_strategies")?;
        let mut strategies: Vec<DeploymentStrategy> = PREDEFINED_STRATEGIES
            .iter()
            .map(|name| DeploymentStrategy {
                id: name.to_string(),
                name: name.to_string(),
            })
            .collect();
        strategies.extend(self.strategies.iter().map(|s| s.value().clone()));
        Ok(strategies)
    }
}

#[async_trait]
impl DeploymentApi for InMemoryAppConfig {
    async fn list_deployments(
        &self,
        application_id: &str,
        environment_id: &str,
    ) -> ApiResult<Vec<DeploymentSummary>> {
        self.record("list_deployments")?;
        let deployments = self
            .deployments
            .get(&(application_id.to_string(), environment_id.to_string()))
            .map(|d| d.clone())
            .unwrap_or_default();

        Ok(deployments
            .into_iter()
            .map(|d| DeploymentSummary {
                configuration_name: self
                    .profile(application_id, &d.configuration_profile_id)
                    .map(|p| p.name)
                    .unwrap_or_default(),
                number: d.number,
                state: d.state,
                percentage_complete: d.percentage_complete,
                started_at: d.started_at,
                completed_at: d.completed_at,
                configuration_version: d.configuration_version,
            })
            .collect())
    }

    async fn get_deployment(
        &self,
        application_id: &str,
        environment_id: &str,
        number: i32,
    ) -> ApiResult<Deployment> {
        self.record("get_deployment")?;
        let mut deployments = self
            .deployments
            .get_mut(&(application_id.to_string(), environment_id.to_string()))
            .ok_or_else(|| ApiError::NotFound(format!("deployment {}", number)))?;
        let deployment = deployments
            .iter_mut()
            .find(|d| d.number == number)
            .ok_or_else(|| ApiError::NotFound(format!("deployment {}", number)))?;

        let key = (application_id.to_string(), environment_id.to_string(), number);
        if let Some(mut script) = self.scripts.get_mut(&key) {
            let next = if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            };
            if let Some(state) = next {
                set_state(deployment, state);
            }
        }
        Ok(deployment.clone())
    }

    async fn get_configuration_version(
        &self,
        application_id: &str,
        profile_id: &str,
        version_number: i32,
    ) -> ApiResult<ConfigurationVersion> {
        self.record("get_configuration_version")?;
        self.versions
            .get(&(application_id.to_string(), profile_id.to_string()))
            .and_then(|v| v.iter().find(|v| v.version_number == version_number).cloned())
            .ok_or_else(|| ApiError::NotFound(format!("configuration version {}", version_number)))
    }

    async fn create_configuration_version(
        &self,
        request: &CreateVersionRequest,
    ) -> ApiResult<ConfigurationVersion> {
        self.record("create_configuration_version")?;
        if self.profile(&request.application_id, &request.profile_id).is_none() {
            return Err(ApiError::NotFound(format!(
                "configuration profile {}",
                request.profile_id
            )));
        }
        Ok(self.push_version(
            &request.application_id,
            &request.profile_id,
            request.content.clone(),
            &request.content_type,
        ))
    }

    async fn start_deployment(&self, request: &StartDeploymentRequest) -> ApiResult<Deployment> {
        self.record("start_deployment")?;
        if !self.environment_exists(&request.application_id, &request.environment_id) {
            return Err(ApiError::NotFound(format!(
                "environment {}",
                request.environment_id
            )));
        }
        let version_exists = self
            .versions
            .get(&(request.application_id.clone(), request.profile_id.clone()))
            .is_some_and(|v| v.iter().any(|v| v.version_number == request.version_number));
        if !version_exists {
            return Err(ApiError::NotFound(format!(
                "configuration version {}",
                request.version_number
            )));
        }

        let mut deployments = self
            .deployments
            .entry((request.application_id.clone(), request.environment_id.clone()))
            .or_default();
        if let Some(ongoing) = deployments.iter().find(|d| d.state.is_in_progress()) {
            return Err(ApiError::Conflict(format!(
                "deployment #{} is in progress",
                ongoing.number
            )));
        }

        let deployment = Deployment {
            number: deployments.len() as i32 + 1,
            state: DeploymentState::Deploying,
            percentage_complete: 0.0,
            started_at: Some(Utc::now()),
            completed_at: None,
            configuration_profile_id: request.profile_id.clone(),
            configuration_version: request.version_number.to_string(),
            strategy_id: request.strategy_id.clone(),
            description: request.description.clone(),
        };
        deployments.push(deployment.clone());
        Ok(deployment)
    }

    async fn stop_deployment(
        &self,
        application_id: &str,
        environment_id: &str,
        number: i32,
    ) -> ApiResult<Deployment> {
        self.record("stop_deployment")?;
        let mut deployments = self
            .deployments
            .get_mut(&(application_id.to_string(), environment_id.to_string()))
            .ok_or_else(|| ApiError::NotFound(format!("deployment {}", number)))?;
        let deployment = deployments
            .iter_mut()
            .find(|d| d.number == number)
            .ok_or_else(|| ApiError::NotFound(format!("deployment {}", number)))?;

        if !deployment.state.is_in_progress() {
            return Err(ApiError::Conflict(format!(
                "deployment #{} is {} and cannot be stopped",
                number, deployment.state
            )));
        }
        self.scripts
            .remove(&(application_id.to_string(), environment_id.to_string(), number));
        set_state(deployment, DeploymentState::RolledBack);
        Ok(deployment.clone())
    }
}
