//! Capability traits for the remote configuration service
//!
//! Each collaborator gets one narrow trait. Production adapters and test
//! doubles implement the same traits and are injected at construction.

use crate::error::ApiResult;
use apcdeploy_types::{
    Application, ConfigurationProfile, ConfigurationVersion, Deployment, DeploymentStrategy,
    DeploymentSummary, Environment, ProfileSummary,
};
use async_trait::async_trait;

/// Read-only access to pre-existing resources
#[async_trait]
pub trait ResourceCatalog: Send + Sync {
    /// List every application
    async fn list_applications(&self) -> ApiResult<Vec<Application>>;

    /// List environments of an application
    async fn list_environments(&self, application_id: &str) -> ApiResult<Vec<Environment>>;

    /// List configuration profiles of an application
    async fn list_configuration_profiles(
        &self,
        application_id: &str,
    ) -> ApiResult<Vec<ProfileSummary>>;

    /// Describe one configuration profile, including its kind
    async fn get_configuration_profile(
        &self,
        application_id: &str,
        profile_id: &str,
    ) -> ApiResult<ConfigurationProfile>;

    /// List predefined and user-defined deployment strategies
    async fn list_deployment_strategies(&self) -> ApiResult<Vec<DeploymentStrategy>>;
}

/// Request to create a hosted configuration version
#[derive(Debug, Clone)]
pub struct CreateVersionRequest {
    pub application_id: String,
    pub profile_id: String,
    pub content: Vec<u8>,
    pub content_type: String,
    pub description: Option<String>,
}

/// Request to start a deployment
#[derive(Debug, Clone)]
pub struct StartDeploymentRequest {
    pub application_id: String,
    pub environment_id: String,
    pub profile_id: String,
    pub strategy_id: String,
    pub version_number: i32,
    pub description: Option<String>,
}

/// Hosted versions and deployments
#[async_trait]
pub trait DeploymentApi: Send + Sync {
    /// List deployments of an environment, in any order
    async fn list_deployments(
        &self,
        application_id: &str,
        environment_id: &str,
    ) -> ApiResult<Vec<DeploymentSummary>>;

    /// Get one deployment by number
    async fn get_deployment(
        &self,
        application_id: &str,
        environment_id: &str,
        number: i32,
    ) -> ApiResult<Deployment>;

    /// Fetch a hosted configuration version, content included
    async fn get_configuration_version(
        &self,
        application_id: &str,
        profile_id: &str,
        version_number: i32,
    ) -> ApiResult<ConfigurationVersion>;

    /// Create a new hosted configuration version
    async fn create_configuration_version(
        &self,
        request: &CreateVersionRequest,
    ) -> ApiResult<ConfigurationVersion>;

    /// Start a deployment of an existing version
    async fn start_deployment(&self, request: &StartDeploymentRequest) -> ApiResult<Deployment>;

    /// Stop an in-progress deployment, rolling it back
    async fn stop_deployment(
        &self,
        application_id: &str,
        environment_id: &str,
        number: i32,
    ) -> ApiResult<Deployment>;
}
