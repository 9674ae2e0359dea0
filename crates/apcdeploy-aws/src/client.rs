//! AWS AppConfig client
//!
//! Listings are paginated by following `next_token` until exhausted.

use crate::convert::{self, deployment_from_output};
use crate::error::classify;
use apcdeploy_engine::{
    ApiError, ApiResult, CreateVersionRequest, DeploymentApi, ResourceCatalog,
    StartDeploymentRequest,
};
use apcdeploy_types::{
    Application, ConfigurationProfile, ConfigurationVersion, Deployment, DeploymentStrategy,
    DeploymentSummary, Environment, ProfileKind, ProfileSummary,
};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_appconfig::primitives::Blob;
use aws_sdk_appconfig::Client;
use tracing::{debug, instrument};

/// AppConfig provider backed by the AWS SDK
#[derive(Debug, Clone)]
pub struct AwsAppConfig {
    client: Client,
}

impl AwsAppConfig {
    /// Create a client from the default credential chain.
    ///
    /// `region` overrides the region from the environment and profile.
    pub async fn new(region: Option<String>) -> ApiResult<Self> {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        let mut builder = aws_sdk_appconfig::config::Builder::from(&config);
        if let Some(region) = region {
            builder = builder.region(Region::new(region));
        }
        let sdk_config = builder.build();

        let Some(region) = sdk_config.region() else {
            return Err(ApiError::Other(
                "no AWS region configured; set one in apcdeploy.yml, with --region or AWS_REGION"
                    .to_string(),
            ));
        };
        debug!(region = %region, "Created AppConfig client");

        Ok(Self {
            client: Client::from_conf(sdk_config),
        })
    }

    /// Wrap an existing SDK client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceCatalog for AwsAppConfig {
    #[instrument(skip(self))]
    async fn list_applications(&self) -> ApiResult<Vec<Application>> {
        let mut applications = Vec::new();
        let mut next_token = None;
        loop {
            let page = self
                .client
                .list_applications()
                .set_next_token(next_token)
                .send()
                .await
                .map_err(classify)?;
            applications.extend(page.items().iter().map(|a| Application {
                id: a.id().unwrap_or_default().to_string(),
                name: a.name().unwrap_or_default().to_string(),
            }));
            next_token = page.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }
        Ok(applications)
    }

    #[instrument(skip(self))]
    async fn list_environments(&self, application_id: &str) -> ApiResult<Vec<Environment>> {
        let mut environments = Vec::new();
        let mut next_token = None;
        loop {
            let page = self
                .client
                .list_environments()
                .application_id(application_id)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(classify)?;
            environments.extend(page.items().iter().map(|e| Environment {
                id: e.id().unwrap_or_default().to_string(),
                name: e.name().unwrap_or_default().to_string(),
            }));
            next_token = page.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }
        Ok(environments)
    }

    #[instrument(skip(self))]
    async fn list_configuration_profiles(
        &self,
        application_id: &str,
    ) -> ApiResult<Vec<ProfileSummary>> {
        let mut profiles = Vec::new();
        let mut next_token = None;
        loop {
            let page = self
                .client
                .list_configuration_profiles()
                .application_id(application_id)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(classify)?;
            profiles.extend(page.items().iter().map(|p| ProfileSummary {
                id: p.id().unwrap_or_default().to_string(),
                name: p.name().unwrap_or_default().to_string(),
            }));
            next_token = page.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }
        Ok(profiles)
    }

    #[instrument(skip(self))]
    async fn get_configuration_profile(
        &self,
        application_id: &str,
        profile_id: &str,
    ) -> ApiResult<ConfigurationProfile> {
        let output = self
            .client
            .get_configuration_profile()
            .application_id(application_id)
            .configuration_profile_id(profile_id)
            .send()
            .await
            .map_err(classify)?;

        Ok(ConfigurationProfile {
            id: output.id().unwrap_or(profile_id).to_string(),
            name: output.name().unwrap_or_default().to_string(),
            kind: ProfileKind::from_type(output.r#type()),
        })
    }

    #[instrument(skip(self))]
    async fn list_deployment_strategies(&self) -> ApiResult<Vec<DeploymentStrategy>> {
        let mut strategies = Vec::new();
        let mut next_token = None;
        loop {
            let page = self
                .client
                .list_deployment_strategies()
                .set_next_token(next_token)
                .send()
                .await
                .map_err(classify)?;
            strategies.extend(page.items().iter().map(|s| DeploymentStrategy {
                id: s.id().unwrap_or_default().to_string(),
                name: s.name().unwrap_or_default().to_string(),
            }));
            next_token = page.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }
        Ok(strategies)
    }
}

#[async_trait]
impl DeploymentApi for AwsAppConfig {
    #[instrument(skip(self))]
    async fn list_deployments(
        &self,
        application_id: &str,
        environment_id: &str,
    ) -> ApiResult<Vec<DeploymentSummary>> {
        let mut deployments = Vec::new();
        let mut next_token = None;
        loop {
            let page = self
                .client
                .list_deployments()
                .application_id(application_id)
                .environment_id(environment_id)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(classify)?;
            deployments.extend(page.items().iter().map(convert::summary));
            next_token = page.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }
        Ok(deployments)
    }

    #[instrument(skip(self))]
    async fn get_deployment(
        &self,
        application_id: &str,
        environment_id: &str,
        number: i32,
    ) -> ApiResult<Deployment> {
        let output = self
            .client
            .get_deployment()
            .application_id(application_id)
            .environment_id(environment_id)
            .deployment_number(number)
            .send()
            .await
            .map_err(classify)?;
        Ok(deployment_from_output!(&output))
    }

    #[instrument(skip(self))]
    async fn get_configuration_version(
        &self,
        application_id: &str,
        profile_id: &str,
        version_number: i32,
    ) -> ApiResult<ConfigurationVersion> {
        let output = self
            .client
            .get_hosted_configuration_version()
            .application_id(application_id)
            .configuration_profile_id(profile_id)
            .version_number(version_number)
            .send()
            .await
            .map_err(classify)?;

        Ok(ConfigurationVersion {
            version_number: output.version_number(),
            content_type: output.content_type().unwrap_or_default().to_string(),
            content: output
                .content()
                .map(|blob| blob.as_ref().to_vec())
                .unwrap_or_default(),
        })
    }

    #[instrument(skip(self, request), fields(profile_id = %request.profile_id))]
    async fn create_configuration_version(
        &self,
        request: &CreateVersionRequest,
    ) -> ApiResult<ConfigurationVersion> {
        let output = self
            .client
            .create_hosted_configuration_version()
            .application_id(&request.application_id)
            .configuration_profile_id(&request.profile_id)
            .content(Blob::new(request.content.clone()))
            .content_type(&request.content_type)
            .set_description(request.description.clone())
            .send()
            .await
            .map_err(classify)?;

        Ok(ConfigurationVersion {
            version_number: output.version_number(),
            content_type: output
                .content_type()
                .unwrap_or(&request.content_type)
                .to_string(),
            content: request.content.clone(),
        })
    }

    #[instrument(skip(self, request), fields(version = request.version_number))]
    async fn start_deployment(&self, request: &StartDeploymentRequest) -> ApiResult<Deployment> {
        let output = self
            .client
            .start_deployment()
            .application_id(&request.application_id)
            .environment_id(&request.environment_id)
            .configuration_profile_id(&request.profile_id)
            .deployment_strategy_id(&request.strategy_id)
            .configuration_version(request.version_number.to_string())
            .set_description(request.description.clone())
            .send()
            .await
            .map_err(classify)?;
        Ok(deployment_from_output!(&output))
    }

    #[instrument(skip(self))]
    async fn stop_deployment(
        &self,
        application_id: &str,
        environment_id: &str,
        number: i32,
    ) -> ApiResult<Deployment> {
        let output = self
            .client
            .stop_deployment()
            .application_id(application_id)
            .environment_id(environment_id)
            .deployment_number(number)
            .send()
            .await
            .map_err(classify)?;
        Ok(deployment_from_output!(&output))
    }
}
