//! Deployment Orchestrator - diff, deploy and observe
//!
//! The orchestrator is the main entry point for deployment operations. For a
//! resolved resource set it:
//!
//! 1. fetches the currently deployed version of the profile, if any
//! 2. normalizes local and remote content and skips when nothing changed
//! 3. refuses to start while another deployment is in progress
//! 4. creates a hosted version and starts a deployment
//! 5. optionally polls until the rollout or the bake finishes
//!
//! Steps 3 and 4 are never retried. The check in step 3 narrows but does not
//! close the window in which another operator may start a deployment; the
//! provider rejects that case on start.

use crate::api::{CreateVersionRequest, DeploymentApi, StartDeploymentRequest};
use crate::clock::{Clock, SystemClock};
use crate::diff::{self, DiffResult};
use crate::error::{ApiError, EngineError, ResourceType, Result};
use crate::normalize::normalize;
use crate::wait::{WaitMachine, WaitMode, WaitStep};
use apcdeploy_types::{
    ContentFormat, ConfigurationVersion, Deployment, DeploymentSummary, ResolvedResourceSet,
    DEFAULT_STRATEGY,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Delay between two polls of a deployment
    pub poll_interval: Duration,
    /// Wait budget when a deploy does not specify one
    pub default_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            default_timeout: Duration::from_secs(600),
        }
    }
}

/// Per-deploy options
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// Deploy even when the content is unchanged
    pub force: bool,
    pub wait: WaitMode,
    /// Overrides [`OrchestratorConfig::default_timeout`]
    pub timeout: Option<Duration>,
    pub description: Option<String>,
}

/// The version currently deployed for a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployedConfiguration {
    pub deployment: Deployment,
    pub version: ConfigurationVersion,
}

/// Local content compared against the deployed version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffReport {
    pub diff: DiffResult,
    /// `None` when nothing has been deployed for the profile yet
    pub deployed: Option<DeployedConfiguration>,
}

/// Observer notified on every successful poll
pub trait DeploymentObserver: Send + Sync {
    fn on_update(&self, deployment: &Deployment);
}

impl DeploymentObserver for () {
    fn on_update(&self, _deployment: &Deployment) {}
}

/// Result of a completed wait
#[derive(Debug, Clone, PartialEq)]
pub struct WaitOutcome {
    pub deployment: Deployment,
    pub polls: u32,
}

/// Result of [`DeploymentOrchestrator::deploy`]
#[derive(Debug, Clone, PartialEq)]
pub enum DeployOutcome {
    /// Content unchanged; nothing was created or started
    Skipped { report: DiffReport },

    /// A new version was created and deployed
    Deployed {
        report: DiffReport,
        version_number: i32,
        deployment: Deployment,
        wait: Option<WaitOutcome>,
    },
}

impl DeployOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, DeployOutcome::Skipped { .. })
    }

    pub fn report(&self) -> &DiffReport {
        match self {
            DeployOutcome::Skipped { report } | DeployOutcome::Deployed { report, .. } => report,
        }
    }
}

/// Orchestrates deployments of one profile to one environment
pub struct DeploymentOrchestrator {
    api: Arc<dyn DeploymentApi>,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn DeploymentObserver>,
    config: OrchestratorConfig,
}

impl DeploymentOrchestrator {
    /// Create an orchestrator using the system clock
    pub fn new(api: Arc<dyn DeploymentApi>, config: OrchestratorConfig) -> Self {
        Self {
            api,
            clock: Arc::new(SystemClock),
            observer: Arc::new(()),
            config,
        }
    }

    /// Replace the clock used by the wait loop
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register an observer for poll updates
    pub fn with_observer(mut self, observer: Arc<dyn DeploymentObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Report whether the environment's latest deployment is in progress
    #[instrument(skip(self))]
    pub async fn check_ongoing_deployment(
        &self,
        application_id: &str,
        environment_id: &str,
    ) -> Result<(bool, Option<DeploymentSummary>)> {
        let latest = self
            .list_deployments(application_id, environment_id)
            .await?
            .into_iter()
            .next();

        let ongoing = latest
            .as_ref()
            .is_some_and(|d| d.state.is_in_progress());
        debug!(ongoing, latest = ?latest.as_ref().map(|d| d.number), "Checked ongoing deployment");
        Ok((ongoing, latest))
    }

    /// Fetch the version currently deployed for the profile.
    ///
    /// This is the highest-numbered deployment of the profile that was not
    /// rolled back, including one still in progress.
    #[instrument(skip(self, resolved), fields(profile_id = %resolved.profile.id))]
    pub async fn fetch_deployed(
        &self,
        resolved: &ResolvedResourceSet,
    ) -> Result<Option<DeployedConfiguration>> {
        let Some(deployment) = self
            .latest_profile_deployment(resolved, |d| !d.state.is_rolled_back())
            .await?
        else {
            debug!("No deployment found for profile");
            return Ok(None);
        };

        let version_number: i32 = deployment.configuration_version.parse().map_err(|_| {
            EngineError::api(
                "get deployment",
                ApiError::Other(format!(
                    "deployment #{} references non-numeric version {:?}",
                    deployment.number, deployment.configuration_version
                )),
            )
        })?;

        let version = self
            .api
            .get_configuration_version(
                &resolved.application_id,
                &resolved.profile.id,
                version_number,
            )
            .await
            .map_err(|e| EngineError::api("get configuration version", e))?;

        debug!(
            deployment = deployment.number,
            version = version.version_number,
            "Fetched deployed configuration"
        );
        Ok(Some(DeployedConfiguration {
            deployment,
            version,
        }))
    }

    /// Compare local content against the deployed version
    #[instrument(skip(self, resolved, content), fields(profile_id = %resolved.profile.id))]
    pub async fn diff(
        &self,
        resolved: &ResolvedResourceSet,
        content: &[u8],
        format: ContentFormat,
    ) -> Result<DiffReport> {
        let deployed = self.fetch_deployed(resolved).await?;
        let diff = compare_with_deployed(content, format, resolved, deployed.as_ref(), false)?;
        Ok(DiffReport { diff, deployed })
    }

    /// Build the report a deploy acts on.
    ///
    /// Same as [`diff`](Self::diff), except that with `force` a deployed
    /// version that no longer parses is compared as raw text, so a fix can
    /// still be pushed over it.
    #[instrument(skip(self, resolved, content, options), fields(profile_id = %resolved.profile.id))]
    pub async fn plan(
        &self,
        resolved: &ResolvedResourceSet,
        content: &[u8],
        format: ContentFormat,
        options: &DeployOptions,
    ) -> Result<DiffReport> {
        let deployed = self.fetch_deployed(resolved).await?;
        let diff = compare_with_deployed(
            content,
            format,
            resolved,
            deployed.as_ref(),
            options.force,
        )?;
        Ok(DiffReport { diff, deployed })
    }

    /// Deploy local content unless it matches what is already deployed
    pub async fn deploy(
        &self,
        resolved: &ResolvedResourceSet,
        content: &[u8],
        format: ContentFormat,
        options: &DeployOptions,
    ) -> Result<DeployOutcome> {
        let report = self.plan(resolved, content, format, options).await?;
        self.deploy_report(resolved, report, content, format, options)
            .await
    }

    /// Deploy local content against a report from [`plan`](Self::plan).
    ///
    /// Callers that want to show the diff whatever the deploy's result
    /// should do so before calling this.
    #[instrument(
        skip(self, resolved, report, content, options),
        fields(
            application_id = %resolved.application_id,
            environment_id = %resolved.environment_id,
            profile_id = %resolved.profile.id,
            force = options.force,
        )
    )]
    pub async fn deploy_report(
        &self,
        resolved: &ResolvedResourceSet,
        report: DiffReport,
        content: &[u8],
        format: ContentFormat,
        options: &DeployOptions,
    ) -> Result<DeployOutcome> {
        // 1-2. Skip when the deployed version already matches
        if report.deployed.is_some() && !report.diff.has_changes && !options.force {
            info!("Content unchanged, skipping deployment");
            return Ok(DeployOutcome::Skipped { report });
        }

        // 3. One deployment at a time per environment
        let (ongoing, latest) = self
            .check_ongoing_deployment(&resolved.application_id, &resolved.environment_id)
            .await?;
        if let (true, Some(current)) = (ongoing, latest) {
            warn!(number = current.number, state = %current.state, "Deployment already in progress");
            return Err(EngineError::Conflict {
                number: current.number,
                state: current.state,
                started_at: current.started_at,
            });
        }

        // 4. Create the version and start the deployment
        let version = self
            .api
            .create_configuration_version(&CreateVersionRequest {
                application_id: resolved.application_id.clone(),
                profile_id: resolved.profile.id.clone(),
                content: content.to_vec(),
                content_type: format.content_type().to_string(),
                description: options.description.clone(),
            })
            .await
            .map_err(|e| EngineError::api("create configuration version", e))?;
        info!(version = version.version_number, "Created configuration version");

        let strategy_id = resolved
            .strategy_id
            .clone()
            .unwrap_or_else(|| DEFAULT_STRATEGY.to_string());
        let deployment = self
            .api
            .start_deployment(&StartDeploymentRequest {
                application_id: resolved.application_id.clone(),
                environment_id: resolved.environment_id.clone(),
                profile_id: resolved.profile.id.clone(),
                strategy_id,
                version_number: version.version_number,
                description: options.description.clone(),
            })
            .await
            .map_err(|e| EngineError::api("start deployment", e))?;
        info!(number = deployment.number, state = %deployment.state, "Started deployment");

        // 5. Optional wait
        let wait = match options.wait {
            WaitMode::None => None,
            mode => {
                let timeout = options.timeout.unwrap_or(self.config.default_timeout);
                Some(
                    self.wait(
                        &resolved.application_id,
                        &resolved.environment_id,
                        deployment.number,
                        mode,
                        timeout,
                    )
                    .await?,
                )
            }
        };

        Ok(DeployOutcome::Deployed {
            report,
            version_number: version.version_number,
            deployment,
            wait,
        })
    }

    /// Poll a deployment until the wait mode is satisfied.
    ///
    /// Transient poll errors are retried until the deadline; any other error
    /// aborts the wait. Timing out leaves the remote deployment running.
    #[instrument(skip(self))]
    pub async fn wait(
        &self,
        application_id: &str,
        environment_id: &str,
        number: i32,
        mode: WaitMode,
        timeout: Duration,
    ) -> Result<WaitOutcome> {
        // No deadline when the budget overflows the clock
        let deadline = self.clock.now().checked_add(timeout);
        if deadline.is_none() {
            debug!(timeout_secs = timeout.as_secs(), "Wait budget exceeds the clock range, waiting without deadline");
        }
        let mut machine = WaitMachine::new(mode);
        let mut polls = 0u32;

        loop {
            polls += 1;
            match self
                .api
                .get_deployment(application_id, environment_id, number)
                .await
            {
                Ok(deployment) => {
                    self.observer.on_update(&deployment);
                    match machine.observe(&deployment.state) {
                        WaitStep::Succeeded => {
                            info!(number, state = %deployment.state, polls, "Wait finished");
                            return Ok(WaitOutcome { deployment, polls });
                        }
                        WaitStep::Failed => {
                            warn!(number, state = %deployment.state, "Deployment rolled back");
                            return Err(EngineError::RolledBack {
                                number,
                                state: deployment.state,
                            });
                        }
                        WaitStep::Continue => {
                            debug!(
                                number,
                                state = %deployment.state,
                                percent = deployment.percentage_complete,
                                "Deployment in progress"
                            );
                        }
                    }
                }
                Err(e) if e.is_transient() => {
                    warn!(number, error = %e, "Transient error while polling, retrying");
                }
                Err(e) => return Err(EngineError::api("get deployment", e)),
            }

            let now = self.clock.now();
            let pause = match deadline {
                Some(deadline) if now >= deadline => {
                    return Err(EngineError::Timeout {
                        last_observed_state: machine.last_observed().cloned(),
                        timeout,
                    });
                }
                Some(deadline) => self.config.poll_interval.min(deadline - now),
                None => self.config.poll_interval,
            };
            self.clock.sleep(pause).await;
        }
    }

    /// Report a deployment of the profile: the given number, or the latest
    #[instrument(skip(self, resolved), fields(profile_id = %resolved.profile.id))]
    pub async fn status(
        &self,
        resolved: &ResolvedResourceSet,
        number: Option<i32>,
    ) -> Result<Deployment> {
        match number {
            Some(number) => self
                .api
                .get_deployment(&resolved.application_id, &resolved.environment_id, number)
                .await
                .map_err(|e| EngineError::api("get deployment", e)),
            None => self
                .latest_profile_deployment(resolved, |_| true)
                .await?
                .ok_or_else(|| EngineError::NotFound {
                    resource_type: ResourceType::Deployment,
                    name: resolved.profile.name.clone(),
                }),
        }
    }

    // --- Internal helpers ---

    /// Deployments of the environment, newest first
    async fn list_deployments(
        &self,
        application_id: &str,
        environment_id: &str,
    ) -> Result<Vec<DeploymentSummary>> {
        let mut deployments = self
            .api
            .list_deployments(application_id, environment_id)
            .await
            .map_err(|e| EngineError::api("list deployments", e))?;
        deployments.sort_by(|a, b| b.number.cmp(&a.number));
        Ok(deployments)
    }

    /// Newest deployment of the resolved profile accepted by `filter`.
    ///
    /// Listings only carry the profile name, so candidates are confirmed by
    /// profile ID on the full deployment.
    async fn latest_profile_deployment(
        &self,
        resolved: &ResolvedResourceSet,
        filter: impl Fn(&DeploymentSummary) -> bool,
    ) -> Result<Option<Deployment>> {
        let summaries = self
            .list_deployments(&resolved.application_id, &resolved.environment_id)
            .await?;

        for summary in summaries
            .iter()
            .filter(|d| d.configuration_name == resolved.profile.name && filter(*d))
        {
            let deployment = self
                .api
                .get_deployment(
                    &resolved.application_id,
                    &resolved.environment_id,
                    summary.number,
                )
                .await
                .map_err(|e| EngineError::api("get deployment", e))?;
            if deployment.configuration_profile_id == resolved.profile.id {
                return Ok(Some(deployment));
            }
        }
        Ok(None)
    }
}

/// Normalize both sides and diff them.
///
/// The remote side uses the format of its stored content type, falling back
/// to the local format. Remote parse errors name the deployed version; with
/// `raw_fallback` the unparsable remote is diffed as-is instead.
fn compare_with_deployed(
    content: &[u8],
    format: ContentFormat,
    resolved: &ResolvedResourceSet,
    deployed: Option<&DeployedConfiguration>,
    raw_fallback: bool,
) -> Result<DiffResult> {
    let kind = resolved.profile.kind;
    let local = normalize(content, format, kind)?;

    let remote = match deployed {
        Some(d) => {
            let remote_format = d.version.format().unwrap_or(format);
            match normalize(&d.version.content, remote_format, kind) {
                Ok(text) => text,
                Err(EngineError::Parse { format, detail }) if raw_fallback => {
                    warn!(
                        version = d.version.version_number,
                        %format,
                        detail = %detail,
                        "Deployed version does not parse, comparing raw content"
                    );
                    String::from_utf8_lossy(&d.version.content).into_owned()
                }
                Err(EngineError::Parse { format, detail }) => {
                    return Err(EngineError::Parse {
                        format,
                        detail: format!("deployed version {}: {}", d.version.version_number, detail),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        None => String::new(),
    };

    let remote_label = match deployed {
        Some(d) => format!("deployed (version {})", d.version.version_number),
        None => "deployed (none)".to_string(),
    };
    Ok(diff::compare_labeled(&local, &remote, &remote_label, "local"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::memory::InMemoryAppConfig;
    use apcdeploy_types::{DeploymentState, ProfileKind, ResolvedProfile};

    struct Fixture {
        store: Arc<InMemoryAppConfig>,
        clock: Arc<ManualClock>,
        orchestrator: DeploymentOrchestrator,
        resolved: ResolvedResourceSet,
    }

    fn fixture(kind: ProfileKind) -> Fixture {
        let store = Arc::new(InMemoryAppConfig::new());
        let app = store.add_application("app");
        let env = store.add_environment(&app, "prod");
        let profile = store.add_profile(&app, "cfg", kind);
        let clock = Arc::new(ManualClock::new());
        let orchestrator =
            DeploymentOrchestrator::new(store.clone(), OrchestratorConfig::default())
                .with_clock(clock.clone());

        Fixture {
            store,
            clock,
            orchestrator,
            resolved: ResolvedResourceSet {
                application_id: app,
                profile: ResolvedProfile {
                    id: profile,
                    name: "cfg".into(),
                    kind,
                },
                environment_id: env,
                strategy_id: None,
            },
        }
    }

    impl Fixture {
        fn seed(&self, content: &str, state: DeploymentState) -> i32 {
            self.store.seed_deployment(
                &self.resolved.application_id,
                &self.resolved.environment_id,
                &self.resolved.profile.id,
                content.as_bytes(),
                "application/json",
                state,
            )
        }

        fn mutations(&self) -> usize {
            self.store.call_count("create_configuration_version")
                + self.store.call_count("start_deployment")
        }
    }

    #[tokio::test]
    async fn test_unchanged_content_is_skipped() {
        let f = fixture(ProfileKind::Freeform);
        f.seed(r#"{"a": 1, "b": 2}"#, DeploymentState::Complete);

        let outcome = f
            .orchestrator
            .deploy(&f.resolved, br#"{"b":2,"a":1}"#, ContentFormat::Json, &DeployOptions::default())
            .await
            .unwrap();

        assert!(outcome.is_skipped());
        assert_eq!(f.mutations(), 0);
    }

    #[tokio::test]
    async fn test_force_deploys_unchanged_content() {
        let f = fixture(ProfileKind::Freeform);
        f.seed(r#"{"a": 1}"#, DeploymentState::Complete);

        let options = DeployOptions {
            force: true,
            ..Default::default()
        };
        let outcome = f
            .orchestrator
            .deploy(&f.resolved, br#"{"a": 1}"#, ContentFormat::Json, &options)
            .await
            .unwrap();

        assert!(!outcome.is_skipped());
        assert_eq!(f.store.call_count("start_deployment"), 1);
    }

    #[tokio::test]
    async fn test_first_deployment_always_deploys() {
        let f = fixture(ProfileKind::Freeform);

        let outcome = f
            .orchestrator
            .deploy(&f.resolved, b"", ContentFormat::Text, &DeployOptions::default())
            .await
            .unwrap();

        match outcome {
            DeployOutcome::Deployed {
                report,
                version_number,
                deployment,
                wait,
            } => {
                assert!(report.deployed.is_none());
                assert_eq!(version_number, 1);
                assert_eq!(deployment.number, 1);
                assert_eq!(deployment.strategy_id, DEFAULT_STRATEGY);
                assert!(wait.is_none());
            }
            other => panic!("expected Deployed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ongoing_deployment_conflicts() {
        let f = fixture(ProfileKind::Freeform);
        f.seed(r#"{"a": 1}"#, DeploymentState::Deploying);

        let err = f
            .orchestrator
            .deploy(&f.resolved, br#"{"a": 2}"#, ContentFormat::Json, &DeployOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Conflict {
                number: 1,
                state: DeploymentState::Deploying,
                ..
            }
        ));
        assert_eq!(f.mutations(), 0);
    }

    #[tokio::test]
    async fn test_plan_keeps_diff_when_deploy_conflicts() {
        let f = fixture(ProfileKind::Freeform);
        f.seed(r#"{"a": 1}"#, DeploymentState::Deploying);
        let options = DeployOptions::default();

        let report = f
            .orchestrator
            .plan(&f.resolved, br#"{"a": 2}"#, ContentFormat::Json, &options)
            .await
            .unwrap();
        assert!(report.diff.has_changes);
        assert!(report.diff.unified_diff.contains("-  \"a\": 1"));
        assert!(report.diff.unified_diff.contains("+  \"a\": 2"));

        let err = f
            .orchestrator
            .deploy_report(&f.resolved, report.clone(), br#"{"a": 2}"#, ContentFormat::Json, &options)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict { number: 1, .. }));
        assert_eq!(report.deployed.map(|d| d.version.version_number), Some(1));
        assert_eq!(f.mutations(), 0);
    }

    #[tokio::test]
    async fn test_unparsable_deployed_version_is_named() {
        let f = fixture(ProfileKind::Freeform);
        f.seed("{broken", DeploymentState::Complete);

        let err = f
            .orchestrator
            .deploy(&f.resolved, br#"{"a": 1}"#, ContentFormat::Json, &DeployOptions::default())
            .await
            .unwrap_err();

        match err {
            EngineError::Parse { format, detail } => {
                assert_eq!(format, ContentFormat::Json);
                assert!(detail.starts_with("deployed version 1: "), "{detail}");
            }
            other => panic!("expected Parse, got {other:?}"),
        }
        assert_eq!(f.mutations(), 0);
    }

    #[tokio::test]
    async fn test_force_deploys_over_unparsable_deployed_version() {
        let f = fixture(ProfileKind::Freeform);
        f.seed("{broken", DeploymentState::Complete);

        let options = DeployOptions {
            force: true,
            ..Default::default()
        };
        let outcome = f
            .orchestrator
            .deploy(&f.resolved, br#"{"a": 1}"#, ContentFormat::Json, &options)
            .await
            .unwrap();

        assert!(!outcome.is_skipped());
        let diff = &outcome.report().diff;
        assert!(diff.unified_diff.contains("-{broken"));
        assert!(diff.unified_diff.contains("+  \"a\": 1"));
        assert_eq!(f.store.call_count("start_deployment"), 1);
    }

    #[tokio::test]
    async fn test_local_parse_error_is_not_relabeled() {
        let f = fixture(ProfileKind::Freeform);
        f.seed(r#"{"a": 1}"#, DeploymentState::Complete);

        let options = DeployOptions {
            force: true,
            ..Default::default()
        };
        let err = f
            .orchestrator
            .deploy(&f.resolved, b"{not json", ContentFormat::Json, &options)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Parse { ref detail, .. } if !detail.starts_with("deployed")));
        assert_eq!(f.mutations(), 0);
    }

    #[tokio::test]
    async fn test_parse_error_aborts_before_mutation() {
        let f = fixture(ProfileKind::Freeform);

        let err = f
            .orchestrator
            .deploy(&f.resolved, b"{not json", ContentFormat::Json, &DeployOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Parse { .. }));
        assert_eq!(f.mutations(), 0);
    }

    #[tokio::test]
    async fn test_validation_error_surfaces_verbatim() {
        let f = fixture(ProfileKind::Freeform);
        f.store.fail_next(
            "create_configuration_version",
            ApiError::Validation("Validator lambda rejected: missing 'limit'".into()),
        );

        let err = f
            .orchestrator
            .deploy(&f.resolved, br#"{"a": 1}"#, ContentFormat::Json, &DeployOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Validation(ref m) if m == "Validator lambda rejected: missing 'limit'"));
        assert_eq!(f.store.call_count("start_deployment"), 0);
    }

    #[tokio::test]
    async fn test_start_deployment_not_retried() {
        let f = fixture(ProfileKind::Freeform);
        f.store
            .fail_next("start_deployment", ApiError::Transient("throttled".into()));

        let err = f
            .orchestrator
            .deploy(&f.resolved, br#"{"a": 1}"#, ContentFormat::Json, &DeployOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Api { operation: "start deployment", .. }));
        assert_eq!(f.store.call_count("start_deployment"), 1);
    }

    #[tokio::test]
    async fn test_wait_deploy_until_baking() {
        let f = fixture(ProfileKind::Freeform);
        f.store.script_states(
            &f.resolved.application_id,
            &f.resolved.environment_id,
            1,
            vec![
                DeploymentState::Deploying,
                DeploymentState::Deploying,
                DeploymentState::Baking,
            ],
        );

        let options = DeployOptions {
            wait: WaitMode::Deploy,
            ..Default::default()
        };
        let outcome = f
            .orchestrator
            .deploy(&f.resolved, br#"{"a": 1}"#, ContentFormat::Json, &options)
            .await
            .unwrap();

        match outcome {
            DeployOutcome::Deployed { wait: Some(wait), .. } => {
                assert_eq!(wait.deployment.state, DeploymentState::Baking);
                assert_eq!(wait.polls, 3);
            }
            other => panic!("expected a finished wait, got {other:?}"),
        }
        assert_eq!(f.clock.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_wait_bake_until_complete() {
        let f = fixture(ProfileKind::Freeform);
        f.store.script_states(
            &f.resolved.application_id,
            &f.resolved.environment_id,
            1,
            vec![
                DeploymentState::Deploying,
                DeploymentState::Baking,
                DeploymentState::Complete,
            ],
        );

        let options = DeployOptions {
            wait: WaitMode::Bake,
            ..Default::default()
        };
        let outcome = f
            .orchestrator
            .deploy(&f.resolved, br#"{"a": 1}"#, ContentFormat::Json, &options)
            .await
            .unwrap();
        match outcome {
            DeployOutcome::Deployed { wait: Some(wait), .. } => {
                assert_eq!(wait.deployment.state, DeploymentState::Complete);
                assert_eq!(wait.polls, 3);
            }
            other => panic!("expected a finished wait, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let f = fixture(ProfileKind::Freeform);
        f.seed(r#"{"a": 1}"#, DeploymentState::Deploying);

        let err = f
            .orchestrator
            .wait(
                &f.resolved.application_id,
                &f.resolved.environment_id,
                1,
                WaitMode::Deploy,
                Duration::from_secs(1),
            )
            .await
            .unwrap_err();

        match err {
            EngineError::Timeout {
                last_observed_state,
                timeout,
            } => {
                assert_eq!(last_observed_state, Some(DeploymentState::Deploying));
                assert_eq!(timeout, Duration::from_secs(1));
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
        assert_eq!(f.clock.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_wait_with_unbounded_timeout() {
        let f = fixture(ProfileKind::Freeform);
        let number = f.seed(r#"{"a": 1}"#, DeploymentState::Deploying);
        f.store.script_states(
            &f.resolved.application_id,
            &f.resolved.environment_id,
            number,
            vec![DeploymentState::Deploying, DeploymentState::Baking],
        );

        let outcome = f
            .orchestrator
            .wait(
                &f.resolved.application_id,
                &f.resolved.environment_id,
                number,
                WaitMode::Deploy,
                Duration::from_secs(u64::MAX),
            )
            .await
            .unwrap();

        assert_eq!(outcome.deployment.state, DeploymentState::Baking);
        assert_eq!(outcome.polls, 2);
        assert_eq!(f.clock.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_wait_reports_rollback() {
        let f = fixture(ProfileKind::Freeform);
        let number = f.seed(r#"{"a": 1}"#, DeploymentState::Deploying);
        f.store.script_states(
            &f.resolved.application_id,
            &f.resolved.environment_id,
            number,
            vec![DeploymentState::Deploying, DeploymentState::RolledBack],
        );

        let err = f
            .orchestrator
            .wait(
                &f.resolved.application_id,
                &f.resolved.environment_id,
                number,
                WaitMode::Deploy,
                Duration::from_secs(600),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::RolledBack { number: 1, .. }));
    }

    #[tokio::test]
    async fn test_wait_retries_transient_errors() {
        let f = fixture(ProfileKind::Freeform);
        let number = f.seed(r#"{"a": 1}"#, DeploymentState::Baking);
        f.store
            .fail_next("get_deployment", ApiError::Transient("Rate exceeded".into()));
        f.store
            .fail_next("get_deployment", ApiError::Transient("Rate exceeded".into()));

        let outcome = f
            .orchestrator
            .wait(
                &f.resolved.application_id,
                &f.resolved.environment_id,
                number,
                WaitMode::Deploy,
                Duration::from_secs(600),
            )
            .await
            .unwrap();
        assert_eq!(outcome.polls, 3);
    }

    #[tokio::test]
    async fn test_wait_aborts_on_non_transient_error() {
        let f = fixture(ProfileKind::Freeform);
        let number = f.seed(r#"{"a": 1}"#, DeploymentState::Deploying);
        f.store
            .fail_next("get_deployment", ApiError::Other("AccessDenied".into()));

        let err = f
            .orchestrator
            .wait(
                &f.resolved.application_id,
                &f.resolved.environment_id,
                number,
                WaitMode::Deploy,
                Duration::from_secs(600),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Api { operation: "get deployment", .. }));
        assert_eq!(f.clock.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_fetch_deployed_skips_rolled_back() {
        let f = fixture(ProfileKind::Freeform);
        f.seed(r#"{"v": 1}"#, DeploymentState::Complete);
        f.seed(r#"{"v": 2}"#, DeploymentState::RolledBack);

        let deployed = f.orchestrator.fetch_deployed(&f.resolved).await.unwrap().unwrap();
        assert_eq!(deployed.deployment.number, 1);
        assert_eq!(deployed.version.content, br#"{"v": 1}"#.to_vec());
    }

    #[tokio::test]
    async fn test_fetch_deployed_ignores_other_profiles() {
        let f = fixture(ProfileKind::Freeform);
        let other = f
            .store
            .add_profile(&f.resolved.application_id, "other", ProfileKind::Freeform);
        f.seed(r#"{"mine": true}"#, DeploymentState::Complete);
        f.store.seed_deployment(
            &f.resolved.application_id,
            &f.resolved.environment_id,
            &other,
            br#"{"mine": false}"#,
            "application/json",
            DeploymentState::Complete,
        );

        let deployed = f.orchestrator.fetch_deployed(&f.resolved).await.unwrap().unwrap();
        assert_eq!(deployed.deployment.number, 1);
    }

    #[tokio::test]
    async fn test_feature_flag_timestamps_do_not_trigger_deploy() {
        let f = fixture(ProfileKind::FeatureFlags);
        f.seed(
            r#"{"flags":{"beta":{"name":"beta"}},"values":{"beta":{"enabled":true,"_createdAt":"2024-01-01T00:00:00Z","_updatedAt":"2024-01-02T00:00:00Z"}},"version":"1"}"#,
            DeploymentState::Complete,
        );

        let local = br#"{"version":"1","flags":{"beta":{"name":"beta"}},"values":{"beta":{"enabled":true}}}"#;
        let outcome = f
            .orchestrator
            .deploy(&f.resolved, local, ContentFormat::Json, &DeployOptions::default())
            .await
            .unwrap();
        assert!(outcome.is_skipped());
    }

    #[tokio::test]
    async fn test_status_latest_and_by_number() {
        let f = fixture(ProfileKind::Freeform);
        f.seed(r#"{"v": 1}"#, DeploymentState::Complete);
        f.seed(r#"{"v": 2}"#, DeploymentState::Baking);

        let latest = f.orchestrator.status(&f.resolved, None).await.unwrap();
        assert_eq!(latest.number, 2);
        assert_eq!(latest.state, DeploymentState::Baking);

        let first = f.orchestrator.status(&f.resolved, Some(1)).await.unwrap();
        assert_eq!(first.state, DeploymentState::Complete);
    }

    #[tokio::test]
    async fn test_status_without_deployments() {
        let f = fixture(ProfileKind::Freeform);
        let err = f.orchestrator.status(&f.resolved, None).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::NotFound {
                resource_type: ResourceType::Deployment,
                ..
            }
        ));
    }
}
