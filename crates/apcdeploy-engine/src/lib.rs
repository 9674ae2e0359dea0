//! apcdeploy Engine
//!
//! Deploys local configuration files to AppConfig declaratively: resolve
//! names to IDs, normalize and diff against what is deployed, then create a
//! version and start a deployment only when something changed.
//!
//! ## Architectural Boundaries
//!
//! - `apcdeploy-types` owns: the resource and deployment model
//! - `apcdeploy-engine` owns: resolution, normalization, diffing, deploy and rollback workflows
//! - `apcdeploy-aws` owns: the AWS SDK adapter behind [`api::ResourceCatalog`] and [`api::DeploymentApi`]
//!
//! ## Key Principle
//!
//! The remote service drives every deployment transition. The engine requests
//! transitions (start, stop) and observes state; it never assumes one.
//!
//! ## Usage
//!
//! ```no_run
//! use apcdeploy_engine::{
//!     DeployOptions, DeploymentOrchestrator, InMemoryAppConfig, OrchestratorConfig,
//!     ResourceResolver, WaitMode,
//! };
//! use apcdeploy_types::{ContentFormat, ProfileKind};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryAppConfig::new());
//! let app = store.add_application("web");
//! store.add_environment(&app, "prod");
//! store.add_profile(&app, "settings", ProfileKind::Freeform);
//!
//! let resolver = ResourceResolver::new(store.clone());
//! let resolved = resolver.resolve_all("web", "settings", "prod", "").await?;
//!
//! let orchestrator = DeploymentOrchestrator::new(store, OrchestratorConfig::default());
//! let options = DeployOptions {
//!     wait: WaitMode::Deploy,
//!     ..Default::default()
//! };
//! let outcome = orchestrator
//!     .deploy(&resolved, br#"{"limit": 10}"#, ContentFormat::Json, &options)
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod api;
pub mod clock;
pub mod diff;
pub mod error;
pub mod memory;
pub mod normalize;
pub mod orchestrator;
pub mod prompt;
pub mod resolver;
pub mod rollback;
pub mod wait;

// Re-exports
pub use api::{CreateVersionRequest, DeploymentApi, ResourceCatalog, StartDeploymentRequest};
pub use clock::{Clock, ManualClock, SystemClock};
pub use diff::{compare, compare_labeled, DiffResult};
pub use error::{ApiError, ApiResult, EngineError, ResourceType, Result};
pub use memory::InMemoryAppConfig;
pub use normalize::normalize;
pub use orchestrator::{
    DeployOptions, DeployOutcome, DeployedConfiguration, DeploymentObserver,
    DeploymentOrchestrator, DiffReport, OrchestratorConfig, WaitOutcome,
};
pub use prompt::{NonInteractivePrompter, PromptError, Prompter, ScriptedPrompter};
pub use resolver::ResourceResolver;
pub use rollback::{RollbackController, SKIP_CONFIRMATION_FLAG};
pub use wait::{WaitMachine, WaitMode, WaitStep};
