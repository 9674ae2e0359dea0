//! apcdeploy Types - Core types for declarative AppConfig deployments
//!
//! These types describe the resources of the remote configuration service as
//! seen by the deployment engine. The engine only ever reads them; the remote
//! service owns every state transition.
//!
//! ## Key Concepts
//!
//! - **Application / Environment / ConfigurationProfile**: pre-existing
//!   resources addressed by name and resolved to provider IDs
//! - **ConfigurationVersion**: immutable, numbered snapshot of content
//! - **Deployment**: a rollout of one version to one environment
//! - **ResolvedResourceSet**: the IDs for a single command invocation

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod content;
pub mod deployment;
pub mod resolved;
pub mod resource;

pub use content::ContentFormat;
pub use deployment::{ConfigurationVersion, Deployment, DeploymentState, DeploymentSummary};
pub use resolved::{ResolvedProfile, ResolvedResourceSet};
pub use resource::{
    Application, ConfigurationProfile, DeploymentStrategy, Environment, ProfileKind,
    ProfileSummary, DEFAULT_STRATEGY, PREDEFINED_STRATEGIES,
};
