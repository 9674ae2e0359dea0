//! Pre-existing AppConfig resources
//!
//! Applications, environments, configuration profiles and deployment
//! strategies are created outside of apcdeploy. They are listed and
//! described, never mutated.

use serde::{Deserialize, Serialize};

/// Strategy used when a project does not name one.
pub const DEFAULT_STRATEGY: &str = "AppConfig.AllAtOnce";

/// Strategies predefined by the service. Their IDs equal their names, so they
/// can be used without a listing call.
pub const PREDEFINED_STRATEGIES: &[&str] = &[
    "AppConfig.AllAtOnce",
    "AppConfig.Linear50PercentEvery30Seconds",
    "AppConfig.Linear20PercentEvery6Minutes",
    "AppConfig.Canary10Percent20Minutes",
];

/// An AppConfig application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub name: String,
}

/// An environment within an application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub id: String,
    pub name: String,
}

/// A deployment strategy, predefined or user-defined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentStrategy {
    pub id: String,
    pub name: String,
}

impl DeploymentStrategy {
    /// Is this name one of the service's predefined strategies?
    pub fn is_predefined(name: &str) -> bool {
        PREDEFINED_STRATEGIES.contains(&name)
    }
}

/// Kind of a configuration profile.
///
/// The kind decides how content is normalized before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProfileKind {
    /// `AWS.AppConfig.FeatureFlags`; values carry service-managed timestamps
    FeatureFlags,

    /// `AWS.Freeform`; arbitrary JSON, YAML or text
    #[default]
    Freeform,
}

impl ProfileKind {
    pub const FEATURE_FLAGS_TYPE: &'static str = "AWS.AppConfig.FeatureFlags";
    pub const FREEFORM_TYPE: &'static str = "AWS.Freeform";

    /// Map the provider's profile type string to a kind.
    ///
    /// Anything other than the feature flag type is treated as freeform.
    pub fn from_type(profile_type: Option<&str>) -> Self {
        match profile_type {
            Some(Self::FEATURE_FLAGS_TYPE) => ProfileKind::FeatureFlags,
            _ => ProfileKind::Freeform,
        }
    }

    /// The provider's type string for this kind
    pub fn as_type(&self) -> &'static str {
        match self {
            ProfileKind::FeatureFlags => Self::FEATURE_FLAGS_TYPE,
            ProfileKind::Freeform => Self::FREEFORM_TYPE,
        }
    }
}

impl std::fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_type())
    }
}

/// A configuration profile as returned by a listing call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub id: String,
    pub name: String,
}

/// A fully described configuration profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationProfile {
    pub id: String,
    pub name: String,
    pub kind: ProfileKind,
}
