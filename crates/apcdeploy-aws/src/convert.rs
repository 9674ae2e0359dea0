//! Mapping between SDK shapes and the engine model

use apcdeploy_types::{DeploymentState, DeploymentSummary};
use aws_sdk_appconfig::primitives::DateTime as SmithyDateTime;
use aws_sdk_appconfig::types::{
    DeploymentState as SdkDeploymentState, DeploymentSummary as SdkDeploymentSummary,
};
use chrono::{DateTime, Utc};

pub(crate) fn timestamp(value: Option<&SmithyDateTime>) -> Option<DateTime<Utc>> {
    value.and_then(|dt| DateTime::from_timestamp(dt.secs(), dt.subsec_nanos()))
}

pub(crate) fn state(value: Option<&SdkDeploymentState>) -> DeploymentState {
    value
        .map(|s| DeploymentState::from(s.as_str()))
        .unwrap_or_else(|| DeploymentState::Unknown(String::new()))
}

pub(crate) fn summary(item: &SdkDeploymentSummary) -> DeploymentSummary {
    DeploymentSummary {
        number: item.deployment_number(),
        state: state(item.state()),
        percentage_complete: item.percentage_complete(),
        started_at: timestamp(item.started_at()),
        completed_at: timestamp(item.completed_at()),
        configuration_name: item.configuration_name().unwrap_or_default().to_string(),
        configuration_version: item.configuration_version().unwrap_or_default().to_string(),
    }
}

/// Build a [`Deployment`] from any output describing one deployment.
///
/// `GetDeployment`, `StartDeployment` and `StopDeployment` share the shape
/// but not a type.
macro_rules! deployment_from_output {
    ($output:expr) => {{
        let output = $output;
        ::apcdeploy_types::Deployment {
            number: output.deployment_number(),
            state: $crate::convert::state(output.state()),
            percentage_complete: output.percentage_complete(),
            started_at: $crate::convert::timestamp(output.started_at()),
            completed_at: $crate::convert::timestamp(output.completed_at()),
            configuration_profile_id: output
                .configuration_profile_id()
                .unwrap_or_default()
                .to_string(),
            configuration_version: output
                .configuration_version()
                .unwrap_or_default()
                .to_string(),
            strategy_id: output
                .deployment_strategy_id()
                .unwrap_or_default()
                .to_string(),
            description: output.description().map(str::to_string),
        }
    }};
}

pub(crate) use deployment_from_output;
