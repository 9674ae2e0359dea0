//! Per-invocation resolution result

use crate::resource::ProfileKind;
use serde::{Deserialize, Serialize};

/// The configuration profile a command operates on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedProfile {
    pub id: String,
    pub name: String,
    pub kind: ProfileKind,
}

/// Provider IDs for one command invocation.
///
/// Built once by the resolver, never mutated and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedResourceSet {
    pub application_id: String,
    pub profile: ResolvedProfile,
    pub environment_id: String,
    /// `None` when the caller did not ask for strategy resolution
    pub strategy_id: Option<String>,
}
