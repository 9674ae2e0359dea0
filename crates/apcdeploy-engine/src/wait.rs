//! Wait semantics for an observed deployment
//!
//! The service drives every transition; the engine only polls. This module
//! holds the pure decision part of the polling loop so it can be tested
//! without a provider or a clock.

use apcdeploy_types::DeploymentState;
use serde::{Deserialize, Serialize};

/// What to wait for after starting a deployment.
///
/// The modes are mutually exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WaitMode {
    /// Return as soon as the deployment is started
    #[default]
    None,

    /// Wait until the rollout finishes (`BAKING` or later)
    Deploy,

    /// Wait until baking finishes (`COMPLETE`)
    Bake,
}

impl WaitMode {
    /// Build a mode from the two CLI flags. Callers reject both being set.
    pub fn from_flags(wait_deploy: bool, wait_bake: bool) -> Self {
        match (wait_deploy, wait_bake) {
            (_, true) => WaitMode::Bake,
            (true, false) => WaitMode::Deploy,
            (false, false) => WaitMode::None,
        }
    }
}

/// Decision after observing one state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStep {
    /// Keep polling
    Continue,
    /// The awaited state was reached
    Succeeded,
    /// The deployment ended without reaching the awaited state
    Failed,
}

/// Polling state machine for one wait
#[derive(Debug, Clone)]
pub struct WaitMachine {
    mode: WaitMode,
    last_observed: Option<DeploymentState>,
    observations: u32,
}

impl WaitMachine {
    pub fn new(mode: WaitMode) -> Self {
        Self {
            mode,
            last_observed: None,
            observations: 0,
        }
    }

    /// Record a state and decide what to do next
    pub fn observe(&mut self, state: &DeploymentState) -> WaitStep {
        self.observations += 1;
        self.last_observed = Some(state.clone());

        match self.mode {
            WaitMode::None => WaitStep::Succeeded,
            WaitMode::Deploy if state.has_reached_baking() => WaitStep::Succeeded,
            WaitMode::Bake if *state == DeploymentState::Complete => WaitStep::Succeeded,
            _ if state.is_rolled_back() => WaitStep::Failed,
            _ => WaitStep::Continue,
        }
    }

    pub fn mode(&self) -> WaitMode {
        self.mode
    }

    pub fn last_observed(&self) -> Option<&DeploymentState> {
        self.last_observed.as_ref()
    }

    pub fn observations(&self) -> u32 {
        self.observations
    }
}
