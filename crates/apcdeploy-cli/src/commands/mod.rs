//! CLI command implementations

use crate::config::{CliConfig, Settings};
use crate::error::CliResult;
use crate::output::Output;
use std::path::PathBuf;

pub mod diff;
pub mod get;
pub mod init;
pub mod rollback;
pub mod run;
pub mod status;

/// Shared invocation context
pub struct Context {
    pub project_path: PathBuf,
    pub user: CliConfig,
    pub output: Output,
}

impl Context {
    /// Effective settings for commands working on an existing project
    pub fn settings(&self, timeout_flag: Option<u64>) -> CliResult<Settings> {
        Settings::load(&self.project_path, &self.user, timeout_flag)
    }
}
