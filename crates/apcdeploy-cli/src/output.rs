//! Output formatting utilities
//!
//! Informational messages go through [`Output`] so `--silent` can suppress
//! them. Command results (diffs, content, status) and errors are always
//! printed.

use apcdeploy_engine::{DeploymentObserver, DiffResult};
use apcdeploy_types::Deployment;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tabled::{settings::Style, Table, Tabled};

/// Output configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub silent: bool,
}

impl Output {
    pub fn new(silent: bool) -> Self {
        Self { silent }
    }

    pub fn success(&self, message: &str) {
        if !self.silent {
            print_success(message);
        }
    }

    pub fn info(&self, message: &str) {
        if !self.silent {
            print_info(message);
        }
    }

    pub fn warning(&self, message: &str) {
        if !self.silent {
            print_warning(message);
        }
    }

    /// Spinner on stderr; hidden when silent
    pub fn spinner(&self, message: &str) -> ProgressBar {
        if self.silent {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb.set_message(message.to_string());
        pb
    }
}

/// Spinner that follows deployment progress
pub struct SpinnerObserver {
    pb: ProgressBar,
}

impl SpinnerObserver {
    pub fn new(pb: ProgressBar) -> Self {
        Self { pb }
    }

    pub fn finish(&self, message: &str) {
        self.pb.finish_with_message(message.to_string());
    }

    pub fn abandon(&self) {
        self.pb.finish_and_clear();
    }
}

impl DeploymentObserver for SpinnerObserver {
    fn on_update(&self, deployment: &Deployment) {
        self.pb.set_message(format!(
            "Deployment #{}: {} ({:.0}%)",
            deployment.number, deployment.state, deployment.percentage_complete
        ));
    }
}

/// Print a unified diff, colored by line kind
pub fn print_diff(diff: &DiffResult) {
    for line in diff.unified_diff.lines() {
        let colored = if line.starts_with("---") || line.starts_with("+++") {
            line.bold()
        } else if line.starts_with("@@") {
            line.cyan()
        } else if line.starts_with('+') {
            line.green()
        } else if line.starts_with('-') {
            line.red()
        } else {
            line.normal()
        };
        println!("{}", colored);
    }
}

/// Print `field: value` rows as a table
pub fn print_fields(rows: Vec<FieldRow>) {
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
}

/// One row of a field table
#[derive(Debug, Tabled)]
pub struct FieldRow {
    #[tabled(rename = "Field")]
    pub field: &'static str,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl FieldRow {
    pub fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}
