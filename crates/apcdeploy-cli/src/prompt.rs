//! Terminal prompts backed by dialoguer

use apcdeploy_engine::{PromptError, Prompter};
use dialoguer::{Confirm, Input, Select};
use std::io::IsTerminal;

/// Prompter for an operator at a terminal
#[derive(Debug, Clone, Copy)]
pub struct TerminalPrompter {
    interactive: bool,
}

impl TerminalPrompter {
    /// Interactive only when both stdin and stderr are terminals
    pub fn detect() -> Self {
        Self {
            interactive: std::io::stdin().is_terminal() && std::io::stderr().is_terminal(),
        }
    }
}

impl Prompter for TerminalPrompter {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn select(&self, prompt: &str, items: &[String]) -> Result<usize, PromptError> {
        Select::new()
            .with_prompt(prompt)
            .items(items)
            .default(0)
            .interact()
            .map_err(|e| PromptError(e.to_string()))
    }

    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String, PromptError> {
        let mut input = Input::<String>::new().with_prompt(prompt);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        input.interact_text().map_err(|e| PromptError(e.to_string()))
    }

    fn confirm(&self, prompt: &str) -> Result<bool, PromptError> {
        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| PromptError(e.to_string()))
    }
}
