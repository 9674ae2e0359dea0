//! Interactive prompting capability
//!
//! Workflows that need consent or a choice from the operator go through
//! [`Prompter`]. The CLI backs it with a terminal UI; tests use
//! [`ScriptedPrompter`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Failure while prompting
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct PromptError(pub String);

/// Operator interaction
pub trait Prompter: Send + Sync {
    /// Can the operator be asked anything at all?
    fn is_interactive(&self) -> bool;

    /// Pick one of `items`, returning its index
    fn select(&self, prompt: &str, items: &[String]) -> Result<usize, PromptError>;

    /// Free-form text input
    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String, PromptError>;

    /// Yes/no confirmation, defaulting to no
    fn confirm(&self, prompt: &str) -> Result<bool, PromptError>;
}

/// Prompter that never asks; every call fails.
///
/// Used for non-interactive sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractivePrompter;

impl Prompter for NonInteractivePrompter {
    fn is_interactive(&self) -> bool {
        false
    }

    fn select(&self, prompt: &str, _items: &[String]) -> Result<usize, PromptError> {
        Err(PromptError(format!("cannot prompt for {:?}: not interactive", prompt)))
    }

    fn input(&self, prompt: &str, _default: Option<&str>) -> Result<String, PromptError> {
        Err(PromptError(format!("cannot prompt for {:?}: not interactive", prompt)))
    }

    fn confirm(&self, prompt: &str) -> Result<bool, PromptError> {
        Err(PromptError(format!("cannot prompt for {:?}: not interactive", prompt)))
    }
}

/// Prompter returning canned answers
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    interactive: bool,
    confirm: bool,
    selections: Mutex<VecDeque<usize>>,
    inputs: Mutex<VecDeque<String>>,
    prompts: AtomicUsize,
}

impl ScriptedPrompter {
    /// Interactive prompter answering `confirm` to every confirmation
    pub fn interactive(confirm: bool) -> Self {
        Self {
            interactive: true,
            confirm,
            ..Default::default()
        }
    }

    /// Prompter reporting no terminal
    pub fn non_interactive() -> Self {
        Self::default()
    }

    /// Queue an answer for the next `select`
    pub fn with_selection(self, index: usize) -> Self {
        self.selections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(index);
        self
    }

    /// Queue an answer for the next `input`
    pub fn with_input(self, value: impl Into<String>) -> Self {
        self.inputs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(value.into());
        self
    }

    /// Number of prompts shown so far
    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

impl Prompter for ScriptedPrompter {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn select(&self, prompt: &str, items: &[String]) -> Result<usize, PromptError> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        let index = self
            .selections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or_else(|| PromptError(format!("no scripted selection for {:?}", prompt)))?;
        if index >= items.len() {
            return Err(PromptError(format!(
                "scripted selection {} out of range for {:?}",
                index, prompt
            )));
        }
        Ok(index)
    }

    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String, PromptError> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        let scripted = self
            .inputs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        scripted
            .or_else(|| default.map(str::to_string))
            .ok_or_else(|| PromptError(format!("no scripted input for {:?}", prompt)))
    }

    fn confirm(&self, _prompt: &str) -> Result<bool, PromptError> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        Ok(self.confirm)
    }
}
