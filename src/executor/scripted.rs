//! Scripted executor for tests
//!
//! Rules match commands by substring, first registered rule wins. Each rule
//! replays a sequence of results and keeps repeating the last one once the
//! sequence is exhausted. Unmatched commands fail with a non-zero exit, so
//! every probe reads "not installed" unless a rule says otherwise.

use super::{CommandExecutor, ExecResult, FailureKind};
use std::sync::Mutex;

#[derive(Debug)]
struct Rule {
    pattern: String,
    responses: Vec<ExecResult>,
    next: usize,
}

impl Rule {
    fn respond(&mut self) -> ExecResult {
        let index = self.next.min(self.responses.len().saturating_sub(1));
        self.next += 1;
        self.responses
            .get(index)
            .cloned()
            .unwrap_or_else(|| ExecResult::ok(""))
    }
}

/// An executor that never touches the system and records every call
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to commands containing `pattern` with `responses`, in order
    pub fn on(self, pattern: impl Into<String>, responses: Vec<ExecResult>) -> Self {
        if let Ok(mut rules) = self.rules.lock() {
            rules.push(Rule {
                pattern: pattern.into(),
                responses,
                next: 0,
            });
        }
        self
    }

    /// Always succeed for commands containing `pattern`
    pub fn succeed(self, pattern: impl Into<String>) -> Self {
        self.on(pattern, vec![ExecResult::ok("")])
    }

    /// Always fail for commands containing `pattern`, with `message` as stderr
    pub fn fail(self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.on(
            pattern,
            vec![ExecResult::failure(FailureKind::NonZeroExit(Some(1)), message)],
        )
    }

    /// Every command executed so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of executed commands containing `pattern`
    pub fn count_matching(&self, pattern: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.contains(pattern))
            .count()
    }
}

impl CommandExecutor for ScriptedExecutor {
    fn execute(&self, command: &str, verbose: bool) -> ExecResult {
        if verbose {
            tracing::info!("Executing (scripted): {}", command);
        }

        if let Ok(mut calls) = self.calls.lock() {
            calls.push(command.to_string());
        }

        let mut rules = match self.rules.lock() {
            Ok(rules) => rules,
            Err(poisoned) => poisoned.into_inner(),
        };

        rules
            .iter_mut()
            .find(|rule| command.contains(&rule.pattern))
            .map(Rule::respond)
            .unwrap_or_else(|| {
                ExecResult::failure(FailureKind::NonZeroExit(Some(1)), "")
            })
    }
}
