//! Command execution boundary
//!
//! Every external command the orchestrator runs goes through a
//! [`CommandExecutor`]. It is the only I/O seam: installs, probes,
//! dependency checks and rollbacks all produce an [`ExecResult`] instead of
//! an error, so a failing package is ordinary data to the caller.
//!
//! Failures carry a [`FailureKind`] tag set where the failure happened
//! (timeout, non-zero exit, spawn error, ...). Keyword classification of the
//! message is only needed for output coming from the external command itself.

mod scripted;
mod shell;

pub use scripted::ScriptedExecutor;
pub use shell::ShellExecutor;

use std::fmt;

/// Where and how a command failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Killed after exceeding the executor timeout
    Timeout,
    /// Exited with a non-zero status (`None` when terminated by a signal)
    NonZeroExit(Option<i32>),
    /// Could not be spawned or waited on
    Spawn(std::io::ErrorKind),
    /// No handler is registered for the package's install method
    UnsupportedMethod,
    /// Required dependencies are missing and could not be installed
    MissingDependencies,
    /// A command succeeded but its output could not be understood
    InvalidResponse,
    /// A GitHub release has no asset for this OS/architecture
    NoMatchingAsset,
}

impl FailureKind {
    /// Failures that no amount of retrying can fix
    pub const fn is_permanent(self) -> bool {
        matches!(
            self,
            Self::UnsupportedMethod | Self::MissingDependencies | Self::NoMatchingAsset
        )
    }
}

/// A tagged failure message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ExecFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ExecFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of one command invocation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    pub success: bool,
    /// Captured stdout, trimmed
    pub output: String,
    /// Set iff `success` is false
    pub error: Option<ExecFailure>,
}

impl ExecResult {
    /// A successful result with the given output
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
        }
    }

    /// A failed result
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(ExecFailure::new(kind, message)),
        }
    }

    /// Failure message, or an empty string on success
    pub fn error_message(&self) -> &str {
        self.error.as_ref().map(|e| e.message.as_str()).unwrap_or("")
    }
}

/// Runs shell command lines.
///
/// Implementations must never panic or return early on failure: every
/// problem is reported through the returned [`ExecResult`].
pub trait CommandExecutor: Send + Sync {
    /// Run `command` through a shell and wait for it (bounded by a timeout).
    ///
    /// With `verbose`, the command and its captured output are echoed to the
    /// log before returning.
    fn execute(&self, command: &str, verbose: bool) -> ExecResult;
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for std::sync::Arc<T> {
    fn execute(&self, command: &str, verbose: bool) -> ExecResult {
        (**self).execute(command, verbose)
    }
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for &T {
    fn execute(&self, command: &str, verbose: bool) -> ExecResult {
        (**self).execute(command, verbose)
    }
}
