//! Error Classifier
//!
//! Turns a failed attempt into an [`InstallError`]: a category, a
//! recoverability flag and remediation hints, appended to the persistent
//! error log.
//!
//! # Classification
//!
//! Failures tagged by the executor are classified by their kind. Only
//! opaque command output (non-zero exits, spawn errors) falls back to
//! case-insensitive keyword matching, checked in this fixed order:
//!
//! | Order | Keywords | Category |
//! |-------|----------|----------|
//! | 1 | network, connection, timeout | Network |
//! | 2 | permission, denied, sudo | Permissions |
//! | 3 | depends, dependency, required | Dependencies |
//! | 4 | not found, 404, no such | NotFound |
//! | 5 | timeout, timed out | Timeout |
//! | - | anything else | Unknown |
//!
//! So "Connection timed out" is `Network`: the network group wins.
//!
//! # Log format
//!
//! ```text
//! [2025-01-01T12:00:00.000Z] Package: lazygit
//! Error: curl: (6) Could not resolve host
//! Recoverable: true
//! Suggestions:
//!   - Check your internet connection
//! ================================================================================
//! ```

use crate::executor::{ExecFailure, FailureKind};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use strum::{Display, EnumIter, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    Network,
    Permissions,
    Dependencies,
    NotFound,
    Timeout,
    Unknown,
}

const KEYWORD_GROUPS: &[(&[&str], ErrorCategory)] = &[
    (&["network", "connection", "timeout"], ErrorCategory::Network),
    (&["permission", "denied", "sudo"], ErrorCategory::Permissions),
    (&["depends", "dependency", "required"], ErrorCategory::Dependencies),
    (&["not found", "404", "no such"], ErrorCategory::NotFound),
    (&["timeout", "timed out"], ErrorCategory::Timeout),
];

impl ErrorCategory {
    /// Categorize raw error text. Total and deterministic.
    pub fn categorize(text: &str) -> Self {
        let lower = text.to_lowercase();
        KEYWORD_GROUPS
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
            .map(|(_, category)| *category)
            .unwrap_or(Self::Unknown)
    }

    /// Categorize a tagged failure, trusting the tag where it is meaningful
    pub fn classify(failure: &ExecFailure) -> Self {
        match failure.kind {
            FailureKind::Timeout => Self::Timeout,
            FailureKind::MissingDependencies => Self::Dependencies,
            FailureKind::UnsupportedMethod | FailureKind::NoMatchingAsset => Self::NotFound,
            FailureKind::NonZeroExit(_) | FailureKind::Spawn(_) | FailureKind::InvalidResponse => {
                Self::categorize(&failure.message)
            }
        }
    }

    /// Network, timeout and permission problems may go away on their own
    pub const fn is_recoverable(self) -> bool {
        matches!(self, Self::Network | Self::Timeout | Self::Permissions)
    }

    pub fn suggestions(self) -> &'static [&'static str] {
        match self {
            Self::Network => &[
                "Check your internet connection",
                "Try again in a few moments",
                "Check if the download server is accessible",
            ],
            Self::Permissions => &[
                "Ensure you have sudo privileges",
                "Run: sudo -v to refresh sudo timeout",
                "Check file permissions in target directory",
            ],
            Self::Dependencies => &[
                "Install missing dependencies first",
                "Run system update: sudo apt-get update",
                "Check package requirements",
            ],
            Self::NotFound => &[
                "Verify package name is correct",
                "Check if package is available for your system",
                "Try alternative installation method",
            ],
            Self::Timeout => &[
                "Increase timeout duration",
                "Check network stability",
                "Try during off-peak hours",
            ],
            Self::Unknown => &[
                "Check the error log for details",
                "Search for the error message online",
                "Try manual installation",
            ],
        }
    }
}

/// Keyword-only recoverability check on raw text
pub fn is_recoverable(text: &str) -> bool {
    ErrorCategory::categorize(text).is_recoverable()
}

/// Remediation hints for a category
pub fn suggest_fix(category: ErrorCategory) -> Vec<String> {
    category.suggestions().iter().map(|s| s.to_string()).collect()
}

/// A classified failure of one attempt. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallError {
    pub package: String,
    pub error: String,
    pub category: ErrorCategory,
    pub recoverable: bool,
    pub suggestions: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl InstallError {
    pub fn new(package: &str, failure: &ExecFailure) -> Self {
        let category = ErrorCategory::classify(failure);
        let error = if failure.message.trim().is_empty() {
            "Unknown error".to_string()
        } else {
            failure.message.clone()
        };
        Self {
            package: package.to_string(),
            error,
            category,
            recoverable: category.is_recoverable(),
            suggestions: suggest_fix(category),
            timestamp: Utc::now(),
        }
    }

    /// Human-readable log block, terminated by a line of 80 `=`
    pub fn to_log_entry(&self) -> String {
        let mut entry = format!(
            "\n[{}] Package: {}\nError: {}\nRecoverable: {}\nSuggestions:\n",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.package,
            self.error,
            self.recoverable
        );
        for suggestion in &self.suggestions {
            entry.push_str("  - ");
            entry.push_str(suggestion);
            entry.push('\n');
        }
        entry.push_str(&"=".repeat(80));
        entry.push('\n');
        entry
    }
}

/// Creates [`InstallError`]s and appends them to the error log
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    log_path: Option<PathBuf>,
}

impl ErrorClassifier {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: Some(log_path.into()),
        }
    }

    /// A classifier that never writes a log
    pub fn without_log() -> Self {
        Self { log_path: None }
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Classify and log one failure
    pub fn create_error(&self, package: &str, failure: &ExecFailure) -> InstallError {
        let error = InstallError::new(package, failure);
        self.log_error(&error);
        error
    }

    /// Append to the log. Write failures are reported and swallowed.
    pub fn log_error(&self, error: &InstallError) {
        let Some(path) = &self.log_path else {
            return;
        };
        if let Err(e) = append(path, &error.to_log_entry()) {
            tracing::warn!("Could not write error log {}: {}", path.display(), e);
        }
    }
}

fn append(path: &Path, entry: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(entry.as_bytes())
}
