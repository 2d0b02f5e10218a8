//! Per-package lifecycle state machine
//!
//! Every package moving through the installer owns a [`PackageLifecycle`].
//! It is the single source of truth for where that package is, rejects
//! transitions the installer should never make, and keeps a timestamped
//! history for debugging.
//!
//! # Stage Flow
//!
//! ```text
//! NotStarted
//!     ↓
//! CheckingInstalled ──(already installed)──→ Done
//!     ↓
//! CheckingDependencies ──(missing)──→ Failed
//!     ↓
//! Installing ──(success)──→ Done
//!     ↓ ↑
//! Retrying
//!
//! Installing ──(retries exhausted, rollback on)──→ RollingBack ──→ Failed
//!
//! (Any non-terminal stage can transition to Failed)
//! ```

use crate::types::PackageStatus;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageStage {
    NotStarted,
    /// Running the method's probe command
    CheckingInstalled,
    /// Checking and auto-installing supporting tools
    CheckingDependencies,
    /// An install attempt is running
    Installing,
    /// Waiting out the backoff delay before the next attempt
    Retrying,
    /// Running the method's uninstall command after a terminal failure
    RollingBack,
    /// Installed, or found already installed (terminal)
    Done,
    /// Terminally failed for this run (terminal)
    Failed,
}

impl PackageStage {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Stages reachable from this one, excluding the universal `Failed` edge
    pub const fn successors(self) -> &'static [Self] {
        match self {
            Self::NotStarted => &[Self::CheckingInstalled],
            Self::CheckingInstalled => &[Self::Done, Self::CheckingDependencies],
            Self::CheckingDependencies => &[Self::Installing],
            Self::Installing => &[Self::Done, Self::Retrying, Self::RollingBack],
            Self::Retrying => &[Self::Installing],
            Self::RollingBack | Self::Done | Self::Failed => &[],
        }
    }

    /// Persisted status corresponding to this stage
    pub const fn status(self) -> PackageStatus {
        match self {
            Self::NotStarted => PackageStatus::Pending,
            Self::Done => PackageStatus::Success,
            Self::Failed => PackageStatus::Failed,
            Self::CheckingInstalled
            | Self::CheckingDependencies
            | Self::Installing
            | Self::Retrying
            | Self::RollingBack => PackageStatus::Installing,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::CheckingInstalled => "Checking install state",
            Self::CheckingDependencies => "Checking dependencies",
            Self::Installing => "Installing",
            Self::Retrying => "Retrying",
            Self::RollingBack => "Rolling back",
            Self::Done => "Done",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for PackageStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PackageTransitionError {
    #[error("Cannot move from {from} to {to}")]
    Invalid { from: PackageStage, to: PackageStage },

    #[error("Cannot transition from terminal stage {from}")]
    FromTerminalState { from: PackageStage },
}

impl From<PackageTransitionError> for crate::error::SetupError {
    fn from(err: PackageTransitionError) -> Self {
        Self::Transition(err.to_string())
    }
}

/// Lifecycle of one package within one run
#[derive(Debug, Clone)]
pub struct PackageLifecycle {
    package_id: String,
    current: PackageStage,
    failed_at: Option<PackageStage>,
    history: Vec<(PackageStage, DateTime<Utc>)>,
}

impl PackageLifecycle {
    pub fn new(package_id: impl Into<String>) -> Self {
        Self {
            package_id: package_id.into(),
            current: PackageStage::NotStarted,
            failed_at: None,
            history: Vec::new(),
        }
    }

    pub fn package_id(&self) -> &str {
        &self.package_id
    }

    #[inline]
    pub fn current(&self) -> PackageStage {
        self.current
    }

    /// Stage that was active when `fail` was called
    pub fn failed_at(&self) -> Option<PackageStage> {
        self.failed_at
    }

    pub fn history(&self) -> &[(PackageStage, DateTime<Utc>)] {
        &self.history
    }

    /// Count of `Installing` entries, i.e. install attempts started
    pub fn attempts(&self) -> u32 {
        self.history
            .iter()
            .filter(|(stage, _)| *stage == PackageStage::Installing)
            .count() as u32
    }

    /// Move to `target`, which must be a direct successor of the current stage.
    pub fn transition_to(
        &mut self,
        target: PackageStage,
    ) -> Result<PackageStage, PackageTransitionError> {
        if self.current.is_terminal() {
            return Err(PackageTransitionError::FromTerminalState { from: self.current });
        }

        if target == PackageStage::Failed {
            self.fail()?;
            return Ok(PackageStage::Failed);
        }

        if !self.current.successors().contains(&target) {
            return Err(PackageTransitionError::Invalid {
                from: self.current,
                to: target,
            });
        }

        self.record(target);
        Ok(target)
    }

    /// Mark the package failed from any non-terminal stage
    pub fn fail(&mut self) -> Result<(), PackageTransitionError> {
        if self.current.is_terminal() {
            return Err(PackageTransitionError::FromTerminalState { from: self.current });
        }
        self.failed_at = Some(self.current);
        self.record(PackageStage::Failed);
        Ok(())
    }

    fn record(&mut self, stage: PackageStage) {
        tracing::debug!(package = %self.package_id, from = %self.current, to = %stage, "stage transition");
        self.history.push((stage, Utc::now()));
        self.current = stage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_installed_path() {
        let mut lc = PackageLifecycle::new("git");
        lc.transition_to(PackageStage::CheckingInstalled).unwrap();
        lc.transition_to(PackageStage::Done).unwrap();
        assert_eq!(lc.current().status(), PackageStatus::Success);
        assert_eq!(lc.attempts(), 0);
    }

    #[test]
    fn test_retry_path_counts_attempts() {
        let mut lc = PackageLifecycle::new("lazygit");
        for stage in [
            PackageStage::CheckingInstalled,
            PackageStage::CheckingDependencies,
            PackageStage::Installing,
            PackageStage::Retrying,
            PackageStage::Installing,
            PackageStage::Retrying,
            PackageStage::Installing,
            PackageStage::Done,
        ] {
            lc.transition_to(stage).unwrap();
        }
        assert_eq!(lc.attempts(), 3);
        assert_eq!(lc.history().len(), 8);
    }

    #[test]
    fn test_rollback_ends_failed() {
        let mut lc = PackageLifecycle::new("jq");
        lc.transition_to(PackageStage::CheckingInstalled).unwrap();
        lc.transition_to(PackageStage::CheckingDependencies).unwrap();
        lc.transition_to(PackageStage::Installing).unwrap();
        lc.transition_to(PackageStage::RollingBack).unwrap();
        lc.fail().unwrap();
        assert_eq!(lc.current(), PackageStage::Failed);
        assert_eq!(lc.failed_at(), Some(PackageStage::RollingBack));
    }

    #[test]
    fn test_cannot_skip_dependency_check() {
        let mut lc = PackageLifecycle::new("jq");
        lc.transition_to(PackageStage::CheckingInstalled).unwrap();
        let err = lc.transition_to(PackageStage::Installing).unwrap_err();
        assert_eq!(
            err,
            PackageTransitionError::Invalid {
                from: PackageStage::CheckingInstalled,
                to: PackageStage::Installing,
            }
        );
    }

    #[test]
    fn test_terminal_stages_are_final() {
        let mut lc = PackageLifecycle::new("jq");
        lc.fail().unwrap();
        assert!(lc.fail().is_err());
        assert!(matches!(
            lc.transition_to(PackageStage::CheckingInstalled),
            Err(PackageTransitionError::FromTerminalState { .. })
        ));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(PackageStage::NotStarted.status(), PackageStatus::Pending);
        assert_eq!(PackageStage::Retrying.status(), PackageStatus::Installing);
        assert_eq!(PackageStage::RollingBack.status(), PackageStatus::Installing);
        assert_eq!(PackageStage::Failed.status(), PackageStatus::Failed);
    }

    #[test]
    fn test_transition_error_converts() {
        let err: crate::error::SetupError = PackageTransitionError::FromTerminalState {
            from: PackageStage::Done,
        }
        .into();
        assert!(err.to_string().contains("terminal stage Done"));
    }
}
