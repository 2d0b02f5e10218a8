//! Progress callbacks for front-ends
//!
//! Callbacks run synchronously on the worker thread that installs the
//! package, so implementations must return quickly.

use super::InstallOutcome;
use crate::error_classifier::InstallError;
use crate::install_state::PackageStage;

pub trait InstallObserver: Sync {
    /// A package entered `stage`; `stage.status()` gives the persisted status
    fn on_progress(&self, _package_id: &str, _stage: PackageStage) {}

    /// An attempt failed and was classified (fires once per failed attempt)
    fn on_error(&self, _error: &InstallError) {}

    /// The batch finished; outcomes are in input order, cancelled packages excluded
    fn on_complete(&self, _outcomes: &[InstallOutcome]) {}
}

/// Ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl InstallObserver for NoopObserver {}
