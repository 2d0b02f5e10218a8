//! dotsetup Library
//!
//! Core of a resumable package installation orchestrator: a catalog of
//! categorized packages, one handler per install method, and an installer
//! that probes, resolves dependencies, retries with backoff, rolls back and
//! records progress so an interrupted run can pick up where it stopped.

pub mod catalog;
pub mod config;
pub mod error;
pub mod error_classifier;
pub mod executor;
pub mod install_state;
pub mod installer;
pub mod logic;
pub mod methods;
pub mod paths;
pub mod preflight;
pub mod preview;
pub mod process_guard;
pub mod progress;
pub mod retry;
pub mod types;

// Re-export main types for convenience
pub use catalog::{Catalog, Category, PackageRecord};
pub use config::{InstallOptions, OrchestratorConfig};
pub use error::{Result, SetupError};
pub use error_classifier::{ErrorCategory, ErrorClassifier, InstallError};
pub use executor::{CommandExecutor, ExecFailure, ExecResult, FailureKind, ScriptedExecutor, ShellExecutor};
pub use install_state::{PackageLifecycle, PackageStage, PackageTransitionError};
pub use installer::{BatchReport, InstallObserver, InstallOutcome, Installer, NoopObserver};
pub use methods::{MethodHandler, MethodRegistry};
pub use process_guard::{CancelToken, ChildRegistry, CommandProcessGroup};
pub use progress::{ProgressState, ProgressStats, ProgressStore};
pub use retry::{RecordingSleeper, RetryPolicy, Sleeper, ThreadSleeper};
pub use types::{InstallMethod, PackageStatus, RunMode};

// Dependency resolution and install-state probing
pub use logic::resolver::{DependencyReport, DependencyResolver, DependencySpec};
pub use logic::state_checker::InstallStateChecker;
