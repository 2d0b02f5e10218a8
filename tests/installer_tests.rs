//! Tests for batch installation
//!
//! These tests drive the public installer API with a scripted executor,
//! a recording sleeper and a progress file in a temp directory. Nothing
//! touches the real package managers.

use dotsetup::catalog::{Catalog, Category, PackageRecord};
use dotsetup::config::OrchestratorConfig;
use dotsetup::error_classifier::{ErrorCategory, ErrorClassifier, InstallError};
use dotsetup::executor::{CommandExecutor, ExecResult, FailureKind, ScriptedExecutor};
use dotsetup::install_state::PackageStage;
use dotsetup::installer::{InstallObserver, InstallOutcome, Installer, NoopObserver};
use dotsetup::preview::preview_installation;
use dotsetup::progress::{PACKAGES_CATEGORY, ProgressStore};
use dotsetup::retry::RecordingSleeper;
use dotsetup::types::{InstallMethod, PackageStatus};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

fn apt(id: &str) -> PackageRecord {
    PackageRecord::new(id, id, id, InstallMethod::Apt)
}

fn catalog(packages: Vec<PackageRecord>) -> Catalog {
    Catalog::new(vec![Category {
        id: "test".into(),
        name: "Test".into(),
        description: "Test packages".into(),
        selected: true,
        packages,
    }])
    .unwrap()
}

fn network_error() -> ExecResult {
    ExecResult::failure(FailureKind::NonZeroExit(Some(100)), "network unreachable")
}

/// Fixture for the three-package scenario: a is already installed, b fails
/// twice with a network error then succeeds, c is not found and rolls back
fn scenario_executor() -> Arc<ScriptedExecutor> {
    Arc::new(
        ScriptedExecutor::new()
            .succeed("' pkg-a 2>/dev/null")
            .on(
                "apt-get install -y pkg-b",
                vec![network_error(), network_error(), ExecResult::ok("")],
            )
            .fail(
                "apt-get install -y pkg-c",
                "E: Unable to locate package pkg-c: not found",
            )
            .succeed("apt-get remove -y pkg-c"),
    )
}

struct Harness {
    _dir: TempDir,
    exec: Arc<ScriptedExecutor>,
    sleeper: Arc<RecordingSleeper>,
    installer: Installer,
    log_path: std::path::PathBuf,
}

fn harness(exec: Arc<ScriptedExecutor>, config: &OrchestratorConfig) -> Harness {
    let dir = TempDir::new().unwrap();
    let sleeper = Arc::new(RecordingSleeper::new());
    let log_path = dir.path().join("logs").join("setup-errors.log");
    let installer = Installer::new(config, exec.clone())
        .with_sleeper(sleeper.clone())
        .with_progress(ProgressStore::new(dir.path().join("setup").join("progress.json")))
        .with_classifier(ErrorClassifier::new(&log_path));
    Harness {
        _dir: dir,
        exec,
        sleeper,
        installer,
        log_path,
    }
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<(String, PackageStage)>>,
    errors: Mutex<Vec<InstallError>>,
    completed: Mutex<Option<Vec<InstallOutcome>>>,
}

impl InstallObserver for RecordingObserver {
    fn on_progress(&self, package_id: &str, stage: PackageStage) {
        self.events
            .lock()
            .unwrap()
            .push((package_id.to_string(), stage));
    }

    fn on_error(&self, error: &InstallError) {
        self.errors.lock().unwrap().push(error.clone());
    }

    fn on_complete(&self, outcomes: &[InstallOutcome]) {
        *self.completed.lock().unwrap() = Some(outcomes.to_vec());
    }
}

// =============================================================================
// End-to-end scenario
// =============================================================================

#[test]
fn test_three_package_scenario() {
    let h = harness(scenario_executor(), &OrchestratorConfig::default());
    let observer = RecordingObserver::default();
    let packages = vec![apt("pkg-a"), apt("pkg-b"), apt("pkg-c")];

    let report = h.installer.install_batch(&packages, &observer).unwrap();

    assert_eq!(report.successful_ids(), vec!["pkg-a", "pkg-b"]);
    assert_eq!(report.failed_ids(), vec!["pkg-c"]);
    assert_eq!(report.rolled_back_ids(), vec!["pkg-c"]);
    assert_eq!(report.exit_code(), 1);

    let attempts: Vec<u32> = report.outcomes().iter().map(|o| o.attempts).collect();
    assert_eq!(attempts, vec![0, 3, 1]);

    // Partial failure keeps the progress file for retry-failed
    let state = h.installer.progress().unwrap().load().unwrap();
    assert_eq!(state.completed, vec!["pkg-a", "pkg-b"]);
    assert_eq!(state.failed, vec!["pkg-c"]);
    assert!(!state.has_unfinished());

    // Backoff only for pkg-b: after attempts 1 and 2
    assert_eq!(
        h.sleeper.delays(),
        vec![Duration::from_millis(2000), Duration::from_millis(4000)]
    );

    // One classified error per failed attempt: 2 for b, 1 for c
    let categories: Vec<ErrorCategory> = observer
        .errors
        .lock()
        .unwrap()
        .iter()
        .map(|e| e.category)
        .collect();
    assert_eq!(
        categories,
        vec![ErrorCategory::Network, ErrorCategory::Network, ErrorCategory::NotFound]
    );

    let log = std::fs::read_to_string(&h.log_path).unwrap();
    assert_eq!(log.matches("Package: pkg-b").count(), 2);
    assert_eq!(log.matches("Package: pkg-c").count(), 1);

    let completed = observer.completed.lock().unwrap().clone().unwrap();
    assert_eq!(completed.len(), 3);
}

#[test]
fn test_observer_sees_stage_sequence() {
    let h = harness(scenario_executor(), &OrchestratorConfig::default());
    let observer = RecordingObserver::default();

    h.installer
        .install_batch(&[apt("pkg-c")], &observer)
        .unwrap();

    let stages: Vec<PackageStage> = observer
        .events
        .lock()
        .unwrap()
        .iter()
        .map(|(_, stage)| *stage)
        .collect();
    assert_eq!(
        stages,
        vec![
            PackageStage::CheckingInstalled,
            PackageStage::CheckingDependencies,
            PackageStage::Installing,
            PackageStage::RollingBack,
            PackageStage::Failed,
        ]
    );
}

// =============================================================================
// Retry semantics
// =============================================================================

#[test]
fn test_already_installed_never_installs() {
    let exec = Arc::new(ScriptedExecutor::new().succeed("' pkg-a 2>/dev/null"));
    let h = harness(exec, &OrchestratorConfig::default());

    let outcome = h.installer.install_package_advanced(&apt("pkg-a"), &NoopObserver);
    assert!(outcome.success);
    assert_eq!(outcome.attempts, 0);
    assert_eq!(h.exec.count_matching("apt-get install"), 0);
}

#[test]
fn test_persistent_network_failure_uses_all_attempts() {
    let exec = Arc::new(ScriptedExecutor::new().on("apt-get install", vec![network_error()]));
    let h = harness(exec, &OrchestratorConfig::default());

    let outcome = h.installer.install_package_advanced(&apt("pkg-x"), &NoopObserver);
    assert!(!outcome.success);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(h.exec.count_matching("apt-get install -y pkg-x"), 3);
    assert_eq!(
        h.sleeper.delays(),
        vec![Duration::from_millis(2000), Duration::from_millis(4000)]
    );
}

#[test]
fn test_not_found_stops_retrying() {
    let exec = Arc::new(ScriptedExecutor::new().fail("apt-get install", "Package pkg-x not found"));
    let mut config = OrchestratorConfig::default();
    config.install.max_retries = 5;
    let h = harness(exec, &config);

    let outcome = h.installer.install_package_advanced(&apt("pkg-x"), &NoopObserver);
    assert_eq!(outcome.attempts, 1);
    assert!(h.sleeper.delays().is_empty());
}

#[test]
fn test_custom_retry_delay() {
    let exec = Arc::new(ScriptedExecutor::new().on("apt-get install", vec![network_error()]));
    let mut config = OrchestratorConfig::default();
    config.install.max_retries = 4;
    config.install.retry_delay_ms = 100;
    let h = harness(exec, &config);

    h.installer.install_package_advanced(&apt("pkg-x"), &NoopObserver);
    assert_eq!(
        h.sleeper.delays(),
        vec![
            Duration::from_millis(100),
            Duration::from_millis(200),
            Duration::from_millis(400)
        ]
    );
}

#[test]
fn test_timeout_is_retried() {
    let exec = Arc::new(ScriptedExecutor::new().on(
        "apt-get install",
        vec![
            ExecResult::failure(FailureKind::Timeout, "Command timed out after 30s"),
            ExecResult::ok(""),
        ],
    ));
    let h = harness(exec, &OrchestratorConfig::default());

    let outcome = h.installer.install_package_advanced(&apt("pkg-x"), &NoopObserver);
    assert!(outcome.success);
    assert_eq!(outcome.attempts, 2);
}

// =============================================================================
// Resume, retry-failed, cancellation
// =============================================================================

/// Cancels the run as soon as the first package finishes
struct CancelAfterFirst<'a> {
    installer: &'a Installer,
}

impl InstallObserver for CancelAfterFirst<'_> {
    fn on_progress(&self, _package_id: &str, stage: PackageStage) {
        if stage.is_terminal() {
            self.installer.cancel_token().cancel();
        }
    }
}

#[test]
fn test_cancelled_run_resumes_unfinished_packages() {
    let exec = Arc::new(ScriptedExecutor::new().succeed("apt-get install"));
    let h = harness(exec, &OrchestratorConfig::default());
    let packages = vec![apt("pkg-a"), apt("pkg-b"), apt("pkg-c")];

    let observer = CancelAfterFirst {
        installer: &h.installer,
    };
    let report = h.installer.install_batch(&packages, &observer).unwrap();
    assert_eq!(report.successful_ids(), vec!["pkg-a"]);
    assert_eq!(report.cancelled, vec!["pkg-b", "pkg-c"]);

    let store = h.installer.progress().unwrap();
    assert!(store.can_resume());
    let state = store.load().unwrap();
    assert_eq!(state.packages["pkg-b"], PackageStatus::Pending);

    // A second installer over the same progress file picks up the rest
    let resumed = Installer::new(&OrchestratorConfig::default(), h.exec.clone())
        .with_progress(ProgressStore::new(store.path()));
    let report = resumed.resume(&catalog(packages), &NoopObserver).unwrap();
    assert_eq!(report.successful_ids(), vec!["pkg-b", "pkg-c"]);
    assert_eq!(h.exec.count_matching("apt-get install -y pkg-a"), 1);

    // Everything succeeded, so the progress file is gone
    assert!(store.load().is_none());
}

#[test]
fn test_retry_failed_only_reruns_failures() {
    let h = harness(scenario_executor(), &OrchestratorConfig::default());
    let packages = vec![apt("pkg-a"), apt("pkg-b"), apt("pkg-c")];
    h.installer.install_batch(&packages, &NoopObserver).unwrap();
    let b_calls = h.exec.count_matching("apt-get install -y pkg-b");

    let report = h
        .installer
        .retry_failed(&catalog(packages), &NoopObserver)
        .unwrap();
    assert_eq!(report.failed_ids(), vec!["pkg-c"]);
    assert_eq!(h.exec.count_matching("apt-get install -y pkg-b"), b_calls);
}

#[test]
fn test_dry_run_resume_only_previews() {
    let h = harness(
        Arc::new(ScriptedExecutor::new().succeed("apt-get install")),
        &OrchestratorConfig::default(),
    );
    let packages = vec![apt("pkg-a"), apt("pkg-b"), apt("pkg-c")];
    let store = h.installer.progress().unwrap();
    store.create_initial(["pkg-a", "pkg-b", "pkg-c"]).unwrap();
    store
        .update_package_progress(PACKAGES_CATEGORY, "pkg-a", PackageStatus::Success)
        .unwrap();
    store
        .update_package_progress(PACKAGES_CATEGORY, "pkg-c", PackageStatus::Failed)
        .unwrap();
    let before = store.load().unwrap();
    let catalog = catalog(packages);

    let resumable = h.installer.resumable_packages(&catalog);
    assert_eq!(resumable.len(), 1);
    assert_eq!(resumable[0].id, "pkg-b");
    let failed = h.installer.failed_packages(&catalog);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].id, "pkg-c");

    let entries = preview_installation(
        &resumable,
        h.installer.executor(),
        h.installer.registry(),
        h.installer.resolver(),
    );
    assert_eq!(entries.len(), 1);
    assert!(!entries[0].already_installed);

    assert_eq!(h.exec.count_matching("apt-get install"), 0);
    assert_eq!(store.load(), Some(before));
}

#[test]
fn test_resume_without_progress_is_empty() {
    let exec = Arc::new(ScriptedExecutor::new());
    let h = harness(exec, &OrchestratorConfig::default());

    let report = h
        .installer
        .resume(&catalog(vec![apt("pkg-a")]), &NoopObserver)
        .unwrap();
    assert!(report.outcomes().is_empty());
    assert!(h.exec.calls().is_empty());
}

// =============================================================================
// Worker pool
// =============================================================================

#[test]
fn test_parallel_outcomes_keep_input_order() {
    let exec = Arc::new(
        ScriptedExecutor::new()
            .succeed("apt-get install")
            .fail("cargo install", "error: could not find `nope` in registry: not found"),
    );
    let mut config = OrchestratorConfig::default();
    config.parallel_installs = 4;
    let h = harness(exec, &config);

    let packages = vec![
        apt("pkg-1"),
        PackageRecord::new("nope", "nope", "nope", InstallMethod::Cargo),
        apt("pkg-2"),
        apt("pkg-3"),
        apt("pkg-4"),
        apt("pkg-5"),
    ];
    let report = h.installer.install_batch(&packages, &NoopObserver).unwrap();

    assert_eq!(
        report.successful_ids(),
        vec!["pkg-1", "pkg-2", "pkg-3", "pkg-4", "pkg-5"]
    );
    assert_eq!(report.failed_ids(), vec!["nope"]);

    let state = h.installer.progress().unwrap().load().unwrap();
    assert_eq!(state.packages.len(), 6);
    assert_eq!(state.failed, vec!["nope"]);
    assert_eq!(state.completed.len(), 5);
}

/// Tracks how many apt installs run at the same time
#[derive(Default)]
struct ConcurrencyCounter {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl CommandExecutor for ConcurrencyCounter {
    fn execute(&self, command: &str, _verbose: bool) -> ExecResult {
        if !command.contains("apt-get install") {
            return ExecResult::failure(FailureKind::NonZeroExit(Some(1)), "");
        }
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        self.active.fetch_sub(1, Ordering::SeqCst);
        ExecResult::ok("")
    }
}

#[test]
fn test_apt_installs_never_overlap() {
    let exec = Arc::new(ConcurrencyCounter::default());
    let mut config = OrchestratorConfig::default();
    config.parallel_installs = 5;
    let installer = Installer::new(&config, exec.clone());

    let packages: Vec<PackageRecord> = (0..10).map(|i| apt(&format!("pkg-{}", i))).collect();
    let report = installer.install_batch(&packages, &NoopObserver).unwrap();

    assert_eq!(report.successful.len(), 10);
    assert_eq!(exec.peak.load(Ordering::SeqCst), 1);
}
