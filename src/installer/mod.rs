//! Installer Core
//!
//! Drives one package through its lifecycle: probe, dependencies, install
//! attempts with backoff, best-effort rollback. Batch orchestration (worker
//! pool, resume, retry-failed) lives in [`batch`].
//!
//! # Design
//!
//! | Concern | Owner |
//! |---------|-------|
//! | Which command installs/removes/probes a package | [`MethodRegistry`] |
//! | Whether the package is already there | [`InstallStateChecker`] |
//! | Supporting tools | [`DependencyResolver`] |
//! | Where the package is in its flow | [`PackageLifecycle`] |
//! | How long to wait between attempts | [`RetryPolicy`] + [`Sleeper`] |
//! | What went wrong | [`ErrorClassifier`] |
//! | What survives a crash | [`ProgressStore`] |
//!
//! Every lifecycle transition is reported to the [`InstallObserver`] and,
//! when the persisted status changes, written to the progress store.
//! Progress write failures are logged and never fail the install.
//!
//! Packages whose method takes the system package lock (apt) run their
//! install and rollback commands while holding the installer's lock, so
//! parallel workers never invoke two apt operations at once.

mod batch;
mod observer;

pub use batch::BatchReport;
pub use observer::{InstallObserver, NoopObserver};

use crate::catalog::PackageRecord;
use crate::config::{InstallOptions, OrchestratorConfig};
use crate::error::Result;
use crate::error_classifier::ErrorClassifier;
use crate::executor::{CommandExecutor, ExecFailure, ExecResult, FailureKind, ShellExecutor};
use crate::install_state::{PackageLifecycle, PackageStage};
use crate::logic::resolver::DependencyResolver;
use crate::logic::state_checker::InstallStateChecker;
use crate::methods::MethodRegistry;
use crate::paths;
use crate::process_guard::CancelToken;
use crate::progress::{PACKAGES_CATEGORY, ProgressStore};
use crate::retry::{RetryPolicy, Sleeper, ThreadSleeper};
use crate::types::PackageStatus;
use std::sync::{Arc, Mutex, MutexGuard};

/// Message fragments that mark a failure as permanent
const PERMANENT_MARKERS: &[&str] = &["not installed", "not found"];

/// Result of installing one package within one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub package: PackageRecord,
    /// Install attempts actually made (0 when already installed or blocked by dependencies)
    pub attempts: u32,
    pub success: bool,
    pub error: Option<String>,
    /// True iff a rollback command ran and succeeded
    pub rolled_back: bool,
}

impl InstallOutcome {
    fn succeeded(package: &PackageRecord, attempts: u32) -> Self {
        Self {
            package: package.clone(),
            attempts,
            success: true,
            error: None,
            rolled_back: false,
        }
    }

    fn failed(package: &PackageRecord, attempts: u32, error: String, rolled_back: bool) -> Self {
        Self {
            package: package.clone(),
            attempts,
            success: false,
            error: Some(error),
            rolled_back,
        }
    }
}

/// Installs packages through the method registry
pub struct Installer {
    executor: Arc<dyn CommandExecutor>,
    registry: Arc<MethodRegistry>,
    resolver: DependencyResolver,
    classifier: ErrorClassifier,
    progress: Option<ProgressStore>,
    sleeper: Arc<dyn Sleeper>,
    options: InstallOptions,
    verbose: bool,
    parallel: usize,
    system_lock: Mutex<()>,
    cancel: CancelToken,
}

impl std::fmt::Debug for Installer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("registry", &self.registry)
            .field("progress", &self.progress.as_ref().map(|p| p.path()))
            .field("options", &self.options)
            .field("parallel", &self.parallel)
            .finish_non_exhaustive()
    }
}

impl Installer {
    /// An installer with the standard registry and resolver, no progress
    /// store and no error log
    pub fn new(config: &OrchestratorConfig, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            executor,
            registry: Arc::new(MethodRegistry::standard(&config.github_bin_dir)),
            resolver: DependencyResolver::standard(),
            classifier: ErrorClassifier::without_log(),
            progress: None,
            sleeper: Arc::new(ThreadSleeper),
            options: config.install.clone(),
            verbose: config.verbose,
            parallel: config.parallel_installs.max(1),
            system_lock: Mutex::new(()),
            cancel: CancelToken::new(),
        }
    }

    /// A fully wired installer: shell executor, per-user progress file and
    /// error log (or the paths the config overrides them with)
    pub fn from_config(config: &OrchestratorConfig) -> Result<Self> {
        let progress_path = match &config.progress_file {
            Some(path) => path.clone(),
            None => paths::progress_file()?,
        };
        let log_path = match &config.error_log {
            Some(path) => path.clone(),
            None => paths::error_log_file()?,
        };
        let executor = Arc::new(ShellExecutor::new(config.command_timeout()));

        Ok(Self::new(config, executor)
            .with_progress(ProgressStore::new(progress_path))
            .with_classifier(ErrorClassifier::new(log_path)))
    }

    pub fn with_progress(mut self, store: ProgressStore) -> Self {
        self.progress = Some(store);
        self
    }

    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_registry(mut self, registry: Arc<MethodRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_resolver(mut self, resolver: DependencyResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Share a cancel token (typically the one wired to SIGINT/SIGTERM)
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn executor(&self) -> &dyn CommandExecutor {
        self.executor.as_ref()
    }

    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &DependencyResolver {
        &self.resolver
    }

    pub fn progress(&self) -> Option<&ProgressStore> {
        self.progress.as_ref()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_installed(&self, pkg: &PackageRecord) -> bool {
        InstallStateChecker::new(self.executor(), &self.registry).is_installed(pkg)
    }

    /// Uninstall `pkg` with its method's rollback command
    pub fn remove(&self, pkg: &PackageRecord) -> ExecResult {
        match self.registry.rollback_command(pkg) {
            Some(command) => {
                let _guard = self.lock_for(pkg);
                self.executor.execute(&command, self.verbose)
            }
            None => ExecResult::failure(
                FailureKind::UnsupportedMethod,
                format!("Cannot automatically remove {} (method: {})", pkg.id, pkg.method),
            ),
        }
    }

    /// Install one package, retrying transient failures and rolling back
    /// on terminal failure. Never returns early without a final status.
    pub fn install_package_advanced(
        &self,
        pkg: &PackageRecord,
        observer: &dyn InstallObserver,
    ) -> InstallOutcome {
        let mut run = PackageRun::new(self, pkg, observer);

        run.enter(PackageStage::CheckingInstalled);
        if self.is_installed(pkg) {
            tracing::info!("{} is already installed", pkg.display_name);
            run.enter(PackageStage::Done);
            return InstallOutcome::succeeded(pkg, 0);
        }

        run.enter(PackageStage::CheckingDependencies);
        let report = self
            .resolver
            .resolve(pkg, self.executor(), self.verbose, &self.system_lock);
        if !report.satisfied {
            let failure = ExecFailure::new(
                FailureKind::MissingDependencies,
                format!("Missing required dependencies: {}", report.missing.join(", ")),
            );
            run.report(&failure);
            run.fail();
            return InstallOutcome::failed(pkg, 0, failure.message, false);
        }

        let policy = RetryPolicy::from(&self.options);
        let mut attempts = 0;
        let failure = loop {
            run.enter(PackageStage::Installing);
            attempts += 1;
            tracing::info!(
                "Installing {} ({}), attempt {}/{}",
                pkg.display_name,
                pkg.method,
                attempts,
                policy.max_attempts
            );

            let result = {
                let _guard = self.lock_for(pkg);
                self.registry.install(pkg, self.executor(), self.verbose)
            };
            if result.success {
                tracing::info!("{} installed", pkg.display_name);
                run.enter(PackageStage::Done);
                return InstallOutcome::succeeded(pkg, attempts);
            }

            let failure = result.error.unwrap_or_else(|| {
                ExecFailure::new(FailureKind::NonZeroExit(None), result.output)
            });
            run.report(&failure);

            if is_permanent(&failure) {
                tracing::info!("{}: permanent failure, not retrying", pkg.id);
                break failure;
            }
            if !policy.should_retry(attempts) {
                break failure;
            }

            run.enter(PackageStage::Retrying);
            let delay = policy.delay_after(attempts);
            tracing::info!("{}: retrying in {}ms", pkg.id, delay.as_millis());
            self.sleeper.sleep(delay);
        };

        let rolled_back = self.options.enable_rollback && self.roll_back(pkg, &mut run);
        run.fail();
        InstallOutcome::failed(pkg, attempts, display_error(&failure), rolled_back)
    }

    /// Best-effort uninstall after a terminal failure
    fn roll_back(&self, pkg: &PackageRecord, run: &mut PackageRun<'_>) -> bool {
        run.enter(PackageStage::RollingBack);

        let Some(command) = self.registry.rollback_command(pkg) else {
            tracing::warn!(
                "Cannot automatically remove {} (method: {}). Manual removal may be required.",
                pkg.display_name,
                pkg.method
            );
            return false;
        };

        let result = {
            let _guard = self.lock_for(pkg);
            self.executor.execute(&command, self.verbose)
        };
        if result.success {
            tracing::info!("Rolled back {}", pkg.display_name);
        } else {
            tracing::warn!("Rollback of {} failed: {}", pkg.display_name, result.error_message());
        }
        result.success
    }

    /// The system package lock, taken only for methods that need it
    fn lock_for(&self, pkg: &PackageRecord) -> Option<MutexGuard<'_, ()>> {
        pkg.method
            .uses_system_lock()
            .then(|| self.system_lock.lock().unwrap_or_else(|p| p.into_inner()))
    }

    fn persist(&self, id: &str, status: PackageStatus) {
        let Some(store) = &self.progress else {
            return;
        };
        if let Err(e) = store.update_package_progress(PACKAGES_CATEGORY, id, status) {
            tracing::warn!("Could not record progress for {}: {}", id, e);
        }
    }
}

fn is_permanent(failure: &ExecFailure) -> bool {
    if failure.kind.is_permanent() {
        return true;
    }
    let lower = failure.message.to_lowercase();
    PERMANENT_MARKERS.iter().any(|m| lower.contains(m))
}

fn display_error(failure: &ExecFailure) -> String {
    if failure.message.trim().is_empty() {
        "Unknown error".to_string()
    } else {
        failure.message.clone()
    }
}

// ============================================================================
// Per-package run bookkeeping
// ============================================================================

/// Lifecycle plus the side effects of each transition
struct PackageRun<'a> {
    installer: &'a Installer,
    observer: &'a dyn InstallObserver,
    lifecycle: PackageLifecycle,
    persisted: Option<PackageStatus>,
}

impl<'a> PackageRun<'a> {
    fn new(installer: &'a Installer, pkg: &PackageRecord, observer: &'a dyn InstallObserver) -> Self {
        Self {
            installer,
            observer,
            lifecycle: PackageLifecycle::new(pkg.id.clone()),
            persisted: None,
        }
    }

    fn enter(&mut self, stage: PackageStage) {
        if let Err(e) = self.lifecycle.transition_to(stage) {
            tracing::error!("{}: {}", self.lifecycle.package_id(), e);
            return;
        }
        self.announce(stage);
    }

    fn fail(&mut self) {
        if let Err(e) = self.lifecycle.fail() {
            tracing::error!("{}: {}", self.lifecycle.package_id(), e);
            return;
        }
        self.announce(PackageStage::Failed);
    }

    /// Classify, log and publish one failed attempt
    fn report(&self, failure: &ExecFailure) {
        let error = self
            .installer
            .classifier
            .create_error(self.lifecycle.package_id(), failure);
        tracing::info!(
            "{}: {} ({})",
            error.package,
            error.error,
            error.category
        );
        self.observer.on_error(&error);
    }

    fn announce(&mut self, stage: PackageStage) {
        let status = stage.status();
        if self.persisted != Some(status) {
            self.installer.persist(self.lifecycle.package_id(), status);
            self.persisted = Some(status);
        }
        self.observer.on_progress(self.lifecycle.package_id(), stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_classifier::{ErrorCategory, InstallError};
    use crate::executor::ScriptedExecutor;
    use crate::retry::RecordingSleeper;
    use crate::types::InstallMethod;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        stages: Mutex<Vec<PackageStage>>,
        errors: Mutex<Vec<ErrorCategory>>,
    }

    impl InstallObserver for Recorder {
        fn on_progress(&self, _id: &str, stage: PackageStage) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_error(&self, error: &InstallError) {
            self.errors.lock().unwrap().push(error.category);
        }
    }

    fn jq() -> PackageRecord {
        PackageRecord::new("jq", "jq", "jq", InstallMethod::Apt)
    }

    fn installer(exec: Arc<ScriptedExecutor>, sleeper: Arc<RecordingSleeper>) -> Installer {
        Installer::new(&OrchestratorConfig::default(), exec).with_sleeper(sleeper)
    }

    #[test]
    fn test_already_installed_runs_no_install() {
        let exec = Arc::new(ScriptedExecutor::new().succeed("dpkg-query"));
        let installer = installer(exec.clone(), Arc::new(RecordingSleeper::new()));

        let outcome = installer.install_package_advanced(&jq(), &NoopObserver);
        assert!(outcome.success);
        assert_eq!(outcome.attempts, 0);
        assert_eq!(exec.count_matching("apt-get install"), 0);
    }

    #[test]
    fn test_network_failures_exhaust_retries() {
        let exec = Arc::new(ScriptedExecutor::new().fail("apt-get install", "network unreachable"));
        let sleeper = Arc::new(RecordingSleeper::new());
        let installer = installer(exec.clone(), sleeper.clone());
        let recorder = Recorder::default();

        let outcome = installer.install_package_advanced(&jq(), &recorder);
        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.error.as_deref(), Some("network unreachable"));
        assert_eq!(
            sleeper.delays(),
            vec![Duration::from_millis(2000), Duration::from_millis(4000)]
        );
        assert_eq!(*recorder.errors.lock().unwrap(), vec![ErrorCategory::Network; 3]);
    }

    #[test]
    fn test_not_found_stops_after_one_attempt_and_rolls_back() {
        let exec = Arc::new(
            ScriptedExecutor::new()
                .fail("apt-get install", "E: Unable to locate package: not found")
                .succeed("apt-get remove -y jq"),
        );
        let sleeper = Arc::new(RecordingSleeper::new());
        let installer = installer(exec.clone(), sleeper.clone());
        let recorder = Recorder::default();

        let outcome = installer.install_package_advanced(&jq(), &recorder);
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.rolled_back);
        assert!(sleeper.delays().is_empty());
        assert_eq!(
            recorder.stages.lock().unwrap().last(),
            Some(&PackageStage::Failed)
        );
        assert!(recorder.stages.lock().unwrap().contains(&PackageStage::RollingBack));
    }

    #[test]
    fn test_rollback_disabled() {
        let exec = Arc::new(ScriptedExecutor::new().fail("apt-get install", "not found"));
        let mut config = OrchestratorConfig::default();
        config.install.enable_rollback = false;
        let installer = Installer::new(&config, exec.clone());

        let outcome = installer.install_package_advanced(&jq(), &NoopObserver);
        assert!(!outcome.rolled_back);
        assert_eq!(exec.count_matching("apt-get remove"), 0);
    }

    #[test]
    fn test_curl_rollback_is_unsupported() {
        let exec = Arc::new(ScriptedExecutor::new().fail("curl -fsSL", "404 not found"));
        let installer = installer(exec, Arc::new(RecordingSleeper::new()));
        let pkg = PackageRecord::new("tool", "tool", "Tool", InstallMethod::Curl)
            .with_extra("https://example.com/install.sh");

        let outcome = installer.install_package_advanced(&pkg, &NoopObserver);
        assert!(!outcome.success);
        assert!(!outcome.rolled_back);
    }

    #[test]
    fn test_missing_dependency_is_fatal_without_attempts() {
        let exec = Arc::new(ScriptedExecutor::new());
        let installer = installer(exec.clone(), Arc::new(RecordingSleeper::new()));
        let pkg = PackageRecord::new("code", "code", "VS Code", InstallMethod::Snap)
            .with_flags("--classic");

        let outcome = installer.install_package_advanced(&pkg, &NoopObserver);
        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 0);
        assert!(outcome.error.unwrap().starts_with("Missing required dependencies: snapd"));
        assert_eq!(exec.count_matching("snap install"), 0);
    }

    #[test]
    fn test_progress_is_persisted() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = ProgressStore::new(dir.path().join("progress.json"));
        let exec = Arc::new(ScriptedExecutor::new().succeed("apt-get install"));
        let installer = installer(exec, Arc::new(RecordingSleeper::new())).with_progress(store);

        installer.install_package_advanced(&jq(), &NoopObserver);
        let store = installer.progress().unwrap();
        assert!(store.is_completed(PACKAGES_CATEGORY, "jq"));
    }

    #[test]
    fn test_remove_uses_rollback_command() {
        let exec = Arc::new(ScriptedExecutor::new().succeed("apt-get remove -y jq"));
        let installer = installer(exec.clone(), Arc::new(RecordingSleeper::new()));
        assert!(installer.remove(&jq()).success);

        let script = PackageRecord::new("s", "s", "S", InstallMethod::Script).with_extra("s.sh");
        let result = installer.remove(&script);
        assert_eq!(result.error.unwrap().kind, FailureKind::UnsupportedMethod);
    }
}
