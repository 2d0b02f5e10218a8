//! Batch orchestration
//!
//! A batch run resets the progress file to "everything pending", then hands
//! packages to a pool of `parallel` scoped worker threads. Workers pull the
//! next index from a shared counter, so packages start in input order, and
//! write outcomes into per-index slots, so the report is in input order no
//! matter which worker finished first.
//!
//! Cancellation is checked before each package is taken. A cancelled batch
//! leaves the untouched packages `pending` on disk, which is exactly what
//! [`Installer::resume`] picks up.

use super::{InstallObserver, InstallOutcome, Installer};
use crate::catalog::{Catalog, PackageRecord};
use crate::error::Result;
use crate::types::PackageStatus;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// Aggregated result of one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub successful: Vec<InstallOutcome>,
    pub failed: Vec<InstallOutcome>,
    /// Failed packages whose rollback succeeded (also listed in `failed`)
    pub rolled_back: Vec<InstallOutcome>,
    /// Ids never started because the batch was cancelled
    pub cancelled: Vec<String>,
}

impl BatchReport {
    fn from_slots(packages: &[PackageRecord], slots: Vec<Option<InstallOutcome>>) -> Self {
        let mut report = Self::default();
        for (pkg, slot) in packages.iter().zip(slots) {
            match slot {
                Some(outcome) if outcome.success => report.successful.push(outcome),
                Some(outcome) => {
                    if outcome.rolled_back {
                        report.rolled_back.push(outcome.clone());
                    }
                    report.failed.push(outcome);
                }
                None => report.cancelled.push(pkg.id.clone()),
            }
        }
        report
    }

    pub fn successful_ids(&self) -> Vec<&str> {
        ids(&self.successful)
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        ids(&self.failed)
    }

    pub fn rolled_back_ids(&self) -> Vec<&str> {
        ids(&self.rolled_back)
    }

    /// Outcomes of every package that ran, successes first
    pub fn outcomes(&self) -> Vec<InstallOutcome> {
        self.successful
            .iter()
            .chain(self.failed.iter())
            .cloned()
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.cancelled.is_empty()
    }

    /// Process exit code: 0 on full success, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

fn ids(outcomes: &[InstallOutcome]) -> Vec<&str> {
    outcomes.iter().map(|o| o.package.id.as_str()).collect()
}

impl Installer {
    /// Install `packages` as a fresh run. The progress file is reset to
    /// "all pending" first.
    pub fn install_batch(
        &self,
        packages: &[PackageRecord],
        observer: &dyn InstallObserver,
    ) -> Result<BatchReport> {
        if let Some(store) = &self.progress {
            store.create_initial(packages.iter().map(|p| p.id.clone()))?;
        }
        Ok(self.run(packages, observer))
    }

    /// Continue an interrupted run: install only the packages the saved
    /// progress still lists as pending or installing, in catalog order.
    pub fn resume(&self, catalog: &Catalog, observer: &dyn InstallObserver) -> Result<BatchReport> {
        let packages = self.resumable_packages(catalog);
        tracing::info!("Resuming {} unfinished package(s)", packages.len());
        Ok(self.run(&packages, observer))
    }

    /// Re-run only the packages the saved progress lists as failed
    pub fn retry_failed(
        &self,
        catalog: &Catalog,
        observer: &dyn InstallObserver,
    ) -> Result<BatchReport> {
        let packages = self.failed_packages(catalog);
        tracing::info!("Retrying {} failed package(s)", packages.len());
        Ok(self.run(&packages, observer))
    }

    /// Packages [`resume`](Self::resume) would install, without installing them
    pub fn resumable_packages(&self, catalog: &Catalog) -> Vec<PackageRecord> {
        self.recorded(catalog, &[PackageStatus::Pending, PackageStatus::Installing])
    }

    /// Packages [`retry_failed`](Self::retry_failed) would install
    pub fn failed_packages(&self, catalog: &Catalog) -> Vec<PackageRecord> {
        self.recorded(catalog, &[PackageStatus::Failed])
    }

    /// Catalog packages whose saved status is one of `statuses`
    fn recorded(&self, catalog: &Catalog, statuses: &[PackageStatus]) -> Vec<PackageRecord> {
        let Some(state) = self.progress.as_ref().and_then(|s| s.load()) else {
            return Vec::new();
        };
        let wanted = state.ids_with(statuses);
        for id in &wanted {
            if catalog.find_by_id(id).is_none() {
                tracing::warn!("Progress lists unknown package {}, skipping", id);
            }
        }
        catalog
            .all_packages()
            .filter(|p| wanted.contains(&p.id))
            .cloned()
            .collect()
    }

    fn run(&self, packages: &[PackageRecord], observer: &dyn InstallObserver) -> BatchReport {
        let slots = self.run_pool(packages, observer);
        let report = BatchReport::from_slots(packages, slots);

        tracing::info!(
            "Batch finished: {} succeeded, {} failed, {} rolled back, {} cancelled",
            report.successful.len(),
            report.failed.len(),
            report.rolled_back.len(),
            report.cancelled.len()
        );

        self.clear_if_finished();
        observer.on_complete(&report.outcomes());
        report
    }

    fn run_pool(
        &self,
        packages: &[PackageRecord],
        observer: &dyn InstallObserver,
    ) -> Vec<Option<InstallOutcome>> {
        let slots: Vec<Mutex<Option<InstallOutcome>>> =
            packages.iter().map(|_| Mutex::new(None)).collect();
        let next = AtomicUsize::new(0);
        let workers = self.parallel.min(packages.len()).max(1);

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    loop {
                        if self.cancel.is_cancelled() {
                            break;
                        }
                        let index = next.fetch_add(1, Ordering::SeqCst);
                        let Some(pkg) = packages.get(index) else {
                            break;
                        };
                        let outcome = self.install_package_advanced(pkg, observer);
                        *slots[index].lock().unwrap_or_else(|p| p.into_inner()) = Some(outcome);
                    }
                });
            }
        });

        slots
            .into_iter()
            .map(|slot| slot.into_inner().unwrap_or_else(|p| p.into_inner()))
            .collect()
    }

    /// Drop the progress file once nothing is left to resume or retry
    fn clear_if_finished(&self) {
        let Some(store) = &self.progress else {
            return;
        };
        let Some(state) = store.load() else {
            return;
        };
        if state.failed.is_empty() && !state.has_unfinished() {
            if let Err(e) = store.clear() {
                tracing::warn!("Could not clear progress file: {}", e);
            }
        }
    }
}
