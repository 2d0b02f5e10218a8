//! Progress Store
//!
//! Durable record of per-package install status, one JSON document at a
//! well-known path. A run that stops half-way leaves the file behind so the
//! next run can pick up only the unfinished packages.
//!
//! # Atomicity
//!
//! `save` writes a temp file in the target directory and renames it over
//! the target. A crash at any point leaves either the old document or the
//! new one, never a truncated mix.
//!
//! # Concurrency
//!
//! All read-modify-write cycles (`update_package_progress`) run under one
//! mutex, so parallel workers can report transitions at any rate.

use crate::error::{Result, SetupError};
use crate::types::PackageStatus;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// Category key used by the installer for package entries
pub const PACKAGES_CATEGORY: &str = "packages";

/// Persisted progress document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    /// Status of every package in the run, keyed by id
    pub packages: BTreeMap<String, PackageStatus>,
    /// Milliseconds since the Unix epoch of the last change
    pub timestamp: i64,
    /// Ids that reached `success`, in completion order
    pub completed: Vec<String>,
    /// Ids that reached `failed`, in completion order
    pub failed: Vec<String>,
    /// Statuses tracked under other category keys
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub categories: BTreeMap<String, BTreeMap<String, PackageStatus>>,
}

impl ProgressState {
    /// Fresh state with every id pending
    pub fn create_initial<I, S>(package_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            packages: package_ids
                .into_iter()
                .map(|id| (id.into(), PackageStatus::Pending))
                .collect(),
            timestamp: Utc::now().timestamp_millis(),
            completed: Vec::new(),
            failed: Vec::new(),
            categories: BTreeMap::new(),
        }
    }

    /// True iff any package is still pending or installing
    pub fn has_unfinished(&self) -> bool {
        self.packages.values().any(|s| s.is_unfinished())
    }

    /// Ids whose status is in `statuses`, in id order
    pub fn ids_with(&self, statuses: &[PackageStatus]) -> Vec<String> {
        self.packages
            .iter()
            .filter(|(_, status)| statuses.contains(status))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Set one package's status, keeping `completed`/`failed` in step
    pub fn set_status(&mut self, category: &str, id: &str, status: PackageStatus) {
        let entries = if category == PACKAGES_CATEGORY {
            &mut self.packages
        } else {
            self.categories.entry(category.to_string()).or_default()
        };
        entries.insert(id.to_string(), status);

        if category == PACKAGES_CATEGORY {
            self.completed.retain(|c| c != id);
            self.failed.retain(|f| f != id);
            match status {
                PackageStatus::Success => self.completed.push(id.to_string()),
                PackageStatus::Failed => self.failed.push(id.to_string()),
                PackageStatus::Pending | PackageStatus::Installing => {}
            }
        }

        self.timestamp = Utc::now().timestamp_millis();
    }

    pub fn stats(&self) -> ProgressStats {
        let all = self
            .packages
            .values()
            .chain(self.categories.values().flat_map(|c| c.values()));

        let mut stats = ProgressStats::default();
        for status in all {
            stats.total += 1;
            match status {
                PackageStatus::Success => stats.completed += 1,
                PackageStatus::Failed => stats.failed += 1,
                PackageStatus::Pending => stats.pending += 1,
                PackageStatus::Installing => stats.installing += 1,
            }
        }
        stats
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressStats {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub pending: usize,
    pub installing: usize,
}

/// File-backed store for [`ProgressState`]
#[derive(Debug)]
pub struct ProgressStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Atomically replace the progress file with `state`
    pub fn save(&self, state: &ProgressState) -> Result<()> {
        let _guard = self.guard();
        self.write(state)
    }

    fn write(&self, state: &ProgressState) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let json = serde_json::to_string_pretty(state)?;
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(json.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| {
            SetupError::progress(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e.error
            ))
        })?;
        Ok(())
    }

    /// Load the saved state. A missing or unreadable file reads as `None`.
    pub fn load(&self) -> Option<ProgressState> {
        let _guard = self.guard();
        self.read()
    }

    fn read(&self) -> Option<ProgressState> {
        let content = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(state) => Some(state),
            Err(e) => {
                tracing::warn!("Ignoring unreadable progress file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Remove the progress file; a missing file is not an error
    pub fn clear(&self) -> Result<()> {
        let _guard = self.guard();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// True iff a saved state has a package still pending or installing
    pub fn can_resume(&self) -> bool {
        self.load().is_some_and(|s| s.has_unfinished())
    }

    /// Create, persist and return a fresh state for `package_ids`
    pub fn create_initial<I, S>(&self, package_ids: I) -> Result<ProgressState>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let state = ProgressState::create_initial(package_ids);
        self.save(&state)?;
        Ok(state)
    }

    /// Load, set one entry, save. Starts from an empty state if none exists.
    pub fn update_package_progress(
        &self,
        category: &str,
        id: &str,
        status: PackageStatus,
    ) -> Result<()> {
        let _guard = self.guard();
        let mut state = self
            .read()
            .unwrap_or_else(|| ProgressState::create_initial(Vec::<String>::new()));
        state.set_status(category, id, status);
        self.write(&state)
    }

    /// True if `id` is recorded as successfully installed
    pub fn is_completed(&self, category: &str, id: &str) -> bool {
        let Some(state) = self.load() else {
            return false;
        };
        let status = if category == PACKAGES_CATEGORY {
            state.packages.get(id)
        } else {
            state.categories.get(category).and_then(|c| c.get(id))
        };
        status == Some(&PackageStatus::Success)
    }

    pub fn stats(&self) -> ProgressStats {
        self.load().map(|s| s.stats()).unwrap_or_default()
    }
}
