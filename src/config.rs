//! Orchestrator configuration
//!
//! Replaces free-floating verbose/dry-run flags with one explicit struct that
//! is built at the boundary (CLI flags merged over an optional JSON file) and
//! passed by reference into every component. There are no module-level
//! mutable settings anywhere in the crate.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound for the worker pool size
pub const MAX_PARALLEL_INSTALLS: usize = 5;

/// Retry and rollback behaviour of a single package install
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallOptions {
    /// Attempts per package (including the first one)
    pub max_retries: u32,
    /// Base delay before the first retry; doubles on every further retry
    pub retry_delay_ms: u64,
    /// Run the method's uninstall command after a terminal failure
    pub enable_rollback: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 2000,
            enable_rollback: true,
        }
    }
}

/// Full orchestrator configuration that can be saved/loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub install: InstallOptions,
    /// Echo every command and its output to the log
    pub verbose: bool,
    /// Preview only; never run a mutating command
    pub dry_run: bool,
    /// Worker count for batch installs (1 = strictly sequential)
    pub parallel_installs: usize,
    /// Hard timeout applied to every external command
    pub command_timeout_secs: u64,
    /// Skip `apt-get update` during preflight
    pub skip_system_update: bool,
    /// Destination directory for GitHub release binaries
    pub github_bin_dir: PathBuf,
    /// Override for the progress file location
    pub progress_file: Option<PathBuf>,
    /// Override for the error log location
    pub error_log: Option<PathBuf>,
    /// Load the catalog from this JSON file instead of the built-in table
    pub catalog_file: Option<PathBuf>,
    /// Categories selected for headless runs
    pub categories: Vec<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            install: InstallOptions::default(),
            verbose: false,
            dry_run: false,
            parallel_installs: 1,
            command_timeout_secs: 30,
            skip_system_update: false,
            github_bin_dir: PathBuf::from("/usr/local/bin"),
            progress_file: None,
            error_log: None,
            catalog_file: None,
            categories: Vec::new(),
        }
    }
}

impl OrchestratorConfig {
    /// Create a configuration with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor timeout as a `Duration`
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.install.max_retries == 0 {
            anyhow::bail!("install.max_retries must be at least 1");
        }

        if self.parallel_installs == 0 || self.parallel_installs > MAX_PARALLEL_INSTALLS {
            anyhow::bail!(
                "parallel_installs must be between 1 and {}",
                MAX_PARALLEL_INSTALLS
            );
        }

        if self.command_timeout_secs == 0 {
            anyhow::bail!("command_timeout_secs must be greater than zero");
        }

        if !self.github_bin_dir.is_absolute() {
            anyhow::bail!("github_bin_dir must be an absolute path");
        }

        if self.categories.iter().any(|c| c.trim().is_empty()) {
            anyhow::bail!("categories cannot contain empty ids");
        }

        Ok(())
    }
}
