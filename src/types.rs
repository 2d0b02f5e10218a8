//! Type-safe domain enums for dotsetup
//!
//! Install methods and package statuses are proper Rust enums instead of
//! strings, so every dispatch over them is exhaustive and typo-proof.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum::{Display, EnumIter, EnumString};

/// How a package gets onto the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InstallMethod {
    /// Debian/Ubuntu package via apt-get
    Apt,
    /// Snap package via snapd
    Snap,
    /// Global npm package
    Npm,
    /// Prebuilt binary from the latest GitHub release
    Github,
    /// Remote install script piped into a shell
    Curl,
    /// Crate installed with `cargo install`
    Cargo,
    /// Local setup script run with bash
    Script,
}

impl InstallMethod {
    /// Returns true if installs with this method take the system package
    /// manager lock (dpkg frontend lock for apt).
    ///
    /// Such operations must never run concurrently with each other.
    pub const fn uses_system_lock(self) -> bool {
        matches!(self, Self::Apt)
    }

    /// Rough download size hint shown by the dry-run preview
    pub const fn estimated_size(self) -> &'static str {
        match self {
            Self::Apt => "~10-50 MB",
            Self::Snap => "~50-200 MB",
            Self::Curl => "~5-20 MB",
            Self::Npm => "~1-10 MB",
            Self::Github => "~5-30 MB",
            Self::Cargo => "~10-100 MB",
            Self::Script => "Unknown",
        }
    }
}

/// Persisted per-package install status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PackageStatus {
    /// Scheduled but not yet started
    Pending,
    /// Currently being checked, installed, retried or rolled back
    #[serde(alias = "running")]
    #[strum(to_string = "installing", serialize = "running")]
    Installing,
    /// Installed (or found already installed)
    #[serde(alias = "completed")]
    #[strum(to_string = "success", serialize = "completed")]
    Success,
    /// Terminally failed for this run
    Failed,
}

impl PackageStatus {
    /// Returns true if the package still has work to do in an interrupted run
    pub const fn is_unfinished(self) -> bool {
        matches!(self, Self::Pending | Self::Installing)
    }

    /// Returns true if this is a terminal status (Success or Failed)
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

/// How the process was asked to run.
///
/// Built once by the CLI boundary and handed to the orchestration entry
/// point; nothing below the boundary inspects process arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Prompt for categories and confirmation before installing
    Interactive,
    /// Install without prompting, driven by a configuration file
    Headless { config: PathBuf },
}

impl RunMode {
    /// Returns true if the user may be prompted
    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Interactive)
    }
}
