//! Pre-flight checks for the host system
//!
//! Run before a batch install to catch the problems that would otherwise
//! fail every package one by one:
//! - unsupported OS or architecture
//! - missing base tools (curl, wget, git)
//! - sudo that would prompt for a password in the middle of the run
//!
//! All probing goes through the [`CommandExecutor`], so the checks are
//! testable with a scripted executor.

use crate::executor::{CommandExecutor, ExecResult};

/// Base tools every install method leans on
pub const REQUIRED_TOOLS: &[&str] = &["curl", "wget", "git"];

const SUPPORTED_ARCHES: &[&str] = &["x86_64", "aarch64"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    pub shell: String,
    pub user: String,
}

impl SystemInfo {
    /// Linux on x86_64 or aarch64
    pub fn is_compatible(&self) -> bool {
        self.os == "Linux" && SUPPORTED_ARCHES.contains(&self.arch.as_str())
    }
}

/// Result of all pre-flight checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightReport {
    pub system: SystemInfo,
    pub compatible: bool,
    pub missing_tools: Vec<String>,
    /// `sudo -n true` succeeded
    pub passwordless_sudo: bool,
    /// `None` when the update was skipped
    pub system_updated: Option<bool>,
}

impl PreflightReport {
    /// True when nothing would stop a batch from running
    pub fn is_ok(&self) -> bool {
        self.compatible && self.missing_tools.is_empty()
    }
}

fn text(result: ExecResult) -> String {
    if result.success {
        result.output.trim().to_string()
    } else {
        String::new()
    }
}

pub fn system_info(executor: &dyn CommandExecutor) -> SystemInfo {
    SystemInfo {
        os: text(executor.execute("uname -s", false)),
        arch: text(executor.execute("uname -m", false)),
        shell: text(executor.execute("echo $SHELL", false)),
        user: text(executor.execute("whoami", false)),
    }
}

/// Base tools that are not on PATH
pub fn missing_tools(executor: &dyn CommandExecutor) -> Vec<String> {
    REQUIRED_TOOLS
        .iter()
        .filter(|tool| {
            !executor
                .execute(&format!("command -v {} >/dev/null 2>&1", tool), false)
                .success
        })
        .map(|tool| tool.to_string())
        .collect()
}

/// True if sudo works without prompting
pub fn ensure_sudo(executor: &dyn CommandExecutor) -> bool {
    executor.execute("sudo -n true", false).success
}

/// Refresh package lists and upgrade installed packages
pub fn update_system(executor: &dyn CommandExecutor, verbose: bool) -> bool {
    let update = executor.execute("sudo apt-get update", verbose);
    if !update.success {
        tracing::warn!("apt-get update failed: {}", update.error_message());
        return false;
    }

    let upgrade = executor.execute(
        "sudo DEBIAN_FRONTEND=noninteractive apt-get upgrade -y",
        verbose,
    );
    if !upgrade.success {
        tracing::warn!("apt-get upgrade failed: {}", upgrade.error_message());
    }
    upgrade.success
}

/// Run every check. The system update runs only when `update` is set and
/// the host is compatible.
pub fn run_preflight(executor: &dyn CommandExecutor, update: bool, verbose: bool) -> PreflightReport {
    tracing::debug!("Running pre-flight checks...");

    let system = system_info(executor);
    let compatible = system.is_compatible();
    if !compatible {
        tracing::warn!("Unsupported system: {} {}", system.os, system.arch);
    }

    let missing_tools = missing_tools(executor);
    let passwordless_sudo = ensure_sudo(executor);
    if !passwordless_sudo {
        tracing::info!("sudo may prompt for a password during installation");
    }

    let system_updated = (update && compatible).then(|| update_system(executor, verbose));

    PreflightReport {
        system,
        compatible,
        missing_tools,
        passwordless_sudo,
        system_updated,
    }
}
