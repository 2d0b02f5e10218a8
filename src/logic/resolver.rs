//! Dependency Resolver
//!
//! Several install methods quietly rely on a runtime that a fresh machine
//! may not have: snapd for snaps, npm or pnpm for global npm packages,
//! curl/wget/tar for GitHub release binaries. The resolver checks those
//! before the main install and installs what it can on demand.
//!
//! # Resolution Rules
//!
//! | Source | Dependencies |
//! |--------|--------------|
//! | package `code`, `discord`, `android-studio` | snapd |
//! | package `gemini-cli` | npm or pnpm |
//! | package `ripgrep` | cargo (optional) |
//! | package `lazygit`, `lazydocker` | wget, tar |
//! | package `wezterm` | wget |
//! | package `docker.io` | systemd (no remediation) |
//! | method `snap` | snapd |
//! | method `npm` | npm or pnpm |
//! | method `github` | curl, wget, tar |
//!
//! Package rules come first, then method rules; a dependency name is only
//! checked once per package.
//!
//! # Outcome
//!
//! - present: nothing happens
//! - absent, optional: ignored
//! - absent, required, installable: install command runs (behind the system
//!   package lock); success lands in `auto_installed`, failure in `missing`
//! - absent, required, no remediation: `missing`

use crate::catalog::PackageRecord;
use crate::executor::CommandExecutor;
use crate::types::InstallMethod;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// A supporting tool a package needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    pub name: String,
    /// Exit status 0 means present
    pub check_command: String,
    pub install_command: Option<String>,
    pub required: bool,
}

impl DependencySpec {
    /// A dependency satisfied by a command on PATH, installable with apt
    pub fn apt_tool(name: &str, command: &str, apt_package: &str) -> Self {
        Self {
            name: name.to_string(),
            check_command: command_exists(command),
            install_command: Some(format!("sudo apt-get install -y {}", apt_package)),
            required: true,
        }
    }

    /// A required dependency that cannot be installed automatically
    pub fn manual(name: &str, command: &str) -> Self {
        Self {
            name: name.to_string(),
            check_command: command_exists(command),
            install_command: None,
            required: true,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

fn command_exists(command: &str) -> String {
    format!("command -v {} >/dev/null 2>&1", command)
}

fn snapd() -> DependencySpec {
    DependencySpec::apt_tool("snapd", "snap", "snapd")
}

fn npm_or_pnpm() -> DependencySpec {
    DependencySpec {
        name: "npm or pnpm".to_string(),
        check_command: format!("{} || {}", command_exists("npm"), command_exists("pnpm")),
        install_command: Some("sudo apt-get install -y npm".to_string()),
        required: true,
    }
}

/// Result of resolving one package's dependencies
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyReport {
    pub satisfied: bool,
    pub missing: Vec<String>,
    pub auto_installed: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DependencyResolver {
    by_package: HashMap<String, Vec<DependencySpec>>,
    by_method: HashMap<InstallMethod, Vec<DependencySpec>>,
}

impl Default for DependencyResolver {
    fn default() -> Self {
        Self::standard()
    }
}

impl DependencyResolver {
    /// A resolver that knows no dependencies at all
    pub fn empty() -> Self {
        Self {
            by_package: HashMap::new(),
            by_method: HashMap::new(),
        }
    }

    /// The built-in dependency tables
    pub fn standard() -> Self {
        let wget = || DependencySpec::apt_tool("wget", "wget", "wget");
        let tar = || DependencySpec::apt_tool("tar", "tar", "tar");

        Self::empty()
            .with_package("code", vec![snapd()])
            .with_package("discord", vec![snapd()])
            .with_package("android-studio", vec![snapd()])
            .with_package("gemini-cli", vec![npm_or_pnpm()])
            .with_package("ripgrep", vec![DependencySpec::manual("cargo", "cargo").optional()])
            .with_package("lazygit", vec![wget(), tar()])
            .with_package("lazydocker", vec![wget(), tar()])
            .with_package("wezterm", vec![wget()])
            .with_package("docker.io", vec![DependencySpec::manual("systemd", "systemctl")])
            .with_method(InstallMethod::Snap, vec![snapd()])
            .with_method(InstallMethod::Npm, vec![npm_or_pnpm()])
            .with_method(
                InstallMethod::Github,
                vec![DependencySpec::apt_tool("curl", "curl", "curl"), wget(), tar()],
            )
    }

    pub fn with_package(mut self, id: &str, deps: Vec<DependencySpec>) -> Self {
        self.by_package.insert(id.to_string(), deps);
        self
    }

    pub fn with_method(mut self, method: InstallMethod, deps: Vec<DependencySpec>) -> Self {
        self.by_method.insert(method, deps);
        self
    }

    /// All dependencies of `pkg`, package rules first, deduplicated by name
    pub fn dependencies_for(&self, pkg: &PackageRecord) -> Vec<DependencySpec> {
        let mut seen = HashSet::new();
        self.by_package
            .get(&pkg.id)
            .into_iter()
            .flatten()
            .chain(self.by_method.get(&pkg.method).into_iter().flatten())
            .filter(|dep| seen.insert(dep.name.clone()))
            .cloned()
            .collect()
    }

    /// Names of required dependencies that are currently absent. Never installs.
    pub fn check(&self, pkg: &PackageRecord, executor: &dyn CommandExecutor) -> Vec<String> {
        self.dependencies_for(pkg)
            .into_iter()
            .filter(|dep| dep.required && !executor.execute(&dep.check_command, false).success)
            .map(|dep| dep.name)
            .collect()
    }

    /// Check every dependency and install missing required ones on demand.
    ///
    /// Install commands go through apt, so they run while holding
    /// `system_lock`.
    pub fn resolve(
        &self,
        pkg: &PackageRecord,
        executor: &dyn CommandExecutor,
        verbose: bool,
        system_lock: &Mutex<()>,
    ) -> DependencyReport {
        let mut report = DependencyReport::default();

        for dep in self.dependencies_for(pkg) {
            if executor.execute(&dep.check_command, false).success {
                continue;
            }

            if !dep.required {
                tracing::debug!(package = %pkg.id, dependency = %dep.name, "optional dependency absent");
                continue;
            }

            let Some(install) = dep.install_command.as_deref() else {
                tracing::info!("{}: missing required dependency {}", pkg.id, dep.name);
                report.missing.push(dep.name);
                continue;
            };

            tracing::info!("{}: installing dependency {}", pkg.id, dep.name);
            let result = {
                let _guard = system_lock.lock().unwrap_or_else(|p| p.into_inner());
                executor.execute(install, verbose)
            };

            if result.success {
                report.auto_installed.push(dep.name);
            } else {
                tracing::warn!(
                    "{}: failed to install dependency {}: {}",
                    pkg.id,
                    dep.name,
                    result.error_message()
                );
                report.missing.push(dep.name);
            }
        }

        report.satisfied = report.missing.is_empty();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ScriptedExecutor;

    fn lazygit() -> PackageRecord {
        PackageRecord::new("lazygit", "lazygit", "lazygit", InstallMethod::Github)
            .with_extra("jesseduffield/lazygit")
    }

    #[test]
    fn test_package_and_method_rules_are_merged_without_duplicates() {
        let resolver = DependencyResolver::standard();
        let names: Vec<_> = resolver
            .dependencies_for(&lazygit())
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["wget", "tar", "curl"]);
    }

    #[test]
    fn test_apt_package_without_rules_has_no_dependencies() {
        let resolver = DependencyResolver::standard();
        let pkg = PackageRecord::new("jq", "jq", "jq", InstallMethod::Apt);
        assert!(resolver.dependencies_for(&pkg).is_empty());

        let exec = ScriptedExecutor::new();
        let report = resolver.resolve(&pkg, &exec, false, &Mutex::new(()));
        assert!(report.satisfied);
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn test_missing_dependency_is_auto_installed() {
        let resolver = DependencyResolver::standard();
        let pkg = PackageRecord::new("code", "code", "VS Code", InstallMethod::Snap);
        let exec = ScriptedExecutor::new().succeed("apt-get install -y snapd");

        let report = resolver.resolve(&pkg, &exec, false, &Mutex::new(()));
        assert!(report.satisfied);
        assert_eq!(report.auto_installed, vec!["snapd"]);
        // snapd appears in both the package and the method table
        assert_eq!(exec.count_matching("command -v snap"), 1);
    }

    #[test]
    fn test_failed_auto_install_reports_missing() {
        let resolver = DependencyResolver::standard();
        let pkg = PackageRecord::new("code", "code", "VS Code", InstallMethod::Snap);
        let exec = ScriptedExecutor::new().fail("apt-get install", "E: Could not get lock");

        let report = resolver.resolve(&pkg, &exec, false, &Mutex::new(()));
        assert!(!report.satisfied);
        assert_eq!(report.missing, vec!["snapd"]);
    }

    #[test]
    fn test_required_without_remediation_is_missing() {
        let resolver = DependencyResolver::standard();
        let pkg = PackageRecord::new("docker.io", "docker.io", "Docker", InstallMethod::Apt);
        let exec = ScriptedExecutor::new();

        let report = resolver.resolve(&pkg, &exec, false, &Mutex::new(()));
        assert_eq!(report.missing, vec!["systemd"]);
        assert!(!report.satisfied);
    }

    #[test]
    fn test_optional_dependency_is_ignored() {
        let resolver = DependencyResolver::standard();
        let pkg = PackageRecord::new("ripgrep", "ripgrep", "ripgrep", InstallMethod::Apt);
        let exec = ScriptedExecutor::new();

        let report = resolver.resolve(&pkg, &exec, false, &Mutex::new(()));
        assert!(report.satisfied);
        assert!(resolver.check(&pkg, &exec).is_empty());
    }

    #[test]
    fn test_check_never_installs() {
        let resolver = DependencyResolver::standard();
        let exec = ScriptedExecutor::new().succeed("command -v curl");

        let missing = resolver.check(&lazygit(), &exec);
        assert_eq!(missing, vec!["wget", "tar"]);
        assert_eq!(exec.count_matching("apt-get"), 0);
    }
}
