//! Dry-run preview
//!
//! Reports what a batch would do without running a single mutating
//! command: only probes and dependency checks go through the executor.

use crate::catalog::PackageRecord;
use crate::executor::CommandExecutor;
use crate::logic::resolver::DependencyResolver;
use crate::logic::state_checker::InstallStateChecker;
use crate::methods::MethodRegistry;
use crate::types::InstallMethod;
use serde::Serialize;

/// What installing one package would involve
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewEntry {
    pub package: String,
    pub name: String,
    pub method: InstallMethod,
    pub already_installed: bool,
    /// Required dependencies currently absent (would be installed first)
    pub missing_dependencies: Vec<String>,
    pub estimated_size: &'static str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewStats {
    pub total: usize,
    pub to_install: usize,
    pub already_installed: usize,
}

/// Preview `packages` in order
pub fn preview_installation(
    packages: &[PackageRecord],
    executor: &dyn CommandExecutor,
    registry: &MethodRegistry,
    resolver: &DependencyResolver,
) -> Vec<PreviewEntry> {
    let checker = InstallStateChecker::new(executor, registry);

    packages
        .iter()
        .map(|pkg| {
            let already_installed = checker.is_installed(pkg);
            let missing_dependencies = if already_installed {
                Vec::new()
            } else {
                resolver.check(pkg, executor)
            };
            PreviewEntry {
                package: pkg.id.clone(),
                name: pkg.display_name.clone(),
                method: pkg.method,
                already_installed,
                missing_dependencies,
                estimated_size: pkg.method.estimated_size(),
            }
        })
        .collect()
}

pub fn calculate_stats(entries: &[PreviewEntry]) -> PreviewStats {
    let already_installed = entries.iter().filter(|e| e.already_installed).count();
    PreviewStats {
        total: entries.len(),
        to_install: entries.len() - already_installed,
        already_installed,
    }
}
