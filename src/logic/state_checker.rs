//! Installation-state probing
//!
//! Each method's probe command is run through the executor and its exit
//! status is the only signal; output is never parsed. A method with no
//! handler or no probe reads as "not installed".

use crate::catalog::PackageRecord;
use crate::executor::CommandExecutor;
use crate::methods::MethodRegistry;

pub struct InstallStateChecker<'a> {
    executor: &'a dyn CommandExecutor,
    registry: &'a MethodRegistry,
}

impl<'a> InstallStateChecker<'a> {
    pub fn new(executor: &'a dyn CommandExecutor, registry: &'a MethodRegistry) -> Self {
        Self { executor, registry }
    }

    pub fn is_installed(&self, pkg: &PackageRecord) -> bool {
        let Some(probe) = self.registry.probe_command(pkg) else {
            tracing::debug!(package = %pkg.id, method = %pkg.method, "no probe, assuming not installed");
            return false;
        };

        let installed = self.executor.execute(&probe, false).success;
        tracing::debug!(package = %pkg.id, installed, "probed install state");
        installed
    }
}
