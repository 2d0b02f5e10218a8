//! Local setup scripts

use super::{MethodHandler, quote};
use crate::catalog::PackageRecord;
use crate::types::InstallMethod;

/// Runs a local script with bash. Scripts are not probed and cannot be rolled back.
pub struct ScriptHandler;

impl MethodHandler for ScriptHandler {
    fn method(&self) -> InstallMethod {
        InstallMethod::Script
    }

    fn probe_command(&self, _pkg: &PackageRecord) -> Option<String> {
        None
    }

    fn install_command(&self, pkg: &PackageRecord) -> Option<String> {
        Some(format!("bash {}", quote(pkg.extra_or_empty())))
    }

    fn rollback_command(&self, _pkg: &PackageRecord) -> Option<String> {
        None
    }
}
