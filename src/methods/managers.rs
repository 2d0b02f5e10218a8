//! Package-manager backed methods: apt, snap, npm and cargo
//!
//! These only differ in their command templates, so one handler type covers
//! all four. Templates receive the already-quoted package name.

use super::{MethodHandler, quote};
use crate::catalog::PackageRecord;
use crate::types::InstallMethod;

type Template = fn(&str) -> String;
type InstallTemplate = fn(&str, &str) -> String;

pub struct ManagerHandler {
    method: InstallMethod,
    probe: Template,
    /// `(flags_prefix, name)`
    install: InstallTemplate,
    remove: Template,
}

impl ManagerHandler {
    pub fn apt() -> Self {
        Self {
            method: InstallMethod::Apt,
            probe: |name| {
                format!(
                    "dpkg-query -W -f='${{Status}}' {} 2>/dev/null | grep -q 'install ok installed'",
                    name
                )
            },
            install: |flags, name| {
                format!(
                    "sudo DEBIAN_FRONTEND=noninteractive apt-get install -y {}{}",
                    flags, name
                )
            },
            remove: |name| format!("sudo apt-get remove -y {}", name),
        }
    }

    pub fn snap() -> Self {
        Self {
            method: InstallMethod::Snap,
            probe: |name| format!("snap list {} >/dev/null 2>&1", name),
            install: |flags, name| format!("sudo snap install {}{}", flags, name),
            remove: |name| format!("sudo snap remove {}", name),
        }
    }

    pub fn npm() -> Self {
        Self {
            method: InstallMethod::Npm,
            probe: |name| format!("npm list -g --depth=0 {} >/dev/null 2>&1", name),
            install: |flags, name| format!("npm install -g {}{}", flags, name),
            remove: |name| format!("npm uninstall -g {}", name),
        }
    }

    pub fn cargo() -> Self {
        Self {
            method: InstallMethod::Cargo,
            probe: |name| format!("cargo install --list 2>/dev/null | grep -q '^{} '", name),
            install: |flags, name| format!("cargo install {}{}", flags, name),
            remove: |name| format!("cargo uninstall {}", name),
        }
    }
}

impl MethodHandler for ManagerHandler {
    fn method(&self) -> InstallMethod {
        self.method
    }

    fn probe_command(&self, pkg: &PackageRecord) -> Option<String> {
        Some((self.probe)(&quote(&pkg.name)))
    }

    fn install_command(&self, pkg: &PackageRecord) -> Option<String> {
        Some((self.install)(&pkg.flags_prefix(), &quote(&pkg.name)))
    }

    fn rollback_command(&self, pkg: &PackageRecord) -> Option<String> {
        Some((self.remove)(&quote(&pkg.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apt_commands() {
        let handler = ManagerHandler::apt();
        let pkg = PackageRecord::new("docker.io", "docker.io", "Docker", InstallMethod::Apt);

        assert_eq!(
            handler.install_command(&pkg).unwrap(),
            "sudo DEBIAN_FRONTEND=noninteractive apt-get install -y docker.io"
        );
        assert_eq!(
            handler.rollback_command(&pkg).unwrap(),
            "sudo apt-get remove -y docker.io"
        );
        assert!(handler.probe_command(&pkg).unwrap().contains("dpkg-query"));
    }

    #[test]
    fn test_snap_honours_flags() {
        let handler = ManagerHandler::snap();
        let pkg = PackageRecord::new("code", "code", "VS Code", InstallMethod::Snap)
            .with_flags("--classic");

        assert_eq!(
            handler.install_command(&pkg).unwrap(),
            "sudo snap install --classic code"
        );
        assert_eq!(handler.rollback_command(&pkg).unwrap(), "sudo snap remove code");
    }

    #[test]
    fn test_npm_and_cargo_commands() {
        let npm = PackageRecord::new("gemini-cli", "gemini-cli", "Gemini", InstallMethod::Npm);
        assert_eq!(
            ManagerHandler::npm().install_command(&npm).unwrap(),
            "npm install -g gemini-cli"
        );

        let cargo = PackageRecord::new("ripgrep", "ripgrep", "ripgrep", InstallMethod::Cargo);
        assert_eq!(
            ManagerHandler::cargo().rollback_command(&cargo).unwrap(),
            "cargo uninstall ripgrep"
        );
    }
}
