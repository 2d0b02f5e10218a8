//! Prebuilt binaries from the latest GitHub release
//!
//! Install is a three step affair, all through the executor:
//! 1. fetch the latest-release JSON with curl and parse it
//! 2. read the machine architecture with `uname -m` and pick a
//!    `linux` + arch + `.tar.gz` asset
//! 3. download, extract and move the binary into the bin dir in a single
//!    shell sequence whose temp dir is removed on every exit path

use super::{MethodHandler, quote};
use crate::catalog::PackageRecord;
use crate::executor::{CommandExecutor, ExecResult, FailureKind};
use crate::types::InstallMethod;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// One downloadable file of a release
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
}

#[derive(Debug, Deserialize)]
struct Release {
    #[serde(default)]
    assets: Vec<ReleaseAsset>,
}

/// Spellings release authors use for a `uname -m` architecture
pub fn arch_aliases(arch: &str) -> Vec<&str> {
    match arch {
        "x86_64" | "amd64" => vec!["x86_64", "amd64"],
        "aarch64" | "arm64" => vec!["arm64", "aarch64"],
        other => vec![other],
    }
}

/// First Linux `.tar.gz` asset built for `arch`
pub fn select_release_asset<'a>(assets: &'a [ReleaseAsset], arch: &str) -> Option<&'a ReleaseAsset> {
    let aliases = arch_aliases(arch);
    assets.iter().find(|asset| {
        let name = asset.name.to_lowercase();
        name.contains("linux")
            && aliases.iter().any(|alias| name.contains(alias))
            && name.ends_with(".tar.gz")
    })
}

pub struct GithubHandler {
    bin_dir: PathBuf,
}

impl GithubHandler {
    pub fn new(bin_dir: &Path) -> Self {
        Self {
            bin_dir: bin_dir.to_path_buf(),
        }
    }

    fn target(&self, pkg: &PackageRecord) -> String {
        quote(&self.bin_dir.join(&pkg.name).to_string_lossy()).into_owned()
    }

    fn release_url(pkg: &PackageRecord) -> String {
        format!(
            "https://api.github.com/repos/{}/releases/latest",
            pkg.extra_or_empty()
        )
    }

    fn install_script(&self, pkg: &PackageRecord, asset: &ReleaseAsset) -> String {
        let name = quote(&pkg.name);
        let target = self.target(pkg);
        format!(
            "tmp=$(mktemp -d) && trap 'rm -rf \"$tmp\"' EXIT && \
             wget -q {url} -O \"$tmp/archive.tar.gz\" && \
             tar -xzf \"$tmp/archive.tar.gz\" -C \"$tmp\" && \
             bin=$(find \"$tmp\" -name {name} -type f | head -n 1) && \
             if [ -z \"$bin\" ]; then echo \"Binary {raw} not found in archive\" >&2; exit 1; fi && \
             sudo mv \"$bin\" {target} && sudo chmod +x {target}",
            url = quote(&asset.browser_download_url),
            name = name,
            raw = pkg.name,
            target = target,
        )
    }
}

impl MethodHandler for GithubHandler {
    fn method(&self) -> InstallMethod {
        InstallMethod::Github
    }

    fn probe_command(&self, pkg: &PackageRecord) -> Option<String> {
        Some(format!("test -x {}", self.target(pkg)))
    }

    /// Depends on the release contents, so there is no static command
    fn install_command(&self, _pkg: &PackageRecord) -> Option<String> {
        None
    }

    fn install(
        &self,
        pkg: &PackageRecord,
        executor: &dyn CommandExecutor,
        verbose: bool,
    ) -> ExecResult {
        let metadata = executor.execute(
            &format!("curl -fsSL {}", quote(&Self::release_url(pkg))),
            verbose,
        );
        if !metadata.success {
            return metadata;
        }

        let release: Release = match serde_json::from_str(&metadata.output) {
            Ok(release) => release,
            Err(e) => {
                return ExecResult::failure(
                    FailureKind::InvalidResponse,
                    format!(
                        "Could not parse release metadata for {}: {}",
                        pkg.extra_or_empty(),
                        e
                    ),
                );
            }
        };

        let uname = executor.execute("uname -m", false);
        let arch = if uname.success && !uname.output.trim().is_empty() {
            uname.output.trim().to_string()
        } else {
            "x86_64".to_string()
        };

        let Some(asset) = select_release_asset(&release.assets, &arch) else {
            return ExecResult::failure(
                FailureKind::NoMatchingAsset,
                format!(
                    "No release asset for linux/{} in {}",
                    arch,
                    pkg.extra_or_empty()
                ),
            );
        };

        tracing::debug!(package = %pkg.id, asset = %asset.name, "selected release asset");
        executor.execute(&self.install_script(pkg, asset), verbose)
    }

    fn rollback_command(&self, pkg: &PackageRecord) -> Option<String> {
        Some(format!("sudo rm -f {}", self.target(pkg)))
    }
}
