//! Remote install scripts piped into a shell

use super::{MethodHandler, quote};
use crate::catalog::PackageRecord;
use crate::types::InstallMethod;

/// Runs `curl <url> | <shell>` with per-tool invocation flags.
///
/// Rollback is unsupported: install scripts leave no uniform uninstall path.
pub struct CurlHandler;

impl CurlHandler {
    fn pipeline(pkg: &PackageRecord) -> String {
        let url = pkg.extra_or_empty();
        let q = quote(url);

        match pkg.id.as_str() {
            "starship" | "rust" => format!("curl -fsSL {} | sh -s -- -y", q),
            "pnpm" => format!("curl -fsSL {} | sh -", q),
            "turso" => format!("curl -sSfL {} | bash", q),
            "nvm" => format!("curl -o- {} | bash", q),
            _ if url.contains("git.io/g-install") => {
                let flags = pkg.flags_prefix();
                let flags = flags.trim_end();
                if flags.is_empty() {
                    format!("curl -sSL {} | sh -s", q)
                } else {
                    format!("curl -sSL {} | sh -s -- {}", q, flags)
                }
            }
            _ => format!("curl -fsSL {} | bash", q),
        }
    }
}

impl MethodHandler for CurlHandler {
    fn method(&self) -> InstallMethod {
        InstallMethod::Curl
    }

    fn probe_command(&self, pkg: &PackageRecord) -> Option<String> {
        Some(format!(
            "command -v {} >/dev/null 2>&1",
            quote(pkg.command_name())
        ))
    }

    fn install_command(&self, pkg: &PackageRecord) -> Option<String> {
        Some(Self::pipeline(pkg))
    }

    fn rollback_command(&self, _pkg: &PackageRecord) -> Option<String> {
        None
    }
}
