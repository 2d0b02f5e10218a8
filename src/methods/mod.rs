//! Install method registry
//!
//! One [`MethodHandler`] per [`InstallMethod`] knows how to probe, install
//! and roll back a package. The registry is populated once and shared by the
//! state checker, the installer, the preview and the CLI, so there is a
//! single place that maps a method to its commands.
//!
//! | method | probe | install | rollback |
//! |---|---|---|---|
//! | apt | `dpkg-query` status | `apt-get install -y` | `apt-get remove -y` |
//! | snap | `snap list <name>` | `snap install [flags]` | `snap remove` |
//! | npm | `npm list -g` | `npm install -g` | `npm uninstall -g` |
//! | cargo | `cargo install --list` | `cargo install` | `cargo uninstall` |
//! | github | binary in the bin dir | latest release asset | `rm -f` the binary |
//! | curl | command on PATH | remote script piped to a shell | unsupported |
//! | script | none | `bash <path>` | unsupported |

mod curl;
mod github;
mod managers;
mod script;

pub use curl::CurlHandler;
pub use github::{GithubHandler, ReleaseAsset, arch_aliases, select_release_asset};
pub use managers::ManagerHandler;
pub use script::ScriptHandler;

use crate::catalog::PackageRecord;
use crate::executor::{CommandExecutor, ExecResult, FailureKind};
use crate::types::InstallMethod;
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;

/// Shell-quote a value interpolated into a command line
pub(crate) fn quote(value: &str) -> Cow<'_, str> {
    shell_words::quote(value)
}

/// Install, rollback and probe commands for one install method
pub trait MethodHandler: Send + Sync {
    fn method(&self) -> InstallMethod;

    /// Command whose exit status alone tells whether `pkg` is installed.
    ///
    /// `None` means the method has no way to tell, and the package is
    /// always treated as not installed.
    fn probe_command(&self, pkg: &PackageRecord) -> Option<String>;

    /// Static install command line, when one exists
    fn install_command(&self, pkg: &PackageRecord) -> Option<String>;

    /// Install `pkg`. The default runs [`MethodHandler::install_command`].
    fn install(
        &self,
        pkg: &PackageRecord,
        executor: &dyn CommandExecutor,
        verbose: bool,
    ) -> ExecResult {
        match self.install_command(pkg) {
            Some(command) => executor.execute(&command, verbose),
            None => ExecResult::failure(
                FailureKind::UnsupportedMethod,
                format!("No install command for {} ({})", pkg.id, self.method()),
            ),
        }
    }

    /// Command that undoes an install, or `None` if rollback is unsupported
    fn rollback_command(&self, pkg: &PackageRecord) -> Option<String>;
}

/// Lookup table from install method to handler
#[derive(Default)]
pub struct MethodRegistry {
    handlers: HashMap<InstallMethod, Box<dyn MethodHandler>>,
}

impl std::fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut methods: Vec<_> = self.handlers.keys().map(|m| m.to_string()).collect();
        methods.sort();
        f.debug_struct("MethodRegistry").field("methods", &methods).finish()
    }
}

impl MethodRegistry {
    /// A registry with no handlers
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with a handler for every built-in method
    pub fn standard(github_bin_dir: &Path) -> Self {
        let mut registry = Self::empty();
        registry.register(ManagerHandler::apt());
        registry.register(ManagerHandler::snap());
        registry.register(ManagerHandler::npm());
        registry.register(ManagerHandler::cargo());
        registry.register(GithubHandler::new(github_bin_dir));
        registry.register(CurlHandler);
        registry.register(ScriptHandler);
        registry
    }

    /// Register (or replace) the handler for its method
    pub fn register<H: MethodHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.method(), Box::new(handler));
    }

    pub fn get(&self, method: InstallMethod) -> Option<&dyn MethodHandler> {
        self.handlers.get(&method).map(|h| h.as_ref())
    }

    pub fn supports(&self, method: InstallMethod) -> bool {
        self.handlers.contains_key(&method)
    }

    pub fn probe_command(&self, pkg: &PackageRecord) -> Option<String> {
        self.get(pkg.method).and_then(|h| h.probe_command(pkg))
    }

    pub fn install_command(&self, pkg: &PackageRecord) -> Option<String> {
        self.get(pkg.method).and_then(|h| h.install_command(pkg))
    }

    /// Install through the method's handler; unknown methods fail permanently
    pub fn install(
        &self,
        pkg: &PackageRecord,
        executor: &dyn CommandExecutor,
        verbose: bool,
    ) -> ExecResult {
        match self.get(pkg.method) {
            Some(handler) => handler.install(pkg, executor, verbose),
            None => ExecResult::failure(
                FailureKind::UnsupportedMethod,
                format!("Unsupported install method: {}", pkg.method),
            ),
        }
    }

    pub fn rollback_command(&self, pkg: &PackageRecord) -> Option<String> {
        self.get(pkg.method).and_then(|h| h.rollback_command(pkg))
    }
}
