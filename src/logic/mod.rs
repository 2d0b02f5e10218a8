//! Pre-install logic: is a package already there, and can it be installed?
//!
//! # Modules
//!
//! - `state_checker` - probes whether a package is already installed
//! - `resolver` - checks (and installs on demand) the tools a package needs

pub mod resolver;
pub mod state_checker;
