//! Well-known per-user file locations
//!
//! Everything the orchestrator persists lives under `~/.dotfiles`:
//!
//! ```text
//! ~/.dotfiles/
//! ├── setup/progress.json      resumable install progress
//! └── logs/setup-errors.log    append-only error log
//! ```

use crate::error::{Result, SetupError};
use std::path::PathBuf;

/// Name of the data directory under the user's home
pub const DATA_DIR_NAME: &str = ".dotfiles";

/// Root of the per-user data directory (`~/.dotfiles`)
pub fn data_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(DATA_DIR_NAME))
        .ok_or_else(|| SetupError::config("Could not determine the home directory"))
}

/// Default location of the progress file
pub fn progress_file() -> Result<PathBuf> {
    Ok(data_dir()?.join("setup").join("progress.json"))
}

/// Default location of the error log
pub fn error_log_file() -> Result<PathBuf> {
    Ok(data_dir()?.join("logs").join("setup-errors.log"))
}
