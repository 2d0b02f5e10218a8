//! Error handling module for dotsetup
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Command execution failures are NOT represented here: the executor reports
//! those as data (`ExecResult`), because a failed install is an expected
//! outcome rather than an error of the orchestrator itself.

use thiserror::Error;

/// Main error type for the orchestrator
#[derive(Error, Debug)]
pub enum SetupError {
    /// IO errors (progress file, error log, catalog file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors (loading, parsing, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog construction or validation errors
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Progress store errors (persisting, locating the file)
    #[error("Progress error: {0}")]
    Progress(String),

    /// Lookup of a package id that is not in the catalog
    #[error("Unknown package: {0}")]
    UnknownPackage(String),

    /// Lookup of a category id that is not in the catalog
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    /// Package lifecycle state machine transition errors
    #[error("Lifecycle transition error: {0}")]
    Transition(String),
}

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, SetupError>;

impl SetupError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a catalog error
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog(msg.into())
    }

    /// Create a progress store error
    pub fn progress(msg: impl Into<String>) -> Self {
        Self::Progress(msg.into())
    }
}
