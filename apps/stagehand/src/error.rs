//! # Application Errors
//!
//! Everything the binary can fail with. Core failures pass through
//! unchanged so their fixed message prefixes reach the log.

use stagehand_core::StagehandError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Any bootstrap engine failure.
    #[error(transparent)]
    Bootstrap(#[from] StagehandError),

    /// The configuration file exists but could not be read.
    #[error("Config unreadable: {path}: {reason}")]
    ConfigRead { path: PathBuf, reason: String },

    /// The configuration file is not valid TOML for [`crate::config::FileConfig`].
    #[error("Config invalid: {path}: {reason}")]
    ConfigParse { path: PathBuf, reason: String },

    /// An explicitly requested configuration file does not exist.
    #[error("Config missing: {0}")]
    ConfigMissing(PathBuf),

    /// The whole bootstrap exceeded its time limit.
    #[error("Bootstrap timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Ctrl-C arrived before the bootstrap finished.
    #[error("Bootstrap interrupted")]
    Interrupted,

    /// `init` would overwrite an existing manifest.
    #[error("Manifest already exists at {0}. Use --force to overwrite.")]
    ManifestExists(PathBuf),

    /// Filesystem failure outside the core (module files for `init`).
    #[error("I/O error at {path}: {reason}")]
    Io { path: PathBuf, reason: String },
}

impl AppError {
    pub(crate) fn io(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            reason: error.to_string(),
        }
    }
}
