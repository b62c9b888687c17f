//! # Configuration
//!
//! Optional `stagehand.toml` in the root directory:
//!
//! ```toml
//! manifest = "extensions.json"
//! log_format = "json"
//! timeout_secs = 30
//! ```
//!
//! Command-line flags override file values; file values override defaults.

use crate::error::AppError;
use serde::Deserialize;
use stagehand_core::MANIFEST_FILE_NAME;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name, looked up in the root directory.
pub const CONFIG_FILE_NAME: &str = "stagehand.toml";

/// Environment variable selecting the log formatter.
pub const LOG_FORMAT_ENV: &str = "STAGEHAND_LOG_FORMAT";

// =============================================================================
// LOG FORMAT
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Parse an environment value. Anything but `json` is text.
    #[must_use]
    pub fn from_env_value(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

// =============================================================================
// FILE CONFIG
// =============================================================================

/// Contents of `stagehand.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Manifest file name, relative to the root.
    pub manifest: Option<String>,
    pub log_format: Option<LogFormat>,
    /// Whole-bootstrap timeout.
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Parse TOML text. `path` only labels errors.
    pub fn parse(text: &str, path: &Path) -> Result<Self, AppError> {
        toml::from_str(text).map_err(|e| AppError::ConfigParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// Load the configuration file.
///
/// An explicit path must exist. The default path may be absent, in which
/// case every value falls back to its default.
pub fn load_config(root: &Path, explicit: Option<&Path>) -> Result<FileConfig, AppError> {
    let path = match explicit {
        Some(path) if !path.is_file() => return Err(AppError::ConfigMissing(path.to_path_buf())),
        Some(path) => path.to_path_buf(),
        None => {
            let default = root.join(CONFIG_FILE_NAME);
            if !default.is_file() {
                return Ok(FileConfig::default());
            }
            default
        }
    };

    let text = std::fs::read_to_string(&path).map_err(|e| AppError::ConfigRead {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    let config = FileConfig::parse(&text, &path)?;
    tracing::debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

// =============================================================================
// RESOLVED SETTINGS
// =============================================================================

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root: PathBuf,
    pub manifest: Option<String>,
    pub config: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

/// Effective settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub root: PathBuf,
    pub manifest: String,
    pub timeout: Option<Duration>,
    pub log_format: LogFormat,
}

impl Settings {
    /// Merge flags over the file config over defaults.
    ///
    /// A zero timeout disables the limit.
    #[must_use]
    pub fn merge(overrides: Overrides, file: FileConfig) -> Self {
        let timeout_secs = overrides.timeout_secs.or(file.timeout_secs);
        Self {
            root: overrides.root,
            manifest: overrides
                .manifest
                .or(file.manifest)
                .unwrap_or_else(|| MANIFEST_FILE_NAME.to_string()),
            timeout: timeout_secs.filter(|secs| *secs > 0).map(Duration::from_secs),
            log_format: file.log_format.unwrap_or_default(),
        }
    }

    /// Load the config file named by the overrides and merge.
    pub fn resolve(overrides: Overrides) -> Result<Self, AppError> {
        let file = load_config(&overrides.root, overrides.config.as_deref())?;
        Ok(Self::merge(overrides, file))
    }
}

// =============================================================================
// TESTS
// =============================================================================
