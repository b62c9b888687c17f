//! # Stagehand CLI Module
//!
//! This module implements the CLI interface for Stagehand.
//!
//! ## Available Commands
//!
//! - `run` - Bootstrap the root and print a summary
//! - `check` - Load and validate the manifest only
//! - `plan` - Print per-stage waves and reconciled statuses
//! - `init` - Write the default manifest and built-in module files

mod commands;

use crate::config::{Overrides, Settings};
use crate::error::AppError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Stagehand - staged extension bootstrapper
///
/// Reads the extension manifest, activates extensions stage by stage in
/// dependency waves, and rewrites the manifest with normalized statuses.
#[derive(Parser, Debug)]
#[command(name = "stagehand")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Root directory holding the manifest and extension modules
    #[arg(short = 'r', long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Manifest file name, relative to the root
    #[arg(short = 'm', long, global = true)]
    pub manifest: Option<String>,

    /// Configuration file (defaults to stagehand.toml in the root)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Whole-bootstrap timeout in seconds (0 disables). A run cut short
    /// before every module resolves leaves the manifest untouched
    #[arg(short = 't', long, global = true)]
    pub timeout: Option<u64>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Flag values relevant to configuration resolution.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            root: self.root.clone(),
            manifest: self.manifest.clone(),
            config: self.config.clone(),
            timeout_secs: self.timeout,
        }
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Bootstrap every extension and print a summary
    Run,

    /// Load and validate the manifest without resolving modules
    Check,

    /// Resolve and schedule without writing or activating anything
    Plan,

    /// Write the default manifest and built-in module files
    Init {
        /// Overwrite an existing manifest
        #[arg(short, long)]
        force: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the parsed command against resolved settings.
pub async fn execute(command: Option<Commands>, settings: &Settings, json_mode: bool) -> Result<(), AppError> {
    match command {
        Some(Commands::Check) => cmd_check(settings, json_mode),
        Some(Commands::Plan) => cmd_plan(settings, json_mode).await,
        Some(Commands::Init { force }) => cmd_init(settings, force),
        // No subcommand - bootstrap by default
        Some(Commands::Run) | None => cmd_run(settings, json_mode).await,
    }
}

/// Resolve configuration for a parsed command line.
pub fn resolve_settings(cli: &Cli) -> Result<Settings, AppError> {
    Settings::resolve(cli.overrides())
}
