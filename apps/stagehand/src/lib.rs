//! # Stagehand
//!
//! Process entry point for the Stagehand bootstrap engine: CLI, configuration
//! and the built-in store extensions.

pub mod builtins;
pub mod cli;
pub mod config;
pub mod error;

pub use error::AppError;
