//! # Core Error Types
//!
//! Every failure the bootstrap engine can surface lives in [`StagehandError`].
//! Each variant renders with one of three fixed prefixes so callers and tests
//! can match on message content:
//!
//! - `Config missing:` - the manifest file is absent
//! - `Config invalid:` - the manifest is malformed
//! - `Bootstrap error:` - module, dependency, activation or slot failures
//!
//! Nothing is retried. The caller logs the error and exits non-zero.

use crate::stage::{ExtensionKind, Stage};
use std::fmt;
use thiserror::Error;

// =============================================================================
// ERROR CATEGORY
// =============================================================================

/// Coarse failure category, mirroring the message prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCategory {
    /// The manifest file does not exist.
    ConfigMissing,
    /// The manifest exists but is structurally invalid.
    ConfigInvalid,
    /// Module resolution, dependency, activation or post-condition failure.
    Bootstrap,
}

impl ErrorCategory {
    /// The fixed message prefix for this category.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::ConfigMissing => "Config missing:",
            Self::ConfigInvalid => "Config invalid:",
            Self::Bootstrap => "Bootstrap error:",
        }
    }
}

// =============================================================================
// DESCRIPTOR FIELDS
// =============================================================================

/// Required field of an extension descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DescriptorField {
    Name,
    Version,
    Kind,
    Activate,
}

impl fmt::Display for DescriptorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Name => "name",
            Self::Version => "version",
            Self::Kind => "kind",
            Self::Activate => "activate",
        };
        f.write_str(name)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur while bootstrapping extensions.
///
/// All variants are fatal for the run that produced them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StagehandError {
    // -------------------------------------------------------------------------
    // Manifest shape
    // -------------------------------------------------------------------------
    /// The manifest file is absent from the root directory.
    #[error("Config missing: {file}. Restore the default file.")]
    ConfigMissing { file: String },

    /// The manifest exists but could not be read.
    #[error("Config invalid: unreadable manifest {file} ({reason}).")]
    ConfigUnreadable { file: String, reason: String },

    /// The manifest is not valid JSON.
    #[error("Config invalid: JSON parse error ({0}).")]
    JsonParse(String),

    /// The manifest is not a JSON object or lacks stage keys.
    #[error("Config invalid: missing required stage arrays ({}).", join_stages(.0))]
    MissingStages(Vec<Stage>),

    /// A stage key maps to something other than an array.
    #[error("Config invalid: stage values must be arrays ({0}).")]
    StageNotArray(Stage),

    /// An entry lacks one of its string fields.
    #[error("Config invalid: entry {index} in {stage} missing: name, path, status.")]
    EntryFieldsMissing { stage: Stage, index: usize },

    /// A status is not `on`, `off` or `needs:<deps>`.
    #[error("Config invalid: status must be on, off, or needs:<dependency> (got {status:?}).")]
    InvalidStatus { status: String },

    /// A `needs:` status with nothing after the colon.
    #[error("Config invalid: needs list cannot be empty.")]
    EmptyNeeds,

    /// A `needs:` status with a blank dependency name.
    #[error("Config invalid: needs list contains empty dependency names.")]
    EmptyNeedsName,

    /// Two entries in the same stage share a name.
    #[error("Config invalid: duplicate extension name {name} in {stage}.")]
    DuplicateEntry { stage: Stage, name: String },

    // -------------------------------------------------------------------------
    // Module resolution
    // -------------------------------------------------------------------------
    /// The entry path does not resolve to a file under the root.
    #[error("Bootstrap error: extension module missing: {path}.")]
    ModuleMissing { path: String },

    /// The entry path climbs out of the root with `..`.
    #[error("Bootstrap error: extension module path escapes the root: {path}.")]
    ModuleOutsideRoot { path: String },

    /// The file exists but exports no descriptor.
    #[error("Bootstrap error: extension module missing default export: {path}.")]
    MissingDefaultExport { path: String },

    /// The descriptor lacks a required field (or it is empty).
    #[error("Bootstrap error: extension missing required field: {field} ({path}).")]
    MissingField { field: DescriptorField, path: String },

    /// The descriptor kind is not one of the known kinds.
    #[error("Bootstrap error: extension has invalid kind: {kind} ({path}).")]
    InvalidKind { kind: String, path: String },

    /// The descriptor name differs from the manifest entry name.
    #[error("Bootstrap error: extension name mismatch: entry {entry} resolves to {name}.")]
    NameMismatch { entry: String, name: String },

    // -------------------------------------------------------------------------
    // Dependency analysis
    // -------------------------------------------------------------------------
    /// An extension registered under a stage with a different kind.
    #[error("Bootstrap error: extension kind mismatch for {stage}: {name} is {kind}.")]
    KindMismatch {
        stage: Stage,
        name: String,
        kind: ExtensionKind,
    },

    /// An `after` entry names an extension absent from the stage.
    #[error("Bootstrap error: unknown dependency {dependency} for {name}.")]
    UnknownDependency { dependency: String, name: String },

    /// The `after` edges of a stage contain a cycle.
    #[error("Bootstrap error: dependency cycle detected in {0}.")]
    DependencyCycle(Stage),

    // -------------------------------------------------------------------------
    // Activation and post-conditions
    // -------------------------------------------------------------------------
    /// An extension's activate call failed.
    #[error("Bootstrap error: activation failed for {name} in {stage}: {reason}.")]
    Activation {
        stage: Stage,
        name: String,
        reason: String,
    },

    /// Mandatory context slots were left empty.
    #[error("Bootstrap error: missing required store slots: {}.", .0.join(", "))]
    MissingSlots(Vec<String>),

    /// The normalized manifest could not be written.
    #[error("Bootstrap error: failed to write {file}: {reason}.")]
    ManifestWrite { file: String, reason: String },
}

impl StagehandError {
    /// The category this error belongs to.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigMissing { .. } => ErrorCategory::ConfigMissing,
            Self::ConfigUnreadable { .. }
            | Self::JsonParse(_)
            | Self::MissingStages(_)
            | Self::StageNotArray(_)
            | Self::EntryFieldsMissing { .. }
            | Self::InvalidStatus { .. }
            | Self::EmptyNeeds
            | Self::EmptyNeedsName
            | Self::DuplicateEntry { .. } => ErrorCategory::ConfigInvalid,
            _ => ErrorCategory::Bootstrap,
        }
    }
}

fn join_stages(stages: &[Stage]) -> String {
    stages
        .iter()
        .map(|stage| stage.key())
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// TESTS
// =============================================================================
