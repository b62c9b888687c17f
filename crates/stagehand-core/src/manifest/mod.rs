//! # Manifest Model
//!
//! Typed representation of the staged extension manifest:
//!
//! ```json
//! {
//!     "stores": [{ "name": "@core/facts", "path": "ext/facts.ext", "status": "on" }],
//!     "loaders": [],
//!     "validators": [],
//!     "contextBuilders": [],
//!     "senders": [],
//!     "ui": []
//! }
//! ```
//!
//! Reading and validation live in [`loader`], the normalized rewrite in
//! [`writer`].

pub mod loader;
pub mod writer;

use crate::stage::Stage;
use crate::types::StagehandError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

pub use loader::{MANIFEST_FILE_NAME, load_manifest, manifest_path, parse_manifest};
pub use writer::{normalize_path, render_manifest, write_manifest};

const NEEDS_PREFIX: &str = "needs:";

// =============================================================================
// STATUS
// =============================================================================

/// Desired state of one manifest entry.
///
/// `Needs` always carries at least one non-empty dependency name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum Status {
    /// Activate this extension.
    On,
    /// Never activate this extension.
    Off,
    /// Would be on, but blocked by the named dependencies.
    Needs(Vec<String>),
}

impl Status {
    /// Parse a manifest status string.
    pub fn parse(value: &str) -> Result<Status, StagehandError> {
        match value {
            "on" => Ok(Status::On),
            "off" => Ok(Status::Off),
            other => {
                let Some(list) = other.strip_prefix(NEEDS_PREFIX) else {
                    return Err(StagehandError::InvalidStatus {
                        status: other.to_string(),
                    });
                };
                if list.is_empty() {
                    return Err(StagehandError::EmptyNeeds);
                }
                let names: Vec<String> = list.split(',').map(|name| name.trim().to_string()).collect();
                if names.iter().any(String::is_empty) {
                    return Err(StagehandError::EmptyNeedsName);
                }
                Ok(Status::Needs(names))
            }
        }
    }

    /// Build a `needs:` status. Returns `On` for an empty list.
    #[must_use]
    pub fn needs<I, S>(dependencies: I) -> Status
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = dependencies.into_iter().map(Into::into).collect();
        if names.is_empty() {
            Status::On
        } else {
            Status::Needs(names)
        }
    }

    #[must_use]
    pub fn is_on(&self) -> bool {
        matches!(self, Status::On)
    }

    #[must_use]
    pub fn is_off(&self) -> bool {
        matches!(self, Status::Off)
    }

    /// True for `off` and `needs:`; such an entry blocks its dependents.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        !self.is_on()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::On => f.write_str("on"),
            Status::Off => f.write_str("off"),
            Status::Needs(names) => write!(f, "{NEEDS_PREFIX}{}", names.join(",")),
        }
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        status.to_string()
    }
}

// =============================================================================
// EXTENSION ENTRY
// =============================================================================

/// One manifest-declared reference to an extension module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtensionEntry {
    /// Unique within its stage.
    pub name: String,
    /// Module locator, relative to the bootstrap root.
    pub path: String,
    pub status: Status,
    /// Passed through unchanged to `activate`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
    /// Keys the engine does not interpret; preserved on rewrite.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExtensionEntry {
    /// Create an entry with no options.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<String>, status: Status) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            status,
            options: None,
            extra: Map::new(),
        }
    }

    /// Attach activation options.
    #[must_use]
    pub fn with_options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }
}

// =============================================================================
// MANIFEST
// =============================================================================

/// Stage-keyed entry lists. Every stage is always present.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Manifest {
    stages: BTreeMap<Stage, Vec<ExtensionEntry>>,
}

impl Manifest {
    /// A manifest with every stage present and empty.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stages: Stage::ALL.into_iter().map(|stage| (stage, Vec::new())).collect(),
        }
    }

    /// Builder-style append, used by callers assembling manifests in code.
    #[must_use]
    pub fn with_entry(mut self, stage: Stage, entry: ExtensionEntry) -> Self {
        self.push(stage, entry);
        self
    }

    pub fn push(&mut self, stage: Stage, entry: ExtensionEntry) {
        self.stages.entry(stage).or_default().push(entry);
    }

    /// Entries of one stage, in declaration order.
    #[must_use]
    pub fn entries(&self, stage: Stage) -> &[ExtensionEntry] {
        self.stages.get(&stage).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn entries_mut(&mut self, stage: Stage) -> &mut Vec<ExtensionEntry> {
        self.stages.entry(stage).or_default()
    }

    /// Find an entry by stage and name.
    #[must_use]
    pub fn entry(&self, stage: Stage, name: &str) -> Option<&ExtensionEntry> {
        self.entries(stage).iter().find(|entry| entry.name == name)
    }

    /// All entries in manifest order: stage order, then declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Stage, usize, &ExtensionEntry)> {
        self.stages
            .iter()
            .flat_map(|(stage, entries)| entries.iter().enumerate().map(move |(index, entry)| (*stage, index, entry)))
    }

    /// Total entry count across all stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_statuses() {
        assert_eq!(Status::parse("on"), Ok(Status::On));
        assert_eq!(Status::parse("off"), Ok(Status::Off));
        assert_eq!(
            Status::parse("needs:a, b"),
            Ok(Status::Needs(vec!["a".to_string(), "b".to_string()]))
        );
    }

    #[test]
    fn rejects_malformed_statuses() {
        assert_eq!(Status::parse("needs:"), Err(StagehandError::EmptyNeeds));
        assert_eq!(Status::parse("needs:a,,b"), Err(StagehandError::EmptyNeedsName));
        assert_eq!(Status::parse("needs: "), Err(StagehandError::EmptyNeedsName));
        assert!(matches!(
            Status::parse("ON"),
            Err(StagehandError::InvalidStatus { .. })
        ));
    }

    #[test]
    fn status_display_round_trips() {
        for raw in ["on", "off", "needs:alpha", "needs:alpha,beta"] {
            let status = Status::parse(raw).expect("valid status");
            assert_eq!(status.to_string(), raw);
        }
    }

    #[test]
    fn needs_with_no_names_is_on() {
        assert_eq!(Status::needs(Vec::<String>::new()), Status::On);
        assert!(Status::needs(["x"]).is_blocking());
    }

    #[test]
    fn manifest_iterates_in_stage_order() {
        let manifest = Manifest::new()
            .with_entry(Stage::Ui, ExtensionEntry::new("panel", "ui/panel.ext", Status::On))
            .with_entry(Stage::Stores, ExtensionEntry::new("facts", "s/facts.ext", Status::On))
            .with_entry(Stage::Stores, ExtensionEntry::new("events", "s/events.ext", Status::Off));

        let order: Vec<_> = manifest
            .iter()
            .map(|(stage, index, entry)| (stage, index, entry.name.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (Stage::Stores, 0, "facts"),
                (Stage::Stores, 1, "events"),
                (Stage::Ui, 0, "panel"),
            ]
        );
        assert_eq!(manifest.len(), 3);
        assert!(manifest.entry(Stage::Stores, "events").is_some());
        assert!(manifest.entry(Stage::Ui, "events").is_none());
    }
}
