//! # Manifest Loader
//!
//! Reads the manifest from the bootstrap root and validates its shape.
//! Pure read + validate: nothing is written here.
//!
//! Checks run in a fixed order so the first reported problem is stable:
//! 1. file present
//! 2. valid JSON
//! 3. every stage key present
//! 4. every stage value an array
//! 5. every entry carries string `name`, `path`, `status`
//! 6. every status well-formed
//! 7. names unique within a stage

use super::{ExtensionEntry, Manifest, Status};
use crate::stage::Stage;
use crate::types::StagehandError;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Default manifest file name, relative to the bootstrap root.
pub const MANIFEST_FILE_NAME: &str = "extensions.json";

/// Location of the manifest for a root directory.
#[must_use]
pub fn manifest_path(root: &Path, file_name: &str) -> PathBuf {
    root.join(file_name)
}

/// Locate, read and validate the manifest under `root`.
pub fn load_manifest(root: &Path, file_name: &str) -> Result<Manifest, StagehandError> {
    let path = manifest_path(root, file_name);
    if !path.is_file() {
        return Err(StagehandError::ConfigMissing {
            file: file_name.to_string(),
        });
    }

    let raw = std::fs::read_to_string(&path).map_err(|e| StagehandError::ConfigUnreadable {
        file: file_name.to_string(),
        reason: e.to_string(),
    })?;

    let manifest = parse_manifest(&raw)?;
    tracing::debug!(
        file = %path.display(),
        entries = manifest.len(),
        "manifest loaded"
    );
    Ok(manifest)
}

/// Parse and validate manifest text.
pub fn parse_manifest(raw: &str) -> Result<Manifest, StagehandError> {
    let document: Value =
        serde_json::from_str(raw).map_err(|e| StagehandError::JsonParse(e.to_string()))?;

    let Some(object) = document.as_object() else {
        return Err(StagehandError::MissingStages(Stage::ALL.to_vec()));
    };

    let missing: Vec<Stage> = Stage::ALL
        .into_iter()
        .filter(|stage| !object.contains_key(stage.key()))
        .collect();
    if !missing.is_empty() {
        return Err(StagehandError::MissingStages(missing));
    }

    let mut stage_arrays = Vec::with_capacity(Stage::ALL.len());
    for stage in Stage::ALL {
        match object.get(stage.key()) {
            Some(Value::Array(items)) => stage_arrays.push((stage, items)),
            _ => return Err(StagehandError::StageNotArray(stage)),
        }
    }

    // Field presence is checked across the whole manifest before any status,
    // so a missing field is always reported ahead of a bad status.
    let mut raw_entries = Vec::new();
    for (stage, items) in &stage_arrays {
        for (index, item) in items.iter().enumerate() {
            let fields = entry_fields(item)
                .ok_or(StagehandError::EntryFieldsMissing { stage: *stage, index })?;
            raw_entries.push((*stage, fields));
        }
    }

    let mut manifest = Manifest::new();
    for (stage, fields) in raw_entries {
        let entry = build_entry(fields)?;
        manifest.push(stage, entry);
    }

    reject_duplicate_names(&manifest)?;
    Ok(manifest)
}

// =============================================================================
// ENTRY HELPERS
// =============================================================================

/// An entry object whose three required fields are strings.
struct EntryFields<'a> {
    name: &'a str,
    path: &'a str,
    status: &'a str,
    object: &'a Map<String, Value>,
}

fn entry_fields(item: &Value) -> Option<EntryFields<'_>> {
    let object = item.as_object()?;
    Some(EntryFields {
        name: object.get("name")?.as_str()?,
        path: object.get("path")?.as_str()?,
        status: object.get("status")?.as_str()?,
        object,
    })
}

fn build_entry(fields: EntryFields<'_>) -> Result<ExtensionEntry, StagehandError> {
    let status = Status::parse(fields.status)?;
    let options = fields.object.get("options").filter(|v| !v.is_null()).cloned();
    let extra = fields
        .object
        .iter()
        .filter(|(key, _)| !matches!(key.as_str(), "name" | "path" | "status" | "options"))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Ok(ExtensionEntry {
        name: fields.name.to_string(),
        path: fields.path.to_string(),
        status,
        options,
        extra,
    })
}

fn reject_duplicate_names(manifest: &Manifest) -> Result<(), StagehandError> {
    for stage in Stage::ALL {
        let mut seen = BTreeSet::new();
        for entry in manifest.entries(stage) {
            if !seen.insert(entry.name.as_str()) {
                return Err(StagehandError::DuplicateEntry {
                    stage,
                    name: entry.name.clone(),
                });
            }
        }
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
