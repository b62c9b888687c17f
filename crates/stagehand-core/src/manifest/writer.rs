//! # Manifest Writer
//!
//! Persists the normalized manifest back to the root directory.
//!
//! Format: UTF-8 JSON, 4-space indentation, stage keys in stage order,
//! trailing newline.

use super::Manifest;
use crate::types::StagehandError;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::path::Path;

/// Canonicalize a module path to `/` separators.
///
/// - `\` becomes `/`
/// - runs of `/` collapse to one
/// - a leading `./` is dropped
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len());
    for c in path.chars() {
        let c = if c == '\\' { '/' } else { c };
        if c == '/' && normalized.ends_with('/') {
            continue;
        }
        normalized.push(c);
    }

    match normalized.strip_prefix("./") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => normalized,
    }
}

/// Render a manifest as pretty-printed JSON.
pub fn render_manifest(manifest: &Manifest) -> Result<String, serde_json::Error> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    manifest.serialize(&mut serializer)?;
    buffer.push(b'\n');
    // serde_json only ever emits UTF-8.
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Write the manifest to `root/file_name`, replacing the previous content.
pub fn write_manifest(
    root: &Path,
    file_name: &str,
    manifest: &Manifest,
) -> Result<(), StagehandError> {
    let failed = |reason: String| StagehandError::ManifestWrite {
        file: file_name.to_string(),
        reason,
    };

    let rendered = render_manifest(manifest).map_err(|e| failed(e.to_string()))?;
    std::fs::write(root.join(file_name), rendered).map_err(|e| failed(e.to_string()))?;

    tracing::debug!(file = file_name, entries = manifest.len(), "normalized manifest written");
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
