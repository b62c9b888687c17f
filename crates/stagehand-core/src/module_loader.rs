//! # Module Loader
//!
//! Resolves a manifest entry's path to a validated [`LoadedExtension`].
//!
//! Rust has no dynamic import, so resolution is a strategy: [`ModuleLoader`]
//! abstracts "path → descriptor" and [`ModuleRegistry`] is the shipped
//! implementation, a table of descriptors keyed by canonical module path.
//! The module file itself must still exist under the bootstrap root.
//!
//! Entry paths are always resolved *inside* the root: a leading `/` or drive
//! prefix is stripped, and `..` may not climb above the root.

use crate::extension::{LoadedExtension, ModuleDescriptor};
use crate::manifest::{ExtensionEntry, normalize_path};
use crate::types::StagehandError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Lexically resolve `path` to its root-relative form.
///
/// Returns `None` when a `..` component would leave the root.
fn root_relative(path: &str) -> Option<String> {
    let normalized = normalize_path(path);
    let rest = match normalized.as_bytes() {
        [drive, b':', ..] if drive.is_ascii_alphabetic() => normalized.get(2..).unwrap_or_default(),
        _ => normalized.as_str(),
    };

    let mut parts: Vec<&str> = Vec::new();
    for part in rest.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            _ => parts.push(part),
        }
    }
    Some(parts.join("/"))
}

/// Location of the module file for `entry` under `root`.
fn module_location(
    root: &Path,
    entry: &ExtensionEntry,
) -> Result<(String, PathBuf), StagehandError> {
    let relative =
        root_relative(&entry.path).ok_or_else(|| StagehandError::ModuleOutsideRoot {
            path: entry.path.clone(),
        })?;
    let location = root.join(&relative);
    Ok((relative, location))
}

fn registry_key(path: &str) -> String {
    root_relative(path).unwrap_or_else(|| normalize_path(path))
}

/// Strategy for turning an entry into an extension.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    /// Resolve `entry.path` relative to `root` and validate the descriptor.
    async fn load(
        &self,
        root: &Path,
        entry: &ExtensionEntry,
    ) -> Result<LoadedExtension, StagehandError>;
}

/// Static table of module descriptors.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, ModuleDescriptor>,
}

impl ModuleRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the descriptor exported by the module at `path`.
    ///
    /// Re-registering a path replaces the earlier descriptor.
    pub fn register(&mut self, path: &str, descriptor: ModuleDescriptor) {
        self.modules.insert(registry_key(path), descriptor);
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with_module(mut self, path: &str, descriptor: ModuleDescriptor) -> Self {
        self.register(path, descriptor);
        self
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.modules.contains_key(&registry_key(path))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[async_trait]
impl ModuleLoader for ModuleRegistry {
    async fn load(
        &self,
        root: &Path,
        entry: &ExtensionEntry,
    ) -> Result<LoadedExtension, StagehandError> {
        let (path, location) = module_location(root, entry)?;

        let exists = tokio::fs::try_exists(&location).await.unwrap_or(false);
        if !exists {
            return Err(StagehandError::ModuleMissing {
                path: entry.path.clone(),
            });
        }

        let descriptor =
            self.modules
                .get(&path)
                .ok_or_else(|| StagehandError::MissingDefaultExport {
                    path: entry.path.clone(),
                })?;

        let extension = descriptor.validate(&entry.path)?;
        tracing::debug!(
            entry = %entry.name,
            path = %path,
            version = %extension.version,
            kind = %extension.kind,
            "module resolved"
        );
        Ok(extension)
    }
}

// =============================================================================
// TESTS
// =============================================================================
