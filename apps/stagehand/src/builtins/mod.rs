//! # Built-in Extensions
//!
//! The stores shipped with the binary, their module registry, and the
//! default manifest written by `stagehand init`.
//!
//! | Entry | Slot | After |
//! |-------|------|-------|
//! | `@stagehand/fact-store` | `factStore` | |
//! | `@stagehand/event-store` | `eventStore` | |
//! | `@stagehand/entity-store` | `entityStore` | |
//! | `@stagehand/relationship-store` | `relationshipStore` | `@stagehand/entity-store` |

mod stores;

pub use stores::{RecordStore, StoreExtension};

use crate::error::AppError;
use stagehand_core::{
    ExtensionEntry, ExtensionKind, Manifest, ModuleDescriptor, ModuleRegistry, Stage, Status,
    StoreSlot, write_manifest,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A built-in module: entry name, module path, slot, optional dependency.
struct Builtin {
    name: &'static str,
    path: &'static str,
    slot: StoreSlot,
    after: Option<&'static str>,
}

const BUILTINS: [Builtin; 4] = [
    Builtin {
        name: "@stagehand/fact-store",
        path: "extensions/stores/fact-store.ext",
        slot: StoreSlot::Fact,
        after: None,
    },
    Builtin {
        name: "@stagehand/event-store",
        path: "extensions/stores/event-store.ext",
        slot: StoreSlot::Event,
        after: None,
    },
    Builtin {
        name: "@stagehand/entity-store",
        path: "extensions/stores/entity-store.ext",
        slot: StoreSlot::Entity,
        after: None,
    },
    Builtin {
        name: "@stagehand/relationship-store",
        path: "extensions/stores/relationship-store.ext",
        slot: StoreSlot::Relationship,
        after: Some("@stagehand/entity-store"),
    },
];

/// Registry resolving every built-in module path.
#[must_use]
pub fn builtin_registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    for builtin in &BUILTINS {
        let mut extension = StoreExtension::new(builtin.slot);
        if builtin.after.is_some() {
            extension = extension.requiring(StoreSlot::Entity);
        }
        let descriptor = ModuleDescriptor::new(
            builtin.name,
            env!("CARGO_PKG_VERSION"),
            ExtensionKind::Store,
            Arc::new(extension),
        )
        .after(builtin.after);
        registry.register(builtin.path, descriptor);
    }
    registry
}

/// Manifest wiring every built-in store, all `on`.
#[must_use]
pub fn default_manifest() -> Manifest {
    BUILTINS.iter().fold(Manifest::new(), |manifest, builtin| {
        manifest.with_entry(
            Stage::Stores,
            ExtensionEntry::new(builtin.name, builtin.path, Status::On),
        )
    })
}

/// Write the default manifest and the built-in module files under `root`.
///
/// Refuses to replace an existing manifest unless `force` is set. Returns
/// every path written.
pub fn install(root: &Path, manifest_file: &str, force: bool) -> Result<Vec<PathBuf>, AppError> {
    let manifest_path = root.join(manifest_file);
    if manifest_path.exists() && !force {
        return Err(AppError::ManifestExists(manifest_path));
    }

    let mut written = Vec::with_capacity(BUILTINS.len() + 1);
    for builtin in &BUILTINS {
        let module = root.join(builtin.path);
        if let Some(parent) = module.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::io(parent, &e))?;
        }
        std::fs::write(&module, format!("# built-in module: {}\n", builtin.name))
            .map_err(|e| AppError::io(&module, &e))?;
        written.push(module);
    }

    write_manifest(root, manifest_file, &default_manifest())?;
    written.push(manifest_path);

    tracing::info!(root = %root.display(), files = written.len(), "default manifest installed");
    Ok(written)
}

// =============================================================================
// TESTS
// =============================================================================
