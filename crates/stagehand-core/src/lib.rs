//! # stagehand-core
//!
//! The staged extension bootstrap engine for Stagehand - THE ENGINE.
//!
//! Reads a declarative manifest of named, staged extension entries, resolves
//! intra-stage `after` ordering, activates extensions in concurrent waves,
//! aggregates their contributions into a shared [`ExtensionContext`], checks
//! the mandatory store slots, and writes a normalized manifest back to disk.
//!
//! ## Pipeline
//!
//! ```text
//! manifest → module loader → reconciler (writes manifest) → graph → waves
//!          → activation engine → slot validator
//! ```
//!
//! ## Architectural Constraints
//!
//! - Deterministic: same manifest and modules, same waves and same rewrite
//! - Closed schedule: stages in fixed order, waves strictly in sequence
//! - No ambient state: every side effect goes through the context argument
//! - No network, no environment variables: configured through [`Bootstrapper`]

// =============================================================================
// MODULES
// =============================================================================

pub mod activation;
pub mod bootstrap;
pub mod context;
pub mod extension;
pub mod graph;
pub mod hooks;
pub mod manifest;
pub mod module_loader;
pub mod reconcile;
pub mod schedule;
pub mod slots;
pub mod stage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use stage::{ExtensionKind, Stage};
pub use types::{DescriptorField, ErrorCategory, StagehandError};

// =============================================================================
// RE-EXPORTS: Manifest
// =============================================================================

pub use manifest::{
    ExtensionEntry, MANIFEST_FILE_NAME, Manifest, Status, load_manifest, normalize_path,
    parse_manifest, render_manifest, write_manifest,
};

// =============================================================================
// RE-EXPORTS: Extensions and Context
// =============================================================================

pub use context::{Capability, Contribution, ExtensionContext};
pub use extension::{
    ActivationError, ActivationResult, Extension, LoadedExtension, ModuleDescriptor, from_fn,
};
pub use hooks::{
    Hook, HookContext, HookHandler, HookRegistry, HookResult, RegisteredHandler, hook_fn,
};
pub use module_loader::{ModuleLoader, ModuleRegistry};
pub use slots::{StoreSlot, validate_required_slots};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use activation::{StageActivation, activate_all, activate_stage};
pub use bootstrap::{BootstrapPlan, Bootstrapper, bootstrap_extensions};
pub use graph::{DependencyGraph, validate_kind};
pub use reconcile::{DependencyIndex, reconcile};
pub use schedule::{ActivationWaves, schedule_waves};
