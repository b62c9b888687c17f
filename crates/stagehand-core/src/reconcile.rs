//! # Status Reconciler
//!
//! Derives the normalized manifest written back to disk.
//!
//! Per stage, every resolved entry that is not `off` is recomputed:
//! - blocked iff some direct dependency is `off` or itself blocked
//!   (iterated to a fixpoint, so blocking is transitive)
//! - a blocked entry becomes `needs:<blocking direct deps, in after order>`
//! - an unblocked entry becomes `on`, which restores earlier demotions
//!
//! `off` entries are never altered. Entries whose module was never resolved
//! keep their declared status and block dependents when `off` or `needs:`.
//! Paths are canonicalized on every entry.
//!
//! Reconciling an already reconciled manifest is a no-op.

use crate::extension::LoadedExtension;
use crate::manifest::{ExtensionEntry, Manifest, Status, normalize_path};
use crate::stage::Stage;
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// DEPENDENCY INDEX
// =============================================================================

/// `after` lists of resolved extensions, by stage and entry name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyIndex {
    stages: BTreeMap<Stage, BTreeMap<String, Vec<String>>>,
}

impl DependencyIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the `after` list of a resolved entry.
    pub fn insert<I, S>(&mut self, stage: Stage, name: impl Into<String>, after: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stages
            .entry(stage)
            .or_default()
            .insert(name.into(), after.into_iter().map(Into::into).collect());
    }

    /// Record a loaded extension under its own name.
    pub fn record(&mut self, stage: Stage, extension: &LoadedExtension) {
        self.insert(stage, extension.name.clone(), extension.after.iter().cloned());
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with<I, S>(mut self, stage: Stage, name: impl Into<String>, after: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(stage, name, after);
        self
    }

    /// The `after` list of a resolved entry, `None` when unresolved.
    #[must_use]
    pub fn after(&self, stage: Stage, name: &str) -> Option<&[String]> {
        self.stages
            .get(&stage)
            .and_then(|names| names.get(name))
            .map(Vec::as_slice)
    }

    #[must_use]
    pub fn is_resolved(&self, stage: Stage, name: &str) -> bool {
        self.after(stage, name).is_some()
    }
}

// =============================================================================
// RECONCILIATION
// =============================================================================

/// Produce the normalized manifest.
#[must_use]
pub fn reconcile(manifest: &Manifest, index: &DependencyIndex) -> Manifest {
    let mut normalized = manifest.clone();
    for stage in Stage::ALL {
        reconcile_stage(stage, normalized.entries_mut(stage), index);
    }
    normalized
}

fn reconcile_stage(
    stage: Stage,
    entries: &mut [ExtensionEntry],
    index: &DependencyIndex,
) {
    for entry in entries.iter_mut() {
        entry.path = normalize_path(&entry.path);
    }

    // Entries that block dependents no matter what the fixpoint decides.
    let fixed_blocking: BTreeSet<&str> = entries
        .iter()
        .filter(|entry| {
            entry.status.is_off()
                || (!index.is_resolved(stage, &entry.name) && entry.status.is_blocking())
        })
        .map(|entry| entry.name.as_str())
        .collect();

    let candidates: Vec<(&str, &[String])> = entries
        .iter()
        .filter(|entry| !entry.status.is_off())
        .filter_map(|entry| {
            index
                .after(stage, &entry.name)
                .map(|after| (entry.name.as_str(), after))
        })
        .collect();

    let mut blocked: BTreeSet<&str> = BTreeSet::new();
    loop {
        let newly: Vec<&str> = candidates
            .iter()
            .filter(|(name, _)| !blocked.contains(name))
            .filter(|(_, after)| {
                after.iter().any(|dep| {
                    fixed_blocking.contains(dep.as_str()) || blocked.contains(dep.as_str())
                })
            })
            .map(|(name, _)| *name)
            .collect();
        if newly.is_empty() {
            break;
        }
        blocked.extend(newly);
    }

    let statuses: BTreeMap<String, Status> = candidates
        .iter()
        .map(|(name, after)| {
            let blockers = after
                .iter()
                .filter(|dep| fixed_blocking.contains(dep.as_str()) || blocked.contains(dep.as_str()))
                .cloned();
            ((*name).to_string(), Status::needs(blockers))
        })
        .collect();

    for entry in entries.iter_mut() {
        let Some(status) = statuses.get(&entry.name) else {
            continue;
        };
        if *status == entry.status {
            continue;
        }
        match status {
            Status::Needs(_) if entry.status.is_on() => {
                tracing::warn!(stage = %stage, entry = %entry.name, status = %status, "extension blocked by dependency");
            }
            _ => {
                tracing::debug!(
                    stage = %stage,
                    entry = %entry.name,
                    from = %entry.status,
                    to = %status,
                    "status reconciled"
                );
            }
        }
        entry.status = status.clone();
    }
}

// =============================================================================
// TESTS
// =============================================================================
