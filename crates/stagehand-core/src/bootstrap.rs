//! # Bootstrapper
//!
//! One bootstrap run, end to end:
//!
//! 1. Load and validate the manifest
//! 2. Resolve every entry's module, in manifest order, before anything runs
//! 3. Reconcile statuses and write the normalized manifest
//! 4. Build and schedule every stage's dependency graph
//! 5. Activate stage by stage, wave by wave
//! 6. Check the mandatory store slots
//!
//! The normalized manifest is written exactly once per run. When a step
//! before the write fails, the best state computed so far is flushed before
//! the error is returned. A manifest that fails to load is never rewritten.

use crate::activation::{StageActivation, activate_all};
use crate::context::ExtensionContext;
use crate::extension::LoadedExtension;
use crate::graph::{DependencyGraph, validate_kind};
use crate::manifest::{MANIFEST_FILE_NAME, Manifest, load_manifest, write_manifest};
use crate::module_loader::ModuleLoader;
use crate::reconcile::{DependencyIndex, reconcile};
use crate::schedule::{ActivationWaves, schedule_waves};
use crate::slots::validate_required_slots;
use crate::stage::Stage;
use crate::types::StagehandError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type Resolved = BTreeMap<Stage, Vec<LoadedExtension>>;

// =============================================================================
// PLAN
// =============================================================================

/// Result of a dry run: the reconciled manifest and every stage's schedule.
#[derive(Debug, Clone)]
pub struct BootstrapPlan {
    manifest: Manifest,
    stages: Vec<StageActivation>,
}

impl BootstrapPlan {
    /// The manifest a real run would write.
    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Stage schedules in stage order.
    #[must_use]
    pub fn stages(&self) -> &[StageActivation] {
        &self.stages
    }

    #[must_use]
    pub fn waves(&self, stage: Stage) -> Option<&ActivationWaves> {
        self.stage(stage).map(StageActivation::waves)
    }

    #[must_use]
    pub fn stage(&self, stage: Stage) -> Option<&StageActivation> {
        self.stages.iter().find(|plan| plan.stage() == stage)
    }

    /// Number of extensions a real run would activate.
    #[must_use]
    pub fn activation_count(&self) -> usize {
        self.stages
            .iter()
            .flat_map(StageActivation::eligible_waves)
            .map(|wave| wave.len())
            .sum()
    }
}

// =============================================================================
// BOOTSTRAPPER
// =============================================================================

/// Configured bootstrap run over one root directory.
#[derive(Clone)]
pub struct Bootstrapper {
    root: PathBuf,
    manifest_file: String,
    loader: Arc<dyn ModuleLoader>,
}

impl Bootstrapper {
    /// Bootstrap `root`, resolving modules through `loader`.
    pub fn new(root: impl Into<PathBuf>, loader: Arc<dyn ModuleLoader>) -> Self {
        Self {
            root: root.into(),
            manifest_file: MANIFEST_FILE_NAME.to_string(),
            loader,
        }
    }

    /// Use a manifest file name other than [`MANIFEST_FILE_NAME`].
    #[must_use]
    pub fn with_manifest_file(mut self, file_name: impl Into<String>) -> Self {
        self.manifest_file = file_name.into();
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn manifest_file(&self) -> &str {
        &self.manifest_file
    }

    /// Run the bootstrap and hand back the populated context.
    pub async fn run(&self) -> Result<ExtensionContext, StagehandError> {
        let manifest = load_manifest(&self.root, &self.manifest_file)?;
        tracing::info!(
            root = %self.root.display(),
            manifest = %self.manifest_file,
            entries = manifest.len(),
            "bootstrap started"
        );

        let mut index = DependencyIndex::new();
        let mut flushed = false;

        match self.execute(&manifest, &mut index, &mut flushed).await {
            Ok(context) => {
                tracing::info!(
                    slots = ?context.filled_slots(),
                    loaders = context.loaders().len(),
                    validators = context.validators().len(),
                    context_builders = context.context_builders().len(),
                    senders = context.senders().len(),
                    ui_components = context.ui_components().len(),
                    "bootstrap complete"
                );
                Ok(context)
            }
            Err(e) => {
                if !flushed {
                    let normalized = reconcile(&manifest, &index);
                    if let Err(flush) = write_manifest(&self.root, &self.manifest_file, &normalized) {
                        tracing::warn!(error = %flush, "failed to persist normalized manifest");
                    }
                }
                Err(e)
            }
        }
    }

    /// Everything [`run`](Self::run) does up to activation, without writing
    /// the manifest or activating anything.
    pub async fn plan(&self) -> Result<BootstrapPlan, StagehandError> {
        let manifest = load_manifest(&self.root, &self.manifest_file)?;
        let mut index = DependencyIndex::new();
        let resolved = self.resolve(&manifest, &mut index).await?;
        let normalized = reconcile(&manifest, &index);
        let stages = schedule(&normalized, &resolved)?;
        Ok(BootstrapPlan {
            manifest: normalized,
            stages,
        })
    }

    async fn execute(
        &self,
        manifest: &Manifest,
        index: &mut DependencyIndex,
        flushed: &mut bool,
    ) -> Result<ExtensionContext, StagehandError> {
        let resolved = self.resolve(manifest, index).await?;

        let normalized = reconcile(manifest, index);
        *flushed = true;
        write_manifest(&self.root, &self.manifest_file, &normalized)?;
        tracing::debug!(manifest = %self.manifest_file, "normalized manifest written");

        let stages = schedule(&normalized, &resolved)?;

        let context = ExtensionContext::new();
        activate_all(&context, &stages).await?;
        validate_required_slots(&context)?;
        Ok(context)
    }

    /// Resolve every entry in manifest order, recording each resolved
    /// `after` list into `index` as it goes.
    async fn resolve(
        &self,
        manifest: &Manifest,
        index: &mut DependencyIndex,
    ) -> Result<Resolved, StagehandError> {
        let mut resolved = Resolved::new();
        for (stage, _, entry) in manifest.iter() {
            let extension = self.loader.load(&self.root, entry).await?;
            if extension.name != entry.name {
                return Err(StagehandError::NameMismatch {
                    entry: entry.name.clone(),
                    name: extension.name,
                });
            }
            validate_kind(stage, &extension)?;
            index.record(stage, &extension);
            resolved.entry(stage).or_default().push(extension);
        }
        Ok(resolved)
    }
}

impl std::fmt::Debug for Bootstrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bootstrapper")
            .field("root", &self.root)
            .field("manifest_file", &self.manifest_file)
            .finish_non_exhaustive()
    }
}

/// Graph, schedule and enlist every stage. Only `on` entries are enlisted.
fn schedule(normalized: &Manifest, resolved: &Resolved) -> Result<Vec<StageActivation>, StagehandError> {
    let mut stages = Vec::with_capacity(Stage::ALL.len());
    for stage in Stage::ALL {
        let extensions = resolved.get(&stage).map(Vec::as_slice).unwrap_or(&[]);
        let graph = DependencyGraph::from_extensions(stage, extensions)?;
        let mut plan = StageActivation::new(schedule_waves(&graph)?);

        for extension in extensions {
            if let Some(entry) = normalized.entry(stage, &extension.name)
                && entry.status.is_on()
            {
                plan.enlist(extension.clone(), entry.options.clone());
            }
        }
        stages.push(plan);
    }
    Ok(stages)
}

/// Bootstrap `root` with the default manifest file name.
pub async fn bootstrap_extensions(
    root: impl Into<PathBuf>,
    loader: Arc<dyn ModuleLoader>,
) -> Result<ExtensionContext, StagehandError> {
    Bootstrapper::new(root, loader).run().await
}
