//! # Activation Engine
//!
//! Runs the scheduled waves of each stage against one [`ExtensionContext`].
//!
//! ## Execution Model
//!
//! ```text
//! stage 0 ── wave 0 ─┬─ activate(a) ─┬─ merge ── wave 1 ── ... ── stage 1 ── ...
//!                    ├─ activate(b) ─┤
//!                    └─ activate(c) ─┘
//! ```
//!
//! - Stages run in [`Stage`] order, waves strictly in sequence.
//! - Members of one wave are polled concurrently on the calling task.
//! - Contributions are merged once the whole wave has completed, in wave
//!   order, so emission order does not depend on completion order.
//! - The first failing activation aborts the run. Mutations already applied
//!   to the context stay.

use crate::context::ExtensionContext;
use crate::extension::LoadedExtension;
use crate::schedule::ActivationWaves;
use crate::stage::Stage;
use crate::types::StagehandError;
use futures::future::try_join_all;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// STAGE ACTIVATION
// =============================================================================

#[derive(Clone)]
struct Member {
    extension: LoadedExtension,
    options: Option<Value>,
}

/// Waves of one stage plus the members eligible to activate.
///
/// Names present in the waves but never enlisted (entries that are `off` or
/// `needs:`) are skipped without side effects.
#[derive(Clone)]
pub struct StageActivation {
    waves: ActivationWaves,
    members: BTreeMap<String, Member>,
}

impl StageActivation {
    #[must_use]
    pub fn new(waves: ActivationWaves) -> Self {
        Self {
            waves,
            members: BTreeMap::new(),
        }
    }

    /// Mark an extension eligible, with the options from its manifest entry.
    pub fn enlist(&mut self, extension: LoadedExtension, options: Option<Value>) {
        self.members
            .insert(extension.name.clone(), Member { extension, options });
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.waves.stage()
    }

    #[must_use]
    pub fn waves(&self) -> &ActivationWaves {
        &self.waves
    }

    #[must_use]
    pub fn is_eligible(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    /// The waves restricted to eligible members. Empty waves are dropped.
    #[must_use]
    pub fn eligible_waves(&self) -> Vec<Vec<&str>> {
        self.waves
            .waves()
            .iter()
            .map(|wave| {
                wave.iter()
                    .map(String::as_str)
                    .filter(|name| self.is_eligible(name))
                    .collect::<Vec<_>>()
            })
            .filter(|wave| !wave.is_empty())
            .collect()
    }
}

impl fmt::Debug for StageActivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageActivation")
            .field("waves", &self.waves)
            .field("eligible", &self.members.keys().collect::<Vec<_>>())
            .finish()
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// Activate one stage. Returns the activated names in activation order.
pub async fn activate_stage(
    context: &ExtensionContext,
    plan: &StageActivation,
) -> Result<Vec<String>, StagehandError> {
    let stage = plan.stage();
    let mut activated = Vec::new();

    for (index, wave) in plan.eligible_waves().into_iter().enumerate() {
        tracing::info!(stage = %stage, wave = index, members = ?wave, "activating wave");

        let calls = wave.iter().filter_map(|name| plan.members.get(*name)).map(|member| {
            let name = member.extension.name.as_str();
            async move {
                member
                    .extension
                    .activation
                    .activate(context, member.options.as_ref())
                    .await
                    .map_err(|e| StagehandError::Activation {
                        stage,
                        name: name.to_string(),
                        reason: e.to_string(),
                    })
            }
        });

        let contributions = match try_join_all(calls).await {
            Ok(contributions) => contributions,
            Err(e) => {
                tracing::debug!(stage = %stage, wave = index, error = %e, "wave aborted");
                return Err(e);
            }
        };

        for contribution in contributions.into_iter().flatten() {
            context.merge(contribution);
        }
        activated.extend(wave.iter().map(|name| (*name).to_string()));
    }

    tracing::info!(stage = %stage, activated = activated.len(), "stage complete");
    Ok(activated)
}

/// Activate every stage in stage order.
///
/// Stage plans are sorted before running, so callers may pass them in any
/// order.
pub async fn activate_all(
    context: &ExtensionContext,
    plans: &[StageActivation],
) -> Result<Vec<(Stage, String)>, StagehandError> {
    let mut ordered: Vec<&StageActivation> = plans.iter().collect();
    ordered.sort_by_key(|plan| plan.stage());

    let mut activated = Vec::new();
    for plan in ordered {
        let names = activate_stage(context, plan).await?;
        activated.extend(names.into_iter().map(|name| (plan.stage(), name)));
    }
    Ok(activated)
}

// =============================================================================
// TESTS
// =============================================================================
