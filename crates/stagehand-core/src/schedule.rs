//! # Wave Scheduler
//!
//! Flattens a [`DependencyGraph`] into activation waves.
//!
//! Iterative frontier extraction: collect every unscheduled name whose
//! dependencies are all scheduled, in declaration order, emit them as one
//! wave, mark them scheduled, repeat. Wave 0 holds every name without
//! dependencies.
//!
//! Members of one wave may activate concurrently; waves run strictly in
//! sequence.

use crate::graph::DependencyGraph;
use crate::stage::Stage;
use crate::types::StagehandError;
use std::collections::{BTreeMap, BTreeSet};

/// Frontier extraction shared by cycle detection and scheduling.
///
/// Returns the waves, or the names left unresolved when no progress is
/// possible.
pub(crate) fn extract_frontiers(
    names: &[String],
    dependencies: &BTreeMap<String, BTreeSet<String>>,
) -> Result<Vec<Vec<String>>, Vec<String>> {
    let mut scheduled: BTreeSet<&str> = BTreeSet::new();
    let mut waves = Vec::new();

    while scheduled.len() < names.len() {
        let wave: Vec<String> = names
            .iter()
            .filter(|name| !scheduled.contains(name.as_str()))
            .filter(|name| {
                dependencies
                    .get(name.as_str())
                    .is_none_or(|deps| deps.iter().all(|dep| scheduled.contains(dep.as_str())))
            })
            .cloned()
            .collect();

        if wave.is_empty() {
            let unresolved = names
                .iter()
                .filter(|name| !scheduled.contains(name.as_str()))
                .cloned()
                .collect();
            return Err(unresolved);
        }

        for name in &wave {
            if let Some(original) = names.iter().find(|n| *n == name) {
                scheduled.insert(original.as_str());
            }
        }
        waves.push(wave);
    }

    Ok(waves)
}

// =============================================================================
// ACTIVATION WAVES
// =============================================================================

/// Ordered waves of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationWaves {
    stage: Stage,
    waves: Vec<Vec<String>>,
}

impl ActivationWaves {
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Waves in activation order.
    #[must_use]
    pub fn waves(&self) -> &[Vec<String>] {
        &self.waves
    }

    /// Concatenation of all waves: a topological order of the stage.
    #[must_use]
    pub fn order(&self) -> Vec<&str> {
        self.waves.iter().flatten().map(String::as_str).collect()
    }

    /// Number of waves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waves.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }
}

/// Schedule a validated graph into waves.
pub fn schedule_waves(graph: &DependencyGraph) -> Result<ActivationWaves, StagehandError> {
    let waves = extract_frontiers(graph.names(), graph.dependency_map())
        .map_err(|_| StagehandError::DependencyCycle(graph.stage()))?;

    tracing::debug!(
        stage = %graph.stage(),
        extensions = graph.len(),
        waves = waves.len(),
        "activation waves scheduled"
    );

    Ok(ActivationWaves {
        stage: graph.stage(),
        waves,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(nodes: &[(&str, &[&str])]) -> Vec<Vec<String>> {
        let graph = DependencyGraph::build(
            Stage::ContextBuilders,
            nodes.iter().map(|(name, after)| (*name, after.iter().copied())),
        )
        .expect("acyclic");
        schedule_waves(&graph).expect("schedulable").waves().to_vec()
    }

    #[test]
    fn independent_extensions_share_wave_zero() {
        let waves = schedule(&[("wave-alpha", &[]), ("wave-beta", &[]), ("wave-gamma", &[])]);
        assert_eq!(waves, vec![vec!["wave-alpha", "wave-beta", "wave-gamma"]]);
    }

    #[test]
    fn dependency_pushes_into_later_wave() {
        let waves = schedule(&[("wave-beta", &["wave-alpha"]), ("wave-alpha", &[])]);
        assert_eq!(waves, vec![vec!["wave-alpha"], vec!["wave-beta"]]);
    }

    #[test]
    fn waves_keep_declaration_order() {
        let waves = schedule(&[
            ("d", &["a"]),
            ("c", &[]),
            ("b", &["c"]),
            ("a", &[]),
            ("e", &["d", "b"]),
        ]);
        assert_eq!(
            waves,
            vec![vec!["c", "a"], vec!["d", "b"], vec!["e"]]
        );
    }

    #[test]
    fn diamond_resolves_in_three_waves() {
        let graph = DependencyGraph::build(
            Stage::Validators,
            [
                ("top", vec![]),
                ("left", vec!["top"]),
                ("right", vec!["top"]),
                ("bottom", vec!["left", "right"]),
            ],
        )
        .expect("acyclic");
        let waves = schedule_waves(&graph).expect("schedulable");
        assert_eq!(waves.len(), 3);
        assert_eq!(waves.order(), vec!["top", "left", "right", "bottom"]);
        assert_eq!(waves.stage(), Stage::Validators);
    }

    #[test]
    fn empty_graph_has_no_waves() {
        let waves = schedule(&[]);
        assert!(waves.is_empty());
    }

    #[test]
    fn frontier_extraction_reports_unresolved_names() {
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let mut dependencies = BTreeMap::new();
        dependencies.insert("a".to_string(), BTreeSet::new());
        dependencies.insert("b".to_string(), BTreeSet::from(["c".to_string()]));
        dependencies.insert("c".to_string(), BTreeSet::from(["b".to_string()]));

        let unresolved = extract_frontiers(&names, &dependencies).expect_err("cycle");
        assert_eq!(unresolved, vec!["b".to_string(), "c".to_string()]);
    }
}
