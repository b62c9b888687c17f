//! # Property-Based Tests
//!
//! Scheduler and reconciler invariants over generated stages.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use proptest::collection::vec;
use proptest::prelude::*;
use stagehand_core::{
    DependencyGraph, DependencyIndex, ExtensionEntry, Manifest, Stage, StagehandError, Status,
    reconcile, schedule_waves,
};
use std::collections::BTreeMap;

/// Acyclic stage: node `i` may only depend on nodes `< i`, then the
/// declaration order is shuffled by `rotation`.
fn acyclic_stage(edges: &[Vec<usize>], rotation: usize) -> Vec<(String, Vec<String>)> {
    let mut nodes: Vec<(String, Vec<String>)> = edges
        .iter()
        .enumerate()
        .map(|(i, deps)| {
            let mut after: Vec<String> = deps
                .iter()
                .filter(|&&d| d < i)
                .map(|d| format!("ext-{d}"))
                .collect();
            after.sort();
            after.dedup();
            (format!("ext-{i}"), after)
        })
        .collect();
    if !nodes.is_empty() {
        let shift = rotation % nodes.len();
        nodes.rotate_left(shift);
    }
    nodes
}

fn status_from(code: u8, deps: &[String]) -> Status {
    match code % 3 {
        0 => Status::On,
        1 => Status::Off,
        _ => Status::needs(deps.iter().take(1).cloned().chain(["elsewhere".to_string()])),
    }
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Concatenated waves are a topological order: every name exactly once,
    /// strictly after its dependencies.
    #[test]
    fn waves_form_a_topological_order(
        edges in vec(vec(0usize..16, 0..4), 0..16),
        rotation in 0usize..16,
    ) {
        let nodes = acyclic_stage(&edges, rotation);
        let graph = DependencyGraph::build(Stage::Validators, nodes.clone()).expect("acyclic");
        let waves = schedule_waves(&graph).expect("schedulable");
        let order = waves.order();

        prop_assert_eq!(order.len(), nodes.len());
        let position: BTreeMap<&str, usize> =
            order.iter().enumerate().map(|(i, name)| (*name, i)).collect();
        prop_assert_eq!(position.len(), nodes.len());

        for (name, after) in &nodes {
            for dep in after {
                prop_assert!(position[dep.as_str()] < position[name.as_str()]);
            }
        }
    }

    /// Wave 0 holds exactly the names without dependencies.
    #[test]
    fn first_wave_is_dependency_free(
        edges in vec(vec(0usize..12, 0..3), 1..12),
        rotation in 0usize..12,
    ) {
        let nodes = acyclic_stage(&edges, rotation);
        let graph = DependencyGraph::build(Stage::Loaders, nodes.clone()).expect("acyclic");
        let waves = schedule_waves(&graph).expect("schedulable");

        let roots: Vec<&str> = nodes
            .iter()
            .filter(|(_, after)| after.is_empty())
            .map(|(name, _)| name.as_str())
            .collect();
        let first: Vec<&str> = waves.waves()[0].iter().map(String::as_str).collect();
        prop_assert_eq!(first, roots);
    }

    /// A back edge closing any chain is always reported as a cycle.
    #[test]
    fn closing_a_chain_is_a_cycle(length in 1usize..10) {
        let nodes: Vec<(String, Vec<String>)> = (0..length)
            .map(|i| {
                let dep = if i == 0 { length - 1 } else { i - 1 };
                (format!("ext-{i}"), vec![format!("ext-{dep}")])
            })
            .collect();
        let err = DependencyGraph::build(Stage::Senders, nodes).expect_err("cycle");
        prop_assert_eq!(err, StagehandError::DependencyCycle(Stage::Senders));
    }

    /// Reconciling a reconciled manifest changes nothing.
    #[test]
    fn reconcile_is_idempotent(
        edges in vec(vec(0usize..10, 0..3), 0..10),
        codes in vec(any::<u8>(), 10),
        resolved in vec(any::<bool>(), 10),
    ) {
        let nodes = acyclic_stage(&edges, 0);
        let mut manifest = Manifest::new();
        let mut index = DependencyIndex::new();
        for (i, (name, after)) in nodes.iter().enumerate() {
            manifest.push(
                Stage::ContextBuilders,
                ExtensionEntry::new(name.clone(), format!("ext\\{name}.ext"), status_from(codes[i], after)),
            );
            if resolved[i] {
                index.insert(Stage::ContextBuilders, name.clone(), after.clone());
            }
        }

        let once = reconcile(&manifest, &index);
        let twice = reconcile(&once, &index);
        prop_assert_eq!(&once, &twice);

        for entry in once.entries(Stage::ContextBuilders) {
            prop_assert!(!entry.path.contains('\\'));
        }
    }

    /// `off` entries survive reconciliation untouched.
    #[test]
    fn reconcile_never_touches_off(
        edges in vec(vec(0usize..10, 0..3), 0..10),
        codes in vec(any::<u8>(), 10),
    ) {
        let nodes = acyclic_stage(&edges, 0);
        let mut manifest = Manifest::new();
        let mut index = DependencyIndex::new();
        for (i, (name, after)) in nodes.iter().enumerate() {
            manifest.push(
                Stage::Loaders,
                ExtensionEntry::new(name.clone(), format!("ext/{name}.ext"), status_from(codes[i], after)),
            );
            index.insert(Stage::Loaders, name.clone(), after.clone());
        }

        let reconciled = reconcile(&manifest, &index);
        for (before, after) in manifest
            .entries(Stage::Loaders)
            .iter()
            .zip(reconciled.entries(Stage::Loaders))
        {
            if before.status.is_off() {
                prop_assert_eq!(&after.status, &Status::Off);
            }
            if after.status.is_on() {
                prop_assert!(!before.status.is_off());
            }
        }
    }
}
