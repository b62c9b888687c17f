//! # Dependency Graph
//!
//! Per-stage `after` graph: extension name → names it must follow.
//!
//! ## Invariants
//!
//! A [`DependencyGraph`] value always satisfies:
//! - every referenced name exists in the same stage
//! - the graph is acyclic
//! - names keep manifest declaration order, which drives tie-breaks
//!
//! `after` edges never cross stages; stage order already sequences stages.

use crate::extension::LoadedExtension;
use crate::schedule::extract_frontiers;
use crate::stage::Stage;
use crate::types::StagehandError;
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// KIND CHECK
// =============================================================================

/// Reject an extension registered under the wrong stage.
pub fn validate_kind(stage: Stage, extension: &LoadedExtension) -> Result<(), StagehandError> {
    if extension.kind == stage.expected_kind() {
        Ok(())
    } else {
        Err(StagehandError::KindMismatch {
            stage,
            name: extension.name.clone(),
            kind: extension.kind,
        })
    }
}

// =============================================================================
// DEPENDENCY GRAPH
// =============================================================================

/// Validated `after` graph of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph {
    stage: Stage,
    names: Vec<String>,
    dependencies: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Build from `(name, after)` pairs in declaration order.
    ///
    /// Fails on a duplicate name, an unknown dependency, or a cycle.
    pub fn build<I, N, D, S>(stage: Stage, nodes: I) -> Result<Self, StagehandError>
    where
        I: IntoIterator<Item = (N, D)>,
        N: Into<String>,
        D: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = Vec::new();
        let mut dependencies: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut declared: Vec<(String, Vec<String>)> = Vec::new();

        for (name, after) in nodes {
            let name = name.into();
            let after: Vec<String> = after.into_iter().map(Into::into).collect();
            if dependencies.contains_key(&name) {
                return Err(StagehandError::DuplicateEntry { stage, name });
            }
            dependencies.insert(name.clone(), after.iter().cloned().collect());
            declared.push((name.clone(), after));
            names.push(name);
        }

        for (name, after) in &declared {
            if let Some(unknown) = after.iter().find(|dep| !dependencies.contains_key(*dep)) {
                return Err(StagehandError::UnknownDependency {
                    dependency: unknown.clone(),
                    name: name.clone(),
                });
            }
        }

        let graph = Self {
            stage,
            names,
            dependencies,
        };

        if let Err(unresolved) = extract_frontiers(&graph.names, &graph.dependencies) {
            tracing::debug!(stage = %stage, unresolved = ?unresolved, "dependency cycle");
            return Err(StagehandError::DependencyCycle(stage));
        }

        Ok(graph)
    }

    /// Kind-check every extension, then build the graph from their `after`
    /// lists.
    pub fn from_extensions(
        stage: Stage,
        extensions: &[LoadedExtension],
    ) -> Result<Self, StagehandError> {
        for extension in extensions {
            validate_kind(stage, extension)?;
        }
        Self::build(
            stage,
            extensions
                .iter()
                .map(|extension| (extension.name.as_str(), extension.after.iter().map(String::as_str))),
        )
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Names in declaration order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Dependency set of one name.
    #[must_use]
    pub fn dependencies_of(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.dependencies.get(name)
    }

    pub(crate) fn dependency_map(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.dependencies
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::{ModuleDescriptor, from_fn};
    use crate::stage::ExtensionKind;

    fn graph(stage: Stage, nodes: &[(&str, &[&str])]) -> Result<DependencyGraph, StagehandError> {
        DependencyGraph::build(stage, nodes.iter().map(|(name, after)| (*name, after.iter().copied())))
    }

    fn extension(name: &str, kind: ExtensionKind, after: &[&str]) -> LoadedExtension {
        ModuleDescriptor::new(name, "1.0.0", kind, from_fn(|_, _| Ok(None)))
            .after(after.iter().copied())
            .validate("test.ext")
            .expect("valid descriptor")
    }

    #[test]
    fn builds_acyclic_graph() {
        let built = graph(
            Stage::ContextBuilders,
            &[("matcher", &["lexicon"]), ("lexicon", &[]), ("expander", &["matcher", "lexicon"])],
        )
        .expect("acyclic");

        assert_eq!(built.len(), 3);
        assert_eq!(built.names(), &["matcher", "lexicon", "expander"]);
        let deps = built.dependencies_of("expander").expect("present");
        assert!(deps.contains("matcher") && deps.contains("lexicon"));
    }

    #[test]
    fn rejects_unknown_dependency() {
        let err = graph(Stage::ContextBuilders, &[("@core/keyword-matcher", &["@core/missing"])])
            .expect_err("must fail");
        assert_eq!(
            err.to_string(),
            "Bootstrap error: unknown dependency @core/missing for @core/keyword-matcher."
        );
    }

    #[test]
    fn rejects_two_node_cycle() {
        let err = graph(
            Stage::ContextBuilders,
            &[("cycle-alpha", &["cycle-beta"]), ("cycle-beta", &["cycle-alpha"])],
        )
        .expect_err("must fail");
        assert_eq!(
            err.to_string(),
            "Bootstrap error: dependency cycle detected in contextBuilders."
        );
    }

    #[test]
    fn rejects_self_dependency() {
        let err = graph(Stage::Senders, &[("loop", &["loop"])]).expect_err("must fail");
        assert_eq!(err, StagehandError::DependencyCycle(Stage::Senders));
    }

    #[test]
    fn rejects_cycle_behind_a_valid_prefix() {
        let err = graph(
            Stage::Validators,
            &[("root", &[]), ("a", &["root", "c"]), ("b", &["a"]), ("c", &["b"])],
        )
        .expect_err("must fail");
        assert_eq!(err, StagehandError::DependencyCycle(Stage::Validators));
    }

    #[test]
    fn empty_stage_is_a_valid_graph() {
        let built = graph(Stage::Ui, &[]).expect("empty graph");
        assert!(built.is_empty());
    }

    #[test]
    fn kind_mismatch_is_reported_before_graph_errors() {
        let extensions = vec![
            extension("@core/memory-store", ExtensionKind::Loader, &["@core/missing"]),
        ];
        let err = DependencyGraph::from_extensions(Stage::Stores, &extensions).expect_err("must fail");
        assert_eq!(
            err.to_string(),
            "Bootstrap error: extension kind mismatch for stores: @core/memory-store is loader."
        );
    }

    #[test]
    fn from_extensions_uses_after_lists() {
        let extensions = vec![
            extension("facts", ExtensionKind::Store, &[]),
            extension("relations", ExtensionKind::Store, &["facts"]),
        ];
        let built = DependencyGraph::from_extensions(Stage::Stores, &extensions).expect("valid");
        assert_eq!(built.stage(), Stage::Stores);
        assert!(built.dependencies_of("relations").expect("present").contains("facts"));
    }
}
