//! # Stages and Extension Kinds
//!
//! Bootstrap runs in a fixed sequence of stages. Each stage accepts exactly
//! one extension kind, and stage N's context mutations are visible to
//! stage N+1.
//!
//! | Stage | Manifest key | Kind |
//! |-------|--------------|------|
//! | 0 | `stores` | `store` |
//! | 1 | `loaders` | `loader` |
//! | 2 | `validators` | `validator` |
//! | 3 | `contextBuilders` | `contextBuilder` |
//! | 4 | `senders` | `sender` |
//! | 5 | `ui` | `ui` |

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// STAGE ENUM
// =============================================================================

/// A fixed bootstrap phase. `Ord` follows activation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Stores,
    Loaders,
    Validators,
    ContextBuilders,
    Senders,
    Ui,
}

impl Stage {
    /// All stages in activation order.
    pub const ALL: [Stage; 6] = [
        Stage::Stores,
        Stage::Loaders,
        Stage::Validators,
        Stage::ContextBuilders,
        Stage::Senders,
        Stage::Ui,
    ];

    /// The manifest key for this stage.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Stage::Stores => "stores",
            Stage::Loaders => "loaders",
            Stage::Validators => "validators",
            Stage::ContextBuilders => "contextBuilders",
            Stage::Senders => "senders",
            Stage::Ui => "ui",
        }
    }

    /// The only extension kind this stage accepts.
    #[must_use]
    pub const fn expected_kind(self) -> ExtensionKind {
        match self {
            Stage::Stores => ExtensionKind::Store,
            Stage::Loaders => ExtensionKind::Loader,
            Stage::Validators => ExtensionKind::Validator,
            Stage::ContextBuilders => ExtensionKind::ContextBuilder,
            Stage::Senders => ExtensionKind::Sender,
            Stage::Ui => ExtensionKind::Ui,
        }
    }

    /// Look a stage up by manifest key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Stage> {
        Stage::ALL.into_iter().find(|stage| stage.key() == key)
    }

    /// Get the next stage, if any.
    #[must_use]
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Stores => Some(Stage::Loaders),
            Stage::Loaders => Some(Stage::Validators),
            Stage::Validators => Some(Stage::ContextBuilders),
            Stage::ContextBuilders => Some(Stage::Senders),
            Stage::Senders => Some(Stage::Ui),
            Stage::Ui => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// =============================================================================
// EXTENSION KIND
// =============================================================================

/// What an extension declares itself to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExtensionKind {
    Store,
    Loader,
    Validator,
    ContextBuilder,
    Sender,
    Ui,
}

impl ExtensionKind {
    /// Descriptor string for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ExtensionKind::Store => "store",
            ExtensionKind::Loader => "loader",
            ExtensionKind::Validator => "validator",
            ExtensionKind::ContextBuilder => "contextBuilder",
            ExtensionKind::Sender => "sender",
            ExtensionKind::Ui => "ui",
        }
    }

    /// Parse a descriptor kind string. Matching is exact.
    #[must_use]
    pub fn parse(value: &str) -> Option<ExtensionKind> {
        Stage::ALL
            .into_iter()
            .map(Stage::expected_kind)
            .find(|kind| kind.as_str() == value)
    }
}

impl fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_order_is_total() {
        let mut stage = Stage::Stores;
        let mut visited = vec![stage];
        while let Some(next) = stage.next() {
            assert!(next > stage);
            visited.push(next);
            stage = next;
        }
        assert_eq!(visited, Stage::ALL.to_vec());
    }

    #[test]
    fn keys_round_trip() {
        for stage in Stage::ALL {
            assert_eq!(Stage::from_key(stage.key()), Some(stage));
        }
        assert_eq!(Stage::from_key("plugins"), None);
    }

    #[test]
    fn kind_parsing_is_exact() {
        assert_eq!(
            ExtensionKind::parse("contextBuilder"),
            Some(ExtensionKind::ContextBuilder)
        );
        assert_eq!(ExtensionKind::parse("ContextBuilder"), None);
        assert_eq!(ExtensionKind::parse("stores"), None);
    }

    #[test]
    fn each_stage_expects_its_own_kind() {
        assert_eq!(Stage::Stores.expected_kind(), ExtensionKind::Store);
        assert_eq!(Stage::Ui.expected_kind(), ExtensionKind::Ui);
        assert_eq!(Stage::Senders.to_string(), "senders");
    }
}
