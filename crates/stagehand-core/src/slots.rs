//! # Store Slots
//!
//! Named single-value capabilities in the [`ExtensionContext`]. Three are
//! mandatory and checked once after every stage has run; this is the single
//! post-condition of a successful bootstrap.

use crate::context::ExtensionContext;
use crate::types::StagehandError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A store slot in the shared context. `Ord` follows report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StoreSlot {
    Fact,
    Event,
    Entity,
    Relationship,
}

impl StoreSlot {
    /// Every slot, in report order.
    pub const ALL: [StoreSlot; 4] = [
        StoreSlot::Fact,
        StoreSlot::Event,
        StoreSlot::Entity,
        StoreSlot::Relationship,
    ];

    /// Slots a successful bootstrap must fill.
    pub const REQUIRED: [StoreSlot; 3] = [StoreSlot::Fact, StoreSlot::Event, StoreSlot::Entity];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            StoreSlot::Fact => "factStore",
            StoreSlot::Event => "eventStore",
            StoreSlot::Entity => "entityStore",
            StoreSlot::Relationship => "relationshipStore",
        }
    }

    #[must_use]
    pub fn is_required(self) -> bool {
        StoreSlot::REQUIRED.contains(&self)
    }
}

impl fmt::Display for StoreSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fail with every unfilled mandatory slot named, or succeed silently.
pub fn validate_required_slots(context: &ExtensionContext) -> Result<(), StagehandError> {
    let missing: Vec<String> = StoreSlot::REQUIRED
        .into_iter()
        .filter(|slot| !context.has_store(*slot))
        .map(|slot| slot.as_str().to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(StagehandError::MissingSlots(missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Capability;

    #[test]
    fn empty_context_misses_all_required_slots() {
        let err = validate_required_slots(&ExtensionContext::new()).expect_err("must fail");
        assert_eq!(
            err.to_string(),
            "Bootstrap error: missing required store slots: factStore, eventStore, entityStore."
        );
    }

    #[test]
    fn names_only_the_unfilled_slot() {
        let context = ExtensionContext::new();
        context.set_store(StoreSlot::Fact, Capability::new("facts", ()));
        context.set_store(StoreSlot::Entity, Capability::new("entities", ()));

        let err = validate_required_slots(&context).expect_err("must fail");
        assert_eq!(err, StagehandError::MissingSlots(vec!["eventStore".to_string()]));
    }

    #[test]
    fn relationship_slot_is_optional() {
        let context = ExtensionContext::new();
        for slot in StoreSlot::REQUIRED {
            context.set_store(slot, Capability::new(slot.as_str(), ()));
        }
        assert!(validate_required_slots(&context).is_ok());
        assert!(!StoreSlot::Relationship.is_required());
    }
}
