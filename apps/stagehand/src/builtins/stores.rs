//! # In-Memory Stores
//!
//! Record bags placed into the store slots. Consumers downcast the slot
//! capability to [`RecordStore`].

use async_trait::async_trait;
use serde_json::Value;
use stagehand_core::{
    ActivationError, ActivationResult, Capability, Extension, ExtensionContext, StoreSlot,
};
use std::sync::{Arc, RwLock};

/// Append-only list of JSON records.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: RwLock<Vec<Value>>,
}

impl RecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, record: Value) {
        self.records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
    }

    /// Snapshot of every record, in append order.
    #[must_use]
    pub fn records(&self) -> Vec<Value> {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Store extension filling one slot with a fresh [`RecordStore`].
///
/// Options: `{ "records": [...] }` seeds the store.
#[derive(Debug, Clone)]
pub struct StoreExtension {
    slot: StoreSlot,
    /// Slots that must already be filled, typically by an `after` dependency.
    requires: Vec<StoreSlot>,
}

impl StoreExtension {
    #[must_use]
    pub fn new(slot: StoreSlot) -> Self {
        Self {
            slot,
            requires: Vec::new(),
        }
    }

    #[must_use]
    pub fn requiring(mut self, slot: StoreSlot) -> Self {
        self.requires.push(slot);
        self
    }
}

#[async_trait]
impl Extension for StoreExtension {
    async fn activate(
        &self,
        context: &ExtensionContext,
        options: Option<&Value>,
    ) -> ActivationResult {
        if let Some(missing) = self.requires.iter().find(|slot| !context.has_store(**slot)) {
            return Err(ActivationError::new(format!("{missing} is not available")));
        }

        let store = RecordStore::new();
        match options.and_then(|o| o.get("records")) {
            None | Some(Value::Null) => {}
            Some(Value::Array(records)) => {
                for record in records {
                    store.append(record.clone());
                }
            }
            Some(_) => return Err(ActivationError::new("records option must be an array")),
        }

        tracing::debug!(slot = %self.slot, records = store.len(), "in-memory store ready");
        context.set_store(self.slot, Capability::from_arc(self.slot.as_str(), Arc::new(store)));
        Ok(None)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn fills_its_slot_with_seeded_records() {
        let context = ExtensionContext::new();
        let options = json!({ "records": [{ "id": 1 }, { "id": 2 }] });
        StoreExtension::new(StoreSlot::Fact)
            .activate(&context, Some(&options))
            .await
            .expect("activates");

        let store = context
            .store_as::<RecordStore>(StoreSlot::Fact)
            .expect("record store");
        assert_eq!(store.len(), 2);
        assert_eq!(store.records()[1], json!({ "id": 2 }));
    }

    #[tokio::test]
    async fn rejects_non_array_records() {
        let err = StoreExtension::new(StoreSlot::Event)
            .activate(&ExtensionContext::new(), Some(&json!({ "records": "nope" })))
            .await
            .expect_err("must fail");
        assert_eq!(err.message(), "records option must be an array");
    }

    #[tokio::test]
    async fn requires_prerequisite_slot() {
        let context = ExtensionContext::new();
        let relationships = StoreExtension::new(StoreSlot::Relationship).requiring(StoreSlot::Entity);

        let err = relationships.activate(&context, None).await.expect_err("entity store missing");
        assert_eq!(err.message(), "entityStore is not available");

        StoreExtension::new(StoreSlot::Entity)
            .activate(&context, None)
            .await
            .expect("entity store");
        relationships.activate(&context, None).await.expect("relationship store");
        assert!(context.has_store(StoreSlot::Relationship));
    }

    #[test]
    fn record_store_appends_in_order() {
        let store = RecordStore::new();
        assert!(store.is_empty());
        store.append(json!("first"));
        store.append(json!("second"));
        assert_eq!(store.records(), vec![json!("first"), json!("second")]);
    }
}
