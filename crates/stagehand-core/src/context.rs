//! # Extension Context
//!
//! The single shared mutable resource of a bootstrap run.
//!
//! - Created empty once per run
//! - Store slots are set by extensions during `activate`
//! - Collections are append-only and filled by the engine from returned
//!   [`Contribution`]s, after each wave completes
//! - Returned to the caller once slot validation passes
//!
//! ## Synchronization
//!
//! Wave members run concurrently and all borrow the same context, so every
//! field sits behind a `RwLock`. Locks are held only for the duration of a
//! single read or write, never across an await point.

use crate::hooks::HookRegistry;
use crate::slots::StoreSlot;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

// =============================================================================
// CAPABILITY
// =============================================================================

/// An opaque, shareable capability object (a store, a loader, a sender...).
///
/// The engine never looks inside; consumers downcast to the concrete type
/// they expect.
#[derive(Clone)]
pub struct Capability {
    name: String,
    handle: Arc<dyn Any + Send + Sync>,
}

impl Capability {
    /// Wrap a value under a diagnostic name.
    pub fn new<T>(name: impl Into<String>, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            name: name.into(),
            handle: Arc::new(value),
        }
    }

    /// Wrap an already shared value.
    pub fn from_arc<T>(name: impl Into<String>, value: Arc<T>) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            name: name.into(),
            handle: value,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Borrow the inner value if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.handle.downcast_ref::<T>()
    }

    /// Clone out a shared handle if the inner value is a `T`.
    #[must_use]
    pub fn downcast_arc<T>(&self) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        Arc::clone(&self.handle).downcast::<T>().ok()
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability").field("name", &self.name).finish()
    }
}

// =============================================================================
// CONTRIBUTION
// =============================================================================

/// Items an extension adds to the shared collections on activation.
///
/// An empty contribution is a no-op.
#[derive(Debug, Clone, Default)]
pub struct Contribution {
    pub loaders: Vec<Capability>,
    pub validators: Vec<Capability>,
    pub context_builders: Vec<Capability>,
    pub senders: Vec<Capability>,
    pub ui_components: Vec<Capability>,
}

impl Contribution {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn loader(mut self, item: Capability) -> Self {
        self.loaders.push(item);
        self
    }

    #[must_use]
    pub fn validator(mut self, item: Capability) -> Self {
        self.validators.push(item);
        self
    }

    #[must_use]
    pub fn context_builder(mut self, item: Capability) -> Self {
        self.context_builders.push(item);
        self
    }

    #[must_use]
    pub fn sender(mut self, item: Capability) -> Self {
        self.senders.push(item);
        self
    }

    #[must_use]
    pub fn ui_component(mut self, item: Capability) -> Self {
        self.ui_components.push(item);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
            && self.validators.is_empty()
            && self.context_builders.is_empty()
            && self.senders.is_empty()
            && self.ui_components.is_empty()
    }
}

// =============================================================================
// CONTEXT
// =============================================================================

#[derive(Debug, Default)]
struct Collections {
    loaders: Vec<Capability>,
    validators: Vec<Capability>,
    context_builders: Vec<Capability>,
    senders: Vec<Capability>,
    ui_components: Vec<Capability>,
}

/// Process-scoped state shared by every extension of one bootstrap run.
#[derive(Debug, Default)]
pub struct ExtensionContext {
    slots: RwLock<BTreeMap<StoreSlot, Capability>>,
    collections: RwLock<Collections>,
    hooks: HookRegistry,
}

impl ExtensionContext {
    /// A fresh, empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Slots
    // -------------------------------------------------------------------------

    /// Fill (or replace) a store slot.
    pub fn set_store(&self, slot: StoreSlot, store: Capability) {
        tracing::debug!(slot = %slot, store = store.name(), "store slot filled");
        write(&self.slots).insert(slot, store);
    }

    /// The capability in a slot, if filled.
    #[must_use]
    pub fn store(&self, slot: StoreSlot) -> Option<Capability> {
        read(&self.slots).get(&slot).cloned()
    }

    /// Typed access to a slot.
    #[must_use]
    pub fn store_as<T>(&self, slot: StoreSlot) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.store(slot).and_then(|store| store.downcast_arc::<T>())
    }

    #[must_use]
    pub fn has_store(&self, slot: StoreSlot) -> bool {
        read(&self.slots).contains_key(&slot)
    }

    /// Slots currently filled, in slot order.
    #[must_use]
    pub fn filled_slots(&self) -> Vec<StoreSlot> {
        read(&self.slots).keys().copied().collect()
    }

    // -------------------------------------------------------------------------
    // Hooks
    // -------------------------------------------------------------------------

    /// Lifecycle hooks registered by extensions of this run.
    #[must_use]
    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    // -------------------------------------------------------------------------
    // Collections
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn loaders(&self) -> Vec<Capability> {
        read(&self.collections).loaders.clone()
    }

    #[must_use]
    pub fn validators(&self) -> Vec<Capability> {
        read(&self.collections).validators.clone()
    }

    #[must_use]
    pub fn context_builders(&self) -> Vec<Capability> {
        read(&self.collections).context_builders.clone()
    }

    #[must_use]
    pub fn senders(&self) -> Vec<Capability> {
        read(&self.collections).senders.clone()
    }

    #[must_use]
    pub fn ui_components(&self) -> Vec<Capability> {
        read(&self.collections).ui_components.clone()
    }

    /// Append a contribution, preserving emission order.
    pub(crate) fn merge(&self, contribution: Contribution) {
        if contribution.is_empty() {
            return;
        }
        let mut collections = write(&self.collections);
        collections.loaders.extend(contribution.loaders);
        collections.validators.extend(contribution.validators);
        collections.context_builders.extend(contribution.context_builders);
        collections.senders.extend(contribution.senders);
        collections.ui_components.extend(contribution.ui_components);
    }
}

// A poisoned lock only means a panicking extension held it; the data is
// still a consistent Vec/BTreeMap.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct FactStore {
        facts: usize,
    }

    #[test]
    fn slots_start_empty() {
        let context = ExtensionContext::new();
        assert!(context.filled_slots().is_empty());
        assert!(!context.has_store(StoreSlot::Fact));
        assert!(context.store(StoreSlot::Event).is_none());
    }

    #[test]
    fn typed_slot_access() {
        let context = ExtensionContext::new();
        context.set_store(StoreSlot::Fact, Capability::new("facts", FactStore { facts: 3 }));

        let store = context.store_as::<FactStore>(StoreSlot::Fact).expect("fact store");
        assert_eq!(store.facts, 3);
        assert!(context.store_as::<String>(StoreSlot::Fact).is_none());
        assert_eq!(context.filled_slots(), vec![StoreSlot::Fact]);
    }

    #[test]
    fn merge_appends_in_order() {
        let context = ExtensionContext::new();
        context.merge(Contribution::new().loader(Capability::new("first", ())));
        context.merge(
            Contribution::new()
                .loader(Capability::new("second", ()))
                .sender(Capability::new("llm", ())),
        );

        let loaders: Vec<String> = context.loaders().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(loaders, vec!["first", "second"]);
        assert_eq!(context.senders().len(), 1);
        assert!(context.validators().is_empty());
    }

    #[test]
    fn empty_contribution_is_a_no_op() {
        let context = ExtensionContext::new();
        context.merge(Contribution::new());
        assert!(context.loaders().is_empty());
        assert!(context.ui_components().is_empty());
        assert!(Contribution::default().is_empty());
    }

    #[test]
    fn shared_capability_downcasts() {
        let shared = Arc::new(FactStore { facts: 1 });
        let capability = Capability::from_arc("facts", Arc::clone(&shared));
        let back = capability.downcast_arc::<FactStore>().expect("same type");
        assert!(Arc::ptr_eq(&shared, &back));
        assert_eq!(capability.downcast_ref::<FactStore>(), Some(&FactStore { facts: 1 }));
    }
}
