//! # Lifecycle Hooks
//!
//! Named interception points that extensions subscribe to during `activate`
//! and that the host fires later, e.g. around loading data or whenever a store
//! creates an entity.
//!
//! Handlers for one hook run sequentially in registration order over a
//! shared [`HookContext`]. A handler that sets [`HookContext::skip`] stops
//! the chain; handlers registered after it are not called.

use crate::extension::ActivationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

// =============================================================================
// HOOKS
// =============================================================================

/// A lifecycle point handlers can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Hook {
    BeforeLoadData,
    AfterLoadData,
    BeforeValidation,
    AfterValidation,
    BeforeBuildContext,
    AfterBuildContext,
    BeforeSendContext,
    AfterSendContext,
    OnTimelineUpdate,
    OnEntityCreated,
    OnFactExtracted,
    OnEventCreated,
    OnRelationshipAdded,
}

impl Hook {
    pub const ALL: [Hook; 13] = [
        Hook::BeforeLoadData,
        Hook::AfterLoadData,
        Hook::BeforeValidation,
        Hook::AfterValidation,
        Hook::BeforeBuildContext,
        Hook::AfterBuildContext,
        Hook::BeforeSendContext,
        Hook::AfterSendContext,
        Hook::OnTimelineUpdate,
        Hook::OnEntityCreated,
        Hook::OnFactExtracted,
        Hook::OnEventCreated,
        Hook::OnRelationshipAdded,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Hook::BeforeLoadData => "before-load-data",
            Hook::AfterLoadData => "after-load-data",
            Hook::BeforeValidation => "before-validation",
            Hook::AfterValidation => "after-validation",
            Hook::BeforeBuildContext => "before-build-context",
            Hook::AfterBuildContext => "after-build-context",
            Hook::BeforeSendContext => "before-send-context",
            Hook::AfterSendContext => "after-send-context",
            Hook::OnTimelineUpdate => "on-timeline-update",
            Hook::OnEntityCreated => "on-entity-created",
            Hook::OnFactExtracted => "on-fact-extracted",
            Hook::OnEventCreated => "on-event-created",
            Hook::OnRelationshipAdded => "on-relationship-added",
        }
    }

    /// Parse a hook name. Matching is exact.
    #[must_use]
    pub fn parse(value: &str) -> Option<Hook> {
        Hook::ALL.into_iter().find(|hook| hook.as_str() == value)
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// HOOK CONTEXT
// =============================================================================

/// Payload threaded through every handler of one `execute` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookContext {
    /// The value under inspection. Handlers may replace it.
    pub data: Value,
    /// Free-form annotations shared between handlers.
    pub metadata: Map<String, Value>,
    /// Set to stop the remaining handlers.
    pub skip: bool,
    /// Extra data a handler wants to attach to the result.
    pub augment: Option<Value>,
}

impl HookContext {
    #[must_use]
    pub fn new(data: Value) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// Result of one handler call.
pub type HookResult = Result<(), ActivationError>;

#[async_trait]
pub trait HookHandler: Send + Sync {
    async fn handle(&self, context: &mut HookContext) -> HookResult;
}

/// Adapter for synchronous handler closures.
pub struct FnHookHandler<F> {
    handle: F,
}

#[async_trait]
impl<F> HookHandler for FnHookHandler<F>
where
    F: Fn(&mut HookContext) -> HookResult + Send + Sync,
{
    async fn handle(&self, context: &mut HookContext) -> HookResult {
        (self.handle)(context)
    }
}

/// Wrap a synchronous closure as a [`HookHandler`].
pub fn hook_fn<F>(handle: F) -> Arc<dyn HookHandler>
where
    F: Fn(&mut HookContext) -> HookResult + Send + Sync + 'static,
{
    Arc::new(FnHookHandler { handle })
}

/// A handler together with the extension that registered it.
#[derive(Clone)]
pub struct RegisteredHandler {
    pub handler: Arc<dyn HookHandler>,
    pub extension: String,
}

impl fmt::Debug for RegisteredHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredHandler")
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Per-hook handler lists, in registration order.
#[derive(Default)]
pub struct HookRegistry {
    handlers: RwLock<BTreeMap<Hook, Vec<RegisteredHandler>>>,
}

impl HookRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to the chain for `hook`.
    pub fn register(
        &self,
        hook: Hook,
        handler: Arc<dyn HookHandler>,
        extension: impl Into<String>,
    ) {
        let extension = extension.into();
        tracing::debug!(hook = %hook, extension = %extension, "hook handler registered");
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(hook)
            .or_default()
            .push(RegisteredHandler { handler, extension });
    }

    /// Handlers registered for `hook`, in registration order.
    #[must_use]
    pub fn handlers(&self, hook: Hook) -> Vec<RegisteredHandler> {
        self.handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&hook)
            .cloned()
            .unwrap_or_default()
    }

    /// Run the chain for `hook` over `context` and hand it back.
    ///
    /// The handler list is snapshotted first, so a handler may register
    /// further handlers without deadlocking; those only apply to later calls.
    /// A handler error aborts the chain.
    pub async fn execute(
        &self,
        hook: Hook,
        mut context: HookContext,
    ) -> Result<HookContext, ActivationError> {
        for registered in self.handlers(hook) {
            registered.handler.handle(&mut context).await.map_err(|e| {
                ActivationError::new(format!(
                    "hook {hook} failed in {}: {e}",
                    registered.extension
                ))
            })?;
            if context.skip {
                tracing::debug!(
                    hook = %hook,
                    extension = %registered.extension,
                    "hook chain skipped"
                );
                break;
            }
        }
        Ok(context)
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        let counts: BTreeMap<&str, usize> = handlers
            .iter()
            .map(|(hook, list)| (hook.as_str(), list.len()))
            .collect();
        f.debug_struct("HookRegistry").field("handlers", &counts).finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
