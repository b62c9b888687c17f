//! # Extensions
//!
//! An extension is what a manifest entry resolves to: a descriptor (`name`,
//! `version`, `kind`, optional `after` list) plus an [`Extension`]
//! implementation providing `activate`.
//!
//! Descriptors arrive unvalidated as [`ModuleDescriptor`] (every field
//! optional, the shape is unknown until checked) and leave the module loader
//! as [`LoadedExtension`].

use crate::context::{Contribution, ExtensionContext};
use crate::stage::ExtensionKind;
use crate::types::{DescriptorField, StagehandError};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// =============================================================================
// ACTIVATION
// =============================================================================

/// Failure raised by an extension's `activate`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ActivationError(String);

impl ActivationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<String> for ActivationError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for ActivationError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

/// Result of one activation: an optional contribution.
pub type ActivationResult = Result<Option<Contribution>, ActivationError>;

/// Runtime behaviour of an extension.
///
/// Activations within one wave run concurrently against the same context;
/// an implementation must not assume it observes the mutations of another
/// member of its own wave.
#[async_trait]
pub trait Extension: Send + Sync {
    /// Run once per bootstrap. `options` comes straight from the manifest entry.
    async fn activate(&self, context: &ExtensionContext, options: Option<&Value>)
    -> ActivationResult;

    /// Release resources. Never called by the engine itself.
    fn deactivate(&self) {}
}

/// Adapter for synchronous activation closures.
pub struct FnExtension<F> {
    activate: F,
}

#[async_trait]
impl<F> Extension for FnExtension<F>
where
    F: Fn(&ExtensionContext, Option<&Value>) -> ActivationResult + Send + Sync,
{
    async fn activate(
        &self,
        context: &ExtensionContext,
        options: Option<&Value>,
    ) -> ActivationResult {
        (self.activate)(context, options)
    }
}

/// Wrap a synchronous closure as an [`Extension`].
pub fn from_fn<F>(activate: F) -> Arc<dyn Extension>
where
    F: Fn(&ExtensionContext, Option<&Value>) -> ActivationResult + Send + Sync + 'static,
{
    Arc::new(FnExtension { activate })
}

// =============================================================================
// DESCRIPTORS
// =============================================================================

/// An extension descriptor as exported by a module, before validation.
#[derive(Clone, Default)]
pub struct ModuleDescriptor {
    pub name: Option<String>,
    pub version: Option<String>,
    pub kind: Option<String>,
    pub after: Vec<String>,
    pub activate: Option<Arc<dyn Extension>>,
}

impl ModuleDescriptor {
    /// A complete descriptor.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        kind: ExtensionKind,
        activate: Arc<dyn Extension>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            version: Some(version.into()),
            kind: Some(kind.as_str().to_string()),
            after: Vec::new(),
            activate: Some(activate),
        }
    }

    /// Declare intra-stage dependencies.
    #[must_use]
    pub fn after<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.after = dependencies.into_iter().map(Into::into).collect();
        self
    }

    /// Check the required shape. `path` only labels errors.
    pub fn validate(&self, path: &str) -> Result<LoadedExtension, StagehandError> {
        let missing = |field| StagehandError::MissingField {
            field,
            path: path.to_string(),
        };

        let name = non_empty(self.name.as_deref()).ok_or_else(|| missing(DescriptorField::Name))?;
        let version =
            non_empty(self.version.as_deref()).ok_or_else(|| missing(DescriptorField::Version))?;
        let raw_kind = non_empty(self.kind.as_deref()).ok_or_else(|| missing(DescriptorField::Kind))?;
        let kind = ExtensionKind::parse(raw_kind).ok_or_else(|| StagehandError::InvalidKind {
            kind: raw_kind.to_string(),
            path: path.to_string(),
        })?;
        let activation = self
            .activate
            .clone()
            .ok_or_else(|| missing(DescriptorField::Activate))?;

        Ok(LoadedExtension {
            name: name.to_string(),
            version: version.to_string(),
            kind,
            after: self.after.clone(),
            activation,
        })
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("kind", &self.kind)
            .field("after", &self.after)
            .field("activate", &self.activate.is_some())
            .finish()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// A validated extension, ready for dependency analysis and activation.
#[derive(Clone)]
pub struct LoadedExtension {
    pub name: String,
    pub version: String,
    pub kind: ExtensionKind,
    /// Names of same-stage extensions that must activate first.
    pub after: Vec<String>,
    pub activation: Arc<dyn Extension>,
}

impl fmt::Debug for LoadedExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedExtension")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("kind", &self.kind)
            .field("after", &self.after)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
