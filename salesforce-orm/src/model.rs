//! Model descriptors and the in-memory model registry

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Name of the record identifier field
pub const ID_FIELD: &str = "Id";

/// A named, ordered field set describing one remote record type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// sObject API name (e.g., "Account"), case-sensitive
    pub name: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl ModelDescriptor {
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Check whether a field is declared on this model
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }
}

/// Catalog of registered models
///
/// Descriptors are immutable once registered and live as long as the
/// registry. Lookups are linear; registries hold a handful of models.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: RwLock<Vec<Arc<ModelDescriptor>>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model, returning false if the name is already taken
    pub fn register(&self, descriptor: ModelDescriptor) -> bool {
        let mut models = self.models.write().unwrap_or_else(|e| e.into_inner());

        if models.iter().any(|m| m.name == descriptor.name) {
            log::debug!("Model '{}' is already registered", descriptor.name);
            return false;
        }

        log::debug!(
            "Registered model '{}' with {} fields",
            descriptor.name,
            descriptor.fields.len()
        );
        models.push(Arc::new(descriptor));
        true
    }

    /// Look up a model by name
    pub fn resolve(&self, name: &str) -> Option<Arc<ModelDescriptor>> {
        self.models
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|m| m.name == name)
            .cloned()
    }

    /// Registered model names, in registration order
    pub fn names(&self) -> Vec<String> {
        self.models
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|m| m.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.models.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
