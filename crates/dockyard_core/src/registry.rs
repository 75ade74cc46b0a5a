//! View registry contract.
//!
//! The engine only needs three operations from whatever owns view definitions.
//! `StaticViewRegistry` is the in-process implementation hosts and tests use.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::models::{InstanceOverrides, View, ViewDefinition, ViewInstance};

/// Source of view definitions consumed by the allocator and lifecycle reducers.
///
/// Implementations must be deterministic for a given definition set: reducers
/// call into the registry and are expected to stay pure.
pub trait ViewRegistry: Send + Sync {
    /// Definition by id.
    fn get(&self, id: &str) -> Option<ViewDefinition>;

    /// Materialize an instance of a definition.
    fn create_instance(
        &self,
        definition_id: &str,
        overrides: InstanceOverrides,
    ) -> Option<ViewInstance> {
        let definition = self.get(definition_id)?;
        let mut local_context = definition.default_context.clone();
        if let Some(context) = overrides.context {
            local_context.extend(context);
        }
        Some(ViewInstance {
            instance_id: overrides.instance_id.unwrap_or_else(|| definition.id.clone()),
            definition_id: definition.id,
            title: overrides.title.unwrap_or(definition.title),
            local_context,
        })
    }

    /// Build a legacy flattened view of a definition.
    fn create_view(&self, definition_id: &str, data: Option<Value>) -> Option<View> {
        let definition = self.get(definition_id)?;
        Some(View {
            id: definition.id.clone(),
            name: definition.title,
            component: definition.id,
            data: data.unwrap_or_else(|| Value::Object(definition.default_context)),
        })
    }
}

/// Thread-safe in-memory registry.
#[derive(Debug, Default)]
pub struct StaticViewRegistry {
    definitions: RwLock<HashMap<String, ViewDefinition>>,
}

impl StaticViewRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding `definitions`.
    pub fn with_definitions(definitions: impl IntoIterator<Item = ViewDefinition>) -> Self {
        let registry = Self::new();
        for definition in definitions {
            registry.register(definition);
        }
        registry
    }

    /// Register or replace a definition.
    pub fn register(&self, definition: ViewDefinition) {
        tracing::debug!(definition_id = %definition.id, "View definition registered");
        self.definitions.write().insert(definition.id.clone(), definition);
    }

    /// Registered definition ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.definitions.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl ViewRegistry for StaticViewRegistry {
    fn get(&self, id: &str) -> Option<ViewDefinition> {
        self.definitions.read().get(id).cloned()
    }
}

/// Shorthand for building a context map from a JSON object literal.
pub fn context(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
