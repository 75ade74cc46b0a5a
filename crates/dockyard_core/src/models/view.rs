//! View definitions, instances and the legacy flattened view.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::panel::Region;

/// A registered, loadable content type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewDefinition {
    /// Definition id (also the legacy `component` name).
    pub id: String,
    /// Default title for new instances.
    pub title: String,
    /// Context every new instance starts with.
    #[serde(default)]
    pub default_context: Map<String, Value>,
    /// Region the view prefers when opened without a target.
    #[serde(default)]
    pub preferred_region: Option<Region>,
}

impl ViewDefinition {
    /// Create a definition with an empty default context.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self { id: id.into(), title: title.into(), default_context: Map::new(), preferred_region: None }
    }

    /// Set the default context.
    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.default_context = context;
        self
    }

    /// Set the preferred region.
    pub fn with_region(mut self, region: Region) -> Self {
        self.preferred_region = Some(region);
        self
    }
}

/// Overrides applied when a registry materializes an instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceOverrides {
    /// Instance id to use (the allocator always supplies one).
    pub instance_id: Option<String>,
    /// Title replacing the definition title.
    pub title: Option<String>,
    /// Context merged over the definition's default context.
    pub context: Option<Map<String, Value>>,
}

/// A materialized, addressable occurrence of a view definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewInstance {
    /// Unique id, `"<definitionId>-<counter>"` for allocated instances.
    pub instance_id: String,
    /// Definition this instance was created from.
    pub definition_id: String,
    /// Display title.
    pub title: String,
    /// Arbitrary per-instance data.
    #[serde(default)]
    pub local_context: Map<String, Value>,
}

impl ViewInstance {
    /// Merge `patch` into the local context key by key.
    ///
    /// Returns true when anything changed.
    pub fn patch_context(&mut self, patch: &Map<String, Value>) -> bool {
        let mut changed = false;
        for (key, value) in patch {
            if self.local_context.get(key) != Some(value) {
                self.local_context.insert(key.clone(), value.clone());
                changed = true;
            }
        }
        changed
    }
}

/// Backward-compatible flattened instance.
///
/// Always derived from a [`ViewInstance`] once instances exist; only states
/// hydrated from old snapshots carry views with no instance behind them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    /// View id (the instance id for derived views).
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Definition id.
    #[serde(default)]
    pub component: String,
    /// Instance data.
    #[serde(default)]
    pub data: Value,
}

impl From<&ViewInstance> for View {
    fn from(instance: &ViewInstance) -> Self {
        Self {
            id: instance.instance_id.clone(),
            name: instance.title.clone(),
            component: instance.definition_id.clone(),
            data: Value::Object(instance.local_context.clone()),
        }
    }
}

/// Numeric suffix of an allocated instance id (`"clock-12"` → 12).
pub fn instance_serial(instance_id: &str) -> Option<u64> {
    instance_id.rsplit_once('-').and_then(|(_, n)| n.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn instance() -> ViewInstance {
        ViewInstance {
            instance_id: "notes-4".into(),
            definition_id: "notes".into(),
            title: "Notes".into(),
            local_context: Map::new(),
        }
    }

    #[test]
    fn test_patch_context_reports_changes() {
        let mut inst = instance();
        let patch = json!({"text": "hi"}).as_object().cloned().unwrap();
        assert!(inst.patch_context(&patch));
        assert!(!inst.patch_context(&patch));
        assert_eq!(inst.local_context["text"], json!("hi"));
    }

    #[test]
    fn test_legacy_view_mirrors_instance() {
        let view = View::from(&instance());
        assert_eq!(view.id, "notes-4");
        assert_eq!(view.component, "notes");
        assert_eq!(view.data, json!({}));
    }

    #[test]
    fn test_instance_serial() {
        assert_eq!(instance_serial("clock-12"), Some(12));
        assert_eq!(instance_serial("multi-part-name-3"), Some(3));
        assert_eq!(instance_serial("clock"), None);
    }
}
