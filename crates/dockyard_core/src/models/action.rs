//! The wire-level action envelope.
//!
//! Actions cross the registry boundary as `{ "type": ..., "payload": {...} }`.
//! Built-in reducers decode them into closed per-module enums; host
//! applications may register handlers for any other type string.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A typed message describing an intended state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Flat namespaced type, e.g. `"panels/assignView"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Arbitrary keyed payload.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub payload: Map<String, Value>,
}

impl Action {
    /// Create an action with an empty payload.
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into(), payload: Map::new() }
    }

    /// Create an action with a prepared payload.
    pub fn with_payload(kind: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self { kind: kind.into(), payload }
    }

    /// Add one payload field.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// The action type string.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Raw payload field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// String payload field; `None` when missing or not a string.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// Integer payload field. Accepts integral floats and numeric strings.
    pub fn i64_field(&self, key: &str) -> Option<i64> {
        match self.payload.get(key)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean payload field.
    pub fn bool_field(&self, key: &str) -> Option<bool> {
        self.payload.get(key).and_then(Value::as_bool)
    }

    /// Object payload field.
    pub fn object_field(&self, key: &str) -> Option<&Map<String, Value>> {
        self.payload.get(key).and_then(Value::as_object)
    }

    /// List of strings; non-string entries are skipped.
    pub fn string_list(&self, key: &str) -> Option<Vec<String>> {
        let items = self.payload.get(key)?.as_array()?;
        Some(items.iter().filter_map(Value::as_str).map(String::from).collect())
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let action = Action::new("panels/setMainAreaCount").with("count", 3);
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value, json!({"type": "panels/setMainAreaCount", "payload": {"count": 3}}));

        let bare: Action = serde_json::from_value(json!({"type": "session/reset"})).unwrap();
        assert!(bare.payload.is_empty());
    }

    #[test]
    fn test_field_coercions() {
        let action = Action::new("x")
            .with("a", 2.0)
            .with("b", "7")
            .with("c", json!(["one", 2, "three"]))
            .with("d", json!({"k": 1}));
        assert_eq!(action.i64_field("a"), Some(2));
        assert_eq!(action.i64_field("b"), Some(7));
        assert_eq!(action.string_list("c"), Some(vec!["one".to_string(), "three".to_string()]));
        assert!(action.object_field("d").is_some());
        assert_eq!(action.str_field("a"), None);
        assert_eq!(action.i64_field("missing"), None);
    }
}
