//! Backend-neutral node records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// A node as returned by a persister, before it is hydrated into an entity.
///
/// The serialized shape matches an Apache AGE vertex:
/// `{"id": 844424930131969, "label": "Person", "properties": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Database-assigned identifier.
    pub id: i64,
    pub label: String,
    #[serde(default)]
    pub properties: Map<String, JsonValue>,
}

impl Node {
    pub fn new(id: i64, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            properties: Map::new(),
        }
    }

    /// Adds or replaces a stored property.
    pub fn with_property(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Returns the stored value for a property key.
    pub fn property(&self, key: &str) -> Option<&JsonValue> {
        self.properties.get(key)
    }
}
