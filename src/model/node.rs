//! Node in the project graph.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use super::{PropertyMap, Value};
use crate::schema::NodeType;

/// Arena index of a node inside one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node in the property graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Stable identifier assigned by the project exporter.
    pub external_id: String,
    pub node_type: NodeType,
    pub properties: PropertyMap,
    /// Embedding vectors keyed by the attribute they were computed from.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub embeddings: HashMap<String, Vec<f32>>,
}

impl Node {
    pub fn new(id: NodeId, external_id: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id,
            external_id: external_id.into(),
            node_type,
            properties: PropertyMap::new(),
            embeddings: HashMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn is_a(&self, node_type: NodeType) -> bool {
        self.node_type == node_type
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Display name, empty when the exporter sent none.
    pub fn name(&self) -> &str {
        self.get("name").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn embedding(&self, field: &str) -> Option<&[f32]> {
        self.embeddings.get(field).map(Vec::as_slice)
    }
}
