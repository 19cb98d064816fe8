//! Relationship (edge) in the project graph.

use serde::{Deserialize, Serialize};

use super::{NodeId, PropertyMap, Value};
use crate::schema::EdgeType;

/// Opaque relationship identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelId(pub u64);

impl std::fmt::Display for RelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Traversal direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

impl std::str::FromStr for Direction {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "outgoing" | "out" => Ok(Direction::Outgoing),
            "incoming" | "in" => Ok(Direction::Incoming),
            "both" => Ok(Direction::Both),
            other => Err(crate::Error::InvalidArgument(format!(
                "direction must be one of incoming, outgoing, both (got '{other}')"
            ))),
        }
    }
}

/// A relationship (directed edge) in the property graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelId,
    pub src: NodeId,
    pub dst: NodeId,
    pub rel_type: EdgeType,
    pub properties: PropertyMap,
}

impl Relationship {
    pub fn new(id: RelId, src: NodeId, dst: NodeId, rel_type: EdgeType) -> Self {
        Self {
            id,
            src,
            dst,
            rel_type,
            properties: PropertyMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// The "other" end of the relationship from the given node.
    pub fn other_node(&self, from: NodeId) -> Option<NodeId> {
        if from == self.src { Some(self.dst) }
        else if from == self.dst { Some(self.src) }
        else { None }
    }

    /// `similarity_score` attribute of similarity edges.
    pub fn score(&self) -> Option<f64> {
        self.properties.get("similarity_score").and_then(Value::as_float)
    }
}
