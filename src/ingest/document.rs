//! The exporter's project document.
//!
//! ```json
//! { "success": true, "message": null,
//!   "data": { "project": {..}, "edges": [..], "embedding_content": [..] } }
//! ```
//!
//! The envelope is optional; a bare `data` object is accepted too.
//!
//! Exporters that flatten the project send `data.nodes` instead of a
//! `project` tree. The tree is rebuilt from the structural edges
//! (`CONTAINS`, `HAS_KEYFRAME`, `DRIVES_WITH_EXPRESSION`); items with no
//! container hang from the `Project` node. Structural edges that would give
//! an item a second container, or close a cycle, are left in `edges` for the
//! mapper to reject.

use std::path::Path;

use hashbrown::HashMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::schema::{EdgeResolution, EdgeType, NodeType, TypeRegistry};
use crate::{Error, Result};

/// One item of the exported tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceItem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", alias = "kind")]
    pub kind: String,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
    #[serde(default, alias = "items", alias = "layers")]
    pub children: Vec<SourceItem>,
    /// Item used as this layer's source, declared inline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Box<SourceItem>>,
}

impl SourceItem {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            kind: kind.into(),
            properties: serde_json::Map::new(),
            children: Vec::new(),
            source: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: SourceItem) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_source(mut self, source: SourceItem) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Display name: `name`, else `properties.name`, else empty.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or_else(|| self.properties.get("name").and_then(|v| v.as_str()))
            .unwrap_or_default()
    }

    /// Items below this one, inline sources included.
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .chain(self.source.as_deref())
            .map(|c| 1 + c.descendant_count())
            .sum()
    }
}

/// An explicit edge listed by the exporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEdge {
    #[serde(deserialize_with = "string_or_number")]
    pub from: String,
    #[serde(deserialize_with = "string_or_number")]
    pub to: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// Text to embed for one node attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingContent {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub field: String,
    #[serde(rename = "type", default)]
    pub node_type: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDocument {
    pub project: SourceItem,
    #[serde(default)]
    pub edges: Vec<SourceEdge>,
    #[serde(default)]
    pub embedding_content: Vec<EmbeddingContent>,
}

/// `data` as flattening exporters send it.
#[derive(Deserialize)]
struct FlatDocument {
    nodes: Vec<SourceItem>,
    #[serde(default)]
    edges: Vec<SourceEdge>,
    #[serde(default)]
    embedding_content: Vec<EmbeddingContent>,
}

impl FlatDocument {
    fn into_tree(self) -> Result<ProjectDocument> {
        let registry = TypeRegistry::new();
        let root_id = self
            .nodes
            .iter()
            .find(|n| registry.resolve(&n.kind).node_type == NodeType::Project)
            .map(|n| n.id.clone())
            .ok_or_else(|| Error::InvalidDocument("flat document has no Project node".into()))?;

        let mut items: HashMap<String, SourceItem> = HashMap::with_capacity(self.nodes.len());
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut duplicates = Vec::new();
        for node in self.nodes {
            if items.contains_key(&node.id) {
                duplicates.push(node);
            } else {
                order.push(node.id.clone());
                items.insert(node.id.clone(), node);
            }
        }

        let mut parent_of: HashMap<String, String> = HashMap::new();
        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        let mut edges = Vec::with_capacity(self.edges.len());
        for edge in self.edges {
            let placement = match registry.resolve_edge(&edge.kind) {
                EdgeResolution::Known(EdgeType::Contains | EdgeType::HasKeyframe) => {
                    Some((edge.from.clone(), edge.to.clone()))
                }
                EdgeResolution::Known(EdgeType::DrivesWithExpression) => {
                    Some((edge.to.clone(), edge.from.clone()))
                }
                _ => None,
            };
            let placed = placement.is_some_and(|(parent, child)| {
                let fits = child != root_id
                    && items.contains_key(&parent)
                    && items.contains_key(&child)
                    && !parent_of.contains_key(&child)
                    && !is_ancestor(&parent_of, &child, &parent);
                if fits {
                    children.entry(parent.clone()).or_default().push(child.clone());
                    parent_of.insert(child, parent);
                }
                fits
            });
            if !placed {
                edges.push(edge);
            }
        }

        let top_level: Vec<String> = order
            .into_iter()
            .filter(|id| *id != root_id && !parent_of.contains_key(id))
            .collect();
        children.entry(root_id.clone()).or_default().extend(top_level);

        let mut project = build_subtree(&root_id, &mut items, &children)
            .ok_or_else(|| Error::InvalidDocument("flat document has no Project node".into()))?;
        project.children.extend(duplicates);

        Ok(ProjectDocument { project, edges, embedding_content: self.embedding_content })
    }
}

/// Whether `candidate` is `id` or one of its ancestors.
fn is_ancestor(parent_of: &HashMap<String, String>, candidate: &str, id: &str) -> bool {
    let mut current = Some(id);
    while let Some(at) = current {
        if at == candidate {
            return true;
        }
        current = parent_of.get(at).map(String::as_str);
    }
    false
}

fn build_subtree(
    id: &str,
    items: &mut HashMap<String, SourceItem>,
    children: &HashMap<String, Vec<String>>,
) -> Option<SourceItem> {
    let mut item = items.remove(id)?;
    for child in children.get(id).into_iter().flatten() {
        if let Some(built) = build_subtree(child, items, children) {
            item.children.push(built);
        }
    }
    Some(item)
}

#[derive(Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

impl ProjectDocument {
    pub fn new(project: SourceItem) -> Self {
        Self { project, edges: Vec::new(), embedding_content: Vec::new() }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| Error::InvalidDocument(format!("malformed JSON: {e}")))?;
        Self::from_json_value(value)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Accepts either the `{success, message, data}` envelope or bare data.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        let data = if value.get("success").is_some() {
            let envelope: Envelope = serde_json::from_value(value)
                .map_err(|e| Error::InvalidDocument(format!("bad envelope: {e}")))?;
            if !envelope.success {
                return Err(Error::InvalidDocument(
                    envelope.message.unwrap_or_else(|| "export reported failure".into()),
                ));
            }
            envelope
                .data
                .ok_or_else(|| Error::InvalidDocument("envelope has no data".into()))?
        } else {
            value
        };

        if data.get("project").is_none() && data.get("nodes").is_some() {
            let flat: FlatDocument =
                serde_json::from_value(data).map_err(|e| Error::InvalidDocument(e.to_string()))?;
            return flat.into_tree();
        }
        serde_json::from_value(data).map_err(|e| Error::InvalidDocument(e.to_string()))
    }

    /// Number of items excluding the project root.
    pub fn item_count(&self) -> usize {
        self.project.descendant_count()
    }
}

/// Exporters emit ids as strings or bare numbers.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Str(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Str(s) => s,
        Id::Int(i) => i.to_string(),
        Id::Float(f) => f.to_string(),
    })
}
