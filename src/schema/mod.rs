//! # Project Schema
//!
//! The closed vocabulary of the graph: node types, edge types and the
//! classes within which similarity comparison is meaningful.
//!
//! | Module | Contents |
//! |--------|----------|
//! | `registry` | source kind → node/edge type, per-type field tables with defaults |
//! | `entity` | typed per-node-type attribute structs (`Entity`) |

pub mod registry;
pub mod entity;

use serde::{Deserialize, Serialize};

pub use registry::{EdgeResolution, FieldSpec, Resolution, TypeRegistry, TypeSchema};
pub use entity::{
    CompositionAttrs, EffectAttrs, Entity, ExpressionAttrs, FolderAttrs, FootageAttrs,
    GraphEntity, KeyframeAttrs, LayerAttrs, ProjectAttrs, PropertyAttrs, RenderItemAttrs,
};

// ============================================================================
// Node types
// ============================================================================

/// Graph node type. `Unknown` absorbs source kinds the registry cannot map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeType {
    Project,
    Composition,
    FootageItem,
    ProjectFolder,
    AVLayer,
    TextLayer,
    ShapeLayer,
    CameraLayer,
    LightLayer,
    Property,
    PropertyGroup,
    Effect,
    Keyframe,
    Expression,
    RenderQueueItem,
    Unknown,
}

impl NodeType {
    pub const ALL: [NodeType; 16] = [
        NodeType::Project,
        NodeType::Composition,
        NodeType::FootageItem,
        NodeType::ProjectFolder,
        NodeType::AVLayer,
        NodeType::TextLayer,
        NodeType::ShapeLayer,
        NodeType::CameraLayer,
        NodeType::LightLayer,
        NodeType::Property,
        NodeType::PropertyGroup,
        NodeType::Effect,
        NodeType::Keyframe,
        NodeType::Expression,
        NodeType::RenderQueueItem,
        NodeType::Unknown,
    ];

    pub const LAYERS: [NodeType; 5] = [
        NodeType::AVLayer,
        NodeType::TextLayer,
        NodeType::ShapeLayer,
        NodeType::CameraLayer,
        NodeType::LightLayer,
    ];

    /// Storage label.
    pub fn label(self) -> &'static str {
        match self {
            NodeType::Project => "Project",
            NodeType::Composition => "Composition",
            NodeType::FootageItem => "FootageItem",
            NodeType::ProjectFolder => "ProjectFolder",
            NodeType::AVLayer => "AVLayer",
            NodeType::TextLayer => "TextLayer",
            NodeType::ShapeLayer => "ShapeLayer",
            NodeType::CameraLayer => "CameraLayer",
            NodeType::LightLayer => "LightLayer",
            NodeType::Property => "Property",
            NodeType::PropertyGroup => "PropertyGroup",
            NodeType::Effect => "Effect",
            NodeType::Keyframe => "Keyframe",
            NodeType::Expression => "Expression",
            NodeType::RenderQueueItem => "RenderQueueItem",
            NodeType::Unknown => "Unknown",
        }
    }

    pub fn from_label(label: &str) -> Option<NodeType> {
        NodeType::ALL.into_iter().find(|t| t.label() == label)
    }

    pub fn is_layer(self) -> bool {
        NodeType::LAYERS.contains(&self)
    }

    /// Property or PropertyGroup.
    pub fn is_property_like(self) -> bool {
        matches!(self, NodeType::Property | NodeType::PropertyGroup)
    }

    /// Project items that layers can use as a source.
    pub fn is_source_item(self) -> bool {
        matches!(self, NodeType::Composition | NodeType::FootageItem)
    }

    pub fn similarity_class(self) -> SimilarityClass {
        if self.is_layer() {
            SimilarityClass::Layer
        } else if self.is_property_like() {
            SimilarityClass::Property
        } else {
            SimilarityClass::Exact(self)
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Edge types
// ============================================================================

/// Graph edge type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    Contains,
    ParentsTo,
    UsesSource,
    DrivesWithExpression,
    HasKeyframe,
    Renders,
    ReferencesInExpression,
    SimilarName,
    SimilarFunction,
}

impl EdgeType {
    pub const ALL: [EdgeType; 9] = [
        EdgeType::Contains,
        EdgeType::ParentsTo,
        EdgeType::UsesSource,
        EdgeType::DrivesWithExpression,
        EdgeType::HasKeyframe,
        EdgeType::Renders,
        EdgeType::ReferencesInExpression,
        EdgeType::SimilarName,
        EdgeType::SimilarFunction,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EdgeType::Contains => "CONTAINS",
            EdgeType::ParentsTo => "PARENTS_TO",
            EdgeType::UsesSource => "USES_SOURCE",
            EdgeType::DrivesWithExpression => "DRIVES_WITH_EXPRESSION",
            EdgeType::HasKeyframe => "HAS_KEYFRAME",
            EdgeType::Renders => "RENDERS",
            EdgeType::ReferencesInExpression => "REFERENCES_IN_EXPRESSION",
            EdgeType::SimilarName => "SIMILAR_NAME",
            EdgeType::SimilarFunction => "SIMILAR_FUNCTION",
        }
    }

    /// Edges created post-hoc from embeddings; symmetric by convention.
    pub fn is_similarity(self) -> bool {
        matches!(self, EdgeType::SimilarName | EdgeType::SimilarFunction)
    }

    /// Edges linking an item to its tree parent.
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            EdgeType::Contains | EdgeType::HasKeyframe | EdgeType::DrivesWithExpression
        )
    }
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Similarity classes
// ============================================================================

/// Bucket within which nodes may be compared for similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SimilarityClass {
    /// Any of the five layer types.
    Layer,
    /// Property or PropertyGroup.
    Property,
    /// Only nodes of this exact type.
    Exact(NodeType),
}

impl SimilarityClass {
    pub fn admits(self, a: NodeType, b: NodeType) -> bool {
        a.similarity_class() == self && b.similarity_class() == self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip() {
        for t in NodeType::ALL {
            assert_eq!(NodeType::from_label(t.label()), Some(t));
        }
        assert_eq!(NodeType::from_label("ae_layer"), None);
    }

    #[test]
    fn test_similarity_classes() {
        assert_eq!(NodeType::TextLayer.similarity_class(), NodeType::CameraLayer.similarity_class());
        assert_eq!(NodeType::Property.similarity_class(), NodeType::PropertyGroup.similarity_class());
        assert_ne!(NodeType::Effect.similarity_class(), NodeType::Property.similarity_class());
        assert_eq!(
            NodeType::Composition.similarity_class(),
            SimilarityClass::Exact(NodeType::Composition)
        );
        assert!(SimilarityClass::Layer.admits(NodeType::AVLayer, NodeType::ShapeLayer));
        assert!(!SimilarityClass::Layer.admits(NodeType::AVLayer, NodeType::Effect));
    }

    #[test]
    fn test_edge_serde_names() {
        let json = serde_json::to_string(&EdgeType::DrivesWithExpression).unwrap();
        assert_eq!(json, "\"DRIVES_WITH_EXPRESSION\"");
        for e in EdgeType::ALL {
            assert_eq!(serde_json::to_string(&e).unwrap(), format!("\"{}\"", e.label()));
        }
    }
}
