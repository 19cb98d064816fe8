//! Result documents returned by the walks.

use std::collections::BTreeMap;

use serde::Serialize;

use super::patterns::AnimationPattern;
use crate::model::{Direction, Node, Value};
use crate::schema::{EdgeType, Entity, NodeType};

/// A node as it appears inside a result: exporter id, name, type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRef {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
}

impl From<&Node> for NodeRef {
    fn from(node: &Node) -> Self {
        Self {
            id: node.external_id.clone(),
            name: node.name().to_string(),
            node_type: node.node_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyframeSummary {
    pub id: String,
    pub time: f64,
    pub value: Value,
    pub interpolation: String,
}

impl KeyframeSummary {
    pub(crate) fn from_node(node: &Node) -> Option<Self> {
        let Ok(Entity::Keyframe(k)) = Entity::decode(node.node_type, &node.properties) else {
            return None;
        };
        Some(Self {
            id: node.external_id.clone(),
            time: k.time,
            value: k.value,
            interpolation: k.interpolation,
        })
    }
}

// ============================================================================
// Hierarchy
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CompositionHierarchy {
    pub composition: NodeRef,
    pub depth: usize,
    pub layers: Vec<HierarchyLayer>,
}

impl CompositionHierarchy {
    /// Every node in the result except the composition.
    pub fn visited_ids(&self) -> Vec<&str> {
        fn props<'a>(p: &'a HierarchyProperty, out: &mut Vec<&'a str>) {
            out.push(&p.node.id);
            out.extend(p.keyframes.iter().map(|k| k.id.as_str()));
            for child in &p.children {
                props(child, out);
            }
        }
        let mut out = Vec::new();
        for layer in &self.layers {
            out.push(layer.node.id.as_str());
            for p in &layer.properties {
                props(p, &mut out);
            }
        }
        out
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HierarchyLayer {
    #[serde(flatten)]
    pub node: NodeRef,
    pub index: i64,
    pub in_point: f64,
    pub out_point: f64,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<HierarchyProperty>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HierarchyProperty {
    #[serde(flatten)]
    pub node: NodeRef,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub value: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<HierarchyProperty>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keyframes: Vec<KeyframeSummary>,
}

/// Why a render path stops short of a render queue item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMarker {
    NoRenderQueueEntry,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderStep {
    pub step: usize,
    #[serde(flatten)]
    pub node: NodeRef,
    /// Edge walked to reach this step; `None` for the layer itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via: Option<EdgeType>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderPath {
    pub layer: NodeRef,
    pub render_path: Vec<RenderStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_queue_item: Option<NodeRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<RenderMarker>,
}

impl RenderPath {
    /// Number of hops along the path.
    pub fn hops(&self) -> usize {
        self.render_path.len().saturating_sub(1)
    }
}

// ============================================================================
// Dependencies
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct DependencyEntry {
    #[serde(flatten)]
    pub node: NodeRef,
    pub relationship: EdgeType,
    pub depth: usize,
    /// Exporter id of the node this one was reached from.
    pub via: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dependencies {
    pub node: NodeRef,
    pub direction: Direction,
    pub max_depth: usize,
    pub incoming: Vec<DependencyEntry>,
    pub outgoing: Vec<DependencyEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EffectProperty {
    #[serde(flatten)]
    pub node: NodeRef,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub value: Value,
    pub keyframes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EffectEntry {
    #[serde(flatten)]
    pub node: NodeRef,
    pub match_name: String,
    pub enabled: bool,
    pub index: i64,
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<EffectProperty>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EffectsChain {
    pub layer: NodeRef,
    /// Ordered by stack index.
    pub effects: Vec<EffectEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpressionInfo {
    pub id: String,
    pub text: String,
    pub language: String,
    pub enabled: bool,
    pub unresolved_references: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpressionReferenceEntry {
    pub target: NodeRef,
    pub reference_kind: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpressionDependencies {
    pub property: NodeRef,
    pub expression: Option<ExpressionInfo>,
    pub references: Vec<ExpressionReferenceEntry>,
}

// ============================================================================
// Time
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ActiveLayer {
    #[serde(flatten)]
    pub node: NodeRef,
    pub in_point: f64,
    pub out_point: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composition: Option<NodeRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyframeHit {
    pub property: NodeRef,
    #[serde(flatten)]
    pub keyframe: KeyframeSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct NearestKeyframes {
    pub property: NodeRef,
    pub before: Option<KeyframeSummary>,
    pub after: Option<KeyframeSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveExpression {
    pub expression: NodeRef,
    pub property: NodeRef,
    pub layer: NodeRef,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeSlice {
    pub time_seconds: f64,
    pub composition: Option<NodeRef>,
    pub active_layers: Vec<ActiveLayer>,
    /// Keyframes within the configured epsilon of the time.
    pub active_keyframes: Vec<KeyframeHit>,
    pub nearest_keyframes: Vec<NearestKeyframes>,
    pub active_expressions: Vec<ActiveExpression>,
}

// ============================================================================
// Similarity
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct SimilarSetup {
    pub layer: NodeRef,
    pub similarity: f64,
    /// Strongest similarity edge score to the reference layer, if any.
    pub embedding_score: Option<f64>,
    /// Jaccard overlap of effect and property group names.
    pub structural_score: f64,
    pub matching_aspects: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimilarSetups {
    pub reference_layer: NodeRef,
    pub similarity_threshold: f64,
    pub similar_setups: Vec<SimilarSetup>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelatedNode {
    #[serde(flatten)]
    pub node: NodeRef,
    pub similarity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelatedByName {
    pub search_term: String,
    pub node_types: Option<Vec<NodeType>>,
    pub results: Vec<RelatedNode>,
}

// ============================================================================
// Discovery
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct UnusedEntry {
    #[serde(flatten)]
    pub node: NodeRef,
    pub reason: &'static str,
    /// Owning layer, for effects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<NodeRef>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UnusedElements {
    pub unused_footage: Vec<UnusedEntry>,
    pub unused_compositions: Vec<UnusedEntry>,
    pub unused_effects: Vec<UnusedEntry>,
    pub orphaned_properties: Vec<UnusedEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopLevelComposition {
    #[serde(flatten)]
    pub node: NodeRef,
    pub layers: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphSummary {
    pub total_nodes: u64,
    pub total_relationships: u64,
    /// Keyed by storage label.
    pub node_counts: BTreeMap<String, usize>,
    pub edge_counts: BTreeMap<String, usize>,
    pub top_level_compositions: Vec<TopLevelComposition>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaDescription {
    pub node_types: Vec<&'static str>,
    pub edge_types: Vec<&'static str>,
    pub available_walks: Vec<&'static str>,
}

// ============================================================================
// Animation
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PatternMatch {
    pub property: NodeRef,
    pub pattern: AnimationPattern,
    pub confidence: f64,
    pub keyframes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnimationPatterns {
    pub pattern_type: String,
    pub time_range: Option<(f64, f64)>,
    pub matching_patterns: Vec<PatternMatch>,
}
