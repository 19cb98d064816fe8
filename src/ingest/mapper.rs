//! Graph Mapper: source document → node records + edge records.
//!
//! Depth-first, parents before children. Every item gets exactly one
//! structural edge from its tree parent:
//!
//! | child under parent | edge |
//! |--------------------|------|
//! | Keyframe under Property | `HAS_KEYFRAME` property → keyframe |
//! | Expression under Property | `DRIVES_WITH_EXPRESSION` expression → property |
//! | anything else | `CONTAINS` parent → child |
//!
//! An item that fails to map is skipped; its children hang from the nearest
//! mapped ancestor instead. Explicit `CONTAINS` edges never give an item a
//! second container.
//!
//! Items declared inline as a layer's `source` get no structural edge, only
//! `USES_SOURCE` layer → item. References by id (`source_id`, `parent_id`,
//! `comp_id`, explicit `edges`) are emitted by external id and resolved by
//! the orchestrator once every node exists, so forward references work.

use hashbrown::{HashMap, HashSet};
use tracing::{debug, warn};

use super::document::{ProjectDocument, SourceEdge, SourceItem};
use super::report::IngestIssue;
use crate::expression::{ExpressionReference, LayerSelector, ReferenceGrammar, ReferenceTarget, Selector};
use crate::model::{PropertyMap, Value, props};
use crate::schema::{EdgeResolution, EdgeType, Entity, GraphEntity, NodeType, TypeRegistry};

// ============================================================================
// Records
// ============================================================================

/// A node ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub external_id: String,
    pub entity: Entity,
    /// Exporter attributes outside the typed field set.
    pub extra: PropertyMap,
}

impl NodeRecord {
    pub fn node_type(&self) -> NodeType {
        self.entity.node_type()
    }

    pub fn name(&self) -> &str {
        self.entity.name()
    }

    /// Attributes as stored: extras overlaid with the canonical typed fields.
    pub fn properties(&self) -> PropertyMap {
        let mut out = self.extra.clone();
        out.extend(self.entity.to_properties());
        out
    }
}

/// An edge between two external ids.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRecord {
    pub from: String,
    pub to: String,
    pub edge_type: EdgeType,
    pub properties: PropertyMap,
}

/// Text to embed for one node attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRequest {
    pub external_id: String,
    pub field: String,
    pub text: String,
}

/// Mapper output.
#[derive(Debug, Clone, Default)]
pub struct MappedGraph {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
    pub embeddings: Vec<EmbeddingRequest>,
    pub issues: Vec<IngestIssue>,
    pub unresolved_references: usize,
}

// ============================================================================
// Mapper
// ============================================================================

pub struct GraphMapper<'g> {
    registry: TypeRegistry,
    grammar: &'g dyn ReferenceGrammar,
}

#[derive(Debug, Clone, Default)]
struct Ctx {
    parent: Option<(String, NodeType)>,
    comp: Option<String>,
    layer: Option<String>,
}

struct LayerEntry {
    id: String,
    name: String,
    index: i64,
}

struct EffectEntry {
    id: String,
    name: String,
    match_name: String,
    index: i64,
}

struct PendingExpression {
    id: String,
    text: String,
    comp: Option<String>,
    layer: Option<String>,
}

#[derive(Default)]
struct MapState {
    out: MappedGraph,
    index: HashMap<String, usize>,
    edge_keys: HashSet<(EdgeType, String, String)>,
    /// child → tree parent, for every structural edge emitted
    parent_of: HashMap<String, String>,
    comp_by_name: HashMap<String, String>,
    layers: HashMap<String, Vec<LayerEntry>>,
    effects: HashMap<String, Vec<EffectEntry>>,
    expressions: Vec<PendingExpression>,
}

impl MapState {
    fn issue(&mut self, issue: IngestIssue) {
        warn!(%issue, "ingest issue");
        self.out.issues.push(issue);
    }

    /// Identical `(type, from, to)` triples are emitted once.
    fn edge(&mut self, edge_type: EdgeType, from: &str, to: &str, properties: PropertyMap) {
        if self.edge_keys.insert((edge_type, from.to_string(), to.to_string())) {
            self.out.edges.push(EdgeRecord {
                from: from.to_string(),
                to: to.to_string(),
                edge_type,
                properties,
            });
        }
    }
}

impl<'g> GraphMapper<'g> {
    pub fn new(grammar: &'g dyn ReferenceGrammar) -> Self {
        Self { registry: TypeRegistry::new(), grammar }
    }

    pub fn map(&self, doc: &ProjectDocument) -> MappedGraph {
        let mut st = MapState::default();

        self.visit(&mut st, &doc.project, &Ctx::default(), 1, true);

        for edge in &doc.edges {
            match self.registry.resolve_edge(&edge.kind) {
                EdgeResolution::Known(EdgeType::Contains) => {
                    if let Err(reason) = claim_parent(&mut st, &edge.from, &edge.to) {
                        st.issue(IngestIssue::Mapping { id: format!("{}->{}", edge.from, edge.to), reason });
                        continue;
                    }
                    st.edge(EdgeType::Contains, &edge.from, &edge.to, edge_properties(edge));
                }
                EdgeResolution::Known(t) => st.edge(t, &edge.from, &edge.to, edge_properties(edge)),
                EdgeResolution::Unknown => st.issue(IngestIssue::Mapping {
                    id: format!("{}->{}", edge.from, edge.to),
                    reason: format!("unknown edge kind '{}'", edge.kind),
                }),
            }
        }

        self.resolve_expressions(&mut st);
        self.embedding_requests(&mut st, doc);

        debug!(
            nodes = st.out.nodes.len(),
            edges = st.out.edges.len(),
            issues = st.out.issues.len(),
            "document mapped"
        );
        st.out
    }

    /// Map one item and its subtree. Returns the item's id when it produced
    /// (or already had) a node.
    fn visit(
        &self,
        st: &mut MapState,
        item: &SourceItem,
        ctx: &Ctx,
        position: usize,
        structural: bool,
    ) -> Option<String> {
        let id = item.id.clone();

        if st.index.contains_key(&id) {
            // An inline source may also be declared elsewhere in the tree.
            if structural {
                st.issue(IngestIssue::Mapping { id, reason: "duplicate id in document".into() });
                return None;
            }
            return Some(id);
        }

        let resolution = self.registry.resolve(&item.kind);
        let mut source: PropertyMap = item
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v.clone())))
            .collect();
        if !resolution.known {
            source.insert("source_kind".into(), Value::from(item.kind.as_str()));
        }

        let entity = resolution
            .schema
            .apply(item.display_name(), position, &source)
            .and_then(|full| Entity::decode(resolution.node_type, &full).map(|e| (e, full)));
        let (entity, extra) = match entity {
            Ok(ok) => ok,
            Err(reason) => {
                st.issue(IngestIssue::Mapping { id, reason });
                if let Some(inline) = &item.source {
                    self.visit(st, inline, &Ctx { parent: None, ..ctx.clone() }, 1, false);
                }
                for (i, child) in item.children.iter().enumerate() {
                    self.visit(st, child, ctx, i + 1, true);
                }
                return None;
            }
        };
        let node_type = entity.node_type();

        if structural {
            if let Some((parent, parent_type)) = &ctx.parent {
                match (node_type, *parent_type) {
                    (NodeType::Keyframe, NodeType::Property) => {
                        st.edge(EdgeType::HasKeyframe, parent, &id, PropertyMap::new())
                    }
                    (NodeType::Expression, NodeType::Property) => {
                        st.edge(EdgeType::DrivesWithExpression, &id, parent, PropertyMap::new())
                    }
                    _ => st.edge(EdgeType::Contains, parent, &id, PropertyMap::new()),
                }
                st.parent_of.insert(id.clone(), parent.clone());
            }
        }

        match &entity {
            Entity::Composition(c) => {
                st.comp_by_name.entry(c.name.clone()).or_insert_with(|| id.clone());
            }
            Entity::Layer(l) => {
                if let Some(comp) = &ctx.comp {
                    st.layers.entry(comp.clone()).or_default().push(LayerEntry {
                        id: id.clone(),
                        name: l.name.clone(),
                        index: l.index,
                    });
                }
                if let Some(source_id) = &l.source_id {
                    st.edge(EdgeType::UsesSource, &id, source_id, PropertyMap::new());
                }
                if let Some(parent_id) = &l.parent_id {
                    st.edge(EdgeType::ParentsTo, &id, parent_id, PropertyMap::new());
                }
            }
            Entity::Effect(e) => {
                if let Some(layer) = &ctx.layer {
                    st.effects.entry(layer.clone()).or_default().push(EffectEntry {
                        id: id.clone(),
                        name: e.name.clone(),
                        match_name: e.match_name.clone(),
                        index: e.index,
                    });
                }
            }
            Entity::Expression(x) => st.expressions.push(PendingExpression {
                id: id.clone(),
                text: x.expression_text.clone(),
                comp: ctx.comp.clone(),
                layer: ctx.layer.clone(),
            }),
            Entity::RenderItem(r) => {
                if let Some(comp_id) = &r.comp_id {
                    st.edge(EdgeType::Renders, &id, comp_id, PropertyMap::new());
                }
            }
            _ => {}
        }

        debug!(id = %id, %node_type, "mapped item");
        st.index.insert(id.clone(), st.out.nodes.len());
        st.out.nodes.push(NodeRecord { external_id: id.clone(), entity, extra });

        let child_ctx = Ctx {
            parent: Some((id.clone(), node_type)),
            comp: if node_type == NodeType::Composition { Some(id.clone()) } else { ctx.comp.clone() },
            layer: if node_type.is_layer() { Some(id.clone()) } else { ctx.layer.clone() },
        };

        if let Some(inline) = &item.source {
            let source_ctx = Ctx { parent: None, ..child_ctx.clone() };
            if let Some(source_id) = self.visit(st, inline, &source_ctx, 1, false) {
                st.edge(EdgeType::UsesSource, &id, &source_id, PropertyMap::new());
            }
        }

        for (i, child) in item.children.iter().enumerate() {
            self.visit(st, child, &child_ctx, i + 1, true);
        }

        Some(id)
    }

    // ========================================================================
    // Expression references
    // ========================================================================

    fn resolve_expressions(&self, st: &mut MapState) {
        let pending = std::mem::take(&mut st.expressions);

        for expr in pending {
            let refs = match self.grammar.references(&expr.text) {
                Ok(refs) => refs,
                Err(e) => {
                    st.issue(IngestIssue::Mapping {
                        id: expr.id.clone(),
                        reason: format!("expression references not parsed: {e}"),
                    });
                    continue;
                }
            };

            let mut unresolved = Vec::new();
            for reference in refs {
                match resolve_reference(st, &reference, &expr) {
                    Some(target) => st.edge(
                        EdgeType::ReferencesInExpression,
                        &expr.id,
                        &target,
                        props([
                            ("reference_kind", reference.kind()),
                            ("token", reference.token.as_str()),
                        ]),
                    ),
                    None => {
                        debug!(expression = %expr.id, token = %reference.token, "unresolved reference");
                        unresolved.push(reference.token);
                    }
                }
            }

            if !unresolved.is_empty() {
                st.out.unresolved_references += unresolved.len();
                warn!(expression = %expr.id, count = unresolved.len(), "expression has unresolved references");
                if let Some(&idx) = st.index.get(&expr.id) {
                    st.out.nodes[idx]
                        .extra
                        .insert("unresolved_references".into(), Value::from(unresolved));
                }
            }
        }
    }

    // ========================================================================
    // Embedding requests
    // ========================================================================

    /// Explicit `embedding_content` wins; otherwise every named node embeds
    /// its name and every expression its text.
    fn embedding_requests(&self, st: &mut MapState, doc: &ProjectDocument) {
        let requests = if !doc.embedding_content.is_empty() {
            doc.embedding_content
                .iter()
                .filter(|c| !c.content.trim().is_empty())
                .map(|c| EmbeddingRequest {
                    external_id: c.id.clone(),
                    field: c.field.clone(),
                    text: c.content.clone(),
                })
                .collect()
        } else {
            let mut out = Vec::new();
            for node in &st.out.nodes {
                if !node.name().trim().is_empty() {
                    out.push(EmbeddingRequest {
                        external_id: node.external_id.clone(),
                        field: "name".into(),
                        text: node.name().to_string(),
                    });
                }
                if let Entity::Expression(x) = &node.entity {
                    out.push(EmbeddingRequest {
                        external_id: node.external_id.clone(),
                        field: "expression_text".into(),
                        text: x.expression_text.clone(),
                    });
                }
            }
            out
        };
        st.out.embeddings = requests;
    }
}

fn edge_properties(edge: &SourceEdge) -> PropertyMap {
    edge.properties
        .iter()
        .map(|(k, v)| (k.clone(), Value::from(v.clone())))
        .collect()
}

/// Record `parent` as the container of `child`, unless `child` already has
/// a different one or `child` is an ancestor of `parent`.
fn claim_parent(st: &mut MapState, parent: &str, child: &str) -> Result<(), String> {
    if parent == child {
        return Err(format!("'{child}' cannot contain itself"));
    }
    let mut ancestor = Some(parent);
    while let Some(id) = ancestor {
        if id == child {
            return Err(format!("'{parent}' containing '{child}' would close a cycle"));
        }
        ancestor = st.parent_of.get(id).map(String::as_str);
    }
    match st.parent_of.get(child) {
        Some(existing) if existing != parent => {
            Err(format!("'{child}' is already contained by '{existing}'"))
        }
        Some(_) => Ok(()),
        None => {
            st.parent_of.insert(child.to_string(), parent.to_string());
            Ok(())
        }
    }
}

fn resolve_layer(
    st: &MapState,
    comp: Option<&String>,
    layer: &LayerSelector,
    expr: &PendingExpression,
) -> Option<String> {
    let comp_id = match comp {
        Some(name) => st.comp_by_name.get(name)?,
        None => match layer {
            LayerSelector::This => return expr.layer.clone(),
            LayerSelector::By(_) => expr.comp.as_ref()?,
        },
    };
    let layers = st.layers.get(comp_id)?;
    let found = match layer {
        LayerSelector::This => return expr.layer.clone(),
        LayerSelector::By(Selector::Name(n)) => layers.iter().find(|l| &l.name == n),
        LayerSelector::By(Selector::Index(i)) => layers.iter().find(|l| l.index == *i),
    };
    found.map(|l| l.id.clone())
}

fn resolve_reference(
    st: &MapState,
    reference: &ExpressionReference,
    expr: &PendingExpression,
) -> Option<String> {
    match &reference.target {
        ReferenceTarget::Composition { name } => st.comp_by_name.get(name).cloned(),
        ReferenceTarget::Layer { comp, layer } => resolve_layer(st, comp.as_ref(), layer, expr),
        ReferenceTarget::Effect { comp, layer, effect } => {
            let layer_id = resolve_layer(st, comp.as_ref(), layer, expr)?;
            let effects = st.effects.get(&layer_id)?;
            let found = match effect {
                Selector::Name(n) => effects.iter().find(|e| &e.name == n || &e.match_name == n),
                Selector::Index(i) => effects.iter().find(|e| e.index == *i),
            };
            found.map(|e| e.id.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::AeExpressionGrammar;
    use pretty_assertions::assert_eq;

    fn map(doc: &ProjectDocument) -> MappedGraph {
        GraphMapper::new(&AeExpressionGrammar).map(doc)
    }

    fn edge_triples(g: &MappedGraph) -> Vec<(EdgeType, &str, &str)> {
        g.edges.iter().map(|e| (e.edge_type, e.from.as_str(), e.to.as_str())).collect()
    }

    fn example() -> ProjectDocument {
        ProjectDocument::new(
            SourceItem::new("P", "Project").named("P").with_child(
                SourceItem::new("C", "Composition")
                    .named("C")
                    .with_property("duration", 10)
                    .with_child(SourceItem::new("T", "TextLayer").named("T").with_property("index", 1))
                    .with_child(
                        SourceItem::new("A", "AVLayer")
                            .named("A")
                            .with_property("index", 2)
                            .with_source(SourceItem::new("F", "FootageItem").named("F")),
                    ),
            ),
        )
    }

    #[test]
    fn test_example_document_shape() {
        let g = map(&example());
        let ids: Vec<_> = g.nodes.iter().map(|n| n.external_id.as_str()).collect();
        assert_eq!(ids, vec!["P", "C", "T", "A", "F"]);
        assert_eq!(
            edge_triples(&g),
            vec![
                (EdgeType::Contains, "P", "C"),
                (EdgeType::Contains, "C", "T"),
                (EdgeType::Contains, "C", "A"),
                (EdgeType::UsesSource, "A", "F"),
            ]
        );
        assert!(g.issues.is_empty());
    }

    #[test]
    fn test_defaults_applied() {
        let g = map(&example());
        let comp = g.nodes[1].properties();
        assert_eq!(comp["frame_rate"], Value::Float(30.0));
        assert_eq!(comp["width"], Value::Int(1920));
        assert_eq!(comp["duration"], Value::Float(10.0));
    }

    #[test]
    fn test_keyframe_and_expression_edges() {
        let doc = ProjectDocument::new(
            SourceItem::new("P", "Project").with_child(
                SourceItem::new("C", "Composition").with_child(
                    SourceItem::new("L", "ShapeLayer").with_child(
                        SourceItem::new("pos", "Property")
                            .named("Position")
                            .with_child(SourceItem::new("k1", "Keyframe").with_property("time", 0.0))
                            .with_child(
                                SourceItem::new("x", "Expression")
                                    .with_property("expression_text", "wiggle(2, 10)"),
                            ),
                    ),
                ),
            ),
        );
        let g = map(&doc);
        let triples = edge_triples(&g);
        assert!(triples.contains(&(EdgeType::HasKeyframe, "pos", "k1")));
        assert!(triples.contains(&(EdgeType::DrivesWithExpression, "x", "pos")));
        assert!(!triples.iter().any(|(t, _, to)| *t == EdgeType::Contains && (*to == "k1" || *to == "x")));
    }

    #[test]
    fn test_failed_item_children_hang_from_ancestor() {
        let doc = ProjectDocument::new(
            SourceItem::new("P", "Project").with_child(
                SourceItem::new("bad", "Keyframe").with_child(SourceItem::new("orphan", "Property")),
            ),
        );
        let g = map(&doc);
        let ids: Vec<_> = g.nodes.iter().map(|n| n.external_id.as_str()).collect();
        assert_eq!(ids, vec!["P", "orphan"]);
        assert_eq!(edge_triples(&g), vec![(EdgeType::Contains, "P", "orphan")]);
        assert_eq!(g.issues.len(), 1);
        assert!(matches!(&g.issues[0], IngestIssue::Mapping { id, .. } if id == "bad"));
    }

    #[test]
    fn test_failed_expression_keeps_nested_items() {
        let doc = ProjectDocument::new(
            SourceItem::new("P", "Project").with_child(
                SourceItem::new("C", "Composition").with_child(
                    SourceItem::new("x", "Expression")
                        .with_child(SourceItem::new("g1", "PropertyGroup").with_property("match_name", "ADBE Group"))
                        .with_child(SourceItem::new("g2", "PropertyGroup").with_property("match_name", "ADBE Group"))
                        .with_child(SourceItem::new("g3", "PropertyGroup").with_property("match_name", "ADBE Group")),
                ),
            ),
        );
        let g = map(&doc);
        assert_eq!(g.nodes.len(), 5);
        assert_eq!(g.issues.len(), 1);
        let contained: Vec<_> = edge_triples(&g)
            .into_iter()
            .filter(|(_, from, _)| *from == "C")
            .map(|(_, _, to)| to)
            .collect();
        assert_eq!(contained, vec!["g1", "g2", "g3"]);
    }

    #[test]
    fn test_explicit_contains_cannot_add_second_parent() {
        let mut doc = ProjectDocument::new(
            SourceItem::new("P", "Project")
                .with_child(SourceItem::new("C", "Composition"))
                .with_child(SourceItem::new("D", "Folder")),
        );
        for (from, to) in [("D", "C"), ("C", "C"), ("D", "P"), ("C", "P")] {
            doc.edges.push(SourceEdge {
                from: from.into(),
                to: to.into(),
                kind: "CONTAINS".into(),
                properties: Default::default(),
            });
        }
        let g = map(&doc);

        let mut parents: HashMap<&str, Vec<&str>> = HashMap::new();
        for (t, from, to) in edge_triples(&g) {
            if t == EdgeType::Contains {
                parents.entry(to).or_default().push(from);
            }
        }
        assert_eq!(parents["C"], vec!["P"]);
        assert!(!parents.contains_key("P"));
        assert_eq!(g.issues.len(), 4);
        assert!(g.issues.iter().all(|i| matches!(i, IngestIssue::Mapping { .. })));
    }

    #[test]
    fn test_unknown_kind_and_edge_kind() {
        let mut doc = ProjectDocument::new(
            SourceItem::new("P", "Project").with_child(SourceItem::new("S", "SolidSource").named("Solid")),
        );
        doc.edges.push(SourceEdge {
            from: "P".into(),
            to: "S".into(),
            kind: "LINKS_TO".into(),
            properties: Default::default(),
        });
        let g = map(&doc);
        assert_eq!(g.nodes[1].node_type(), NodeType::Unknown);
        assert_eq!(g.nodes[1].properties()["source_kind"], Value::from("SolidSource"));
        assert_eq!(g.issues.len(), 1);
    }

    #[test]
    fn test_forward_source_id_and_render_item() {
        let doc = ProjectDocument::new(
            SourceItem::new("P", "Project")
                .with_child(
                    SourceItem::new("C", "Composition")
                        .with_child(SourceItem::new("L", "AVLayer").with_property("source_id", "pre")),
                )
                .with_child(SourceItem::new("pre", "Composition"))
                .with_child(SourceItem::new("rq", "RenderQueueItem").with_property("comp_id", "C")),
        );
        let g = map(&doc);
        let triples = edge_triples(&g);
        assert!(triples.contains(&(EdgeType::UsesSource, "L", "pre")));
        assert!(triples.contains(&(EdgeType::Renders, "rq", "C")));
    }

    #[test]
    fn test_expression_references_resolved() {
        let doc = ProjectDocument::new(
            SourceItem::new("P", "Project")
                .with_child(
                    SourceItem::new("C", "Composition")
                        .named("Main")
                        .with_child(
                            SourceItem::new("ctrl", "AVLayer").named("Control").with_child(
                                SourceItem::new("fx", "Effect").named("Amount"),
                            ),
                        )
                        .with_child(
                            SourceItem::new("L", "TextLayer").named("Title").with_child(
                                SourceItem::new("op", "Property").named("Opacity").with_child(
                                    SourceItem::new("x", "Expression").with_property(
                                        "expression_text",
                                        "thisComp.layer(\"Control\").effect(\"Amount\")(1) + thisComp.layer(1).opacity + comp(\"Gone\").duration",
                                    ),
                                ),
                            ),
                        ),
                ),
        );
        let g = map(&doc);
        let refs: Vec<_> = g
            .edges
            .iter()
            .filter(|e| e.edge_type == EdgeType::ReferencesInExpression)
            .map(|e| (e.to.as_str(), e.properties["reference_kind"].clone()))
            .collect();
        assert_eq!(
            refs,
            vec![("fx", Value::from("effect")), ("ctrl", Value::from("layer"))]
        );
        assert_eq!(g.unresolved_references, 1);
        let x = g.nodes.iter().find(|n| n.external_id == "x").unwrap();
        assert_eq!(
            x.properties()["unresolved_references"],
            Value::from(vec!["comp(\"Gone\")"])
        );
        assert!(g.issues.is_empty());
    }

    #[test]
    fn test_duplicate_ids_and_edges() {
        let mut doc = ProjectDocument::new(
            SourceItem::new("P", "Project")
                .with_child(SourceItem::new("C", "Composition"))
                .with_child(SourceItem::new("C", "Composition")),
        );
        doc.edges.push(SourceEdge {
            from: "P".into(),
            to: "C".into(),
            kind: "contains".into(),
            properties: Default::default(),
        });
        let g = map(&doc);
        assert_eq!(g.nodes.len(), 2);
        assert_eq!(g.edges.len(), 1);
        assert_eq!(g.issues.len(), 1);
    }

    #[test]
    fn test_derived_embedding_requests() {
        let g = map(&example());
        let fields: Vec<_> = g.embeddings.iter().map(|r| (r.external_id.as_str(), r.field.as_str())).collect();
        assert_eq!(fields, vec![("P", "name"), ("C", "name"), ("T", "name"), ("A", "name"), ("F", "name")]);
    }
}
