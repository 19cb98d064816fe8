//! Whole-graph scans: unused elements, summary, schema.

use std::collections::{BTreeMap, VecDeque};

use hashbrown::HashSet;

use super::{
    GraphSummary, GraphWalker, NodeRef, QueryResult, SchemaDescription, TopLevelComposition,
    UnusedElements, UnusedEntry, container, decode,
};
use crate::model::{Direction, NodeId};
use crate::schema::{EdgeType, Entity, NodeType};
use crate::storage::StorageBackend;

/// Names of the walks a [`GraphWalker`] offers.
pub const AVAILABLE_WALKS: [&str; 12] = [
    "walk_composition_hierarchy",
    "walk_dependencies",
    "walk_related_by_name",
    "walk_effects_chain",
    "walk_expression_dependencies",
    "walk_time_relationships",
    "find_similar_setups",
    "discover_unused_elements",
    "trace_render_path",
    "find_animation_patterns",
    "graph_summary",
    "schema_description",
];

impl<B: StorageBackend> GraphWalker<'_, B> {
    /// Footage no layer uses, compositions no render queue item reaches,
    /// disabled effects, and properties with neither keyframes nor an
    /// expression.
    ///
    /// A composition is reached when a render queue item renders it, or a
    /// layer inside a reached composition uses it as its source.
    pub async fn discover_unused_elements(&self) -> QueryResult<UnusedElements> {
        let mut session = self.session().await?;
        let mut out = UnusedElements::default();

        session.scan(NodeType::FootageItem).await?;
        for footage in session.collect().await? {
            let users = session
                .relationships(footage.id, Direction::Incoming, Some(EdgeType::UsesSource))
                .await?;
            if users.is_empty() {
                out.unused_footage.push(UnusedEntry {
                    node: NodeRef::from(&footage),
                    reason: "no_layer_references",
                    layer: None,
                });
            }
        }

        // Compositions reachable from the render queue.
        session.scan(NodeType::RenderQueueItem).await?;
        session.out_step(EdgeType::Renders, Some(NodeType::Composition)).await?;
        let mut reached: HashSet<NodeId> = HashSet::new();
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        for comp in session.collect().await? {
            if reached.insert(comp.id) {
                queue.push_back(comp.id);
            }
        }
        while let Some(comp) = queue.pop_front() {
            session.start(comp).await?;
            session.out_step(EdgeType::Contains, None).await?;
            session.out_step(EdgeType::UsesSource, Some(NodeType::Composition)).await?;
            for nested in session.collect().await? {
                if reached.insert(nested.id) {
                    queue.push_back(nested.id);
                }
            }
        }

        session.scan(NodeType::Composition).await?;
        for comp in session.collect().await? {
            if !reached.contains(&comp.id) {
                out.unused_compositions.push(UnusedEntry {
                    node: NodeRef::from(&comp),
                    reason: "not_in_render_queue",
                    layer: None,
                });
            }
        }

        session.scan(NodeType::Effect).await?;
        for effect in session.collect().await? {
            let Some(Entity::Effect(fx)) = decode(&effect) else { continue };
            if fx.enabled {
                continue;
            }
            let layer = container(&session, effect.id, NodeType::is_layer).await?;
            out.unused_effects.push(UnusedEntry {
                node: NodeRef::from(&effect),
                reason: "disabled",
                layer: layer.as_ref().map(NodeRef::from),
            });
        }

        session.scan(NodeType::Property).await?;
        for property in session.collect().await? {
            let keyed = !session
                .relationships(property.id, Direction::Outgoing, Some(EdgeType::HasKeyframe))
                .await?
                .is_empty();
            let driven = !session
                .relationships(property.id, Direction::Incoming, Some(EdgeType::DrivesWithExpression))
                .await?
                .is_empty();
            if !keyed && !driven {
                out.orphaned_properties.push(UnusedEntry {
                    node: NodeRef::from(&property),
                    reason: "no_keyframes_or_expressions",
                    layer: None,
                });
            }
        }

        session.close().await?;
        Ok(out)
    }

    /// Node and edge counts, and compositions not used as a layer source.
    pub async fn graph_summary(&self) -> QueryResult<GraphSummary> {
        let mut session = self.session().await?;
        let backend = session.backend();

        let total_nodes = backend.node_count(session.tx()).await?;
        let total_relationships = backend.relationship_count(session.tx()).await?;

        let mut node_counts = BTreeMap::new();
        for node_type in NodeType::ALL {
            let n = session.scan(node_type).await?;
            if n > 0 {
                node_counts.insert(node_type.label().to_string(), n);
            }
        }

        let mut edge_counts = BTreeMap::new();
        for edge_type in EdgeType::ALL {
            let n = backend.relationships_by_type(session.tx(), edge_type).await?.len();
            if n > 0 {
                edge_counts.insert(edge_type.label().to_string(), n);
            }
        }

        let mut top_level_compositions = Vec::new();
        session.scan(NodeType::Composition).await?;
        for comp in session.collect().await? {
            let used = !session
                .relationships(comp.id, Direction::Incoming, Some(EdgeType::UsesSource))
                .await?
                .is_empty();
            if used {
                continue;
            }
            let layers = session
                .neighbours(comp.id, Direction::Outgoing, EdgeType::Contains)
                .await?
                .iter()
                .filter(|(_, n)| n.node_type.is_layer())
                .count();
            top_level_compositions.push(TopLevelComposition { node: NodeRef::from(&comp), layers });
        }

        session.close().await?;
        Ok(GraphSummary {
            total_nodes,
            total_relationships,
            node_counts,
            edge_counts,
            top_level_compositions,
        })
    }

    /// Static description of the graph vocabulary and the walks.
    pub fn schema_description(&self) -> SchemaDescription {
        SchemaDescription {
            node_types: NodeType::ALL.iter().map(|t| t.label()).collect(),
            edge_types: EdgeType::ALL.iter().map(|t| t.label()).collect(),
            available_walks: AVAILABLE_WALKS.to_vec(),
        }
    }
}
