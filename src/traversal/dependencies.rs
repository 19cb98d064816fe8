//! Dependency, effect stack and expression walks.

use hashbrown::HashSet;

use super::{
    Dependencies, DependencyEntry, EffectEntry, EffectProperty, EffectsChain, ExpressionDependencies,
    ExpressionInfo, ExpressionReferenceEntry, GraphWalker, NodeRef, QueryResult, decode,
};
use crate::model::{Direction, Node, NodeId, Value};
use crate::schema::{EdgeType, Entity, NodeType};
use crate::session::Session;
use crate::storage::StorageBackend;

/// What a node depends on.
const OUTGOING: [EdgeType; 2] = [EdgeType::UsesSource, EdgeType::DrivesWithExpression];
/// What depends on a node.
const INCOMING: [EdgeType; 3] = [EdgeType::UsesSource, EdgeType::DrivesWithExpression, EdgeType::ParentsTo];

impl<B: StorageBackend> GraphWalker<'_, B> {
    /// Breadth-first over dependency edges, `max_depth` hops at most.
    ///
    /// `direction` is `incoming`, `outgoing` or `both`.
    pub async fn walk_dependencies(
        &self,
        node_id: &str,
        direction: &str,
        max_depth: usize,
    ) -> QueryResult<Dependencies> {
        let direction: Direction = direction.parse()?;
        self.check_depth(max_depth)?;
        let (session, start) = self.start(node_id, |_| true, "any node").await?;

        let outgoing = if matches!(direction, Direction::Outgoing | Direction::Both) {
            expand(&session, &start, Direction::Outgoing, &OUTGOING, max_depth).await?
        } else {
            Vec::new()
        };
        let incoming = if matches!(direction, Direction::Incoming | Direction::Both) {
            expand(&session, &start, Direction::Incoming, &INCOMING, max_depth).await?
        } else {
            Vec::new()
        };

        Ok(Dependencies {
            node: NodeRef::from(&start),
            direction,
            max_depth,
            incoming,
            outgoing,
        })
    }

    /// Effects on a layer in stack order, optionally with their properties.
    pub async fn walk_effects_chain(
        &self,
        layer_id: &str,
        include_properties: bool,
    ) -> QueryResult<EffectsChain> {
        let (session, layer) = self.start(layer_id, NodeType::is_layer, "a layer").await?;

        let mut effects = Vec::new();
        for (_, node) in session.neighbours(layer.id, Direction::Outgoing, EdgeType::Contains).await? {
            let Some(Entity::Effect(fx)) = decode(&node) else { continue };
            let properties = if include_properties {
                Some(self.effect_properties(&session, node.id).await?)
            } else {
                None
            };
            effects.push(EffectEntry {
                node: NodeRef::from(&node),
                match_name: fx.match_name,
                enabled: fx.enabled,
                index: fx.index,
                category: fx.category,
                properties,
            });
        }
        effects.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.node.id.cmp(&b.node.id)));

        Ok(EffectsChain { layer: NodeRef::from(&layer), effects })
    }

    async fn effect_properties(
        &self,
        session: &Session<'_, B>,
        effect: NodeId,
    ) -> QueryResult<Vec<EffectProperty>> {
        let mut out = Vec::new();
        let mut visited: HashSet<NodeId> = [effect].into_iter().collect();
        let mut frontier = vec![effect];

        for _ in 0..self.config.max_depth {
            let mut next = Vec::new();
            for id in frontier {
                for (_, child) in session.neighbours(id, Direction::Outgoing, EdgeType::Contains).await? {
                    if !child.node_type.is_property_like() || !visited.insert(child.id) {
                        continue;
                    }
                    next.push(child.id);
                    if child.node_type == NodeType::Property {
                        let keyframes = session
                            .relationships(child.id, Direction::Outgoing, Some(EdgeType::HasKeyframe))
                            .await?
                            .len();
                        out.push(EffectProperty {
                            node: NodeRef::from(&child),
                            value: child.get("value").cloned().unwrap_or(Value::Null),
                            keyframes,
                        });
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        Ok(out)
    }

    /// The expression driving a property and what that expression references.
    pub async fn walk_expression_dependencies(
        &self,
        property_id: &str,
    ) -> QueryResult<ExpressionDependencies> {
        let (session, property) = self
            .start(property_id, NodeType::is_property_like, "a property")
            .await?;

        let mut drivers: Vec<Node> = session
            .neighbours(property.id, Direction::Incoming, EdgeType::DrivesWithExpression)
            .await?
            .into_iter()
            .map(|(_, n)| n)
            .filter(|n| n.node_type == NodeType::Expression)
            .collect();
        drivers.sort_by_key(|n| n.id);

        let Some(expr_node) = drivers.into_iter().next() else {
            return Ok(ExpressionDependencies {
                property: NodeRef::from(&property),
                expression: None,
                references: Vec::new(),
            });
        };

        let Some(Entity::Expression(expr)) = decode(&expr_node) else {
            return Ok(ExpressionDependencies {
                property: NodeRef::from(&property),
                expression: None,
                references: Vec::new(),
            });
        };

        let unresolved_references = expr_node
            .get("unresolved_references")
            .and_then(Value::as_list)
            .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();

        let references = session
            .neighbours(expr_node.id, Direction::Outgoing, EdgeType::ReferencesInExpression)
            .await?
            .into_iter()
            .map(|(rel, target)| ExpressionReferenceEntry {
                target: NodeRef::from(&target),
                reference_kind: rel
                    .properties
                    .get("reference_kind")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                token: rel
                    .properties
                    .get("token")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect();

        Ok(ExpressionDependencies {
            property: NodeRef::from(&property),
            expression: Some(ExpressionInfo {
                id: expr_node.external_id.clone(),
                text: expr.expression_text,
                language: expr.language,
                enabled: expr.enabled,
                unresolved_references,
            }),
            references,
        })
    }
}

/// Level-by-level expansion over `edges` in one direction.
async fn expand<B: StorageBackend>(
    session: &Session<'_, B>,
    start: &Node,
    dir: Direction,
    edges: &[EdgeType],
    max_depth: usize,
) -> QueryResult<Vec<DependencyEntry>> {
    let mut out = Vec::new();
    let mut visited: HashSet<NodeId> = [start.id].into_iter().collect();
    let mut frontier = vec![start.clone()];

    for depth in 1..=max_depth {
        let mut next = Vec::new();
        for from in &frontier {
            for &edge in edges {
                for (_, node) in session.neighbours(from.id, dir, edge).await? {
                    if !visited.insert(node.id) {
                        continue;
                    }
                    out.push(DependencyEntry {
                        node: NodeRef::from(&node),
                        relationship: edge,
                        depth,
                        via: from.external_id.clone(),
                    });
                    next.push(node);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    Ok(out)
}
