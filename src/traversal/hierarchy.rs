//! Containment walks: down from a composition, up from a layer.

use std::collections::VecDeque;

use hashbrown::{HashMap, HashSet};
use tracing::debug;

use super::{
    CompositionHierarchy, GraphWalker, HierarchyLayer, HierarchyProperty, KeyframeSummary, NodeRef,
    QueryResult, RenderMarker, RenderPath, RenderStep, container, decode, keyframes,
};
use crate::model::{Direction, Node, NodeId, Path, Value};
use crate::schema::{EdgeType, Entity, NodeType};
use crate::storage::StorageBackend;

/// Property tree gathered level by level, assembled afterwards.
#[derive(Default)]
struct PropertyTree {
    children: HashMap<NodeId, Vec<Node>>,
    keyframes: HashMap<NodeId, Vec<KeyframeSummary>>,
}

impl PropertyTree {
    fn build(&self, node: &Node, seen: &mut HashSet<NodeId>) -> HierarchyProperty {
        let children = self
            .children
            .get(&node.id)
            .map(|kids| {
                kids.iter()
                    .filter(|k| seen.insert(k.id))
                    .collect::<Vec<_>>()
                    .into_iter()
                    .map(|k| self.build(k, seen))
                    .collect()
            })
            .unwrap_or_default();

        HierarchyProperty {
            node: NodeRef::from(node),
            value: node.get("value").cloned().unwrap_or(Value::Null),
            children,
            keyframes: self.keyframes.get(&node.id).cloned().unwrap_or_default(),
        }
    }
}

impl<B: StorageBackend> GraphWalker<'_, B> {
    /// Layers of a composition; with `depth >= 2` their property groups and
    /// properties; with `depth >= 3` the keyframes of those properties.
    pub async fn walk_composition_hierarchy(
        &self,
        comp_id: &str,
        depth: usize,
    ) -> QueryResult<CompositionHierarchy> {
        self.check_depth(depth)?;
        let (session, comp) = self
            .start(comp_id, |t| t == NodeType::Composition, "Composition")
            .await?;

        let mut visited: HashSet<NodeId> = HashSet::new();
        visited.insert(comp.id);

        let mut layers: Vec<(Node, HierarchyLayer)> = Vec::new();
        for (_, node) in session.neighbours(comp.id, Direction::Outgoing, EdgeType::Contains).await? {
            if !node.node_type.is_layer() || !visited.insert(node.id) {
                continue;
            }
            let Some(Entity::Layer(attrs)) = decode(&node) else { continue };
            let entry = HierarchyLayer {
                node: NodeRef::from(&node),
                index: attrs.index,
                in_point: attrs.in_point,
                out_point: attrs.out_point,
                enabled: attrs.enabled,
                properties: Vec::new(),
            };
            layers.push((node, entry));
        }
        layers.sort_by_key(|(_, l)| l.index);

        if depth >= 2 {
            for (layer, entry) in &mut layers {
                let mut tree = PropertyTree::default();
                let mut roots = Vec::new();
                let mut frontier = vec![layer.id];

                // Nested groups are bounded by the configured maximum.
                for level in 0..self.config.max_depth {
                    let mut next = Vec::new();
                    for parent in frontier {
                        for (_, child) in
                            session.neighbours(parent, Direction::Outgoing, EdgeType::Contains).await?
                        {
                            if !child.node_type.is_property_like() || visited.contains(&child.id) {
                                continue;
                            }
                            if depth >= 3 && child.node_type == NodeType::Property {
                                tree.keyframes.insert(child.id, keyframes(&session, child.id).await?);
                            }
                            next.push(child.id);
                            if level == 0 {
                                roots.push(child);
                            } else {
                                tree.children.entry(parent).or_default().push(child);
                            }
                        }
                    }
                    if next.is_empty() {
                        break;
                    }
                    frontier = next;
                }

                entry.properties = roots
                    .iter()
                    .filter(|r| visited.insert(r.id))
                    .collect::<Vec<_>>()
                    .into_iter()
                    .map(|r| tree.build(r, &mut visited))
                    .collect();
            }
        }

        debug!(comp = comp_id, depth, layers = layers.len(), "hierarchy walked");
        Ok(CompositionHierarchy {
            composition: NodeRef::from(&comp),
            depth,
            layers: layers.into_iter().map(|(_, l)| l).collect(),
        })
    }

    /// Layer → composition → render queue item.
    ///
    /// When the layer's composition is not rendered directly, compositions
    /// using it as a layer source are searched (nearest first, bounded by
    /// the configured maximum depth). Without any render queue entry the
    /// result is the one-hop path to the composition plus a marker.
    pub async fn trace_render_path(&self, layer_id: &str) -> QueryResult<RenderPath> {
        let (session, layer) = self.start(layer_id, NodeType::is_layer, "a layer").await?;

        let Some(comp) = container(&session, layer.id, |t| t == NodeType::Composition).await? else {
            return Ok(RenderPath {
                layer: NodeRef::from(&layer),
                render_path: steps(&Path::single(layer.clone())),
                render_queue_item: None,
                marker: Some(RenderMarker::NoRenderQueueEntry),
            });
        };

        let mut base = Path::single(layer.clone());
        if let Some((rel, _)) = session
            .neighbours(layer.id, Direction::Incoming, EdgeType::Contains)
            .await?
            .into_iter()
            .find(|(_, n)| n.id == comp.id)
        {
            base.append(rel, comp.clone());
        }

        let mut visited = HashSet::new();
        visited.insert(comp.id);
        let mut queue = VecDeque::from([(base.clone(), 0usize)]);

        while let Some((path, level)) = queue.pop_front() {
            let current = path.end().id;
            if let Some((rel, rq)) = session
                .neighbours(current, Direction::Incoming, EdgeType::Renders)
                .await?
                .into_iter()
                .find(|(_, n)| n.node_type == NodeType::RenderQueueItem)
            {
                let mut found = path;
                found.append(rel, rq.clone());
                return Ok(RenderPath {
                    layer: NodeRef::from(&layer),
                    render_path: steps(&found),
                    render_queue_item: Some(NodeRef::from(&rq)),
                    marker: None,
                });
            }
            if level >= self.config.max_depth {
                continue;
            }

            // Precomp: a layer elsewhere uses this composition as its source.
            for (use_rel, user) in session.neighbours(current, Direction::Incoming, EdgeType::UsesSource).await? {
                if !user.node_type.is_layer() {
                    continue;
                }
                let Some((contain_rel, outer)) = session
                    .neighbours(user.id, Direction::Incoming, EdgeType::Contains)
                    .await?
                    .into_iter()
                    .find(|(_, n)| n.node_type == NodeType::Composition)
                else {
                    continue;
                };
                if !visited.insert(outer.id) {
                    continue;
                }
                let mut extended = path.clone();
                extended.append(use_rel, user);
                extended.append(contain_rel, outer);
                queue.push_back((extended, level + 1));
            }
        }

        debug!(layer = layer_id, "no render queue entry");
        Ok(RenderPath {
            layer: NodeRef::from(&layer),
            render_path: steps(&base),
            render_queue_item: None,
            marker: Some(RenderMarker::NoRenderQueueEntry),
        })
    }
}

fn steps(path: &Path) -> Vec<RenderStep> {
    path.nodes
        .iter()
        .enumerate()
        .map(|(i, node)| RenderStep {
            step: i + 1,
            node: NodeRef::from(node),
            via: i.checked_sub(1).and_then(|r| path.relationships.get(r)).map(|r| r.rel_type),
        })
        .collect()
}
