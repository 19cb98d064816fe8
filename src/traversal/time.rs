//! What is active at a point in time.

use hashbrown::HashSet;

use super::{
    ActiveExpression, ActiveLayer, GraphWalker, KeyframeHit, NearestKeyframes, NodeRef, QueryResult,
    TimeSlice, check_time, container, decode, keyframes, layer_subtree,
};
use crate::model::{Direction, Node};
use crate::schema::{EdgeType, Entity, NodeType};
use crate::storage::StorageBackend;

impl<B: StorageBackend> GraphWalker<'_, B> {
    /// Layers whose `[in_point, out_point]` contains `t` (inclusive), and
    /// for their animated properties: keyframes at `t` (within
    /// `keyframe_epsilon`), the nearest keyframe on either side, and the
    /// enabled expressions driving them.
    pub async fn walk_time_relationships(
        &self,
        t: f64,
        comp_id: Option<&str>,
    ) -> QueryResult<TimeSlice> {
        check_time(t)?;
        let eps = self.config.keyframe_epsilon;

        let (mut session, comp) = match comp_id {
            Some(id) => {
                let (session, comp) = self
                    .start(id, |ty| ty == NodeType::Composition, "Composition")
                    .await?;
                (session, Some(comp))
            }
            None => (self.session().await?, None),
        };

        let candidates: Vec<Node> = match &comp {
            Some(c) => {
                session.start(c.id).await?;
                session.out_step(EdgeType::Contains, None).await?;
                session.collect().await?.into_iter().filter(|n| n.node_type.is_layer()).collect()
            }
            None => {
                let mut all = Vec::new();
                for layer_type in NodeType::LAYERS {
                    session.scan(layer_type).await?;
                    all.extend(session.collect().await?);
                }
                all.sort_by_key(|n| n.id);
                all
            }
        };

        let mut slice = TimeSlice {
            time_seconds: t,
            composition: comp.as_ref().map(NodeRef::from),
            active_layers: Vec::new(),
            active_keyframes: Vec::new(),
            nearest_keyframes: Vec::new(),
            active_expressions: Vec::new(),
        };

        let mut seen_props = HashSet::new();
        for layer in candidates {
            let Some(Entity::Layer(attrs)) = decode(&layer) else { continue };
            if !attrs.is_active_at(t) {
                continue;
            }
            let owner = match &comp {
                Some(c) => Some(NodeRef::from(c)),
                None => container(&session, layer.id, |ty| ty == NodeType::Composition)
                    .await?
                    .as_ref()
                    .map(NodeRef::from),
            };
            slice.active_layers.push(ActiveLayer {
                node: NodeRef::from(&layer),
                in_point: attrs.in_point,
                out_point: attrs.out_point,
                composition: owner,
            });

            let subtree = layer_subtree(&session, layer.id, self.config.max_depth).await?;
            for property in subtree.properties {
                if property.node_type != NodeType::Property || !seen_props.insert(property.id) {
                    continue;
                }

                let track = keyframes(&session, property.id).await?;
                if !track.is_empty() {
                    let property_ref = NodeRef::from(&property);
                    slice.active_keyframes.extend(
                        track
                            .iter()
                            .filter(|k| (k.time - t).abs() <= eps)
                            .map(|k| KeyframeHit { property: property_ref.clone(), keyframe: k.clone() }),
                    );
                    slice.nearest_keyframes.push(NearestKeyframes {
                        property: property_ref,
                        before: track.iter().rev().find(|k| k.time < t - eps).cloned(),
                        after: track.iter().find(|k| k.time > t + eps).cloned(),
                    });
                }

                for (_, expr) in session
                    .neighbours(property.id, Direction::Incoming, EdgeType::DrivesWithExpression)
                    .await?
                {
                    let Some(Entity::Expression(x)) = decode(&expr) else { continue };
                    if x.enabled {
                        slice.active_expressions.push(ActiveExpression {
                            expression: NodeRef::from(&expr),
                            property: NodeRef::from(&property),
                            layer: NodeRef::from(&layer),
                        });
                    }
                }
            }
        }

        Ok(slice)
    }
}
