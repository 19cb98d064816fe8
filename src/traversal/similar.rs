//! Similarity-driven walks.

use std::collections::BTreeSet;

use hashbrown::HashMap;

use super::{
    GraphWalker, LayerSubtree, NodeRef, QueryError, QueryResult, RelatedByName, RelatedNode,
    SimilarSetup, SimilarSetups, check_threshold, invalid, layer_subtree,
};
use crate::model::{Direction, Node, NodeId};
use crate::schema::{EdgeType, Entity, NodeType};
use crate::session::Session;
use crate::similarity::cosine_similarity;
use crate::storage::StorageBackend;

/// Effect match names and property group names of a layer.
#[derive(Debug, Default)]
struct Features {
    effects: BTreeSet<String>,
    groups: BTreeSet<String>,
}

impl Features {
    fn of(subtree: &LayerSubtree) -> Self {
        let effects = subtree
            .effects
            .iter()
            .map(|n| match Entity::decode(n.node_type, &n.properties) {
                Ok(Entity::Effect(fx)) => fx.match_name,
                _ => n.name().to_string(),
            })
            .collect();
        let groups = subtree
            .properties
            .iter()
            .filter(|n| n.node_type == NodeType::PropertyGroup)
            .map(|n| n.name().to_string())
            .collect();
        Self { effects, groups }
    }

    fn is_empty(&self) -> bool {
        self.effects.is_empty() && self.groups.is_empty()
    }
}

/// Jaccard index over both feature sets together; 0 when both are empty.
fn jaccard(a: &Features, b: &Features) -> f64 {
    let shared = a.effects.intersection(&b.effects).count() + a.groups.intersection(&b.groups).count();
    let union = a.effects.union(&b.effects).count() + a.groups.union(&b.groups).count();
    if union == 0 { 0.0 } else { shared as f64 / union as f64 }
}

impl<B: StorageBackend> GraphWalker<'_, B> {
    /// Layers set up like the reference layer.
    ///
    /// Candidates are scored by the overlap of their effects and property
    /// groups with the reference. For candidates joined to the reference by
    /// a `SIMILAR_*` edge the score blends that edge's similarity in:
    /// `w * structural + (1 - w) * embedding`, `w` being
    /// `traversal.structural_weight`. Similarity neighbours whose edge score
    /// alone reaches the threshold are always included.
    pub async fn find_similar_setups(
        &self,
        layer_id: &str,
        threshold: f64,
    ) -> QueryResult<SimilarSetups> {
        check_threshold(threshold)?;
        let (mut session, reference) = self.start(layer_id, NodeType::is_layer, "a layer").await?;
        let w = self.config.structural_weight;

        let ref_features = Features::of(&layer_subtree(&session, reference.id, self.config.max_depth).await?);
        let embedding_scores = similarity_neighbours(&session, reference.id).await?;

        let mut candidates: Vec<Node> = Vec::new();
        for layer_type in NodeType::LAYERS {
            session.scan(layer_type).await?;
            candidates.extend(session.collect().await?);
        }
        candidates.sort_by_key(|n| n.id);

        let mut similar_setups = Vec::new();
        for candidate in candidates {
            if candidate.id == reference.id {
                continue;
            }
            let features = Features::of(&layer_subtree(&session, candidate.id, self.config.max_depth).await?);
            let structural = if ref_features.is_empty() && features.is_empty() {
                0.0
            } else {
                jaccard(&ref_features, &features)
            };
            let embedding = embedding_scores.get(&candidate.id).copied();
            let similarity = match embedding {
                Some(e) => w * structural + (1.0 - w) * e,
                None => structural,
            };

            if similarity < threshold && !embedding.is_some_and(|e| e >= threshold) {
                continue;
            }

            let mut matching_aspects = Vec::new();
            if embedding.is_some() {
                matching_aspects.push("name");
            }
            if ref_features.effects.intersection(&features.effects).next().is_some() {
                matching_aspects.push("effects");
            }
            if ref_features.groups.intersection(&features.groups).next().is_some() {
                matching_aspects.push("properties");
            }

            similar_setups.push(SimilarSetup {
                layer: NodeRef::from(&candidate),
                similarity,
                embedding_score: embedding,
                structural_score: structural,
                matching_aspects,
            });
        }
        similar_setups.sort_by(|a, b| {
            b.similarity.total_cmp(&a.similarity).then_with(|| a.layer.id.cmp(&b.layer.id))
        });

        Ok(SimilarSetups {
            reference_layer: NodeRef::from(&reference),
            similarity_threshold: threshold,
            similar_setups,
        })
    }

    /// Vector search: nodes whose primary embedding is closest to the term.
    pub async fn walk_related_by_name(
        &self,
        search_term: &str,
        node_types: Option<&[NodeType]>,
        limit: usize,
    ) -> QueryResult<RelatedByName> {
        if search_term.trim().is_empty() {
            return Err(invalid("search term must not be empty"));
        }
        if limit == 0 {
            return Err(invalid("limit must be positive"));
        }
        let Some(embedder) = self.embedder else {
            return Err(invalid("no embedding service configured"));
        };
        let query = embedder.embed_query(search_term).await.map_err(QueryError::from)?;

        let session = self.session().await?;
        let nodes = session.backend().all_nodes(session.tx()).await?;

        let mut results: Vec<RelatedNode> = nodes
            .iter()
            .filter(|n| node_types.is_none_or(|types| types.contains(&n.node_type)))
            .filter_map(|n| {
                n.embedding(&self.primary_field).map(|v| RelatedNode {
                    node: NodeRef::from(n),
                    similarity: cosine_similarity(&query, v),
                })
            })
            .collect();
        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity).then_with(|| a.node.id.cmp(&b.node.id)));
        results.truncate(limit);

        Ok(RelatedByName {
            search_term: search_term.to_string(),
            node_types: node_types.map(<[NodeType]>::to_vec),
            results,
        })
    }
}

/// Strongest `SIMILAR_*` score per neighbour, either direction.
async fn similarity_neighbours<B: StorageBackend>(
    session: &Session<'_, B>,
    node: NodeId,
) -> QueryResult<HashMap<NodeId, f64>> {
    let mut scores: HashMap<NodeId, f64> = HashMap::new();
    for edge in [EdgeType::SimilarName, EdgeType::SimilarFunction] {
        for rel in session.relationships(node, Direction::Both, Some(edge)).await? {
            let (Some(other), Some(score)) = (rel.other_node(node), rel.score()) else { continue };
            let entry = scores.entry(other).or_insert(score);
            *entry = entry.max(score);
        }
    }
    Ok(scores)
}
