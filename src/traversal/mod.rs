//! # Traversal Engine
//!
//! Read-only walks over an ingested project graph, composed from the
//! [`Session`] single-hop primitives. Every walk opens its own session,
//! is bounded by a depth parameter and keeps a visited set, so cyclic
//! `USES_SOURCE` / `PARENTS_TO` / `RENDERS` structure always terminates.
//!
//! | Module | Walks |
//! |--------|-------|
//! | `hierarchy` | `walk_composition_hierarchy`, `trace_render_path` |
//! | `dependencies` | `walk_dependencies`, `walk_effects_chain`, `walk_expression_dependencies` |
//! | `time` | `walk_time_relationships` |
//! | `similar` | `find_similar_setups`, `walk_related_by_name` |
//! | `discovery` | `discover_unused_elements`, `graph_summary`, `schema_description` |
//! | `patterns` | `find_animation_patterns` |
//!
//! Nodes are addressed by their exporter id. Results are serde documents.

pub mod results;
mod hierarchy;
mod dependencies;
mod time;
mod similar;
mod discovery;
mod patterns;

use hashbrown::HashSet;

pub use patterns::{AnimationPattern, PatternQuery, classify_track};
pub use results::*;

use crate::config::TraversalConfig;
use crate::embedding::{EmbedError, EmbeddingAdapter};
use crate::model::{Direction, Node, NodeId};
use crate::schema::{EdgeType, Entity, NodeType};
use crate::session::Session;
use crate::storage::StorageBackend;
use crate::Error;

// ============================================================================
// Errors
// ============================================================================

/// Why a walk produced no result.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbedError),

    #[error("store error: {0}")]
    Store(#[source] Error),
}

impl From<Error> for QueryError {
    fn from(e: Error) -> Self {
        match e {
            Error::NotFound(what) => QueryError::NotFound(what),
            Error::InvalidArgument(why) => QueryError::InvalidArgument(why),
            other => QueryError::Store(other),
        }
    }
}

pub type QueryResult<T> = std::result::Result<T, QueryError>;

fn invalid(msg: impl Into<String>) -> QueryError {
    QueryError::InvalidArgument(msg.into())
}

// ============================================================================
// Walker
// ============================================================================

/// Entry point for every walk.
pub struct GraphWalker<'b, B: StorageBackend> {
    backend: &'b B,
    config: TraversalConfig,
    primary_field: String,
    embedder: Option<&'b EmbeddingAdapter>,
}

impl<'b, B: StorageBackend> GraphWalker<'b, B> {
    pub fn new(backend: &'b B, config: &TraversalConfig) -> Self {
        Self {
            backend,
            config: config.clone(),
            primary_field: "name".into(),
            embedder: None,
        }
    }

    /// Field whose vectors `walk_related_by_name` ranks.
    pub fn with_primary_field(mut self, field: impl Into<String>) -> Self {
        self.primary_field = field.into();
        self
    }

    pub fn with_embedder(mut self, embedder: Option<&'b EmbeddingAdapter>) -> Self {
        self.embedder = embedder;
        self
    }

    pub fn config(&self) -> &TraversalConfig {
        &self.config
    }

    async fn session(&self) -> QueryResult<Session<'b, B>> {
        Ok(Session::open(self.backend).await?)
    }

    /// Open a session positioned on `external_id`, checking its type.
    async fn start(
        &self,
        external_id: &str,
        accepts: impl Fn(NodeType) -> bool,
        expected: &str,
    ) -> QueryResult<(Session<'b, B>, Node)> {
        let mut session = self.session().await?;
        let node = session.start_at_external(external_id).await?;
        if !accepts(node.node_type) {
            return Err(invalid(format!(
                "'{external_id}' is a {}, expected {expected}",
                node.node_type
            )));
        }
        Ok((session, node))
    }

    // ========================================================================
    // Validation
    // ========================================================================

    fn check_depth(&self, depth: usize) -> QueryResult<()> {
        if depth == 0 || depth > self.config.max_depth {
            return Err(invalid(format!(
                "depth must be within [1, {}] (got {depth})",
                self.config.max_depth
            )));
        }
        Ok(())
    }
}

fn check_threshold(threshold: f64) -> QueryResult<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(invalid(format!("threshold must be within [0, 1] (got {threshold})")));
    }
    Ok(())
}

fn check_time(t: f64) -> QueryResult<()> {
    if !t.is_finite() {
        return Err(invalid(format!("time must be finite (got {t})")));
    }
    Ok(())
}

// ============================================================================
// Shared helpers
// ============================================================================

fn decode(node: &Node) -> Option<Entity> {
    Entity::decode(node.node_type, &node.properties).ok()
}

/// Effects and properties below a layer.
#[derive(Debug, Default)]
struct LayerSubtree {
    effects: Vec<Node>,
    /// Property and PropertyGroup nodes, including those under effects.
    properties: Vec<Node>,
}

/// `CONTAINS` descent from a layer through effects and property groups,
/// at most `max_depth` levels.
async fn layer_subtree<B: StorageBackend>(
    session: &Session<'_, B>,
    layer: NodeId,
    max_depth: usize,
) -> QueryResult<LayerSubtree> {
    let mut out = LayerSubtree::default();
    let mut visited = HashSet::new();
    visited.insert(layer);
    let mut frontier = vec![layer];

    for _ in 0..max_depth {
        let mut next = Vec::new();
        for id in frontier {
            for (_, child) in session.neighbours(id, Direction::Outgoing, EdgeType::Contains).await? {
                if !visited.insert(child.id) {
                    continue;
                }
                match child.node_type {
                    NodeType::Effect => {
                        next.push(child.id);
                        out.effects.push(child);
                    }
                    t if t.is_property_like() => {
                        next.push(child.id);
                        out.properties.push(child);
                    }
                    _ => {}
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

/// The node's `CONTAINS` parent, if it has one of the wanted type.
async fn container<B: StorageBackend>(
    session: &Session<'_, B>,
    node: NodeId,
    accepts: impl Fn(NodeType) -> bool,
) -> QueryResult<Option<Node>> {
    Ok(session
        .neighbours(node, Direction::Incoming, EdgeType::Contains)
        .await?
        .into_iter()
        .map(|(_, n)| n)
        .find(|n| accepts(n.node_type)))
}

/// Keyframes of a property, sorted by time. Undecodable ones are skipped.
async fn keyframes<B: StorageBackend>(
    session: &Session<'_, B>,
    property: NodeId,
) -> QueryResult<Vec<KeyframeSummary>> {
    let mut out: Vec<KeyframeSummary> = session
        .neighbours(property, Direction::Outgoing, EdgeType::HasKeyframe)
        .await?
        .into_iter()
        .filter_map(|(_, n)| KeyframeSummary::from_node(&n))
        .collect();
    out.sort_by(|a, b| a.time.total_cmp(&b.time));
    Ok(out)
}
