//! Similarity edge computation.
//!
//! Nodes carrying a vector are bucketed by [`SimilarityClass`]; within a
//! bucket every unordered pair whose cosine similarity is strictly above the
//! threshold becomes one [`SimilarPair`], oriented from the node seen first
//! in source order to the later one.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::model::NodeId;
use crate::schema::{NodeType, SimilarityClass};

/// Cosine similarity of two vectors.
///
/// Zero-norm vectors and vectors of different length have similarity 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut na, mut nb) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (dot / (na.sqrt() * nb.sqrt())).clamp(-1.0, 1.0)
}

/// A node with the vector used for comparison.
#[derive(Debug, Clone)]
pub struct EmbeddedNode {
    pub id: NodeId,
    pub node_type: NodeType,
    pub vector: Vec<f32>,
}

/// Two nodes above threshold. `from` precedes `to` in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarPair {
    pub from: NodeId,
    pub to: NodeId,
    pub score: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct SimilarityComputer {
    threshold: f64,
    max_bucket_size: Option<usize>,
}

impl SimilarityComputer {
    pub fn new(threshold: f64) -> Self {
        Self { threshold, max_bucket_size: None }
    }

    /// Only the first `max` nodes of each bucket (input order) are compared.
    pub fn with_max_bucket_size(mut self, max: Option<usize>) -> Self {
        self.max_bucket_size = max;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// All pairs above threshold. `nodes` must be in source order.
    pub fn compute(&self, nodes: &[EmbeddedNode]) -> Vec<SimilarPair> {
        let mut buckets: BTreeMap<SimilarityClass, Vec<&EmbeddedNode>> = BTreeMap::new();
        for node in nodes {
            buckets.entry(node.node_type.similarity_class()).or_default().push(node);
        }

        let mut pairs = Vec::new();
        for (class, mut bucket) in buckets {
            if let Some(max) = self.max_bucket_size {
                if bucket.len() > max {
                    warn!(?class, size = bucket.len(), max, "similarity bucket truncated");
                    bucket.truncate(max);
                }
            }

            for (i, a) in bucket.iter().enumerate() {
                for b in &bucket[i + 1..] {
                    let score = cosine_similarity(&a.vector, &b.vector);
                    if score > self.threshold {
                        pairs.push(SimilarPair { from: a.id, to: b.id, score });
                    }
                }
            }
        }
        pairs
    }
}
