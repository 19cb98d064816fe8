//! Configuration (TOML, every field defaulted).
//!
//! ```toml
//! [ingestion]
//! similarity_threshold = 0.7
//! embedding_concurrency = 8
//!
//! [traversal]
//! default_depth = 2
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub ingestion: IngestionConfig,
    pub traversal: TraversalConfig,
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Pairs strictly above this cosine similarity get a similarity edge.
    pub similarity_threshold: f64,
    /// Cap on nodes compared per similarity bucket.
    pub max_bucket_size: Option<usize>,
    /// Concurrent calls to the embedding service.
    pub embedding_concurrency: usize,
    /// Field whose vectors produce `SIMILAR_NAME`.
    pub primary_field: String,
    /// Vectors on other fields produce `SIMILAR_FUNCTION`.
    pub function_similarity: bool,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
            max_bucket_size: Some(4096),
            embedding_concurrency: 8,
            primary_field: "name".into(),
            function_similarity: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalConfig {
    pub default_depth: usize,
    pub max_depth: usize,
    /// Seconds within which a keyframe counts as "at" a time.
    pub keyframe_epsilon: f64,
    /// Weight of structural overlap in `find_similar_setups`.
    pub structural_weight: f64,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            default_depth: 2,
            max_depth: 8,
            keyframe_epsilon: 0.001,
            structural_weight: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { dimension: 768 }
    }
}

impl GraphConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: GraphConfig =
            toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        let i = &self.ingestion;
        let t = &self.traversal;
        let checks = [
            ((0.0..=1.0).contains(&i.similarity_threshold), "ingestion.similarity_threshold must be within [0, 1]"),
            (i.max_bucket_size != Some(0), "ingestion.max_bucket_size must be positive"),
            (i.embedding_concurrency > 0, "ingestion.embedding_concurrency must be positive"),
            (!i.primary_field.is_empty(), "ingestion.primary_field must not be empty"),
            (t.max_depth > 0, "traversal.max_depth must be positive"),
            (
                (1..=t.max_depth).contains(&t.default_depth),
                "traversal.default_depth must be within [1, max_depth]",
            ),
            (t.keyframe_epsilon >= 0.0, "traversal.keyframe_epsilon must not be negative"),
            ((0.0..=1.0).contains(&t.structural_weight), "traversal.structural_weight must be within [0, 1]"),
            (self.embedding.dimension > 0, "embedding.dimension must be positive"),
        ];
        match checks.iter().find(|(ok, _)| !ok) {
            Some((_, message)) => Err(Error::Config((*message).to_string())),
            None => Ok(()),
        }
    }
}
