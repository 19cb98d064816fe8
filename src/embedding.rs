//! # Embedding Adapter
//!
//! Wraps an external text → vector service:
//!
//! - caches vectors per `(node, field)` so re-runs in the same process do
//!   not call the service again for unchanged text
//! - validates dimension and finiteness of every returned vector
//!
//! [`HashingEmbedder`] is an offline service (feature hashing over words and
//! character trigrams) for tests and for running without a model server.

use std::hash::Hasher;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::Mutex;
use tracing::debug;
use twox_hash::XxHash64;

/// Why a vector could not be produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EmbedError {
    #[error("embedding service failed: {0}")]
    Service(String),

    #[error("nothing to embed")]
    EmptyInput,

    #[error("expected a {expected}-dimensional vector, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("embedding contains non-finite values")]
    NonFinite,
}

/// External embedding model: `embed(text) -> vector` of fixed dimension.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbedError>;
}

// ============================================================================
// EmbeddingAdapter
// ============================================================================

struct CacheEntry {
    text_hash: u64,
    vector: Vec<f32>,
}

/// Caching, validating front of an [`EmbeddingService`].
pub struct EmbeddingAdapter {
    service: Arc<dyn EmbeddingService>,
    /// (external node id, field) → vector
    cache: Mutex<HashMap<(String, String), CacheEntry>>,
    service_calls: AtomicU64,
}

impl EmbeddingAdapter {
    pub fn new(service: Arc<dyn EmbeddingService>) -> Self {
        Self {
            service,
            cache: Mutex::new(HashMap::new()),
            service_calls: AtomicU64::new(0),
        }
    }

    pub fn dimension(&self) -> usize {
        self.service.dimension()
    }

    /// Vector for `text`, the content of `field` on node `node_id`.
    ///
    /// A cached vector is reused only while the text is unchanged.
    pub async fn embed(
        &self,
        node_id: &str,
        field: &str,
        text: &str,
    ) -> std::result::Result<Vec<f32>, EmbedError> {
        let key = (node_id.to_string(), field.to_string());
        let text_hash = hash_text(text);

        let hit = self
            .cache
            .lock()
            .get(&key)
            .filter(|entry| entry.text_hash == text_hash)
            .map(|entry| entry.vector.clone());
        if let Some(vector) = hit {
            debug!(node_id, field, "embedding cache hit");
            return Ok(vector);
        }

        let vector = self.embed_uncached(text).await?;
        self.cache.lock().insert(key, CacheEntry { text_hash, vector: vector.clone() });
        Ok(vector)
    }

    /// Vector for free text (search terms); never cached.
    pub async fn embed_query(&self, text: &str) -> std::result::Result<Vec<f32>, EmbedError> {
        self.embed_uncached(text).await
    }

    async fn embed_uncached(&self, text: &str) -> std::result::Result<Vec<f32>, EmbedError> {
        if text.trim().is_empty() {
            return Err(EmbedError::EmptyInput);
        }
        self.service_calls.fetch_add(1, Ordering::Relaxed);
        let vector = self.service.embed(text).await?;

        let expected = self.service.dimension();
        if vector.len() != expected {
            return Err(EmbedError::DimensionMismatch { expected, got: vector.len() });
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(EmbedError::NonFinite);
        }
        Ok(vector)
    }

    /// Number of times the underlying service was called.
    pub fn service_calls(&self) -> u64 {
        self.service_calls.load(Ordering::Relaxed)
    }

    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }
}

impl std::fmt::Debug for EmbeddingAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingAdapter")
            .field("dimension", &self.dimension())
            .field("cached", &self.cached())
            .finish()
    }
}

fn hash_text(text: &str) -> u64 {
    let mut h = XxHash64::with_seed(0);
    h.write(text.as_bytes());
    h.finish()
}

// ============================================================================
// HashingEmbedder
// ============================================================================

/// Offline embedder: signed feature hashing of lowercase words and their
/// character trigrams, L2-normalised.
///
/// Names that share words or spelling ("Title", "Title Copy") land close
/// together; unrelated names are near-orthogonal for large dimensions.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension: dimension.max(1) }
    }

    fn add(&self, v: &mut [f32], feature: &str, weight: f32) {
        let mut h = XxHash64::with_seed(0x5eed);
        h.write(feature.as_bytes());
        let hash = h.finish();
        let slot = (hash % self.dimension as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        v[slot] += sign * weight;
    }

    pub fn embed_sync(&self, text: &str) -> std::result::Result<Vec<f32>, EmbedError> {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        if words.is_empty() {
            return Err(EmbedError::EmptyInput);
        }

        let mut v = vec![0.0f32; self.dimension];
        for word in &words {
            self.add(&mut v, word, 1.0);
            let padded: Vec<char> = format!("#{word}#").chars().collect();
            for gram in padded.windows(3) {
                let gram: String = gram.iter().collect();
                self.add(&mut v, &gram, 0.5);
            }
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(v)
    }
}

#[async_trait]
impl EmbeddingService for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbedError> {
        self.embed_sync(text)
    }
}
