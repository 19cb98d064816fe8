//! # aegraph — After Effects project graph
//!
//! Ingests an exported After Effects project (compositions, layers, effects,
//! properties, keyframes, expressions) into a typed property graph, adds
//! similarity edges from text embeddings, and answers structural questions
//! by walking the graph.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `StorageBackend` is the contract between walks and storage
//! 2. **Clean DTOs**: `Node`, `Relationship`, `Value` cross all boundaries
//! 3. **Best-effort ingestion**: per-item failures are report entries, not errors
//! 4. **Bounded walks**: every traversal is depth-limited and cycle-safe
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use aegraph::{HashingEmbedder, ProjectGraph};
//!
//! # async fn example(json: &str) -> aegraph::Result<()> {
//! let graph = ProjectGraph::open_memory()
//!     .await?
//!     .with_embedder(Arc::new(HashingEmbedder::new(256)));
//!
//! let report = graph.ingest_json(json).await?;
//! println!("{} nodes, {} errors", report.nodes_created, report.errors);
//!
//! let walker = graph.walker();
//! let active = walker.walk_time_relationships(2.5, None).await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod schema;
pub mod storage;
pub mod tx;
pub mod index;
pub mod session;
pub mod expression;
pub mod embedding;
pub mod similarity;
pub mod ingest;
pub mod traversal;
pub mod config;

use std::sync::Arc;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Node, Relationship, Path, Value, PropertyMap,
    NodeId, RelId, Direction,
};

pub use schema::{EdgeType, Entity, GraphEntity, NodeType, SimilarityClass, TypeRegistry};

// ============================================================================
// Re-exports: Storage
// ============================================================================

pub use storage::{ConstraintType, MemoryBackend, StorageBackend};
pub use tx::{Transaction, TxMode, TxId};
pub use session::{Session, SessionId};

// ============================================================================
// Re-exports: Pipeline
// ============================================================================

pub use config::GraphConfig;
pub use embedding::{EmbedError, EmbeddingAdapter, EmbeddingService, HashingEmbedder};
pub use ingest::{IngestIssue, IngestionOrchestrator, IngestionReport, IngestionState, ProjectDocument};
pub use traversal::{GraphWalker, QueryError, QueryResult};

// ============================================================================
// Top-level handle
// ============================================================================

/// The primary entry point. A `ProjectGraph` wraps a storage backend, the
/// configuration and an optional embedding service.
pub struct ProjectGraph<B: StorageBackend> {
    backend: B,
    config: GraphConfig,
    embedder: Option<Arc<EmbeddingAdapter>>,
}

impl<B: StorageBackend> ProjectGraph<B> {
    /// Create a graph over the given backend with default configuration.
    pub fn with_backend(backend: B) -> Self {
        Self { backend, config: GraphConfig::default(), embedder: None }
    }

    pub fn with_config(mut self, config: GraphConfig) -> Self {
        self.config = config;
        self
    }

    /// Without an embedder, ingestion skips vectors and similarity edges.
    pub fn with_embedder(mut self, service: Arc<dyn EmbeddingService>) -> Self {
        self.embedder = Some(Arc::new(EmbeddingAdapter::new(service)));
        self
    }

    /// Ingest one exported project.
    pub async fn ingest(&self, doc: &ProjectDocument) -> Result<IngestionReport> {
        let mut orchestrator = IngestionOrchestrator::new(&self.backend, self.config.ingestion.clone());
        if let Some(embedder) = &self.embedder {
            orchestrator = orchestrator.with_embedder(embedder);
        }
        orchestrator.run(doc).await
    }

    /// Parse exporter JSON (envelope optional) and ingest it.
    pub async fn ingest_json(&self, text: &str) -> Result<IngestionReport> {
        let doc = ProjectDocument::from_json_str(text)?;
        self.ingest(&doc).await
    }

    /// Read-only traversal engine over this graph.
    pub fn walker(&self) -> GraphWalker<'_, B> {
        GraphWalker::new(&self.backend, &self.config.traversal)
            .with_primary_field(&self.config.ingestion.primary_field)
            .with_embedder(self.embedder.as_deref())
    }

    /// Access the underlying backend (for advanced use).
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn embedder(&self) -> Option<&EmbeddingAdapter> {
        self.embedder.as_deref()
    }
}

/// In-memory graph for testing and embedding.
impl ProjectGraph<MemoryBackend> {
    pub async fn open_memory() -> Result<Self> {
        Ok(Self::with_backend(MemoryBackend::new()))
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Expression syntax error at position {position}: {message}")]
    SyntaxError { position: usize, message: String },

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Transaction error: {0}")]
    TxError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
