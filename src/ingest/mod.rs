//! # Ingestion
//!
//! Source document → typed records → store.
//!
//! | Module | Role |
//! |--------|------|
//! | `document` | exporter JSON (envelope optional) |
//! | `mapper` | depth-first walk emitting node, edge and embedding records |
//! | `orchestrator` | phased materialization, embeddings, similarity |
//! | `report` | counters, per-item issues, run state |

pub mod document;
pub mod mapper;
pub mod orchestrator;
pub mod report;

pub use document::{EmbeddingContent, ProjectDocument, SourceEdge, SourceItem};
pub use mapper::{EdgeRecord, EmbeddingRequest, GraphMapper, MappedGraph, NodeRecord};
pub use orchestrator::IngestionOrchestrator;
pub use report::{ErrorBreakdown, IngestIssue, IngestionReport, IngestionState};
