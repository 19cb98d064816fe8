//! Ingestion outcome: per-item issues, counters and run state.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Orchestrator state machine.
///
/// ```text
/// Idle → SchemaReady → NodesMaterialized → EdgesMaterialized
///      → EmbeddingsComputed → SimilarityComputed → Done
///   (any) ──fatal──▶ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionState {
    Idle,
    SchemaReady,
    NodesMaterialized,
    EdgesMaterialized,
    EmbeddingsComputed,
    SimilarityComputed,
    Done,
    Failed,
}

/// A non-fatal failure, recorded and skipped.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IngestIssue {
    /// Unknown edge kind, missing required field, malformed attribute.
    #[error("mapping failed for '{id}': {reason}")]
    Mapping { id: String, reason: String },

    #[error("embedding skipped for '{id}.{field}': {reason}")]
    Embedding { id: String, field: String, reason: String },

    /// An edge endpoint is neither in the document nor in the store.
    #[error("{edge_type} {from} -> {to} dropped: '{missing}' not found")]
    EdgeResolution { edge_type: String, from: String, to: String, missing: String },

    #[error("node '{id}' not written: {reason}")]
    NodeWrite { id: String, reason: String },

    #[error("{edge_type} {from} -> {to} not written: {reason}")]
    EdgeWrite { edge_type: String, from: String, to: String, reason: String },
}

/// Issue count per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ErrorBreakdown {
    pub mapping: usize,
    pub embedding: usize,
    pub edge_resolution: usize,
    pub node_write: usize,
    pub edge_write: usize,
}

impl ErrorBreakdown {
    pub fn record(&mut self, issue: &IngestIssue) {
        match issue {
            IngestIssue::Mapping { .. } => self.mapping += 1,
            IngestIssue::Embedding { .. } => self.embedding += 1,
            IngestIssue::EdgeResolution { .. } => self.edge_resolution += 1,
            IngestIssue::NodeWrite { .. } => self.node_write += 1,
            IngestIssue::EdgeWrite { .. } => self.edge_write += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.mapping + self.embedding + self.edge_resolution + self.node_write + self.edge_write
    }
}

/// Result of one ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub nodes_created: usize,
    /// Existing external ids whose attributes were replaced.
    pub nodes_updated: usize,
    pub edges_created: usize,
    /// Derived or explicit edges already present in the store.
    pub edges_skipped_existing: usize,
    /// `CONTAINS` edges removed because their item moved to another container.
    pub edges_replaced: usize,
    pub similarity_edges_created: usize,
    pub embeddings_generated: usize,
    pub errors: usize,
    pub error_breakdown: ErrorBreakdown,
    pub issues: Vec<IngestIssue>,
    /// Expression references that matched no item (not counted as errors).
    pub unresolved_references: usize,
    pub state: IngestionState,
    pub started_at: DateTime<Utc>,
    pub elapsed_seconds: f64,
}

impl IngestionReport {
    pub(crate) fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            nodes_created: 0,
            nodes_updated: 0,
            edges_created: 0,
            edges_skipped_existing: 0,
            edges_replaced: 0,
            similarity_edges_created: 0,
            embeddings_generated: 0,
            errors: 0,
            error_breakdown: ErrorBreakdown::default(),
            issues: Vec::new(),
            unresolved_references: 0,
            state: IngestionState::Idle,
            started_at,
            elapsed_seconds: 0.0,
        }
    }

    pub(crate) fn record(&mut self, issue: IngestIssue) {
        self.error_breakdown.record(&issue);
        self.errors = self.error_breakdown.total();
        self.issues.push(issue);
    }

    /// Best-effort success: the run reached `Done`, whatever the error count.
    pub fn is_success(&self) -> bool {
        self.state == IngestionState::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakdown_totals() {
        let mut report = IngestionReport::new(Utc::now());
        report.record(IngestIssue::Mapping { id: "k".into(), reason: "no time".into() });
        report.record(IngestIssue::EdgeResolution {
            edge_type: "USES_SOURCE".into(),
            from: "A".into(),
            to: "missing".into(),
            missing: "missing".into(),
        });
        assert_eq!(report.errors, 2);
        assert_eq!(report.error_breakdown.edge_resolution, 1);
        assert!(!report.is_success());
    }

    #[test]
    fn test_issue_serialization() {
        let issue = IngestIssue::Embedding { id: "L1".into(), field: "name".into(), reason: "x".into() };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["kind"], "embedding");
        assert_eq!(issue.to_string(), "embedding skipped for 'L1.name': x");
    }
}
