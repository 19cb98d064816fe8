//! Ingestion Orchestrator.
//!
//! ```text
//! begin_tx ─▶ schema ─▶ map ─▶ nodes ─┬─▶ edges ──────┬─▶ attach vectors ─▶ similarity ─▶ commit
//!                                     └─▶ embeddings ─┘
//! ```
//!
//! Every node is written (or marked failed) before any edge is: edges may
//! point forward in source order. Edge writing and embedding generation
//! overlap; similarity waits for both.
//!
//! Per-item failures become [`IngestIssue`]s. Only an unreachable store
//! (`StoreUnavailable`) or a failed schema setup (`SchemaError`) abort the
//! run, leaving the orchestrator in [`IngestionState::Failed`].

use std::time::Instant;

use chrono::Utc;
use futures::StreamExt;
use hashbrown::HashMap;
use parking_lot::Mutex;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::document::ProjectDocument;
use super::mapper::{EdgeRecord, EmbeddingRequest, GraphMapper, MappedGraph};
use super::report::{IngestIssue, IngestionReport, IngestionState};
use crate::config::IngestionConfig;
use crate::embedding::EmbeddingAdapter;
use crate::expression::{AeExpressionGrammar, ReferenceGrammar};
use crate::index::IndexType;
use crate::model::{Direction, NodeId, PropertyMap, Value, props};
use crate::schema::{EdgeType, NodeType, TypeSchema};
use crate::similarity::{EmbeddedNode, SimilarityComputer};
use crate::storage::{ConstraintType, StorageBackend};
use crate::tx::TxMode;
use crate::{Error, Result};

static DEFAULT_GRAMMAR: AeExpressionGrammar = AeExpressionGrammar;

pub struct IngestionOrchestrator<'a, B: StorageBackend> {
    backend: &'a B,
    config: IngestionConfig,
    embedder: Option<&'a EmbeddingAdapter>,
    grammar: &'a dyn ReferenceGrammar,
    state: Mutex<IngestionState>,
}

/// Outcome of writing edges; merged into the report after the join.
#[derive(Default)]
struct EdgeOutcome {
    created: usize,
    skipped_existing: usize,
    replaced: usize,
    issues: Vec<IngestIssue>,
}

enum EdgeWritten {
    /// `replaced` counts stale `CONTAINS` edges removed first.
    Created { replaced: usize },
    Existing,
    /// Carries the external id that matched no node.
    Unresolved(String),
}

type EmbeddingOutcome = Vec<(EmbeddingRequest, std::result::Result<Vec<f32>, crate::embedding::EmbedError>)>;

fn is_fatal(e: &Error) -> bool {
    matches!(e, Error::StoreUnavailable(_))
}

impl<'a, B: StorageBackend> IngestionOrchestrator<'a, B> {
    pub fn new(backend: &'a B, config: IngestionConfig) -> Self {
        Self {
            backend,
            config,
            embedder: None,
            grammar: &DEFAULT_GRAMMAR,
            state: Mutex::new(IngestionState::Idle),
        }
    }

    pub fn with_embedder(mut self, embedder: &'a EmbeddingAdapter) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_grammar(mut self, grammar: &'a dyn ReferenceGrammar) -> Self {
        self.grammar = grammar;
        self
    }

    pub fn state(&self) -> IngestionState {
        *self.state.lock()
    }

    fn transition(&self, report: &mut IngestionReport, next: IngestionState) {
        *self.state.lock() = next;
        report.state = next;
        info!(
            state = ?next,
            nodes_created = report.nodes_created,
            nodes_updated = report.nodes_updated,
            edges_created = report.edges_created,
            embeddings = report.embeddings_generated,
            errors = report.errors,
            "ingestion phase complete"
        );
    }

    fn fail(&self, e: Error) -> Error {
        *self.state.lock() = IngestionState::Failed;
        error!(error = %e, "ingestion aborted");
        e
    }

    /// Run one ingestion of `doc`.
    pub async fn run(&self, doc: &ProjectDocument) -> Result<IngestionReport> {
        let span = info_span!("ingest", project = %doc.project.id);
        self.run_inner(doc).instrument(span).await
    }

    async fn run_inner(&self, doc: &ProjectDocument) -> Result<IngestionReport> {
        let clock = Instant::now();
        let mut report = IngestionReport::new(Utc::now());
        *self.state.lock() = IngestionState::Idle;

        let mut tx = self
            .backend
            .begin_tx(TxMode::ReadWrite)
            .await
            .map_err(|e| self.fail(Error::StoreUnavailable(e.to_string())))?;

        if let Err(e) = self.write(&mut tx, doc, &mut report).await {
            if let Err(rollback) = self.backend.rollback_tx(tx).await {
                debug!(error = %rollback, "rollback after abort failed");
            }
            return Err(self.fail(e));
        }

        self.backend
            .commit_tx(tx)
            .await
            .map_err(|e| self.fail(Error::StoreUnavailable(e.to_string())))?;

        report.elapsed_seconds = clock.elapsed().as_secs_f64();
        self.transition(&mut report, IngestionState::Done);
        Ok(report)
    }

    /// Every phase up to commit. An `Err` here is fatal for the run.
    async fn write(&self, tx: &mut B::Tx, doc: &ProjectDocument, report: &mut IngestionReport) -> Result<()> {
        self.init_schema().await?;
        self.transition(report, IngestionState::SchemaReady);

        let mapped = GraphMapper::new(self.grammar).map(doc);
        let MappedGraph { nodes, edges, embeddings, issues, unresolved_references } = mapped;
        report.unresolved_references = unresolved_references;
        for issue in issues {
            report.record(issue);
        }

        // Phase 1: nodes. Builds the external id → NodeId map.
        let mut id_map: HashMap<String, NodeId> = HashMap::with_capacity(nodes.len());
        for record in &nodes {
            let props = record.properties();
            let existing = self.backend.node_by_external_id(tx, &record.external_id).await?;

            let written = match existing {
                Some(node) if node.node_type != record.node_type() => Err(Error::ConstraintViolation(format!(
                    "'{}' exists as {}, not {}",
                    record.external_id,
                    node.node_type,
                    record.node_type()
                ))),
                Some(node) => self
                    .backend
                    .replace_node_properties(tx, node.id, props)
                    .await
                    .map(|()| (node.id, false)),
                None => self
                    .backend
                    .create_node(tx, record.node_type(), &record.external_id, props)
                    .await
                    .map(|id| (id, true)),
            };

            match written {
                Ok((id, created)) => {
                    if created {
                        report.nodes_created += 1;
                    } else {
                        report.nodes_updated += 1;
                        debug!(id = %record.external_id, "node updated in place");
                    }
                    id_map.insert(record.external_id.clone(), id);
                }
                Err(e) if is_fatal(&e) => return Err(e),
                Err(e) => {
                    let issue = IngestIssue::NodeWrite { id: record.external_id.clone(), reason: e.to_string() };
                    warn!(%issue, "ingest issue");
                    report.record(issue);
                }
            }
        }
        self.transition(report, IngestionState::NodesMaterialized);

        // Phase 2: edges and embeddings, concurrently.
        let (edge_outcome, vectors) = futures::join!(
            self.materialize_edges(&mut *tx, &edges, &id_map),
            self.generate_embeddings(embeddings),
        );
        let edge_outcome = edge_outcome?;
        report.edges_created = edge_outcome.created;
        report.edges_skipped_existing = edge_outcome.skipped_existing;
        report.edges_replaced = edge_outcome.replaced;
        for issue in edge_outcome.issues {
            report.record(issue);
        }
        self.transition(report, IngestionState::EdgesMaterialized);

        for (request, result) in vectors {
            let issue = match (result, id_map.get(&request.external_id)) {
                (Ok(vector), Some(&id)) => {
                    match self.backend.set_node_embedding(tx, id, &request.field, vector).await {
                        Ok(()) => {
                            report.embeddings_generated += 1;
                            continue;
                        }
                        Err(e) if is_fatal(&e) => return Err(e),
                        Err(e) => e.to_string(),
                    }
                }
                (Ok(_), None) => "node was not materialized".to_string(),
                (Err(e), _) => e.to_string(),
            };
            let issue = IngestIssue::Embedding {
                id: request.external_id,
                field: request.field,
                reason: issue,
            };
            warn!(%issue, "ingest issue");
            report.record(issue);
        }
        self.transition(report, IngestionState::EmbeddingsComputed);

        // Phase 3: similarity over every vector in the store.
        self.compute_similarity(tx, report).await?;
        self.transition(report, IngestionState::SimilarityComputed);
        Ok(())
    }

    /// Indexes on exporter id and name for every type, a vector index on the
    /// primary embedded field, `Exists` constraints on every required attribute.
    async fn init_schema(&self) -> Result<()> {
        let schema_err = |e: Error| match e {
            Error::StoreUnavailable(_) => e,
            other => Error::SchemaError(other.to_string()),
        };

        for node_type in NodeType::ALL {
            self.backend
                .create_index(node_type, "external_id", IndexType::Unique)
                .await
                .map_err(schema_err)?;
            self.backend
                .create_index(node_type, "name", IndexType::BTree)
                .await
                .map_err(schema_err)?;
            self.backend
                .create_index(node_type, &self.config.primary_field, IndexType::Vector)
                .await
                .map_err(schema_err)?;
            for field in TypeSchema::for_type(node_type).required_fields() {
                self.backend
                    .create_constraint(node_type, field, ConstraintType::Exists)
                    .await
                    .map_err(schema_err)?;
            }
        }
        Ok(())
    }

    async fn materialize_edges(
        &self,
        tx: &mut B::Tx,
        edges: &[EdgeRecord],
        id_map: &HashMap<String, NodeId>,
    ) -> Result<EdgeOutcome> {
        let mut out = EdgeOutcome::default();

        for edge in edges {
            let issue = match self.write_edge(tx, edge, id_map).await {
                Ok(EdgeWritten::Created { replaced }) => {
                    out.created += 1;
                    out.replaced += replaced;
                    continue;
                }
                Ok(EdgeWritten::Existing) => {
                    out.skipped_existing += 1;
                    continue;
                }
                Ok(EdgeWritten::Unresolved(missing)) => IngestIssue::EdgeResolution {
                    edge_type: edge.edge_type.to_string(),
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                    missing,
                },
                Err(e) if is_fatal(&e) => return Err(e),
                Err(e) => edge_write_issue(edge.edge_type, &edge.from, &edge.to, &e),
            };
            warn!(%issue, "ingest issue");
            out.issues.push(issue);
        }
        Ok(out)
    }

    async fn write_edge(
        &self,
        tx: &mut B::Tx,
        edge: &EdgeRecord,
        id_map: &HashMap<String, NodeId>,
    ) -> Result<EdgeWritten> {
        let src = self.resolve_endpoint(tx, &edge.from, id_map).await?;
        let dst = self.resolve_endpoint(tx, &edge.to, id_map).await?;
        let (src, dst) = match (src, dst) {
            (Some(s), Some(d)) => (s, d),
            (None, _) => return Ok(EdgeWritten::Unresolved(edge.from.clone())),
            (_, None) => return Ok(EdgeWritten::Unresolved(edge.to.clone())),
        };

        if self.backend.find_relationship(tx, src, dst, edge.edge_type).await?.is_some() {
            return Ok(EdgeWritten::Existing);
        }

        // An item has at most one container: a moved item leaves its old one.
        let mut replaced = 0;
        if edge.edge_type == EdgeType::Contains {
            let stale = self
                .backend
                .get_relationships(tx, dst, Direction::Incoming, Some(EdgeType::Contains))
                .await?;
            for rel in stale {
                if self.backend.delete_relationship(tx, rel.id).await? {
                    debug!(item = %edge.to, old_parent = %rel.src, "item moved to a new container");
                    replaced += 1;
                }
            }
        }

        self.backend
            .create_relationship(tx, src, dst, edge.edge_type, edge.properties.clone())
            .await?;
        Ok(EdgeWritten::Created { replaced })
    }

    /// Document ids first, then nodes left in the store by earlier runs.
    async fn resolve_endpoint(
        &self,
        tx: &B::Tx,
        external_id: &str,
        id_map: &HashMap<String, NodeId>,
    ) -> Result<Option<NodeId>> {
        if let Some(&id) = id_map.get(external_id) {
            return Ok(Some(id));
        }
        Ok(self.backend.node_by_external_id(tx, external_id).await?.map(|n| n.id))
    }

    async fn generate_embeddings(&self, requests: Vec<EmbeddingRequest>) -> EmbeddingOutcome {
        let Some(embedder) = self.embedder else {
            if !requests.is_empty() {
                debug!(count = requests.len(), "no embedder configured, skipping vectors");
            }
            return Vec::new();
        };

        let mut results: Vec<(usize, EmbeddingRequest, _)> = futures::stream::iter(requests.into_iter().enumerate())
            .map(move |(i, request)| async move {
                let result = embedder.embed(&request.external_id, &request.field, &request.text).await;
                (i, request, result)
            })
            .buffer_unordered(self.config.embedding_concurrency.max(1))
            .collect()
            .await;

        results.sort_by_key(|(i, _, _)| *i);
        results.into_iter().map(|(_, request, result)| (request, result)).collect()
    }

    /// Similarity edges for every embedded field. Store errors on a single
    /// pair are recorded and the pair skipped.
    async fn compute_similarity(&self, tx: &mut B::Tx, report: &mut IngestionReport) -> Result<()> {
        let nodes = self.backend.all_nodes(tx).await?;
        let computer = SimilarityComputer::new(self.config.similarity_threshold)
            .with_max_bucket_size(self.config.max_bucket_size);
        let external: HashMap<NodeId, &str> = nodes.iter().map(|n| (n.id, n.external_id.as_str())).collect();

        let mut fields: Vec<&str> = nodes
            .iter()
            .flat_map(|n| n.embeddings.keys().map(String::as_str))
            .collect();
        fields.sort_unstable();
        fields.dedup();

        for field in fields {
            let edge_type = if field == self.config.primary_field {
                EdgeType::SimilarName
            } else if self.config.function_similarity {
                EdgeType::SimilarFunction
            } else {
                continue;
            };

            let embedded: Vec<EmbeddedNode> = nodes
                .iter()
                .filter_map(|n| {
                    n.embedding(field).map(|v| EmbeddedNode {
                        id: n.id,
                        node_type: n.node_type,
                        vector: v.to_vec(),
                    })
                })
                .collect();

            for pair in computer.compute(&embedded) {
                match self.write_similarity(tx, pair.from, pair.to, edge_type, field, pair.score).await {
                    Ok(true) => report.similarity_edges_created += 1,
                    Ok(false) => {}
                    Err(e) if is_fatal(&e) => return Err(e),
                    Err(e) => {
                        let name = |id: NodeId| external.get(&id).map_or_else(|| id.to_string(), |s| s.to_string());
                        let issue = edge_write_issue(edge_type, &name(pair.from), &name(pair.to), &e);
                        warn!(%issue, "ingest issue");
                        report.record(issue);
                    }
                }
            }
            debug!(field, edge_type = %edge_type, "similarity computed");
        }
        Ok(())
    }

    /// `false` when the pair is already linked in either direction.
    async fn write_similarity(
        &self,
        tx: &mut B::Tx,
        from: NodeId,
        to: NodeId,
        edge_type: EdgeType,
        field: &str,
        score: f64,
    ) -> Result<bool> {
        let forward = self.backend.find_relationship(tx, from, to, edge_type).await?;
        let backward = self.backend.find_relationship(tx, to, from, edge_type).await?;
        if forward.is_some() || backward.is_some() {
            return Ok(false);
        }
        let attrs: PropertyMap = props([
            ("similarity_score", Value::from(score)),
            ("field", Value::from(field)),
        ]);
        self.backend.create_relationship(tx, from, to, edge_type, attrs).await?;
        Ok(true)
    }
}

fn edge_write_issue(edge_type: EdgeType, from: &str, to: &str, e: &Error) -> IngestIssue {
    IngestIssue::EdgeWrite {
        edge_type: edge_type.to_string(),
        from: from.to_string(),
        to: to.to_string(),
        reason: e.to_string(),
    }
}
