//! In-memory storage backend.
//!
//! This is the reference implementation of `StorageBackend`: an arena.
//! Nodes and relationships live in contiguous vectors addressed by their
//! integer ids, so cross references (cycles included) are index lookups.
//!
//! ## Limitations
//!
//! - **No real transactions**: `commit_tx()` and `rollback_tx()` only check
//!   the store is open. Writes are applied immediately; rollback does NOT
//!   undo mutations.
//! - **Nodes are never deleted**: node ids stay dense, an id is its arena
//!   slot. A deleted relationship leaves an empty slot behind.
//! - **Indexes are bookkeeping only**: lookups by type and external id are
//!   always indexed; `create_index()` merely records the request.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use hashbrown::{HashMap, HashSet};
use parking_lot::RwLock;
use tracing::debug;

use super::{ConstraintType, StorageBackend};
use crate::index::IndexType;
use crate::model::*;
use crate::schema::{EdgeType, NodeType};
use crate::tx::{Transaction, TxId, TxMode};
use crate::{Error, Result};

// ============================================================================
// MemoryBackend
// ============================================================================

/// In-memory property graph storage. Clones share the same arena.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    graph: RwLock<Arena>,
    schema: RwLock<SchemaState>,
    next_tx_id: AtomicU64,
    closed: AtomicBool,
}

#[derive(Default)]
struct Arena {
    nodes: Vec<Node>,
    /// `None` marks a deleted relationship.
    relationships: Vec<Option<Relationship>>,
    /// node slot → ids of every relationship touching it
    adjacency: Vec<Vec<RelId>>,
    by_external_id: HashMap<String, NodeId>,
    by_type: HashMap<NodeType, Vec<NodeId>>,
}

#[derive(Default)]
struct SchemaState {
    indexes: HashSet<(NodeType, String, IndexType)>,
    constraints: HashSet<(NodeType, String, ConstraintType)>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes requested so far, sorted for stable output.
    pub fn indexes(&self) -> Vec<(NodeType, String, IndexType)> {
        let mut out: Vec<_> = self.inner.schema.read().indexes.iter().cloned().collect();
        out.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
        out
    }

    pub fn constraint_count(&self) -> usize {
        self.inner.schema.read().constraints.len()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(Error::StoreUnavailable("memory backend has been shut down".into()));
        }
        Ok(())
    }

    fn ensure_writable(&self, tx: &MemoryTx) -> Result<()> {
        self.ensure_open()?;
        if !tx.is_writable() {
            return Err(Error::TxError(format!("{} is read-only", tx.id)));
        }
        Ok(())
    }

    /// Check `Exists` constraints for a node about to hold `props`.
    fn check_constraints(&self, node_type: NodeType, props: &PropertyMap) -> Result<()> {
        let schema = self.inner.schema.read();
        for (t, key, kind) in &schema.constraints {
            if *t != node_type {
                continue;
            }
            let present = props.get(key.as_str()).is_some_and(|v| !v.is_null());
            match kind {
                ConstraintType::Exists if !present => {
                    return Err(Error::ConstraintViolation(format!(
                        "{node_type} requires attribute '{key}'"
                    )));
                }
                ConstraintType::Exists => {}
            }
        }
        Ok(())
    }
}

impl Arena {
    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    fn relationship(&self, id: RelId) -> Option<&Relationship> {
        self.relationships.get(id.0 as usize).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.0 as usize)
            .ok_or_else(|| Error::NotFound(format!("Node {id}")))
    }
}

// ============================================================================
// MemoryTx
// ============================================================================

/// In-memory transaction (a marker carrying its mode, no MVCC).
pub struct MemoryTx {
    id: TxId,
    mode: TxMode,
}

impl Transaction for MemoryTx {
    fn mode(&self) -> TxMode { self.mode }
    fn id(&self) -> TxId { self.id }
}

// ============================================================================
// StorageBackend impl
// ============================================================================

#[async_trait]
impl StorageBackend for MemoryBackend {
    type Tx = MemoryTx;

    async fn shutdown(&self) -> Result<()> {
        self.inner.closed.store(true, Ordering::Release);
        Ok(())
    }

    async fn begin_tx(&self, mode: TxMode) -> Result<MemoryTx> {
        self.ensure_open()?;
        let id = TxId(self.inner.next_tx_id.fetch_add(1, Ordering::Relaxed));
        Ok(MemoryTx { id, mode })
    }

    /// Writes are already visible; commit only validates the store is open.
    async fn commit_tx(&self, _tx: MemoryTx) -> Result<()> {
        self.ensure_open()
    }

    /// WARNING: No-op. Mutations applied during this transaction are NOT reverted.
    async fn rollback_tx(&self, _tx: MemoryTx) -> Result<()> {
        Ok(())
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    async fn create_node(
        &self,
        tx: &mut MemoryTx,
        node_type: NodeType,
        external_id: &str,
        props: PropertyMap,
    ) -> Result<NodeId> {
        self.ensure_writable(tx)?;
        let mut arena = self.inner.graph.write();

        if arena.by_external_id.contains_key(external_id) {
            return Err(Error::ConstraintViolation(format!(
                "external id '{external_id}' already exists"
            )));
        }
        self.check_constraints(node_type, &props)?;

        let id = NodeId(arena.nodes.len() as u64);
        let mut node = Node::new(id, external_id, node_type);
        node.properties = props;

        arena.nodes.push(node);
        arena.adjacency.push(Vec::new());
        arena.by_external_id.insert(external_id.to_string(), id);
        arena.by_type.entry(node_type).or_default().push(id);

        debug!(%id, external_id, %node_type, "node created");
        Ok(id)
    }

    async fn get_node(&self, _tx: &MemoryTx, id: NodeId) -> Result<Option<Node>> {
        self.ensure_open()?;
        Ok(self.inner.graph.read().node(id).cloned())
    }

    async fn node_by_external_id(&self, _tx: &MemoryTx, external_id: &str) -> Result<Option<Node>> {
        self.ensure_open()?;
        let arena = self.inner.graph.read();
        Ok(arena
            .by_external_id
            .get(external_id)
            .and_then(|id| arena.node(*id))
            .cloned())
    }

    async fn replace_node_properties(
        &self,
        tx: &mut MemoryTx,
        id: NodeId,
        props: PropertyMap,
    ) -> Result<()> {
        self.ensure_writable(tx)?;
        let mut arena = self.inner.graph.write();
        let node_type = arena
            .node(id)
            .map(|n| n.node_type)
            .ok_or_else(|| Error::NotFound(format!("Node {id}")))?;
        self.check_constraints(node_type, &props)?;
        arena.node_mut(id)?.properties = props;
        Ok(())
    }

    async fn set_node_embedding(
        &self,
        tx: &mut MemoryTx,
        id: NodeId,
        field: &str,
        vector: Vec<f32>,
    ) -> Result<()> {
        self.ensure_writable(tx)?;
        let mut arena = self.inner.graph.write();
        arena.node_mut(id)?.embeddings.insert(field.to_string(), vector);
        Ok(())
    }

    // ========================================================================
    // Relationships
    // ========================================================================

    async fn create_relationship(
        &self,
        tx: &mut MemoryTx,
        src: NodeId,
        dst: NodeId,
        rel_type: EdgeType,
        props: PropertyMap,
    ) -> Result<RelId> {
        self.ensure_writable(tx)?;
        let mut arena = self.inner.graph.write();

        // Verify both nodes exist
        if arena.node(src).is_none() {
            return Err(Error::NotFound(format!("Source node {src}")));
        }
        if arena.node(dst).is_none() {
            return Err(Error::NotFound(format!("Target node {dst}")));
        }

        let id = RelId(arena.relationships.len() as u64);
        let mut rel = Relationship::new(id, src, dst, rel_type);
        rel.properties = props;
        arena.relationships.push(Some(rel));

        // Update adjacency for both endpoints
        arena.adjacency[src.0 as usize].push(id);
        if src != dst {
            arena.adjacency[dst.0 as usize].push(id);
        }

        debug!(%id, %src, %dst, %rel_type, "relationship created");
        Ok(id)
    }

    async fn get_relationship(&self, _tx: &MemoryTx, id: RelId) -> Result<Option<Relationship>> {
        self.ensure_open()?;
        Ok(self.inner.graph.read().relationship(id).cloned())
    }

    async fn delete_relationship(&self, tx: &mut MemoryTx, id: RelId) -> Result<bool> {
        self.ensure_writable(tx)?;
        let mut arena = self.inner.graph.write();
        let Some(rel) = arena.relationships.get_mut(id.0 as usize).and_then(Option::take) else {
            return Ok(false);
        };
        for end in [rel.src, rel.dst] {
            if let Some(rels) = arena.adjacency.get_mut(end.0 as usize) {
                rels.retain(|rid| *rid != id);
            }
        }
        debug!(%id, src = %rel.src, dst = %rel.dst, rel_type = %rel.rel_type, "relationship deleted");
        Ok(true)
    }

    async fn get_relationships(
        &self,
        _tx: &MemoryTx,
        node: NodeId,
        dir: Direction,
        rel_type: Option<EdgeType>,
    ) -> Result<Vec<Relationship>> {
        self.ensure_open()?;
        let arena = self.inner.graph.read();

        let Some(rel_ids) = arena.adjacency.get(node.0 as usize) else {
            return Ok(Vec::new());
        };

        let result = rel_ids
            .iter()
            .filter_map(|rid| arena.relationship(*rid))
            .filter(|rel| match dir {
                Direction::Outgoing => rel.src == node,
                Direction::Incoming => rel.dst == node,
                Direction::Both => true,
            })
            .filter(|rel| rel_type.is_none_or(|t| rel.rel_type == t))
            .cloned()
            .collect();

        Ok(result)
    }

    async fn relationships_by_type(
        &self,
        _tx: &MemoryTx,
        rel_type: EdgeType,
    ) -> Result<Vec<Relationship>> {
        self.ensure_open()?;
        let arena = self.inner.graph.read();
        Ok(arena
            .relationships
            .iter()
            .flatten()
            .filter(|r| r.rel_type == rel_type)
            .cloned()
            .collect())
    }

    // ========================================================================
    // Scan
    // ========================================================================

    async fn all_nodes(&self, _tx: &MemoryTx) -> Result<Vec<Node>> {
        self.ensure_open()?;
        Ok(self.inner.graph.read().nodes.clone())
    }

    async fn nodes_by_type(&self, _tx: &MemoryTx, node_type: NodeType) -> Result<Vec<Node>> {
        self.ensure_open()?;
        let arena = self.inner.graph.read();
        Ok(arena
            .by_type
            .get(&node_type)
            .into_iter()
            .flatten()
            .filter_map(|id| arena.node(*id).cloned())
            .collect())
    }

    // ========================================================================
    // Schema
    // ========================================================================

    async fn create_index(
        &self,
        node_type: NodeType,
        property: &str,
        index_type: IndexType,
    ) -> Result<()> {
        self.ensure_open()?;
        self.inner
            .schema
            .write()
            .indexes
            .insert((node_type, property.to_string(), index_type));
        Ok(())
    }

    async fn create_constraint(
        &self,
        node_type: NodeType,
        property: &str,
        constraint_type: ConstraintType,
    ) -> Result<()> {
        self.ensure_open()?;
        let arena = self.inner.graph.read();
        let existing: Vec<&Node> = arena
            .by_type
            .get(&node_type)
            .into_iter()
            .flatten()
            .filter_map(|id| arena.node(*id))
            .collect();

        match constraint_type {
            ConstraintType::Exists => {
                if let Some(bad) = existing.iter().find(|n| n.get(property).is_none_or(Value::is_null)) {
                    return Err(Error::ConstraintViolation(format!(
                        "cannot require {node_type}.{property}: node '{}' lacks it",
                        bad.external_id
                    )));
                }
            }
        }
        drop(arena);

        self.inner
            .schema
            .write()
            .constraints
            .insert((node_type, property.to_string(), constraint_type));
        Ok(())
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    async fn node_count(&self, _tx: &MemoryTx) -> Result<u64> {
        self.ensure_open()?;
        Ok(self.inner.graph.read().nodes.len() as u64)
    }

    async fn relationship_count(&self, _tx: &MemoryTx) -> Result<u64> {
        self.ensure_open()?;
        Ok(self.inner.graph.read().relationships.iter().flatten().count() as u64)
    }

    async fn node_types(&self, _tx: &MemoryTx) -> Result<Vec<NodeType>> {
        self.ensure_open()?;
        let mut types: Vec<NodeType> = self.inner.graph.read().by_type.keys().copied().collect();
        types.sort();
        Ok(types)
    }

    async fn edge_types(&self, _tx: &MemoryTx) -> Result<Vec<EdgeType>> {
        self.ensure_open()?;
        let arena = self.inner.graph.read();
        let mut types: Vec<EdgeType> = arena.relationships.iter().flatten().map(|r| r.rel_type).collect();
        types.sort();
        types.dedup();
        Ok(types)
    }
}

// ============================================================================
// Tests
// ============================================================================
