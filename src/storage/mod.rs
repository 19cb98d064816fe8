//! # Storage Backend Trait
//!
//! The contract between the ingestion pipeline / traversal engine and the
//! graph store. Everything above this trait composes single-hop primitives;
//! nothing above it knows how nodes are laid out.
//!
//! ## Implementations
//!
//! | Backend | Module | Description |
//! |---------|--------|-------------|
//! | `MemoryBackend` | `memory` | Arena-backed in-process store, reference implementation |

pub mod memory;

use async_trait::async_trait;

use crate::index::IndexType;
use crate::model::*;
use crate::schema::{EdgeType, NodeType};
use crate::tx::{Transaction, TxMode};
use crate::{Error, Result};

pub use memory::MemoryBackend;

// ============================================================================
// Constraint types
// ============================================================================

/// Type of constraint to create on a node type + attribute pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintType {
    /// Attribute must be present (non-null) on every node of this type.
    Exists,
}

// ============================================================================
// StorageBackend Trait
// ============================================================================

/// The graph store contract.
///
/// Reads take `&Self::Tx`, writes take `&mut Self::Tx` and fail with
/// [`Error::TxError`] on a read-only transaction. Once [`shutdown`] has been
/// called every operation fails with [`Error::StoreUnavailable`].
///
/// [`shutdown`]: StorageBackend::shutdown
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// The transaction type for this backend.
    type Tx: Transaction;

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Shut down the backend. Subsequent calls report the store unavailable.
    async fn shutdown(&self) -> Result<()>;

    // ========================================================================
    // Transactions
    // ========================================================================

    async fn begin_tx(&self, mode: TxMode) -> Result<Self::Tx>;

    async fn commit_tx(&self, tx: Self::Tx) -> Result<()>;

    async fn rollback_tx(&self, tx: Self::Tx) -> Result<()>;

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Create a node. Fails with `ConstraintViolation` when the external id is
    /// already taken or an `Exists` constraint is not met.
    async fn create_node(
        &self,
        tx: &mut Self::Tx,
        node_type: NodeType,
        external_id: &str,
        props: PropertyMap,
    ) -> Result<NodeId>;

    /// Get a node by ID. Returns None if not found.
    async fn get_node(&self, tx: &Self::Tx, id: NodeId) -> Result<Option<Node>>;

    /// Look a node up by its exporter id.
    ///
    /// Default: full scan. Backends with an external-id index override this.
    async fn node_by_external_id(&self, tx: &Self::Tx, external_id: &str) -> Result<Option<Node>> {
        Ok(self
            .all_nodes(tx)
            .await?
            .into_iter()
            .find(|n| n.external_id == external_id))
    }

    /// Replace the whole attribute map, re-checking constraints.
    async fn replace_node_properties(
        &self,
        tx: &mut Self::Tx,
        id: NodeId,
        props: PropertyMap,
    ) -> Result<()>;

    /// Attach an embedding vector computed from `field`.
    async fn set_node_embedding(
        &self,
        tx: &mut Self::Tx,
        id: NodeId,
        field: &str,
        vector: Vec<f32>,
    ) -> Result<()>;

    // ========================================================================
    // Relationships
    // ========================================================================

    /// Create a relationship. Both endpoints must exist (`NotFound` otherwise).
    async fn create_relationship(
        &self,
        tx: &mut Self::Tx,
        src: NodeId,
        dst: NodeId,
        rel_type: EdgeType,
        props: PropertyMap,
    ) -> Result<RelId>;

    async fn get_relationship(&self, tx: &Self::Tx, id: RelId) -> Result<Option<Relationship>>;

    /// Delete a relationship. Returns true if it existed.
    async fn delete_relationship(&self, tx: &mut Self::Tx, id: RelId) -> Result<bool>;

    /// Single hop: all relationships of a node, filtered by direction and type.
    async fn get_relationships(
        &self,
        tx: &Self::Tx,
        node: NodeId,
        dir: Direction,
        rel_type: Option<EdgeType>,
    ) -> Result<Vec<Relationship>>;

    /// The `(src)-[rel_type]->(dst)` relationship, if one exists.
    async fn find_relationship(
        &self,
        tx: &Self::Tx,
        src: NodeId,
        dst: NodeId,
        rel_type: EdgeType,
    ) -> Result<Option<Relationship>> {
        let rels = self
            .get_relationships(tx, src, Direction::Outgoing, Some(rel_type))
            .await?;
        Ok(rels.into_iter().find(|r| r.dst == dst))
    }

    /// Find all relationships of a given type.
    ///
    /// Default: scans all nodes and collects outgoing relationships of that type.
    async fn relationships_by_type(
        &self,
        tx: &Self::Tx,
        rel_type: EdgeType,
    ) -> Result<Vec<Relationship>> {
        let mut result = Vec::new();
        let nodes = self.all_nodes(tx).await?;
        for node in &nodes {
            let rels = self
                .get_relationships(tx, node.id, Direction::Outgoing, Some(rel_type))
                .await?;
            result.extend(rels);
        }
        Ok(result)
    }

    // ========================================================================
    // Scan
    // ========================================================================

    /// Return all nodes, in creation order.
    async fn all_nodes(&self, tx: &Self::Tx) -> Result<Vec<Node>>;

    /// Find all nodes of a given type.
    async fn nodes_by_type(&self, tx: &Self::Tx, node_type: NodeType) -> Result<Vec<Node>>;

    /// Find nodes by type + attribute value. Numbers compare across int/float.
    async fn nodes_by_property(
        &self,
        tx: &Self::Tx,
        node_type: NodeType,
        key: &str,
        value: &Value,
    ) -> Result<Vec<Node>> {
        Ok(self
            .nodes_by_type(tx, node_type)
            .await?
            .into_iter()
            .filter(|n| n.get(key).is_some_and(|v| v.loosely_equals(value)))
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
    ) -> Result<()>;

    /// Create a schema constraint. Fails if existing nodes already violate it.
    ///
    /// Default returns "not supported".
    async fn create_constraint(
        &self,
        _node_type: NodeType,
        _property: &str,
        _constraint_type: ConstraintType,
    ) -> Result<()> {
        Err(Error::StorageError("constraints not supported".into()))
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    async fn node_count(&self, tx: &Self::Tx) -> Result<u64>;

    async fn relationship_count(&self, tx: &Self::Tx) -> Result<u64>;

    /// Distinct node types present.
    async fn node_types(&self, tx: &Self::Tx) -> Result<Vec<NodeType>>;

    /// Distinct edge types present.
    async fn edge_types(&self, tx: &Self::Tx) -> Result<Vec<EdgeType>>;
}
