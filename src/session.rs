//! Session / cursor over the graph store.
//!
//! A [`Session`] owns a read-only transaction and a *current result set*.
//! Step and filter operations replace the result set; [`Session::next`]
//! pulls from it one node at a time.
//!
//! ```text
//! open ─▶ scan / start ─▶ out_step / in_step / filter … ─▶ next … ─▶ close
//! ```
//!
//! A session is owned and not `Clone`: concurrent queries open their own.
//! Dropping a session abandons it; there is nothing to cancel.

use hashbrown::HashSet;

use crate::model::{Direction, Node, NodeId, Relationship, Value};
use crate::schema::{EdgeType, NodeType};
use crate::storage::StorageBackend;
use crate::tx::{Transaction, TxMode};
use crate::{Error, Result};

/// Identifier of an open session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

pub struct Session<'b, B: StorageBackend> {
    backend: &'b B,
    tx: B::Tx,
    id: SessionId,
    current: Vec<NodeId>,
    cursor: usize,
}

impl<'b, B: StorageBackend> Session<'b, B> {
    /// Acquire a session (`init_session`).
    pub async fn open(backend: &'b B) -> Result<Self> {
        let tx = backend.begin_tx(TxMode::ReadOnly).await?;
        let id = SessionId(tx.id().0);
        Ok(Self { backend, tx, id, current: Vec::new(), cursor: 0 })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn backend(&self) -> &'b B {
        self.backend
    }

    pub fn tx(&self) -> &B::Tx {
        &self.tx
    }

    /// Size of the current result set.
    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    fn reset(&mut self, ids: Vec<NodeId>) -> usize {
        self.current = ids;
        self.cursor = 0;
        self.current.len()
    }

    // ========================================================================
    // Seeding the result set
    // ========================================================================

    /// Start from one node. `NotFound` if it does not exist.
    pub async fn start(&mut self, id: NodeId) -> Result<Node> {
        let node = self
            .node(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Node {id}")))?;
        self.reset(vec![id]);
        Ok(node)
    }

    /// Start from the node carrying this exporter id.
    pub async fn start_at_external(&mut self, external_id: &str) -> Result<Node> {
        let node = self
            .backend
            .node_by_external_id(&self.tx, external_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Node '{external_id}'")))?;
        self.reset(vec![node.id]);
        Ok(node)
    }

    /// `scan_by_type`: every node of a type.
    pub async fn scan(&mut self, node_type: NodeType) -> Result<usize> {
        let nodes = self.backend.nodes_by_type(&self.tx, node_type).await?;
        Ok(self.reset(nodes.into_iter().map(|n| n.id).collect()))
    }

    // ========================================================================
    // Steps
    // ========================================================================

    /// Follow outgoing `edge` relationships from every node in the result set.
    pub async fn out_step(&mut self, edge: EdgeType, target: Option<NodeType>) -> Result<usize> {
        self.step(Direction::Outgoing, edge, target).await
    }

    /// Follow incoming `edge` relationships to every node in the result set.
    pub async fn in_step(&mut self, edge: EdgeType, target: Option<NodeType>) -> Result<usize> {
        self.step(Direction::Incoming, edge, target).await
    }

    async fn step(
        &mut self,
        dir: Direction,
        edge: EdgeType,
        target: Option<NodeType>,
    ) -> Result<usize> {
        let mut seen = HashSet::new();
        let mut next = Vec::new();

        for &from in &self.current {
            let rels = self.backend.get_relationships(&self.tx, from, dir, Some(edge)).await?;
            for rel in rels {
                let to = if dir == Direction::Incoming { rel.src } else { rel.dst };
                if !seen.insert(to) {
                    continue;
                }
                if let Some(t) = target {
                    match self.backend.get_node(&self.tx, to).await? {
                        Some(n) if n.node_type == t => {}
                        _ => continue,
                    }
                }
                next.push(to);
            }
        }

        Ok(self.reset(next))
    }

    /// Keep nodes whose attributes match every `(key, value)` pair.
    pub async fn filter(&mut self, predicates: &[(&str, Value)]) -> Result<usize> {
        let mut kept = Vec::with_capacity(self.current.len());
        for &id in &self.current {
            let Some(node) = self.backend.get_node(&self.tx, id).await? else {
                continue;
            };
            let matches = predicates
                .iter()
                .all(|(k, v)| node.get(k).is_some_and(|actual| actual.loosely_equals(v)));
            if matches {
                kept.push(id);
            }
        }
        Ok(self.reset(kept))
    }

    // ========================================================================
    // Pulling results
    // ========================================================================

    /// Next node of the result set, `None` at end.
    pub async fn next(&mut self) -> Result<Option<Node>> {
        while let Some(&id) = self.current.get(self.cursor) {
            self.cursor += 1;
            if let Some(node) = self.backend.get_node(&self.tx, id).await? {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    /// Drain the rest of the result set.
    pub async fn collect(&mut self) -> Result<Vec<Node>> {
        let mut out = Vec::with_capacity(self.current.len().saturating_sub(self.cursor));
        while let Some(node) = self.next().await? {
            out.push(node);
        }
        Ok(out)
    }

    // ========================================================================
    // Point reads (do not touch the result set)
    // ========================================================================

    pub async fn node(&self, id: NodeId) -> Result<Option<Node>> {
        self.backend.get_node(&self.tx, id).await
    }

    pub async fn relationships(
        &self,
        node: NodeId,
        dir: Direction,
        rel_type: Option<EdgeType>,
    ) -> Result<Vec<Relationship>> {
        self.backend.get_relationships(&self.tx, node, dir, rel_type).await
    }

    /// Nodes one hop away along `rel_type`, paired with the relationship.
    pub async fn neighbours(
        &self,
        node: NodeId,
        dir: Direction,
        rel_type: EdgeType,
    ) -> Result<Vec<(Relationship, Node)>> {
        let rels = self.relationships(node, dir, Some(rel_type)).await?;
        let mut out = Vec::with_capacity(rels.len());
        for rel in rels {
            let Some(other) = rel.other_node(node) else { continue };
            if let Some(n) = self.node(other).await? {
                out.push((rel, n));
            }
        }
        Ok(out)
    }

    /// Release the session's transaction.
    pub async fn close(self) -> Result<()> {
        self.backend.commit_tx(self.tx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PropertyMap, props};
    use crate::storage::MemoryBackend;

    async fn fixture() -> (MemoryBackend, NodeId) {
        let db = MemoryBackend::new();
        let mut tx = db.begin_tx(TxMode::ReadWrite).await.unwrap();
        let comp = db
            .create_node(&mut tx, NodeType::Composition, "c", props([("name", "Main")]))
            .await
            .unwrap();
        for (ext, t, enabled) in [
            ("l1", NodeType::TextLayer, true),
            ("l2", NodeType::AVLayer, false),
            ("l3", NodeType::AVLayer, true),
        ] {
            let id = db
                .create_node(&mut tx, t, ext, props([("enabled", enabled)]))
                .await
                .unwrap();
            db.create_relationship(&mut tx, comp, id, EdgeType::Contains, PropertyMap::new())
                .await
                .unwrap();
        }
        db.commit_tx(tx).await.unwrap();
        (db, comp)
    }

    #[tokio::test]
    async fn test_step_filter_next() {
        let (db, comp) = fixture().await;
        let mut s = Session::open(&db).await.unwrap();

        s.start(comp).await.unwrap();
        assert_eq!(s.out_step(EdgeType::Contains, None).await.unwrap(), 3);
        assert_eq!(s.filter(&[("enabled", Value::Bool(true))]).await.unwrap(), 2);

        let first = s.next().await.unwrap().unwrap();
        assert_eq!(first.external_id, "l1");
        let second = s.next().await.unwrap().unwrap();
        assert_eq!(second.external_id, "l3");
        assert!(s.next().await.unwrap().is_none());
        s.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_typed_step_and_in_step() {
        let (db, comp) = fixture().await;
        let mut s = Session::open(&db).await.unwrap();

        s.start(comp).await.unwrap();
        assert_eq!(s.out_step(EdgeType::Contains, Some(NodeType::AVLayer)).await.unwrap(), 2);
        assert_eq!(s.in_step(EdgeType::Contains, None).await.unwrap(), 1);
        assert_eq!(s.collect().await.unwrap()[0].id, comp);
    }

    #[tokio::test]
    async fn test_scan_and_missing_start() {
        let (db, _) = fixture().await;
        let mut s = Session::open(&db).await.unwrap();

        assert_eq!(s.scan(NodeType::AVLayer).await.unwrap(), 2);
        assert!(matches!(s.start(NodeId(42)).await, Err(Error::NotFound(_))));
        assert!(s.start_at_external("l3").await.is_ok());
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let (db, comp) = fixture().await;
        let mut a = Session::open(&db).await.unwrap();
        let mut b = Session::open(&db).await.unwrap();
        assert_ne!(a.id(), b.id());

        a.start(comp).await.unwrap();
        b.scan(NodeType::TextLayer).await.unwrap();
        a.out_step(EdgeType::Contains, None).await.unwrap();

        assert_eq!(a.len(), 3);
        assert_eq!(b.len(), 1);
    }
}
