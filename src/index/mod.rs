//! Index kinds created during schema initialization.

use serde::{Deserialize, Serialize};

/// Type of index to create on a `(node type, attribute)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexType {
    /// Equality lookups (exporter ids, names).
    BTree,
    /// Unique constraint (implies B-tree).
    Unique,
    /// Vector similarity over an embedding field.
    Vector,
}
