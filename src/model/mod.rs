//! # Property Graph Model
//!
//! Plain DTOs for the project graph.
//! These types cross every boundary: storage ↔ ingestion ↔ traversal ↔ caller.
//!
//! Design rule: this module is pure data. No I/O, no state, no async.

pub mod node;
pub mod relationship;
pub mod path;
pub mod value;
pub mod property_map;

pub use node::{Node, NodeId};
pub use relationship::{Relationship, RelId, Direction};
pub use path::Path;
pub use value::Value;
pub use property_map::{PropertyMap, props};
