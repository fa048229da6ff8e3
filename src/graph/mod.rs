//! Property graph data model
//!
//! - Nodes with labels and properties
//! - Directed, typed edges
//! - In-memory storage with adjacency lists and ordered label indices
//! - JSON snapshots for loading and saving a store

pub mod edge;
pub mod node;
pub mod property;
pub mod snapshot;
pub mod store;
pub mod types;

// Re-export main types
pub use edge::Edge;
pub use node::Node;
pub use property::{PropertyMap, PropertyValue};
pub use snapshot::{GraphSnapshot, SnapshotError, SnapshotResult};
pub use store::{GraphError, GraphResult, GraphStore};
pub use types::{EdgeId, EdgeType, Label, NodeId};
