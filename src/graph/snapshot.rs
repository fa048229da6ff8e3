//! JSON snapshots of a graph store
//!
//! A snapshot lists live nodes and edges with their original ids. Loading goes
//! through the same id-preserving insert path that rollback uses, so edges are
//! validated against the nodes loaded before them.

use super::edge::Edge;
use super::node::Node;
use super::store::{GraphError, GraphStore};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Snapshot errors
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid snapshot: {0}")]
    Graph(#[from] GraphError),
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Serializable image of a graph store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    /// Read a snapshot from a JSON file
    pub fn load(path: impl AsRef<Path>) -> SnapshotResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let snapshot: GraphSnapshot = serde_json::from_str(&raw)?;
        info!(
            "Loaded snapshot {:?}: {} nodes, {} edges",
            path,
            snapshot.nodes.len(),
            snapshot.edges.len()
        );
        Ok(snapshot)
    }

    /// Write the snapshot as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> SnapshotResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        debug!("Saved snapshot to {:?}", path);
        Ok(())
    }
}

impl GraphStore {
    /// Capture every live node and edge
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.all_nodes().cloned().collect(),
            edges: self.all_edges().cloned().collect(),
        }
    }

    /// Rebuild a store from a snapshot
    pub fn from_snapshot(snapshot: GraphSnapshot) -> SnapshotResult<Self> {
        let mut store = GraphStore::new();
        for node in snapshot.nodes {
            store.insert_recovered_node(node)?;
        }
        for edge in snapshot.edges {
            store.insert_recovered_edge(edge)?;
        }
        Ok(store)
    }
}
