//! Aliasgraph
//!
//! Reversible migration of Contributor identity fields onto Alias nodes in a
//! property graph.
//!
//! # Layers
//!
//! - [`graph`]: in-memory property graph with JSON snapshots
//! - [`session`]: transactional statement execution over a graph
//! - [`migration`]: candidate selection, forward/backward transactions, driver
//! - [`config`]: driver configuration loaded from YAML
//!
//! ## Example Usage
//!
//! ```rust
//! use aliasgraph::graph::{GraphStore, PropertyMap};
//! use aliasgraph::migration::{MigrationDriver, MigrationOutcome};
//! use aliasgraph::session::{EntityLabel, MemorySession};
//! use aliasgraph::MigrationConfig;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let mut store = GraphStore::new();
//! let mut props = PropertyMap::new();
//! props.insert("id".to_string(), "u1".into());
//! props.insert("openid".to_string(), "abc".into());
//! store.create_node_with_properties(vec![EntityLabel::Contributor.to_label()], props);
//!
//! let driver = MigrationDriver::new(MemorySession::new(store), MigrationConfig::default());
//! assert_eq!(driver.migrate_one("u1").await.unwrap(), MigrationOutcome::Applied);
//! assert_eq!(driver.revert_one("u1").await.unwrap(), MigrationOutcome::Applied);
//! # });
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod graph;
pub mod migration;
pub mod session;

// Re-export main types for convenience
pub use config::{ConfigError, ConfigResult, FailurePolicy, MigrationConfig};

pub use graph::{
    Edge, EdgeId, EdgeType, GraphError, GraphResult, GraphSnapshot, GraphStore, Label, Node, NodeId,
    PropertyMap, PropertyValue,
};

pub use session::{GraphSession, GraphTransaction, MemorySession, SessionError, SessionResult};

pub use migration::{
    BatchReport, ContributorKey, ContributorView, Direction, IdentityFields, MigrationDriver,
    MigrationError, MigrationOutcome, MigrationResult, SkipReason,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
