//! Graph session capability
//!
//! A [`GraphSession`] hands out transactions; a [`GraphTransaction`] runs
//! parameterized [`Statement`]s with read-your-writes semantics and ends in
//! exactly one commit or rollback. Implementations must roll back a
//! transaction that is dropped while still open, so every exit path releases
//! its unit of work.
//!
//! [`MemorySession`] is the in-process implementation backed by a
//! [`GraphStore`](crate::graph::GraphStore).

pub mod memory;
pub mod record;
pub mod statement;

pub use memory::{MemorySession, MemoryTransaction};
pub use record::{Record, Value};
pub use statement::{EdgeDirection, EntityLabel, PropertyFilter, RelationType, Statement};

use crate::graph::GraphError;
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a graph session or one of its transactions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Statement rejected by the underlying graph
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Concurrent modification detected by the store
    #[error("Transaction conflict: {0}")]
    Conflict(String),

    /// Store-level constraint rejected a write
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Statement issued after commit or rollback
    #[error("Transaction already closed")]
    TransactionClosed,
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Source of transactions against one graph store
#[async_trait]
pub trait GraphSession: Send + Sync {
    /// Open a new unit of work
    async fn begin(&self) -> SessionResult<Box<dyn GraphTransaction>>;
}

/// One unit of work against the store
#[async_trait]
pub trait GraphTransaction: Send {
    /// Execute a statement and return its result records
    async fn run(&mut self, statement: Statement) -> SessionResult<Vec<Record>>;

    /// Make every write of this transaction visible atomically
    async fn commit(&mut self) -> SessionResult<()>;

    /// Discard every write of this transaction
    async fn rollback(&mut self) -> SessionResult<()>;
}

#[async_trait]
impl<S: GraphSession + ?Sized> GraphSession for std::sync::Arc<S> {
    async fn begin(&self) -> SessionResult<Box<dyn GraphTransaction>> {
        (**self).begin().await
    }
}

#[async_trait]
impl<S: GraphSession + ?Sized> GraphSession for &S {
    async fn begin(&self) -> SessionResult<Box<dyn GraphTransaction>> {
        (**self).begin().await
    }
}
