//! In-process graph session over a shared [`GraphStore`]
//!
//! A transaction holds the store's write lock from `begin` until it commits,
//! rolls back or is dropped, so transactions are serialized. Writes are applied
//! to the store immediately and recorded in an undo log; rollback replays the
//! log in reverse.

use super::record::{Record, Value};
use super::statement::{EdgeDirection, PropertyFilter, Statement};
use super::{GraphSession, GraphTransaction, SessionError, SessionResult};
use crate::graph::{Edge, EdgeId, GraphStore, Node, NodeId, PropertyMap, PropertyValue};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use tracing::{debug, warn};

/// Session handing out transactions on a shared in-memory store
#[derive(Debug, Clone)]
pub struct MemorySession {
    store: Arc<RwLock<GraphStore>>,
    next_tx: Arc<AtomicU64>,
}

impl MemorySession {
    /// Create a session owning `store`
    pub fn new(store: GraphStore) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            next_tx: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Get a reference to the underlying store (for direct graph inspection)
    pub fn store(&self) -> &Arc<RwLock<GraphStore>> {
        &self.store
    }
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new(GraphStore::new())
    }
}

#[async_trait]
impl GraphSession for MemorySession {
    async fn begin(&self) -> SessionResult<Box<dyn GraphTransaction>> {
        let guard = Arc::clone(&self.store).write_owned().await;
        let id = self.next_tx.fetch_add(1, Ordering::Relaxed);
        debug!(tx = id, "Transaction started");
        Ok(Box::new(MemoryTransaction {
            id,
            guard: Some(guard),
            undo: Vec::new(),
        }))
    }
}

/// Inverse of one applied write
#[derive(Debug)]
enum Undo {
    RestoreProperty {
        node: NodeId,
        key: String,
        previous: Option<PropertyValue>,
    },
    RemoveNode(NodeId),
    RemoveEdge(EdgeId),
    RestoreNode { node: Node, edges: Vec<Edge> },
}

/// Transaction on a [`MemorySession`]
pub struct MemoryTransaction {
    id: u64,
    guard: Option<OwnedRwLockWriteGuard<GraphStore>>,
    undo: Vec<Undo>,
}

impl MemoryTransaction {
    fn store_mut(&mut self) -> SessionResult<&mut GraphStore> {
        self.guard
            .as_deref_mut()
            .ok_or(SessionError::TransactionClosed)
    }

    fn execute(&mut self, statement: Statement) -> SessionResult<Vec<Record>> {
        let mut undo = std::mem::take(&mut self.undo);
        let result = self
            .store_mut()
            .and_then(|store| apply(store, &mut undo, statement));
        self.undo = undo;
        result
    }

    fn undo_all(&mut self) {
        let entries = std::mem::take(&mut self.undo);
        let Some(store) = self.guard.as_deref_mut() else {
            return;
        };

        for entry in entries.into_iter().rev() {
            if let Err(e) = revert(store, entry) {
                warn!(tx = self.id, "Undo step failed: {}", e);
            }
        }
    }
}

#[async_trait]
impl GraphTransaction for MemoryTransaction {
    async fn run(&mut self, statement: Statement) -> SessionResult<Vec<Record>> {
        debug!(tx = self.id, statement = statement.kind(), "Executing statement");
        self.execute(statement)
    }

    async fn commit(&mut self) -> SessionResult<()> {
        if self.guard.is_none() {
            return Err(SessionError::TransactionClosed);
        }
        debug!(tx = self.id, writes = self.undo.len(), "Transaction committed");
        self.undo.clear();
        self.guard = None;
        Ok(())
    }

    async fn rollback(&mut self) -> SessionResult<()> {
        if self.guard.is_none() {
            return Err(SessionError::TransactionClosed);
        }
        debug!(tx = self.id, writes = self.undo.len(), "Transaction rolled back");
        self.undo_all();
        self.guard = None;
        Ok(())
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if self.guard.is_some() {
            if !self.undo.is_empty() {
                warn!(tx = self.id, "Transaction dropped while open, rolling back");
            }
            self.undo_all();
        }
    }
}

fn node_record(variable: &str, node: &Node) -> Record {
    Record::new().with(variable, Value::Node(node.clone()))
}

fn matches_filter(node: &Node, filter: Option<&PropertyFilter>) -> bool {
    filter.map_or(true, |f| node.get_property(&f.key) == Some(&f.value))
}

fn apply(
    store: &mut GraphStore,
    undo: &mut Vec<Undo>,
    statement: Statement,
) -> SessionResult<Vec<Record>> {
    match statement {
        Statement::MatchLabel { label } => Ok(store
            .get_nodes_by_label(&label.to_label())
            .into_iter()
            .map(|n| node_record("n", n))
            .collect()),

        Statement::MatchByProperty { label, filter } => Ok(store
            .find_nodes(&label.to_label(), &filter.key, &filter.value)
            .into_iter()
            .map(|n| node_record("n", n))
            .collect()),

        Statement::MatchWithProperty { label, key } => Ok(store
            .get_nodes_by_label(&label.to_label())
            .into_iter()
            .filter(|n| n.has_property(&key))
            .map(|n| node_record("n", n))
            .collect()),

        Statement::MatchNeighbors {
            node,
            relation,
            direction,
            neighbor,
            filter,
        } => {
            let edge_type = relation.to_edge_type();
            let neighbor_label = neighbor.to_label();
            let edges = match direction {
                EdgeDirection::Incoming => store.get_incoming_edges(node),
                EdgeDirection::Outgoing => store.get_outgoing_edges(node),
            };

            let mut records = Vec::new();
            for edge in edges.into_iter().filter(|e| e.edge_type == edge_type) {
                let Some(m) = edge.other_end(node).and_then(|other| store.get_node(other)) else {
                    continue;
                };
                if m.has_label(&neighbor_label) && matches_filter(m, filter.as_ref()) {
                    records.push(
                        Record::new()
                            .with("m", Value::Node(m.clone()))
                            .with("r", Value::Edge(edge.clone())),
                    );
                }
            }
            Ok(records)
        }

        Statement::MatchTargets {
            source,
            relation,
            target,
            filter,
        } => {
            let source_label = source.to_label();
            let target_label = target.to_label();
            let mut targets = BTreeSet::new();

            for edge in store.get_edges_by_type(&relation.to_edge_type()) {
                let source_ok = store.get_node(edge.source).is_some_and(|s| {
                    s.has_label(&source_label) && matches_filter(s, filter.as_ref())
                });
                let target_ok = store
                    .get_node(edge.target)
                    .is_some_and(|t| t.has_label(&target_label));
                if source_ok && target_ok {
                    targets.insert(edge.target);
                }
            }

            Ok(targets
                .into_iter()
                .filter_map(|id| store.get_node(id))
                .map(|n| node_record("n", n))
                .collect())
        }

        Statement::CreateNode { label, properties } => {
            let properties: PropertyMap = properties
                .into_iter()
                .filter(|(_, v)| !v.is_null())
                .collect();
            let id = store.create_node_with_properties(vec![label.to_label()], properties);
            undo.push(Undo::RemoveNode(id));
            let node = store.get_node(id).ok_or(crate::graph::GraphError::NodeNotFound(id))?;
            Ok(vec![node_record("n", node)])
        }

        Statement::CreateEdge {
            source,
            target,
            relation,
        } => {
            let id = store.create_edge(source, target, relation.to_edge_type())?;
            undo.push(Undo::RemoveEdge(id));
            let edge = store.get_edge(id).ok_or(crate::graph::GraphError::EdgeNotFound(id))?;
            Ok(vec![Record::new().with("r", Value::Edge(edge.clone()))])
        }

        Statement::SetProperties { node, properties } => {
            if !store.has_node(node) {
                return Err(crate::graph::GraphError::NodeNotFound(node).into());
            }
            for (key, value) in properties {
                // Setting null removes the property
                let previous = if value.is_null() {
                    store.remove_node_property(node, &key)?
                } else {
                    store.set_node_property(node, key.clone(), value)?
                };
                undo.push(Undo::RestoreProperty { node, key, previous });
            }
            let updated = store.get_node(node).ok_or(crate::graph::GraphError::NodeNotFound(node))?;
            Ok(vec![node_record("n", updated)])
        }

        Statement::RemoveProperties { node, keys } => {
            if !store.has_node(node) {
                return Err(crate::graph::GraphError::NodeNotFound(node).into());
            }
            for key in keys {
                let previous = store.remove_node_property(node, &key)?;
                if previous.is_some() {
                    undo.push(Undo::RestoreProperty { node, key, previous });
                }
            }
            let updated = store.get_node(node).ok_or(crate::graph::GraphError::NodeNotFound(node))?;
            Ok(vec![node_record("n", updated)])
        }

        Statement::DetachDelete { node } => {
            let (removed, edges) = store.delete_node(node)?;
            undo.push(Undo::RestoreNode { node: removed, edges });
            Ok(Vec::new())
        }
    }
}

fn revert(store: &mut GraphStore, entry: Undo) -> SessionResult<()> {
    match entry {
        Undo::RestoreProperty { node, key, previous } => {
            match previous {
                Some(value) => store.set_node_property(node, key, value)?,
                None => store.remove_node_property(node, &key)?,
            };
        }
        Undo::RemoveNode(id) => {
            store.delete_node(id)?;
        }
        Undo::RemoveEdge(id) => {
            store.delete_edge(id)?;
        }
        Undo::RestoreNode { node, edges } => {
            store.insert_recovered_node(node)?;
            for edge in edges {
                store.insert_recovered_edge(edge)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::statement::{EntityLabel, RelationType};

    fn seeded() -> (MemorySession, NodeId) {
        let mut store = GraphStore::new();
        let mut props = PropertyMap::new();
        props.insert("id".to_string(), "u1".into());
        props.insert("openid".to_string(), "abc".into());
        let c = store.create_node_with_properties(vec![EntityLabel::Contributor.to_label()], props);
        (MemorySession::new(store), c)
    }

    #[tokio::test]
    async fn test_commit_makes_writes_visible() {
        let (session, c) = seeded();

        let mut tx = session.begin().await.unwrap();
        tx.run(Statement::RemoveProperties {
            node: c,
            keys: vec!["openid".to_string()],
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let store = session.store().read().await;
        assert!(!store.get_node(c).unwrap().has_property("openid"));
    }

    #[tokio::test]
    async fn test_rollback_restores_everything() {
        let (session, c) = seeded();

        let mut tx = session.begin().await.unwrap();
        tx.run(Statement::RemoveProperties {
            node: c,
            keys: vec!["openid".to_string(), "email".to_string()],
        })
        .await
        .unwrap();
        let created = tx
            .run(Statement::CreateNode {
                label: EntityLabel::Alias,
                properties: PropertyMap::from([("openid".to_string(), "abc".into())]),
            })
            .await
            .unwrap();
        let alias = created[0].node("n").unwrap().id;
        tx.run(Statement::CreateEdge {
            source: alias,
            target: c,
            relation: RelationType::AliasOf,
        })
        .await
        .unwrap();
        tx.rollback().await.unwrap();

        let store = session.store().read().await;
        assert_eq!(store.node_count(), 1);
        assert_eq!(store.edge_count(), 0);
        let node = store.get_node(c).unwrap();
        assert_eq!(node.get_property("openid"), Some(&PropertyValue::from("abc")));
        assert!(node.get_property("email").is_none());
    }

    #[tokio::test]
    async fn test_drop_rolls_back_detach_delete() {
        let (session, c) = seeded();
        {
            let mut store = session.store().write().await;
            let a = store.create_node(EntityLabel::Alias.to_label());
            store.create_edge(a, c, RelationType::AliasOf.to_edge_type()).unwrap();
        }

        {
            let mut tx = session.begin().await.unwrap();
            let aliases = tx
                .run(Statement::MatchNeighbors {
                    node: c,
                    relation: RelationType::AliasOf,
                    direction: EdgeDirection::Incoming,
                    neighbor: EntityLabel::Alias,
                    filter: None,
                })
                .await
                .unwrap();
            let alias = aliases[0].node("m").unwrap().id;
            tx.run(Statement::DetachDelete { node: alias }).await.unwrap();
            // dropped without commit
        }

        let store = session.store().read().await;
        assert_eq!(store.node_count(), 2);
        assert_eq!(store.get_incoming_edges(c).len(), 1);
    }

    #[tokio::test]
    async fn test_closed_transaction_rejects_statements() {
        let (session, _) = seeded();
        let mut tx = session.begin().await.unwrap();
        tx.commit().await.unwrap();

        let err = tx
            .run(Statement::MatchLabel { label: EntityLabel::Contributor })
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::TransactionClosed);
        assert_eq!(tx.commit().await, Err(SessionError::TransactionClosed));
    }

    #[tokio::test]
    async fn test_set_null_removes_property() {
        let (session, c) = seeded();
        let mut tx = session.begin().await.unwrap();
        let records = tx
            .run(Statement::SetProperties {
                node: c,
                properties: PropertyMap::from([
                    ("openid".to_string(), PropertyValue::Null),
                    ("email".to_string(), "a@b.com".into()),
                ]),
            })
            .await
            .unwrap();
        let node = records[0].node("n").unwrap();
        assert!(node.get_property("openid").is_none());
        assert_eq!(node.get_property("email"), Some(&PropertyValue::from("a@b.com")));
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_match_targets_distinct() {
        let (session, c) = seeded();
        {
            let mut store = session.store().write().await;
            for primary in [true, true, false] {
                let mut props = PropertyMap::new();
                props.insert("is_primary".to_string(), primary.into());
                let a = store
                    .create_node_with_properties(vec![EntityLabel::Alias.to_label()], props);
                store.create_edge(a, c, RelationType::AliasOf.to_edge_type()).unwrap();
            }
        }

        let mut tx = session.begin().await.unwrap();
        let targets = tx
            .run(Statement::MatchTargets {
                source: EntityLabel::Alias,
                relation: RelationType::AliasOf,
                target: EntityLabel::Contributor,
                filter: Some(PropertyFilter::equals("is_primary", true)),
            })
            .await
            .unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].node("n").unwrap().id, c);
        tx.rollback().await.unwrap();
    }
}
