//! Candidate discovery for batch passes

use super::error::MigrationResult;
use super::identity::IS_PRIMARY_KEY;
use super::lookup::{contributor_id, match_nodes};
use crate::session::{EntityLabel, GraphTransaction, PropertyFilter, RelationType, Statement};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Direction of a migration pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Contributor fields move onto a new primary alias
    Forward,
    /// Primary alias fields move back onto the Contributor
    Backward,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => f.write_str("forward"),
            Direction::Backward => f.write_str("backward"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forward" | "migrate" => Ok(Direction::Forward),
            "backward" | "revert" => Ok(Direction::Backward),
            other => Err(format!("unknown direction: {other}")),
        }
    }
}

/// Ids of the Contributors eligible for `direction`, in discovery order.
///
/// - forward: Contributors whose own `openid` is set
/// - backward: Contributors with a primary alias
///
/// Read-only. Contributors without a string `id` cannot be addressed by the
/// single-entity transactions and are left out with a warning.
pub async fn candidates(
    tx: &mut dyn GraphTransaction,
    direction: Direction,
) -> MigrationResult<Vec<String>> {
    let statement = match direction {
        Direction::Forward => Statement::MatchWithProperty {
            label: EntityLabel::Contributor,
            key: "openid".to_string(),
        },
        Direction::Backward => Statement::MatchTargets {
            source: EntityLabel::Alias,
            relation: RelationType::AliasOf,
            target: EntityLabel::Contributor,
            filter: Some(PropertyFilter::equals(IS_PRIMARY_KEY, true)),
        },
    };

    let nodes = match_nodes(tx, statement).await?;
    let mut ids = Vec::with_capacity(nodes.len());
    for node in nodes {
        match contributor_id(&node) {
            Some(id) => ids.push(id),
            None => warn!("Contributor {} has no string id, not selectable", node.id),
        }
    }

    debug!(%direction, count = ids.len(), "Selected candidates");
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphStore, PropertyMap, PropertyValue};
    use crate::session::{GraphSession, MemorySession};

    fn contributor(
        store: &mut GraphStore,
        id: Option<&str>,
        openid: Option<&str>,
    ) -> crate::graph::NodeId {
        let mut props = PropertyMap::new();
        if let Some(id) = id {
            props.insert("id".to_string(), id.into());
        }
        props.insert("openid".to_string(), PropertyValue::from(openid));
        store.create_node_with_properties(vec![EntityLabel::Contributor.to_label()], props)
    }

    fn alias(store: &mut GraphStore, owner: crate::graph::NodeId, primary: bool) {
        let mut props = PropertyMap::new();
        props.insert(IS_PRIMARY_KEY.to_string(), primary.into());
        let a = store.create_node_with_properties(vec![EntityLabel::Alias.to_label()], props);
        store
            .create_edge(a, owner, RelationType::AliasOf.to_edge_type())
            .unwrap();
    }

    #[tokio::test]
    async fn test_forward_candidates_in_discovery_order() {
        let mut store = GraphStore::new();
        contributor(&mut store, Some("u3"), Some("c"));
        contributor(&mut store, Some("u1"), None);
        contributor(&mut store, Some("u2"), Some("b"));
        contributor(&mut store, None, Some("orphan"));
        let session = MemorySession::new(store);

        let mut tx = session.begin().await.unwrap();
        let ids = candidates(tx.as_mut(), Direction::Forward).await.unwrap();
        assert_eq!(ids, vec!["u3".to_string(), "u2".to_string()]);
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_backward_candidates_need_primary_alias() {
        let mut store = GraphStore::new();
        let a = contributor(&mut store, Some("a"), None);
        let b = contributor(&mut store, Some("b"), None);
        contributor(&mut store, Some("c"), None);
        alias(&mut store, b, true);
        alias(&mut store, a, false);
        alias(&mut store, a, true);
        let session = MemorySession::new(store);

        let mut tx = session.begin().await.unwrap();
        let ids = candidates(tx.as_mut(), Direction::Backward).await.unwrap();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_graph_has_no_candidates() {
        let session = MemorySession::default();
        let mut tx = session.begin().await.unwrap();
        assert!(candidates(tx.as_mut(), Direction::Forward).await.unwrap().is_empty());
        assert!(candidates(tx.as_mut(), Direction::Backward).await.unwrap().is_empty());
        tx.rollback().await.unwrap();
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("Forward".parse::<Direction>(), Ok(Direction::Forward));
        assert_eq!("revert".parse::<Direction>(), Ok(Direction::Backward));
        assert!("sideways".parse::<Direction>().is_err());
    }
}
