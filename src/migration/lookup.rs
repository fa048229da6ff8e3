//! Read statements shared by the selector, the transactions and the views

use super::error::{MigrationError, MigrationResult};
use super::identity::{CONTRIBUTOR_ID_KEY, IS_PRIMARY_KEY};
use crate::graph::{Node, NodeId};
use crate::session::{
    EdgeDirection, EntityLabel, GraphTransaction, PropertyFilter, Record, RelationType, Statement,
};

fn nodes(records: Vec<Record>, variable: &str) -> Vec<Node> {
    records
        .into_iter()
        .filter_map(|r| r.node(variable).cloned())
        .collect()
}

/// The Contributor's string id, if it has one
pub(crate) fn contributor_id(node: &Node) -> Option<String> {
    node.get_property(CONTRIBUTOR_ID_KEY)
        .and_then(|v| v.as_string())
        .map(str::to_string)
}

/// Load the Contributor with `id`; `None` when it does not exist
pub(crate) async fn find_contributor(
    tx: &mut dyn GraphTransaction,
    id: &str,
) -> MigrationResult<Option<Node>> {
    let records = tx
        .run(Statement::MatchByProperty {
            label: EntityLabel::Contributor,
            filter: PropertyFilter::equals(CONTRIBUTOR_ID_KEY, id),
        })
        .await?;

    let mut found = nodes(records, "n");
    match found.len() {
        0 => Ok(None),
        1 => Ok(found.pop()),
        count => Err(MigrationError::DuplicateContributor {
            id: id.to_string(),
            count,
        }),
    }
}

/// Aliases linked to the Contributor node, optionally only primary ones
pub(crate) async fn aliases_of(
    tx: &mut dyn GraphTransaction,
    contributor: NodeId,
    primary_only: bool,
) -> MigrationResult<Vec<Node>> {
    let records = tx
        .run(Statement::MatchNeighbors {
            node: contributor,
            relation: RelationType::AliasOf,
            direction: EdgeDirection::Incoming,
            neighbor: EntityLabel::Alias,
            filter: primary_only.then(|| PropertyFilter::equals(IS_PRIMARY_KEY, true)),
        })
        .await?;
    Ok(nodes(records, "m"))
}

/// Contributors an alias points at
pub(crate) async fn owners_of(
    tx: &mut dyn GraphTransaction,
    alias: NodeId,
) -> MigrationResult<Vec<Node>> {
    let records = tx
        .run(Statement::MatchNeighbors {
            node: alias,
            relation: RelationType::AliasOf,
            direction: EdgeDirection::Outgoing,
            neighbor: EntityLabel::Contributor,
            filter: None,
        })
        .await?;
    Ok(nodes(records, "m"))
}

/// Every node carrying `label`, in discovery order
pub(crate) async fn all_with_label(
    tx: &mut dyn GraphTransaction,
    label: EntityLabel,
) -> MigrationResult<Vec<Node>> {
    match_nodes(tx, Statement::MatchLabel { label }).await
}

/// Whether the alias node is marked primary
pub(crate) fn is_primary(alias: &Node) -> bool {
    alias
        .get_property(IS_PRIMARY_KEY)
        .and_then(|v| v.as_boolean())
        .unwrap_or(false)
}

/// Collect records of a `MATCH ... RETURN n` statement as nodes
pub(crate) async fn match_nodes(
    tx: &mut dyn GraphTransaction,
    statement: Statement,
) -> MigrationResult<Vec<Node>> {
    let records = tx.run(statement).await?;
    Ok(nodes(records, "n"))
}
