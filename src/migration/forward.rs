//! Forward transaction: move a Contributor's identity onto a new primary alias

use super::error::{MigrationOutcome, MigrationResult, SkipReason};
use super::identity::{IdentityFields, IDENTITY_FIELDS, IS_PRIMARY_KEY};
use super::lookup::{aliases_of, find_contributor};
use crate::graph::PropertyValue;
use crate::session::{EntityLabel, GraphTransaction, RelationType, SessionError, Statement};
use tracing::debug;

/// Migrate one Contributor inside `tx`.
///
/// Reads the identity fields, checks the guard, then removes the fields from
/// the Contributor, creates the primary Alias with the captured values and
/// links it with `ALIAS_OF`. The caller owns commit and rollback; on a skip
/// nothing has been written.
pub async fn migrate(tx: &mut dyn GraphTransaction, id: &str) -> MigrationResult<MigrationOutcome> {
    let Some(contributor) = find_contributor(tx, id).await? else {
        return Ok(MigrationOutcome::Skipped(SkipReason::NotFound));
    };

    let identity = IdentityFields::from_properties(id, &contributor.properties)?;
    if !identity.has_migratable_identity() {
        return Ok(MigrationOutcome::Skipped(SkipReason::NoIdentity));
    }

    // Never create a second primary alias
    if !aliases_of(tx, contributor.id, true).await?.is_empty() {
        return Ok(MigrationOutcome::Skipped(SkipReason::PrimaryAliasExists));
    }

    tx.run(Statement::RemoveProperties {
        node: contributor.id,
        keys: IDENTITY_FIELDS.iter().map(|f| f.to_string()).collect(),
    })
    .await?;

    let mut properties = identity.to_properties();
    properties.insert(IS_PRIMARY_KEY.to_string(), PropertyValue::Boolean(true));
    let created = tx
        .run(Statement::CreateNode {
            label: EntityLabel::Alias,
            properties,
        })
        .await?;
    let alias = created
        .first()
        .and_then(|r| r.node("n"))
        .map(|n| n.id)
        .ok_or_else(|| SessionError::Constraint("alias creation returned no node".to_string()))?;

    let linked = tx
        .run(Statement::CreateEdge {
            source: alias,
            target: contributor.id,
            relation: RelationType::AliasOf,
        })
        .await?;
    let edge = linked
        .first()
        .and_then(|r| r.edge("r"))
        .map(|e| e.id)
        .ok_or_else(|| SessionError::Constraint("alias link returned no edge".to_string()))?;

    debug!(contributor = id, alias = %alias, edge = %edge, "Identity moved to primary alias");
    Ok(MigrationOutcome::Applied)
}
