//! Backward transaction: fold a Contributor's primary alias back onto it

use super::error::{MigrationError, MigrationOutcome, MigrationResult, SkipReason};
use super::identity::IdentityFields;
use super::lookup::{aliases_of, find_contributor};
use crate::session::{GraphTransaction, Statement};
use tracing::debug;

/// Revert one Contributor inside `tx`.
///
/// Copies the primary alias's identity fields onto the Contributor, then
/// detach-deletes the alias, which removes its `ALIAS_OF` edge with it.
/// Fields absent on the alias stay absent on the Contributor. Non-primary
/// aliases are left alone.
pub async fn revert(tx: &mut dyn GraphTransaction, id: &str) -> MigrationResult<MigrationOutcome> {
    let Some(contributor) = find_contributor(tx, id).await? else {
        return Ok(MigrationOutcome::Skipped(SkipReason::NotFound));
    };

    let mut primaries = aliases_of(tx, contributor.id, true).await?;
    let alias = match primaries.len() {
        0 => return Ok(MigrationOutcome::Skipped(SkipReason::NoPrimaryAlias)),
        1 => primaries.remove(0),
        count => {
            return Err(MigrationError::AmbiguousPrimaryAlias {
                id: id.to_string(),
                count,
            })
        }
    };

    let identity = IdentityFields::from_properties(&format!("alias of {id}"), &alias.properties)?;

    tx.run(Statement::SetProperties {
        node: contributor.id,
        properties: identity.to_properties(),
    })
    .await?;
    tx.run(Statement::DetachDelete { node: alias.id }).await?;

    debug!(contributor = id, alias = %alias.id, "Primary alias folded back");
    Ok(MigrationOutcome::Applied)
}
