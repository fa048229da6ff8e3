//! Contributor identity alias migration
//!
//! Moves identity-bearing fields (`openid`, `email`, `affiliation`,
//! `first_name`, `last_name`) from a Contributor node onto a primary Alias
//! node linked by `ALIAS_OF`, and back again.
//!
//! - [`selector`] finds the Contributors eligible for a pass
//! - [`forward`] and [`backward`] are the two per-entity transactions
//! - [`driver`] runs them singly or in batches
//! - [`view`] resolves a Contributor's effective identity and audits the graph

pub mod backward;
pub mod driver;
pub mod error;
pub mod forward;
pub mod identity;
mod lookup;
pub mod selector;
pub mod view;

pub use driver::{
    BatchReport, FailedEntity, MigrationDriver, PlannedEntity, PlannedOutcome, SkippedEntity,
};
pub use error::{MigrationError, MigrationOutcome, MigrationResult, SkipReason};
pub use identity::{IdentityFields, CONTRIBUTOR_ID_KEY, IDENTITY_FIELDS, IS_PRIMARY_KEY};
pub use selector::{candidates, Direction};
pub use view::{
    audit, resolve_contributor, AliasView, AuditReport, ContributorKey, ContributorView, Violation,
    ViolationKind,
};
