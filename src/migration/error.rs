//! Outcomes and errors of migration operations

use crate::session::SessionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a single-entity operation left the graph untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No Contributor carries the requested id
    NotFound,
    /// Neither `openid` nor `email` is present on the Contributor
    NoIdentity,
    /// The Contributor already has a primary alias
    PrimaryAliasExists,
    /// The Contributor has no primary alias to revert
    NoPrimaryAlias,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::NotFound => "contributor not found",
            SkipReason::NoIdentity => "no openid or email to migrate",
            SkipReason::PrimaryAliasExists => "primary alias already exists",
            SkipReason::NoPrimaryAlias => "no primary alias to revert",
        };
        f.write_str(text)
    }
}

/// Result of a forward or backward transaction on one Contributor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum MigrationOutcome {
    /// The graph was rewritten
    Applied,
    /// Nothing was changed
    Skipped(SkipReason),
}

impl MigrationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MigrationOutcome::Applied)
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            MigrationOutcome::Applied => None,
            MigrationOutcome::Skipped(reason) => Some(*reason),
        }
    }
}

impl From<MigrationOutcome> for bool {
    fn from(outcome: MigrationOutcome) -> bool {
        outcome.is_applied()
    }
}

/// Failures that abort a single-entity operation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MigrationError {
    /// Connection loss, conflict or constraint violation in the store
    #[error("Store failure: {0}")]
    Store(#[from] SessionError),

    /// An identity field holds something other than a string
    #[error("{owner}: field '{field}' holds a {found} value, expected a string")]
    MalformedField {
        owner: String,
        field: &'static str,
        found: &'static str,
    },

    /// More than one primary alias points at the Contributor
    #[error("Contributor {id} has {count} primary aliases")]
    AmbiguousPrimaryAlias { id: String, count: usize },

    /// More than one Contributor carries the id
    #[error("Contributor id {id} is not unique ({count} matches)")]
    DuplicateContributor { id: String, count: usize },
}

pub type MigrationResult<T> = Result<T, MigrationError>;
