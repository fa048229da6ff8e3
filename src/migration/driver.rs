//! Migration driver
//!
//! Runs the forward and backward transactions one Contributor at a time, each
//! inside its own graph transaction. Batch passes select candidates first and
//! then walk them sequentially; a failure never leaks into the next entity.

use super::backward;
use super::error::{MigrationError, MigrationOutcome, MigrationResult, SkipReason};
use super::forward;
use super::selector::{candidates, Direction};
use crate::config::{FailurePolicy, MigrationConfig};
use crate::session::{GraphSession, GraphTransaction};
use serde::Serialize;
use tracing::{error, info, warn};

/// A candidate that was left untouched
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntity {
    pub id: String,
    pub reason: SkipReason,
}

/// A candidate whose transaction failed and was rolled back
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedEntity {
    pub id: String,
    pub error: String,
}

/// Summary of one batch pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub direction: Direction,
    pub dry_run: bool,
    pub applied: Vec<String>,
    pub skipped: Vec<SkippedEntity>,
    pub failed: Vec<FailedEntity>,
    /// Stopped early under [`FailurePolicy::Abort`]
    pub aborted: bool,
}

impl BatchReport {
    fn new(direction: Direction, dry_run: bool) -> Self {
        Self {
            direction,
            dry_run,
            applied: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            aborted: false,
        }
    }

    /// Number of candidates the pass looked at
    pub fn processed(&self) -> usize {
        self.applied.len() + self.skipped.len() + self.failed.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Outcome one candidate would have, computed without committing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedEntity {
    pub id: String,
    #[serde(flatten)]
    pub outcome: PlannedOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum PlannedOutcome {
    Apply,
    Skip(SkipReason),
    Fail(String),
}

/// Drives migrations against a graph session
pub struct MigrationDriver<S: GraphSession> {
    session: S,
    config: MigrationConfig,
}

impl<S: GraphSession> MigrationDriver<S> {
    pub fn new(session: S, config: MigrationConfig) -> Self {
        Self { session, config }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Move one Contributor's identity onto a new primary alias
    pub async fn migrate_one(&self, id: &str) -> MigrationResult<MigrationOutcome> {
        self.run_one(Direction::Forward, id, self.config.dry_run).await
    }

    /// Fold one Contributor's primary alias back onto it
    pub async fn revert_one(&self, id: &str) -> MigrationResult<MigrationOutcome> {
        self.run_one(Direction::Backward, id, self.config.dry_run).await
    }

    /// Migrate every Contributor that still carries an `openid`
    pub async fn migrate_all(&self) -> MigrationResult<BatchReport> {
        self.run_all(Direction::Forward).await
    }

    /// Revert every Contributor that has a primary alias
    pub async fn revert_all(&self) -> MigrationResult<BatchReport> {
        self.run_all(Direction::Backward).await
    }

    /// Outcome each candidate would have, without mutating anything
    pub async fn plan_all(&self, direction: Direction) -> MigrationResult<Vec<PlannedEntity>> {
        let ids = self.select(direction).await?;
        let mut plan = Vec::with_capacity(ids.len());
        for id in ids {
            let outcome = match self.run_one(direction, &id, true).await {
                Ok(MigrationOutcome::Applied) => PlannedOutcome::Apply,
                Ok(MigrationOutcome::Skipped(reason)) => PlannedOutcome::Skip(reason),
                Err(e) => PlannedOutcome::Fail(e.to_string()),
            };
            plan.push(PlannedEntity { id, outcome });
        }
        info!(%direction, candidates = plan.len(), "Plan computed");
        Ok(plan)
    }

    async fn select(&self, direction: Direction) -> MigrationResult<Vec<String>> {
        let mut tx = self.session.begin().await?;
        let selected = candidates(tx.as_mut(), direction).await;
        // read-only, nothing to keep
        if let Err(e) = tx.rollback().await {
            warn!("Rollback of candidate selection failed: {}", e);
        }
        selected
    }

    async fn run_all(&self, direction: Direction) -> MigrationResult<BatchReport> {
        let ids = self.select(direction).await?;
        info!(%direction, candidates = ids.len(), dry_run = self.config.dry_run, "Starting batch");

        let mut report = BatchReport::new(direction, self.config.dry_run);
        for id in ids {
            match self.run_one(direction, &id, self.config.dry_run).await {
                Ok(MigrationOutcome::Applied) => report.applied.push(id),
                Ok(MigrationOutcome::Skipped(reason)) => {
                    report.skipped.push(SkippedEntity { id, reason })
                }
                Err(e) => {
                    report.failed.push(FailedEntity {
                        id,
                        error: e.to_string(),
                    });
                    if self.config.failure_policy == FailurePolicy::Abort {
                        warn!(%direction, "Aborting batch after failure");
                        report.aborted = true;
                        break;
                    }
                }
            }
        }

        info!(
            %direction,
            applied = report.applied.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            aborted = report.aborted,
            "Batch finished"
        );
        Ok(report)
    }

    async fn run_one(
        &self,
        direction: Direction,
        id: &str,
        dry_run: bool,
    ) -> MigrationResult<MigrationOutcome> {
        let mut tx = self.session.begin().await?;
        let result = match direction {
            Direction::Forward => forward::migrate(tx.as_mut(), id).await,
            Direction::Backward => backward::revert(tx.as_mut(), id).await,
        };

        // A failed commit counts as a failed entity, same as a failed statement
        let result = match result {
            Ok(outcome) => finish(tx.as_mut(), outcome, dry_run).await.map(|()| outcome),
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(id, "Rollback after failure also failed: {}", rollback);
                }
                Err(e)
            }
        };

        match &result {
            Ok(MigrationOutcome::Applied) if dry_run => {
                info!(%direction, id, "Would apply (dry run)")
            }
            Ok(MigrationOutcome::Applied) => info!(%direction, id, "Applied"),
            Ok(MigrationOutcome::Skipped(reason)) => {
                warn!(%direction, id, %reason, "Skipped")
            }
            Err(e) => error!(%direction, id, "Failed: {}", e),
        }
        result
    }
}

async fn finish(
    tx: &mut dyn GraphTransaction,
    outcome: MigrationOutcome,
    dry_run: bool,
) -> MigrationResult<()> {
    if outcome.is_applied() && !dry_run {
        tx.commit().await.map_err(MigrationError::from)
    } else {
        tx.rollback().await.map_err(MigrationError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphStore, PropertyMap, PropertyValue};
    use crate::session::{EntityLabel, MemorySession};

    fn session(contributors: &[(&str, Option<&str>)]) -> MemorySession {
        let mut store = GraphStore::new();
        for (id, openid) in contributors {
            let mut props = PropertyMap::new();
            props.insert("id".to_string(), (*id).into());
            props.insert("openid".to_string(), PropertyValue::from(*openid));
            store.create_node_with_properties(vec![EntityLabel::Contributor.to_label()], props);
        }
        MemorySession::new(store)
    }

    #[tokio::test]
    async fn test_migrate_then_revert_all() {
        let driver = MigrationDriver::new(
            session(&[("a", Some("oa")), ("b", None), ("c", Some("oc"))]),
            MigrationConfig::default(),
        );

        let report = driver.migrate_all().await.unwrap();
        assert_eq!(report.applied, vec!["a".to_string(), "c".to_string()]);
        assert!(report.skipped.is_empty());
        assert!(!report.has_failures());
        assert_eq!(report.processed(), 2);

        let report = driver.revert_all().await.unwrap();
        assert_eq!(report.applied, vec!["a".to_string(), "c".to_string()]);

        let store = driver.session().store().read().await;
        assert_eq!(store.edge_count(), 0);
        assert_eq!(store.node_count(), 3);
    }

    #[tokio::test]
    async fn test_dry_run_rolls_back() {
        let driver = MigrationDriver::new(
            session(&[("a", Some("oa"))]),
            MigrationConfig::default().with_dry_run(true),
        );

        assert_eq!(driver.migrate_one("a").await.unwrap(), MigrationOutcome::Applied);
        let report = driver.migrate_all().await.unwrap();
        assert!(report.dry_run);
        assert_eq!(report.applied, vec!["a".to_string()]);

        let store = driver.session().store().read().await;
        assert_eq!(store.node_count(), 1);
        assert_eq!(store.edge_count(), 0);
    }

    #[tokio::test]
    async fn test_plan_does_not_mutate() {
        let driver = MigrationDriver::new(
            session(&[("a", Some("oa")), ("b", Some(""))]),
            MigrationConfig::default(),
        );

        let plan = driver.plan_all(Direction::Forward).await.unwrap();
        assert_eq!(
            plan,
            vec![
                PlannedEntity {
                    id: "a".to_string(),
                    outcome: PlannedOutcome::Apply
                },
                PlannedEntity {
                    id: "b".to_string(),
                    outcome: PlannedOutcome::Skip(SkipReason::NoIdentity)
                },
            ]
        );
        assert_eq!(driver.session().store().read().await.node_count(), 2);
    }

    #[tokio::test]
    async fn test_single_entity_skips() {
        let driver = MigrationDriver::new(session(&[("a", None)]), MigrationConfig::default());
        assert_eq!(
            driver.migrate_one("a").await.unwrap(),
            MigrationOutcome::Skipped(SkipReason::NoIdentity)
        );
        assert_eq!(
            driver.revert_one("a").await.unwrap(),
            MigrationOutcome::Skipped(SkipReason::NoPrimaryAlias)
        );
        assert_eq!(
            driver.migrate_one("zz").await.unwrap(),
            MigrationOutcome::Skipped(SkipReason::NotFound)
        );
        assert_eq!(
            driver.revert_one("zz").await.unwrap(),
            MigrationOutcome::Skipped(SkipReason::NotFound)
        );
    }

    #[test]
    fn test_report_json() {
        let mut report = BatchReport::new(Direction::Backward, false);
        report.skipped.push(SkippedEntity {
            id: "x".to_string(),
            reason: SkipReason::NoPrimaryAlias,
        });
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["direction"], "backward");
        assert_eq!(json["skipped"][0]["reason"], "no_primary_alias");
        assert_eq!(json["aborted"], false);
    }
}
