//! Read-side views over migrated and unmigrated Contributors
//!
//! Readers do not need to know whether a Contributor has been migrated yet:
//! the effective identity is the primary alias's fields when one exists and
//! the Contributor's own fields otherwise.

use super::error::{MigrationError, MigrationResult};
use super::identity::IdentityFields;
use super::lookup::{
    aliases_of, all_with_label, contributor_id, find_contributor, is_primary, match_nodes,
    owners_of,
};
use crate::graph::Node;
use crate::session::{EntityLabel, GraphTransaction, PropertyFilter, RelationType, Statement};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// How a caller names a Contributor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContributorKey {
    /// The stable `id` property
    Id(String),
    /// An OpenID URL held by the Contributor or one of its aliases
    OpenId(String),
}

impl ContributorKey {
    /// Anything starting with `http` is an OpenID URL, everything else an id
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http") {
            ContributorKey::OpenId(raw.to_string())
        } else {
            ContributorKey::Id(raw.to_string())
        }
    }
}

impl fmt::Display for ContributorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContributorKey::Id(id) => write!(f, "id {id}"),
            ContributorKey::OpenId(openid) => write!(f, "openid {openid}"),
        }
    }
}

/// One alias as seen from its Contributor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasView {
    pub is_primary: bool,
    pub identity: IdentityFields,
}

/// A Contributor with its effective identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContributorView {
    pub id: String,
    /// Primary alias fields when migrated, own fields otherwise
    pub identity: IdentityFields,
    pub migrated: bool,
    /// Primary alias first, then the rest in discovery order
    pub aliases: Vec<AliasView>,
}

/// Resolve `key` to a view; `None` when no Contributor matches
pub async fn resolve_contributor(
    tx: &mut dyn GraphTransaction,
    key: &ContributorKey,
) -> MigrationResult<Option<ContributorView>> {
    let node = match key {
        ContributorKey::Id(id) => find_contributor(tx, id).await?,
        ContributorKey::OpenId(openid) => find_by_openid(tx, openid).await?,
    };
    let Some(node) = node else {
        debug!("No contributor for {}", key);
        return Ok(None);
    };
    build_view(tx, node).await.map(Some)
}

async fn find_by_openid(
    tx: &mut dyn GraphTransaction,
    openid: &str,
) -> MigrationResult<Option<Node>> {
    // Migrated contributors are reached through their aliases
    let via_alias = match_nodes(
        tx,
        Statement::MatchTargets {
            source: EntityLabel::Alias,
            relation: RelationType::AliasOf,
            target: EntityLabel::Contributor,
            filter: Some(PropertyFilter::equals("openid", openid)),
        },
    )
    .await?;
    if let Some(node) = via_alias.into_iter().next() {
        return Ok(Some(node));
    }

    let own = match_nodes(
        tx,
        Statement::MatchByProperty {
            label: EntityLabel::Contributor,
            filter: PropertyFilter::equals("openid", openid),
        },
    )
    .await?;
    Ok(own.into_iter().next())
}

async fn build_view(tx: &mut dyn GraphTransaction, node: Node) -> MigrationResult<ContributorView> {
    let id = contributor_id(&node).unwrap_or_else(|| node.id.to_string());
    let own = IdentityFields::from_properties(&id, &node.properties)?;

    let mut aliases = Vec::new();
    for alias in aliases_of(tx, node.id, false).await? {
        let identity =
            IdentityFields::from_properties(&format!("alias of {id}"), &alias.properties)?;
        aliases.push(AliasView {
            is_primary: is_primary(&alias),
            identity,
        });
    }
    // stable sort keeps discovery order within each group
    aliases.sort_by_key(|a| !a.is_primary);

    let primaries = aliases.iter().filter(|a| a.is_primary).count();
    if primaries > 1 {
        return Err(MigrationError::AmbiguousPrimaryAlias { id, count: primaries });
    }

    let (identity, migrated) = match aliases.first() {
        Some(primary) if primary.is_primary => (primary.identity.clone(), true),
        _ => (own, false),
    };

    Ok(ContributorView {
        id,
        identity,
        migrated,
        aliases,
    })
}

/// A broken data-model invariant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum ViolationKind {
    /// Identity fields on the Contributor and a primary alias at once
    IdentityOnBothSides,
    /// More than one primary alias
    MultiplePrimaryAliases(usize),
    /// An alias with no ALIAS_OF edge
    OrphanedAlias,
    /// An alias linked to more than one Contributor
    MultipleAliasTargets(usize),
    /// An identity field that is not a string
    MalformedField(String),
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::IdentityOnBothSides => {
                f.write_str("identity fields on contributor and primary alias")
            }
            ViolationKind::MultiplePrimaryAliases(n) => write!(f, "{n} primary aliases"),
            ViolationKind::OrphanedAlias => f.write_str("alias without ALIAS_OF edge"),
            ViolationKind::MultipleAliasTargets(n) => write!(f, "alias linked to {n} contributors"),
            ViolationKind::MalformedField(detail) => f.write_str(detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Contributor id, or the node id for aliases
    pub entity: String,
    pub kind: ViolationKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub contributors: usize,
    pub migrated: usize,
    pub aliases: usize,
    pub violations: Vec<Violation>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Walk the whole graph and report every broken invariant. Read-only.
pub async fn audit(tx: &mut dyn GraphTransaction) -> MigrationResult<AuditReport> {
    let mut report = AuditReport::default();

    for node in all_with_label(tx, EntityLabel::Contributor).await? {
        report.contributors += 1;
        let entity = contributor_id(&node).unwrap_or_else(|| node.id.to_string());

        let own = match IdentityFields::from_properties(&entity, &node.properties) {
            Ok(fields) => fields,
            Err(e) => {
                report.violations.push(Violation {
                    entity,
                    kind: ViolationKind::MalformedField(e.to_string()),
                });
                continue;
            }
        };

        let primaries = aliases_of(tx, node.id, true).await?.len();
        if primaries > 0 {
            report.migrated += 1;
        }
        if primaries > 1 {
            report.violations.push(Violation {
                entity: entity.clone(),
                kind: ViolationKind::MultiplePrimaryAliases(primaries),
            });
        }
        if primaries > 0 && !own.is_empty() {
            report.violations.push(Violation {
                entity,
                kind: ViolationKind::IdentityOnBothSides,
            });
        }
    }

    for alias in all_with_label(tx, EntityLabel::Alias).await? {
        report.aliases += 1;
        let entity = alias.id.to_string();

        match owners_of(tx, alias.id).await?.len() {
            0 => report.violations.push(Violation {
                entity: entity.clone(),
                kind: ViolationKind::OrphanedAlias,
            }),
            1 => {}
            n => report.violations.push(Violation {
                entity: entity.clone(),
                kind: ViolationKind::MultipleAliasTargets(n),
            }),
        }

        if let Err(e) = IdentityFields::from_properties(&entity, &alias.properties) {
            report.violations.push(Violation {
                entity,
                kind: ViolationKind::MalformedField(e.to_string()),
            });
        }
    }

    debug!(
        contributors = report.contributors,
        aliases = report.aliases,
        violations = report.violations.len(),
        "Audit finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphStore, NodeId, PropertyMap, PropertyValue};
    use crate::migration::identity::IS_PRIMARY_KEY;
    use crate::session::{GraphSession, MemorySession};

    fn contributor(store: &mut GraphStore, pairs: &[(&str, &str)]) -> NodeId {
        let props: PropertyMap = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), PropertyValue::from(*v)))
            .collect();
        store.create_node_with_properties(vec![EntityLabel::Contributor.to_label()], props)
    }

    fn alias(store: &mut GraphStore, owner: Option<NodeId>, primary: bool, openid: &str) -> NodeId {
        let mut props = PropertyMap::new();
        props.insert(IS_PRIMARY_KEY.to_string(), primary.into());
        props.insert("openid".to_string(), openid.into());
        let a = store.create_node_with_properties(vec![EntityLabel::Alias.to_label()], props);
        if let Some(owner) = owner {
            store
                .create_edge(a, owner, RelationType::AliasOf.to_edge_type())
                .unwrap();
        }
        a
    }

    #[test]
    fn test_key_parsing() {
        assert_eq!(
            ContributorKey::parse("https://id.example.org/ada"),
            ContributorKey::OpenId("https://id.example.org/ada".to_string())
        );
        assert_eq!(ContributorKey::parse("u1"), ContributorKey::Id("u1".to_string()));
    }

    #[tokio::test]
    async fn test_view_before_and_after_migration() {
        let mut store = GraphStore::new();
        contributor(&mut store, &[("id", "u1"), ("openid", "http://a"), ("first_name", "Ada")]);
        let migrated = contributor(&mut store, &[("id", "u2")]);
        alias(&mut store, Some(migrated), false, "http://old");
        alias(&mut store, Some(migrated), true, "http://b");
        let session = MemorySession::new(store);

        let mut tx = session.begin().await.unwrap();
        let u1 = resolve_contributor(tx.as_mut(), &ContributorKey::parse("u1"))
            .await
            .unwrap()
            .unwrap();
        assert!(!u1.migrated);
        assert_eq!(u1.identity.first_name.as_deref(), Some("Ada"));
        assert!(u1.aliases.is_empty());

        let u2 = resolve_contributor(tx.as_mut(), &ContributorKey::parse("u2"))
            .await
            .unwrap()
            .unwrap();
        assert!(u2.migrated);
        assert_eq!(u2.identity.openid.as_deref(), Some("http://b"));
        assert_eq!(u2.aliases.len(), 2);
        assert!(u2.aliases[0].is_primary);
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_lookup_by_openid_on_either_side() {
        let mut store = GraphStore::new();
        contributor(&mut store, &[("id", "u1"), ("openid", "http://a")]);
        let u2 = contributor(&mut store, &[("id", "u2")]);
        alias(&mut store, Some(u2), false, "http://legacy");
        let session = MemorySession::new(store);

        let mut tx = session.begin().await.unwrap();
        let by_own = resolve_contributor(tx.as_mut(), &ContributorKey::parse("http://a"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_own.id, "u1");

        let by_alias = resolve_contributor(tx.as_mut(), &ContributorKey::parse("http://legacy"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_alias.id, "u2");

        let missing = resolve_contributor(tx.as_mut(), &ContributorKey::parse("http://none"))
            .await
            .unwrap();
        assert!(missing.is_none());
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_audit_reports_violations() {
        let mut store = GraphStore::new();
        contributor(&mut store, &[("id", "clean"), ("openid", "http://c")]);
        let both = contributor(&mut store, &[("id", "both"), ("email", "x@y.z")]);
        alias(&mut store, Some(both), true, "http://both");
        let twice = contributor(&mut store, &[("id", "twice")]);
        alias(&mut store, Some(twice), true, "http://1");
        alias(&mut store, Some(twice), true, "http://2");
        alias(&mut store, None, false, "http://orphan");
        let session = MemorySession::new(store);

        let mut tx = session.begin().await.unwrap();
        let report = audit(tx.as_mut()).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(report.contributors, 3);
        assert_eq!(report.migrated, 2);
        assert_eq!(report.aliases, 4);
        assert!(!report.is_clean());

        let kinds: Vec<&ViolationKind> = report.violations.iter().map(|v| &v.kind).collect();
        assert_eq!(
            kinds,
            vec![
                &ViolationKind::IdentityOnBothSides,
                &ViolationKind::MultiplePrimaryAliases(2),
                &ViolationKind::OrphanedAlias,
            ]
        );
        assert_eq!(report.violations[0].entity, "both");
    }

    #[tokio::test]
    async fn test_clean_graph_audit() {
        let session = MemorySession::default();
        let mut tx = session.begin().await.unwrap();
        let report = audit(tx.as_mut()).await.unwrap();
        assert!(report.is_clean());
        assert_eq!(report.contributors, 0);
        tx.rollback().await.unwrap();
    }
}
