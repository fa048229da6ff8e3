//! Parameterized graph statements
//!
//! Labels and relationship types are closed enumerations; everything else is a
//! bound parameter. Each variant documents the Cypher it stands for and the
//! variables bound in its result records.

use crate::graph::{EdgeType, Label, NodeId, PropertyMap, PropertyValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Node labels a statement may address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityLabel {
    Contributor,
    Alias,
}

impl EntityLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityLabel::Contributor => "Contributor",
            EntityLabel::Alias => "Alias",
        }
    }

    pub fn to_label(self) -> Label {
        Label::new(self.as_str())
    }
}

impl fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Contributor" => Ok(EntityLabel::Contributor),
            "Alias" => Ok(EntityLabel::Alias),
            other => Err(format!("unknown entity label: {other}")),
        }
    }
}

/// Relationship types a statement may address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationType {
    AliasOf,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::AliasOf => "ALIAS_OF",
        }
    }

    pub fn to_edge_type(self) -> EdgeType {
        EdgeType::new(self.as_str())
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of an edge relative to the anchor node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    /// `(m)-[r]->(n)`
    Incoming,
    /// `(n)-[r]->(m)`
    Outgoing,
}

/// Equality predicate on a single property
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyFilter {
    pub key: String,
    pub value: PropertyValue,
}

impl PropertyFilter {
    pub fn equals(key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A graph statement with its parameters bound
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `MATCH (n:<label>) RETURN n`
    MatchLabel { label: EntityLabel },

    /// `MATCH (n:<label> {<key>: $value}) RETURN n`
    MatchByProperty {
        label: EntityLabel,
        filter: PropertyFilter,
    },

    /// `MATCH (n:<label>) WHERE n.<key> IS NOT NULL RETURN n`
    MatchWithProperty { label: EntityLabel, key: String },

    /// `MATCH (n)<-[r:<relation>]-(m:<neighbor>) WHERE id(n) = $node`
    /// `[AND m.<key> = $value] RETURN m, r` (arrow reversed for `Outgoing`)
    MatchNeighbors {
        node: NodeId,
        relation: RelationType,
        direction: EdgeDirection,
        neighbor: EntityLabel,
        filter: Option<PropertyFilter>,
    },

    /// `MATCH (s:<source>)-[:<relation>]->(n:<target>) [WHERE s.<key> = $value] RETURN DISTINCT n`
    MatchTargets {
        source: EntityLabel,
        relation: RelationType,
        target: EntityLabel,
        filter: Option<PropertyFilter>,
    },

    /// `CREATE (n:<label> $properties) RETURN n`
    CreateNode {
        label: EntityLabel,
        properties: PropertyMap,
    },

    /// `MATCH (s), (t) WHERE id(s) = $source AND id(t) = $target`
    /// `CREATE (s)-[r:<relation>]->(t) RETURN r`
    CreateEdge {
        source: NodeId,
        target: NodeId,
        relation: RelationType,
    },

    /// `MATCH (n) WHERE id(n) = $node SET n += $properties RETURN n`
    SetProperties { node: NodeId, properties: PropertyMap },

    /// `MATCH (n) WHERE id(n) = $node REMOVE n.<key>, ... RETURN n`
    RemoveProperties { node: NodeId, keys: Vec<String> },

    /// `MATCH (n) WHERE id(n) = $node DETACH DELETE n`
    DetachDelete { node: NodeId },
}

impl Statement {
    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::MatchLabel { .. } => "match_label",
            Statement::MatchByProperty { .. } => "match_by_property",
            Statement::MatchWithProperty { .. } => "match_with_property",
            Statement::MatchNeighbors { .. } => "match_neighbors",
            Statement::MatchTargets { .. } => "match_targets",
            Statement::CreateNode { .. } => "create_node",
            Statement::CreateEdge { .. } => "create_edge",
            Statement::SetProperties { .. } => "set_properties",
            Statement::RemoveProperties { .. } => "remove_properties",
            Statement::DetachDelete { .. } => "detach_delete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_closed_set() {
        assert_eq!("Alias".parse::<EntityLabel>(), Ok(EntityLabel::Alias));
        assert!("Alias) DETACH DELETE (x".parse::<EntityLabel>().is_err());
        assert_eq!(EntityLabel::Contributor.to_label().as_str(), "Contributor");
        assert_eq!(RelationType::AliasOf.to_edge_type().as_str(), "ALIAS_OF");
    }

    #[test]
    fn test_statement_kind() {
        let read = Statement::MatchLabel { label: EntityLabel::Alias };
        let write = Statement::DetachDelete { node: NodeId::new(1) };
        assert_eq!(read.kind(), "match_label");
        assert_eq!(write.kind(), "detach_delete");
    }
}
