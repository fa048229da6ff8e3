//! Node implementation for property graph

use super::property::{PropertyMap, PropertyValue};
use super::types::{Label, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A node in the property graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier for this node
    pub id: NodeId,

    /// Set of labels for this node
    pub labels: HashSet<Label>,

    /// Properties associated with this node
    #[serde(default)]
    pub properties: PropertyMap,

    /// Creation timestamp (Unix milliseconds)
    #[serde(default)]
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    #[serde(default)]
    pub updated_at: i64,
}

impl Node {
    /// Create a new node with a single label
    pub fn new(id: NodeId, label: impl Into<Label>) -> Self {
        Self::new_with_properties(id, vec![label.into()], PropertyMap::new())
    }

    /// Create a new node with labels and properties
    pub fn new_with_properties(id: NodeId, labels: Vec<Label>, properties: PropertyMap) -> Self {
        let now = chrono::Utc::now().timestamp_millis();

        Node {
            id,
            labels: labels.into_iter().collect(),
            properties,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if node has a specific label
    pub fn has_label(&self, label: &Label) -> bool {
        self.labels.contains(label)
    }

    /// Set a property value, returning the previous one
    pub fn set_property(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        let old = self.properties.insert(key.into(), value.into());
        self.touch();
        old
    }

    /// Get a property value
    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Remove a property
    pub fn remove_property(&mut self, key: &str) -> Option<PropertyValue> {
        let removed = self.properties.remove(key);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    /// A property counts as present only when it holds a non-null value.
    pub fn has_property(&self, key: &str) -> bool {
        self.properties.get(key).is_some_and(|v| !v.is_null())
    }

    fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().timestamp_millis();
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl std::hash::Hash for Node {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_node_single_label() {
        let node = Node::new(NodeId::new(1), "Contributor");
        assert_eq!(node.id, NodeId::new(1));
        assert_eq!(node.labels.len(), 1);
        assert!(node.has_label(&Label::new("Contributor")));
        assert!(node.created_at > 0);
    }

    #[test]
    fn test_node_properties() {
        let mut node = Node::new(NodeId::new(2), "Contributor");

        assert_eq!(node.set_property("openid", "abc"), None);
        let old = node.set_property("openid", "def");
        assert_eq!(old, Some(PropertyValue::from("abc")));

        assert!(node.has_property("openid"));
        assert!(node.remove_property("openid").is_some());
        assert!(!node.has_property("openid"));
        assert!(node.remove_property("openid").is_none());
    }

    #[test]
    fn test_null_property_is_absent() {
        let mut node = Node::new(NodeId::new(3), "Contributor");
        node.set_property("email", PropertyValue::Null);
        assert!(node.get_property("email").is_some());
        assert!(!node.has_property("email"));
    }

    #[test]
    fn test_node_equality_by_id() {
        let a = Node::new(NodeId::new(7), "Alias");
        let b = Node::new(NodeId::new(7), "Contributor");
        let c = Node::new(NodeId::new(8), "Alias");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
