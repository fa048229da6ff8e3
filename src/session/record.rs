//! Records returned by statement execution

use crate::graph::{Edge, Node};
use indexmap::IndexMap;

/// Value types that can be bound to a result variable
#[derive(Debug, Clone)]
pub enum Value {
    /// A fully materialized node
    Node(Node),
    /// A fully materialized edge
    Edge(Edge),
}

/// A single result row: variable bindings in projection order
#[derive(Debug, Clone, Default)]
pub struct Record {
    bindings: IndexMap<String, Value>,
}

impl Record {
    /// Create a new empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style bind
    pub fn with(mut self, variable: impl Into<String>, value: Value) -> Self {
        self.bind(variable, value);
        self
    }

    /// Bind a variable to a value
    pub fn bind(&mut self, variable: impl Into<String>, value: Value) {
        self.bindings.insert(variable.into(), value);
    }

    /// The node bound to `variable`, if it is a node
    pub fn node(&self, variable: &str) -> Option<&Node> {
        match self.bindings.get(variable) {
            Some(Value::Node(node)) => Some(node),
            _ => None,
        }
    }

    /// The edge bound to `variable`, if it is an edge
    pub fn edge(&self, variable: &str) -> Option<&Edge> {
        match self.bindings.get(variable) {
            Some(Value::Edge(edge)) => Some(edge),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeId, NodeId};

    #[test]
    fn test_typed_accessors() {
        let edge = Edge::new(EdgeId::new(1), NodeId::new(2), NodeId::new(1), "ALIAS_OF");
        let record = Record::new()
            .with("m", Value::Node(Node::new(NodeId::new(2), "Alias")))
            .with("r", Value::Edge(edge));

        assert_eq!(record.node("m").map(|n| n.id), Some(NodeId::new(2)));
        assert!(record.node("r").is_none());
        assert_eq!(record.edge("r").map(|e| e.id), Some(EdgeId::new(1)));
        assert!(record.edge("m").is_none());
        assert!(record.node("missing").is_none());
    }
}
