//! In-memory graph storage implementation

use super::edge::Edge;
use super::node::Node;
use super::property::{PropertyMap, PropertyValue};
use super::types::{EdgeId, EdgeType, Label, NodeId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

/// Highest id the store accepts; ids are signed 64-bit in external stores
pub const MAX_ID: u64 = i64::MAX as u64;

/// Errors that can occur during graph operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Edge {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("Node {0} already exists")]
    NodeAlreadyExists(NodeId),

    #[error("Edge {0} already exists")]
    EdgeAlreadyExists(EdgeId),

    #[error("Invalid edge: source node {0} does not exist")]
    InvalidEdgeSource(NodeId),

    #[error("Invalid edge: target node {0} does not exist")]
    InvalidEdgeTarget(NodeId),

    #[error("Id {0} is outside the supported range")]
    IdOutOfRange(u64),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// In-memory graph storage
///
/// Keyed by id, so loaded ids may be sparse:
/// - nodes / edges: ordered maps, iteration follows id order
/// - outgoing / incoming: adjacency lists per node
/// - label_index / edge_type_index: ordered sets, so scans follow discovery order
///
/// Ids are never reused after a delete.
#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeId, Edge>,
    outgoing: HashMap<NodeId, Vec<EdgeId>>,
    incoming: HashMap<NodeId, Vec<EdgeId>>,
    label_index: HashMap<Label, BTreeSet<NodeId>>,
    edge_type_index: HashMap<EdgeType, BTreeSet<EdgeId>>,
    next_node_id: u64,
    next_edge_id: u64,
}

/// Id after `id`, or an error when `id` is past [`MAX_ID`]
fn successor(id: u64) -> GraphResult<u64> {
    if id > MAX_ID {
        return Err(GraphError::IdOutOfRange(id));
    }
    id.checked_add(1).ok_or(GraphError::IdOutOfRange(id))
}

impl GraphStore {
    /// Create a new empty graph store
    pub fn new() -> Self {
        GraphStore {
            next_node_id: 1,
            next_edge_id: 1,
            ..Default::default()
        }
    }

    fn allocate_node_id(&mut self) -> NodeId {
        let id = NodeId::new(self.next_node_id.max(1));
        self.next_node_id = id.as_u64().saturating_add(1);
        id
    }

    fn allocate_edge_id(&mut self) -> EdgeId {
        let id = EdgeId::new(self.next_edge_id.max(1));
        self.next_edge_id = id.as_u64().saturating_add(1);
        id
    }

    /// Create a node with auto-generated ID and single label
    pub fn create_node(&mut self, label: impl Into<Label>) -> NodeId {
        self.create_node_with_properties(vec![label.into()], PropertyMap::new())
    }

    /// Create a node with multiple labels and properties
    pub fn create_node_with_properties(
        &mut self,
        labels: Vec<Label>,
        properties: PropertyMap,
    ) -> NodeId {
        let node_id = self.allocate_node_id();
        let node = Node::new_with_properties(node_id, labels, properties);
        self.place_node(node);
        node_id
    }

    fn place_node(&mut self, node: Node) {
        let node_id = node.id;
        for label in &node.labels {
            self.label_index
                .entry(label.clone())
                .or_default()
                .insert(node_id);
        }
        self.nodes.insert(node_id, node);
    }

    /// Get a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Get a mutable node by ID
    ///
    /// Label changes made through this handle bypass the label index.
    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Check if a node exists
    pub fn has_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Set a property on a node, returning the previous value
    pub fn set_node_property(
        &mut self,
        node_id: NodeId,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> GraphResult<Option<PropertyValue>> {
        let node = self
            .get_node_mut(node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        Ok(node.set_property(key, value))
    }

    /// Remove a property from a node, returning the removed value
    pub fn remove_node_property(
        &mut self,
        node_id: NodeId,
        key: &str,
    ) -> GraphResult<Option<PropertyValue>> {
        let node = self
            .get_node_mut(node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        Ok(node.remove_property(key))
    }

    /// Delete a node and all its connected edges
    ///
    /// Returns the node together with the edges that were removed alongside it.
    pub fn delete_node(&mut self, id: NodeId) -> GraphResult<(Node, Vec<Edge>)> {
        if !self.has_node(id) {
            return Err(GraphError::NodeNotFound(id));
        }

        let mut attached = self.outgoing.remove(&id).unwrap_or_default();
        attached.extend(self.incoming.remove(&id).unwrap_or_default());
        attached.sort();
        attached.dedup();

        let mut removed_edges = Vec::with_capacity(attached.len());
        for edge_id in attached {
            removed_edges.push(self.delete_edge(edge_id)?);
        }

        let node = self.nodes.remove(&id).ok_or(GraphError::NodeNotFound(id))?;
        for label in &node.labels {
            if let Some(set) = self.label_index.get_mut(label) {
                set.remove(&id);
            }
        }

        Ok((node, removed_edges))
    }

    /// Create an edge between two nodes
    pub fn create_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        edge_type: impl Into<EdgeType>,
    ) -> GraphResult<EdgeId> {
        // Validate nodes exist
        if !self.has_node(source) {
            return Err(GraphError::InvalidEdgeSource(source));
        }
        if !self.has_node(target) {
            return Err(GraphError::InvalidEdgeTarget(target));
        }

        let edge_id = self.allocate_edge_id();
        self.place_edge(Edge::new(edge_id, source, target, edge_type));
        Ok(edge_id)
    }

    fn place_edge(&mut self, edge: Edge) {
        let edge_id = edge.id;
        self.outgoing.entry(edge.source).or_default().push(edge_id);
        self.incoming.entry(edge.target).or_default().push(edge_id);
        self.edge_type_index
            .entry(edge.edge_type.clone())
            .or_default()
            .insert(edge_id);
        self.edges.insert(edge_id, edge);
    }

    /// Get an edge by ID
    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// Check if an edge exists
    pub fn has_edge(&self, id: EdgeId) -> bool {
        self.edges.contains_key(&id)
    }

    /// Delete an edge
    pub fn delete_edge(&mut self, id: EdgeId) -> GraphResult<Edge> {
        let edge = self.edges.remove(&id).ok_or(GraphError::EdgeNotFound(id))?;

        if let Some(list) = self.outgoing.get_mut(&edge.source) {
            list.retain(|e| *e != id);
        }
        if let Some(list) = self.incoming.get_mut(&edge.target) {
            list.retain(|e| *e != id);
        }
        if let Some(set) = self.edge_type_index.get_mut(&edge.edge_type) {
            set.remove(&id);
        }

        Ok(edge)
    }

    fn resolve_edges(&self, ids: Option<&Vec<EdgeId>>) -> Vec<&Edge> {
        ids.map(|ids| ids.iter().filter_map(|id| self.get_edge(*id)).collect())
            .unwrap_or_default()
    }

    /// Get all outgoing edges from a node
    pub fn get_outgoing_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.resolve_edges(self.outgoing.get(&node_id))
    }

    /// Get all incoming edges to a node
    pub fn get_incoming_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.resolve_edges(self.incoming.get(&node_id))
    }

    /// Get all nodes with a specific label, in discovery order
    pub fn get_nodes_by_label(&self, label: &Label) -> Vec<&Node> {
        self.label_index
            .get(label)
            .map(|ids| ids.iter().filter_map(|id| self.get_node(*id)).collect())
            .unwrap_or_default()
    }

    /// Get all edges of a specific type, in discovery order
    pub fn get_edges_by_type(&self, edge_type: &EdgeType) -> Vec<&Edge> {
        self.edge_type_index
            .get(edge_type)
            .map(|ids| ids.iter().filter_map(|id| self.get_edge(*id)).collect())
            .unwrap_or_default()
    }

    /// Nodes with `label` whose property `key` equals `value`
    pub fn find_nodes(&self, label: &Label, key: &str, value: &PropertyValue) -> Vec<&Node> {
        self.get_nodes_by_label(label)
            .into_iter()
            .filter(|node| node.get_property(key) == Some(value))
            .collect()
    }

    /// Get total number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get total number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// All live nodes in id order
    pub fn all_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All live edges in id order
    pub fn all_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Insert a node that keeps its existing ID (snapshot load, rollback)
    pub fn insert_recovered_node(&mut self, node: Node) -> GraphResult<()> {
        let next = successor(node.id.as_u64())?;
        if self.has_node(node.id) {
            return Err(GraphError::NodeAlreadyExists(node.id));
        }
        self.next_node_id = self.next_node_id.max(next);
        self.place_node(node);
        Ok(())
    }

    /// Insert an edge that keeps its existing ID
    ///
    /// Source and target nodes must already exist.
    pub fn insert_recovered_edge(&mut self, edge: Edge) -> GraphResult<()> {
        let next = successor(edge.id.as_u64())?;
        if self.has_edge(edge.id) {
            return Err(GraphError::EdgeAlreadyExists(edge.id));
        }
        if !self.has_node(edge.source) {
            return Err(GraphError::InvalidEdgeSource(edge.source));
        }
        if !self.has_node(edge.target) {
            return Err(GraphError::InvalidEdgeTarget(edge.target));
        }
        self.next_edge_id = self.next_edge_id.max(next);
        self.place_edge(edge);
        Ok(())
    }
}
