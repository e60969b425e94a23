//! The weighted contribution graph consumed by cred computation.
//!
//! Nodes carry a minted weight (the value a contribution introduces into the
//! system); edges carry a forwards/backwards weight pair. Both are keyed by
//! address in ordered maps, so iteration order is deterministic and prefix
//! queries are range scans.
//!
//! The graph does not require edge endpoints to exist when an edge is added;
//! endpoint validation happens when a Markov process graph is built from it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::address::{EdgeAddress, NodeAddress};
use crate::error::ConfigError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub address: NodeAddress,
    pub description: String,
    pub timestamp_ms: Option<i64>,
    /// Minted value; non-negative.
    pub weight: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeWeight {
    /// Weight of the src → dst direction.
    pub forwards: f64,
    /// Weight of the dst → src direction.
    pub backwards: f64,
}

impl EdgeWeight {
    pub fn new(forwards: f64, backwards: f64) -> Self {
        Self { forwards, backwards }
    }

    pub fn is_zero(&self) -> bool {
        self.forwards == 0.0 && self.backwards == 0.0
    }

    pub fn is_valid(&self) -> bool {
        valid_weight(self.forwards) && valid_weight(self.backwards)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub address: EdgeAddress,
    pub src: NodeAddress,
    pub dst: NodeAddress,
    pub timestamp_ms: i64,
    pub weight: EdgeWeight,
}

pub(crate) fn valid_weight(w: f64) -> bool {
    w.is_finite() && w >= 0.0
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GraphParts", into = "GraphParts")]
pub struct WeightedGraph {
    nodes: BTreeMap<NodeAddress, Node>,
    edges: BTreeMap<EdgeAddress, Edge>,
}

#[derive(Serialize, Deserialize)]
struct GraphParts {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl WeightedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) -> Result<(), ConfigError> {
        if !valid_weight(node.weight) {
            return Err(ConfigError::InvalidWeight(node.address.to_string()));
        }
        if self.nodes.contains_key(&node.address) {
            return Err(ConfigError::DuplicateNode(node.address.to_string()));
        }
        self.nodes.insert(node.address.clone(), node);
        Ok(())
    }

    pub fn add_edge(&mut self, edge: Edge) -> Result<(), ConfigError> {
        if !edge.weight.is_valid() {
            return Err(ConfigError::InvalidWeight(edge.address.to_string()));
        }
        if self.edges.contains_key(&edge.address) {
            return Err(ConfigError::DuplicateEdge(edge.address.to_string()));
        }
        self.edges.insert(edge.address.clone(), edge);
        Ok(())
    }

    pub fn node(&self, address: &NodeAddress) -> Option<&Node> {
        self.nodes.get(address)
    }

    pub fn edge(&self, address: &EdgeAddress) -> Option<&Edge> {
        self.edges.get(address)
    }

    pub fn contains_node(&self, address: &NodeAddress) -> bool {
        self.nodes.contains_key(address)
    }

    /// Nodes in address order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Edges in address order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// All nodes whose address starts with `prefix`, in address order.
    pub fn nodes_with_prefix<'a>(
        &'a self,
        prefix: &'a NodeAddress,
    ) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes
            .range::<NodeAddress, _>(prefix.prefix_range())
            .take_while(move |(k, _)| k.has_prefix(prefix))
            .map(|(_, n)| n)
    }

    /// All edges whose address starts with `prefix`, in address order.
    pub fn edges_with_prefix<'a>(
        &'a self,
        prefix: &'a EdgeAddress,
    ) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges
            .range::<EdgeAddress, _>(prefix.prefix_range())
            .take_while(move |(k, _)| k.has_prefix(prefix))
            .map(|(_, e)| e)
    }

    /// Sum of all node weights.
    pub fn total_node_weight(&self) -> f64 {
        self.nodes.values().map(|n| n.weight).sum()
    }
}

impl TryFrom<GraphParts> for WeightedGraph {
    type Error = ConfigError;

    fn try_from(parts: GraphParts) -> Result<Self, Self::Error> {
        let mut graph = Self::new();
        for node in parts.nodes {
            graph.add_node(node)?;
        }
        for edge in parts.edges {
            graph.add_edge(edge)?;
        }
        Ok(graph)
    }
}

impl From<WeightedGraph> for GraphParts {
    fn from(graph: WeightedGraph) -> Self {
        Self {
            nodes: graph.nodes.into_values().collect(),
            edges: graph.edges.into_values().collect(),
        }
    }
}
