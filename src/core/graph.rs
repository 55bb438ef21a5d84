//! Platform-neutral workflow graph shared by every platform adapter.
//!
//! Each vendor document is decoded into a [`WorkflowGraph`] before translation and the
//! target document is rebuilt from one. Nodes keep declaration order; edges keep the
//! order in which they were declared so traversals are deterministic.

use petgraph::algo::{connected_components, is_cyclic_directed};
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Whether a node starts the workflow or acts after it started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Trigger,
    Action,
}

/// One unit of work, independent of the vendor's naming for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Key the source platform uses when other nodes reference this one in expressions
    /// (node name for n8n, module id for Make, step id for Zapier).
    pub key: String,
    pub name: String,
    pub type_id: String,
    pub parameters: Map<String, Value>,
    pub position: Option<[f64; 2]>,
    pub role: NodeRole,
    /// Platform specific extras (error handling flags, type versions) kept for feature
    /// detection but never copied across platforms.
    #[serde(default)]
    pub settings: Map<String, Value>,
}

impl GraphNode {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        type_id: impl Into<String>,
        parameters: Map<String, Value>,
        role: NodeRole,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            type_id: type_id.into(),
            parameters,
            position: None,
            role,
            settings: Map::new(),
        }
    }
}

/// Directed connection between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub from: usize,
    pub to: usize,
    /// Output slot on the upstream node (n8n IF/Switch outputs, Make route index).
    pub output_index: usize,
    /// Route filter or branch condition guarding this edge.
    pub condition: Option<Value>,
}

/// Workflow graph decoded from any supported platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowGraph {
    pub name: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl WorkflowGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn add_node(&mut self, node: GraphNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Add an edge, ignoring exact duplicates.
    pub fn add_edge(&mut self, from: usize, to: usize, output_index: usize, condition: Option<Value>) {
        let duplicate = self
            .edges
            .iter()
            .any(|edge| edge.from == from && edge.to == to && edge.output_index == output_index);
        if !duplicate {
            self.edges.push(GraphEdge {
                from,
                to,
                output_index,
                condition,
            });
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn index_of_key(&self, key: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.key == key)
    }

    /// Outgoing edges of `index`, ordered by output slot then declaration.
    pub fn outgoing(&self, index: usize) -> Vec<&GraphEdge> {
        let mut edges: Vec<&GraphEdge> = self.edges.iter().filter(|e| e.from == index).collect();
        edges.sort_by_key(|edge| edge.output_index);
        edges
    }

    pub fn incoming(&self, index: usize) -> Vec<&GraphEdge> {
        self.edges.iter().filter(|e| e.to == index).collect()
    }

    pub fn successors(&self, index: usize) -> Vec<usize> {
        self.outgoing(index).into_iter().map(|edge| edge.to).collect()
    }

    pub fn predecessors(&self, index: usize) -> Vec<usize> {
        self.incoming(index).into_iter().map(|edge| edge.from).collect()
    }

    pub fn out_degree(&self, index: usize) -> usize {
        self.edges.iter().filter(|e| e.from == index).count()
    }

    pub fn in_degree(&self, index: usize) -> usize {
        self.edges.iter().filter(|e| e.to == index).count()
    }

    pub fn max_out_degree(&self) -> usize {
        (0..self.nodes.len())
            .map(|index| self.out_degree(index))
            .max()
            .unwrap_or(0)
    }

    /// True when any node has more than one outgoing edge.
    pub fn has_fan_out(&self) -> bool {
        self.max_out_degree() > 1
    }

    /// Nodes without incoming edges in declaration order. Falls back to the first node
    /// when every node has a predecessor (a cycle through the trigger).
    pub fn roots(&self) -> Vec<usize> {
        let mut roots: Vec<usize> = (0..self.nodes.len())
            .filter(|&index| self.in_degree(index) == 0)
            .collect();
        if roots.is_empty() && !self.nodes.is_empty() {
            roots.push(0);
        }
        // Triggers go first so the chain starts where the workflow starts.
        roots.sort_by_key(|&index| self.nodes[index].role != NodeRole::Trigger);
        roots
    }

    /// Depth-first preorder from the roots, followed by any node never reached.
    pub fn traversal_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut visited = HashSet::new();
        for root in self.roots() {
            self.visit_depth_first(root, &mut visited, &mut order);
        }
        for index in 0..self.nodes.len() {
            if !visited.contains(&index) {
                self.visit_depth_first(index, &mut visited, &mut order);
            }
        }
        order
    }

    fn visit_depth_first(&self, start: usize, visited: &mut HashSet<usize>, order: &mut Vec<usize>) {
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            order.push(current);
            for next in self.successors(current).into_iter().rev() {
                if !visited.contains(&next) {
                    stack.push(next);
                }
            }
        }
    }

    /// Longest chain length (in nodes) measured breadth-first from the roots.
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut level: HashMap<usize, usize> = HashMap::new();
        let mut frontier = self.roots();
        for &root in &frontier {
            level.insert(root, 1);
        }
        while let Some(current) = frontier.pop() {
            let current_level = level[&current];
            for next in self.successors(current) {
                let candidate = current_level + 1;
                // Bounded by node count so cycles terminate.
                if candidate <= self.nodes.len() && level.get(&next).map_or(true, |&l| l < candidate) {
                    level.insert(next, candidate);
                    frontier.push(next);
                }
            }
        }
        level.values().copied().max().unwrap_or(1)
    }

    fn to_petgraph(&self) -> DiGraph<usize, ()> {
        let mut graph = DiGraph::new();
        let indices: Vec<_> = (0..self.nodes.len()).map(|i| graph.add_node(i)).collect();
        for edge in &self.edges {
            if let (Some(&from), Some(&to)) = (indices.get(edge.from), indices.get(edge.to)) {
                graph.add_edge(from, to, ());
            }
        }
        graph
    }

    pub fn is_cyclic(&self) -> bool {
        is_cyclic_directed(&self.to_petgraph())
    }

    /// Number of weakly connected pieces the workflow splits into.
    pub fn component_count(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        connected_components(&self.to_petgraph())
    }

    /// Remove `skipped` nodes, connecting each surviving predecessor straight to the
    /// surviving successors so chains stay intact.
    pub fn without_nodes(&self, skipped: &HashSet<usize>) -> WorkflowGraph {
        let mut remap = HashMap::new();
        let mut result = WorkflowGraph::new(self.name.clone());
        for (index, node) in self.nodes.iter().enumerate() {
            if !skipped.contains(&index) {
                remap.insert(index, result.add_node(node.clone()));
            }
        }

        for edge in &self.edges {
            let Some(&from) = remap.get(&edge.from) else {
                continue;
            };
            for target in self.surviving_targets(edge.to, skipped) {
                if let Some(&to) = remap.get(&target) {
                    result.add_edge(from, to, edge.output_index, edge.condition.clone());
                }
            }
        }
        result
    }

    fn surviving_targets(&self, start: usize, skipped: &HashSet<usize>) -> Vec<usize> {
        let mut found = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if skipped.contains(&current) {
                for next in self.successors(current).into_iter().rev() {
                    stack.push(next);
                }
            } else {
                found.push(current);
            }
        }
        found
    }
}
