//! petgraph-based directed graph wrapper for the workflow snapshot.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};

use super::types::{EdgeMode, Workflow};
use crate::error::{CompileError, Finding};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeLabel {
    pub edge_id: String,
    pub mode: EdgeMode,
    pub source_handle: Option<String>,
    pub target_handle: Option<String>,
}

/// Read-only view over the node/edge snapshot. Construction enforces the
/// graph-model invariants: unique node ids, edge endpoints that resolve.
pub struct WorkflowGraph {
    pub graph: DiGraph<String, EdgeLabel>,
    pub node_indices: HashMap<String, NodeIndex>,
}

impl WorkflowGraph {
    pub fn build(workflow: &Workflow) -> Result<Self, CompileError> {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();
        let mut findings = Vec::new();

        for node in &workflow.nodes {
            let id = node.id().to_string();
            if node_indices.contains_key(&id) {
                findings.push(
                    Finding::error("MALFORMED_GRAPH", format!("Duplicate node id '{}'", id))
                        .at_node(id.clone()),
                );
                continue;
            }
            let idx = graph.add_node(id.clone());
            node_indices.insert(id, idx);
        }

        for edge in &workflow.edges {
            let source_idx = node_indices.get(&edge.source);
            let target_idx = node_indices.get(&edge.target);

            match (source_idx, target_idx) {
                (Some(&s), Some(&t)) => {
                    graph.add_edge(
                        s,
                        t,
                        EdgeLabel {
                            edge_id: edge.id.clone(),
                            mode: edge.mode,
                            source_handle: edge.source_handle.clone(),
                            target_handle: edge.target_handle.clone(),
                        },
                    );
                }
                (None, _) => {
                    findings.push(
                        Finding::error(
                            "MALFORMED_GRAPH",
                            format!(
                                "Edge '{}' references unknown source node '{}'",
                                edge.id, edge.source
                            ),
                        )
                        .at_edge(edge.id.clone()),
                    );
                }
                (_, None) => {
                    findings.push(
                        Finding::error(
                            "MALFORMED_GRAPH",
                            format!(
                                "Edge '{}' references unknown target node '{}'",
                                edge.id, edge.target
                            ),
                        )
                        .at_edge(edge.id.clone()),
                    );
                }
            }
        }

        if !findings.is_empty() {
            return Err(CompileError::MalformedGraph { findings });
        }

        Ok(WorkflowGraph { graph, node_indices })
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.node_indices.contains_key(node_id)
    }

    pub fn successors(&self, node_id: &str) -> Vec<(&str, &EdgeLabel)> {
        let Some(&idx) = self.node_indices.get(node_id) else {
            return vec![];
        };
        self.graph
            .edges_directed(idx, petgraph::Direction::Outgoing)
            .map(|e| {
                let target = petgraph::visit::EdgeRef::target(&e);
                (self.graph[target].as_str(), e.weight())
            })
            .collect()
    }

    pub fn predecessors(&self, node_id: &str) -> Vec<(&str, &EdgeLabel)> {
        let Some(&idx) = self.node_indices.get(node_id) else {
            return vec![];
        };
        self.graph
            .edges_directed(idx, petgraph::Direction::Incoming)
            .map(|e| {
                let source = petgraph::visit::EdgeRef::source(&e);
                (self.graph[source].as_str(), e.weight())
            })
            .collect()
    }

    /// Successors reachable through sequential/parallel edges only; the set
    /// that cycle detection and ordering operate on.
    pub fn ordering_successors(&self, node_id: &str) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .successors(node_id)
            .into_iter()
            .filter(|(_, label)| label.mode.is_ordering())
            .map(|(id, _)| id)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn incoming_count(&self, node_id: &str) -> usize {
        self.predecessors(node_id).len()
    }

    pub fn outgoing_count(&self, node_id: &str) -> usize {
        self.successors(node_id).len()
    }
}
