//! Cycle detection and deterministic execution ordering.
//!
//! Both operate on the ordering subgraph: sequential and parallel edges.
//! Conditional edges activate at run time and never constrain order.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::CompileError;
use crate::parse::graph::WorkflowGraph;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Three-color DFS over the ordering edges. Returns `Err(Cycle)` carrying
/// the sorted set of node ids on the gray stack when a back edge is found.
pub fn detect_cycle(graph: &WorkflowGraph) -> Result<(), CompileError> {
    let mut colors: HashMap<&str, Color> = graph
        .node_indices
        .keys()
        .map(|id| (id.as_str(), Color::White))
        .collect();

    // Deterministic visit order for deterministic diagnostics.
    let mut roots: Vec<&str> = graph.node_indices.keys().map(String::as_str).collect();
    roots.sort_unstable();

    let mut stack: Vec<&str> = Vec::new();
    for root in roots {
        if colors[root] == Color::White {
            if let Some(involved) = visit(graph, root, &mut colors, &mut stack) {
                return Err(CompileError::Cycle { involved });
            }
        }
    }
    Ok(())
}

fn visit<'a>(
    graph: &'a WorkflowGraph,
    node: &'a str,
    colors: &mut HashMap<&'a str, Color>,
    stack: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    colors.insert(node, Color::Gray);
    stack.push(node);

    for next in graph.ordering_successors(node) {
        match colors[next] {
            Color::Gray => {
                // Back edge: the loop is the stack suffix from `next` down.
                let start = stack.iter().position(|&n| n == next).unwrap_or(0);
                let involved: BTreeSet<String> =
                    stack[start..].iter().map(|s| s.to_string()).collect();
                return Some(involved.into_iter().collect());
            }
            Color::White => {
                if let Some(involved) = visit(graph, next, colors, stack) {
                    return Some(involved);
                }
            }
            Color::Black => {}
        }
    }

    stack.pop();
    colors.insert(node, Color::Black);
    None
}

/// Kahn's algorithm over the ordering edges with a `BTreeSet` frontier, so
/// ties between ready nodes break by node id and the order is reproducible.
///
/// Callers must run [`detect_cycle`] first; on a cyclic graph the returned
/// order silently omits the nodes trapped in the cycle.
pub fn execution_order(graph: &WorkflowGraph) -> Vec<String> {
    let mut in_degree: BTreeMap<&str, usize> = graph
        .node_indices
        .keys()
        .map(|id| (id.as_str(), 0))
        .collect();

    for id in graph.node_indices.keys() {
        for next in graph.ordering_successors(id) {
            *in_degree.entry(next).or_insert(0) += 1;
        }
    }

    let mut frontier: BTreeSet<&str> = in_degree
        .iter()
        .filter(|&(_, &d)| d == 0)
        .map(|(&id, _)| id)
        .collect();

    let mut order = Vec::with_capacity(in_degree.len());
    while let Some(&node) = frontier.iter().next() {
        frontier.remove(node);
        order.push(node.to_string());
        for next in graph.ordering_successors(node) {
            let d = in_degree.get_mut(next).unwrap();
            *d -= 1;
            if *d == 0 {
                frontier.insert(next);
            }
        }
    }
    order
}
