//! Lowering: ordering, branch resolution, composite expansion and the
//! flattened node/edge structure the emitter serializes.

pub mod branch;
pub mod expand;
pub mod topo;

use std::collections::HashMap;

use tracing::debug;

use crate::error::CompileError;
use crate::parse::graph::WorkflowGraph;
use crate::parse::types::{EdgeMode, Workflow, WorkflowNode};

pub use branch::{resolve_branches, BranchResolution};
pub use expand::{expand_node, PrimitiveOp};
pub use topo::{detect_cycle, execution_order};

/// Id source for synthesized internal edges. One generator per compile
/// call, so concurrent compiles never interleave counters.
#[derive(Debug, Default)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        IdGenerator::default()
    }

    pub fn next_edge_id(&mut self) -> String {
        let id = format!("internal-{}", self.next);
        self.next += 1;
        id
    }
}

/// A node of the flattened plan.
#[derive(Debug, Clone)]
pub enum LoweredNode {
    /// Atomic or routing node, carried through unchanged.
    Atomic(WorkflowNode),
    /// Composite kept un-expanded (storage mode or per-node opt-out).
    PreservedComposite(WorkflowNode),
    /// One expanded step of a composite.
    Primitive(PrimitiveOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoweredEdgeKind {
    Sequential,
    Parallel,
    Conditional,
    /// Synthesized chain between a composite's primitives.
    Internal,
}

impl LoweredEdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoweredEdgeKind::Sequential => "sequential",
            LoweredEdgeKind::Parallel => "parallel",
            LoweredEdgeKind::Conditional => "conditional",
            LoweredEdgeKind::Internal => "internal",
        }
    }

    fn from_mode(mode: EdgeMode) -> Self {
        match mode {
            EdgeMode::Sequential => LoweredEdgeKind::Sequential,
            EdgeMode::Parallel => LoweredEdgeKind::Parallel,
            EdgeMode::Conditional => LoweredEdgeKind::Conditional,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoweredEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_handle: Option<String>,
    pub target_handle: Option<String>,
    pub kind: LoweredEdgeKind,
    pub data: Option<serde_json::Value>,
}

/// Output of the lowering stage, ready for emission.
#[derive(Debug)]
pub struct LoweredPlan {
    pub nodes: Vec<LoweredNode>,
    pub edges: Vec<LoweredEdge>,
    /// Pre-expansion execution order over the authored nodes.
    pub suggested_order: Vec<String>,
}

/// Lower a validated workflow. Cycle detection and branch resolution run
/// here; both abort with their fatal error on failure.
pub fn lower(
    workflow: &Workflow,
    graph: &WorkflowGraph,
    expand_composites: bool,
    ids: &mut IdGenerator,
) -> Result<LoweredPlan, CompileError> {
    detect_cycle(graph)?;
    let suggested_order = execution_order(graph);
    let resolution = resolve_branches(workflow, graph)?;

    let by_id: HashMap<&str, &WorkflowNode> =
        workflow.nodes.iter().map(|n| (n.id(), n)).collect();

    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    // Composite id → (first primitive id, last primitive id).
    let mut boundaries: HashMap<String, (String, String)> = HashMap::new();

    for node_id in &suggested_order {
        let Some(&node) = by_id.get(node_id.as_str()) else {
            continue;
        };

        if should_expand(node, expand_composites) {
            let ops = expand_node(node);
            // A composite always yields at least one primitive; guarded
            // steps only trim the middle.
            if let (Some(first), Some(last)) = (ops.first(), ops.last()) {
                boundaries.insert(
                    node.id().to_string(),
                    (first.id.clone(), last.id.clone()),
                );
            }
            for window in ops.windows(2) {
                edges.push(LoweredEdge {
                    id: ids.next_edge_id(),
                    source: window[0].id.clone(),
                    target: window[1].id.clone(),
                    source_handle: None,
                    target_handle: None,
                    kind: LoweredEdgeKind::Internal,
                    data: None,
                });
            }
            nodes.extend(ops.into_iter().map(LoweredNode::Primitive));
        } else if node.is_composite() {
            nodes.push(LoweredNode::PreservedComposite(node.clone()));
        } else {
            nodes.push(LoweredNode::Atomic(node.clone()));
        }
    }

    for edge in &workflow.edges {
        let source = match boundaries.get(&edge.source) {
            Some((_, last)) => last.clone(),
            None => edge.source.clone(),
        };
        let target = match boundaries.get(&edge.target) {
            Some((first, _)) => first.clone(),
            None => edge.target.clone(),
        };
        edges.push(LoweredEdge {
            id: edge.id.clone(),
            source,
            target,
            source_handle: edge.source_handle.clone(),
            target_handle: edge.target_handle.clone(),
            kind: LoweredEdgeKind::from_mode(edge.mode),
            data: resolution.edge_annotations.get(&edge.id).cloned(),
        });
    }

    debug!(
        nodes = nodes.len(),
        edges = edges.len(),
        expanded = boundaries.len(),
        "lowering complete"
    );

    Ok(LoweredPlan { nodes, edges, suggested_order })
}

/// A composite expands unless the caller compiles in storage mode, the node
/// opts out, or it is pinned as a preserved UO.
fn should_expand(node: &WorkflowNode, expand_composites: bool) -> bool {
    node.is_composite()
        && expand_composites
        && node.expand_to_primitives().unwrap_or(true)
        && !node.preserve_as_uo()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lower_json(json: serde_json::Value, expand: bool) -> LoweredPlan {
        let wf: Workflow = serde_json::from_value(json).unwrap();
        let graph = WorkflowGraph::build(&wf).unwrap();
        let mut ids = IdGenerator::new();
        lower(&wf, &graph, expand, &mut ids).unwrap()
    }

    fn two_composite_workflow() -> serde_json::Value {
        json!({
            "nodes": [
                { "kind": "sdl7_deck_initialization", "id": "deck", "parameters": {} },
                { "kind": "sdl7_add_solvent_to_vial", "id": "sol",
                  "parameters": { "vial": "A2" } },
            ],
            "edges": [
                { "id": "e0", "source": "deck", "target": "sol" },
            ]
        })
    }

    #[test]
    fn expansion_rewrites_outer_edges_to_boundary_primitives() {
        let plan = lower_json(two_composite_workflow(), true);

        let outer = plan.edges.iter().find(|e| e.id == "e0").unwrap();
        assert_eq!(outer.source, "deck___1");
        assert_eq!(outer.target, "sol___0");

        let internal: Vec<_> = plan
            .edges
            .iter()
            .filter(|e| e.kind == LoweredEdgeKind::Internal)
            .collect();
        assert_eq!(internal.len(), 1);
        assert_eq!(internal[0].source, "deck___0");
        assert_eq!(internal[0].target, "deck___1");
        assert_eq!(internal[0].id, "internal-0");
    }

    #[test]
    fn storage_mode_keeps_composites_whole() {
        let plan = lower_json(two_composite_workflow(), false);
        assert_eq!(plan.nodes.len(), 2);
        assert!(plan
            .nodes
            .iter()
            .all(|n| matches!(n, LoweredNode::PreservedComposite(_))));
        assert!(plan
            .edges
            .iter()
            .all(|e| e.kind != LoweredEdgeKind::Internal));
        let outer = plan.edges.iter().find(|e| e.id == "e0").unwrap();
        assert_eq!(outer.source, "deck");
        assert_eq!(outer.target, "sol");
    }

    #[test]
    fn preserve_as_uo_overrides_expansion() {
        let plan = lower_json(
            json!({
                "nodes": [
                    { "kind": "sdl7_deck_initialization", "id": "deck",
                      "preserveAsUO": true, "parameters": {} },
                ],
                "edges": []
            }),
            true,
        );
        assert!(matches!(plan.nodes[0], LoweredNode::PreservedComposite(_)));
    }

    #[test]
    fn suggested_order_covers_authored_nodes_only() {
        let plan = lower_json(two_composite_workflow(), true);
        assert_eq!(plan.suggested_order, vec!["deck", "sol"]);
    }

    #[test]
    fn cycle_aborts_lowering() {
        let wf: Workflow = serde_json::from_value(json!({
            "nodes": [
                { "kind": "sensor_read", "id": "a", "parameters": {} },
                { "kind": "sensor_read", "id": "b", "parameters": {} },
            ],
            "edges": [
                { "id": "e0", "source": "a", "target": "b" },
                { "id": "e1", "source": "b", "target": "a" },
            ]
        }))
        .unwrap();
        let graph = WorkflowGraph::build(&wf).unwrap();
        let mut ids = IdGenerator::new();
        assert!(matches!(
            lower(&wf, &graph, true, &mut ids),
            Err(CompileError::Cycle { .. })
        ));
    }
}
