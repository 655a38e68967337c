//! Emission: serialize the lowered plan into the canonical payload.

pub mod types;

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::info;

use crate::error::CompileError;
use crate::lower::{LoweredEdge, LoweredEdgeKind, LoweredNode, LoweredPlan};
use crate::parse::types::Workflow;

pub use types::{
    EdgeAnalysis, ExecutionComplexity, ExecutionMetadata, ExecutionPayload, PlanEdge, PlanNode,
};

pub const EXPORT_VERSION: &str = "1.0";

/// Build the execution payload. An empty plan is a fatal error; a workflow
/// that validated but lowered to nothing must never reach the runner.
pub fn emit(
    workflow: &Workflow,
    plan: &LoweredPlan,
    timestamp: Option<&str>,
) -> Result<ExecutionPayload, CompileError> {
    if plan.nodes.is_empty() {
        return Err(CompileError::EmptyPlan);
    }

    let nodes: Vec<PlanNode> = plan.nodes.iter().map(plan_node).collect();
    let edges: Vec<PlanEdge> = plan.edges.iter().map(plan_edge).collect();

    // Fixed histogram shape: consumers index all four types, present or not.
    let mut edge_types: BTreeMap<String, usize> =
        ["sequential", "parallel", "conditional", "internal"]
            .into_iter()
            .map(|t| (t.to_string(), 0))
            .collect();
    for edge in &plan.edges {
        *edge_types.entry(edge.kind.as_str().to_string()).or_insert(0) += 1;
    }
    let has_parallel = edge_types["parallel"] > 0;
    let has_conditional = edge_types["conditional"] > 0;

    let complexity = if has_conditional {
        ExecutionComplexity::Complex
    } else if has_parallel {
        ExecutionComplexity::Parallel
    } else {
        ExecutionComplexity::Sequential
    };

    let estimated_duration = nodes.iter().map(duration_hint).sum();

    let payload = ExecutionPayload {
        workflow_id: workflow.id.clone(),
        workflow_name: workflow.name.clone(),
        nodes,
        edges,
        execution_metadata: ExecutionMetadata {
            edge_analysis: EdgeAnalysis {
                total_edges: plan.edges.len(),
                edge_types,
                has_parallel_execution: has_parallel,
                has_conditional_flow: has_conditional,
            },
            suggested_execution_order: plan.suggested_order.clone(),
            execution_complexity: complexity,
            estimated_duration,
            export_timestamp: match timestamp {
                Some(ts) => ts.to_string(),
                None => Utc::now().to_rfc3339(),
            },
            export_version: EXPORT_VERSION.to_string(),
        },
    };

    info!(
        nodes = payload.nodes.len(),
        edges = payload.edges.len(),
        duration_s = payload.execution_metadata.estimated_duration,
        "payload emitted"
    );
    Ok(payload)
}

fn plan_node(node: &LoweredNode) -> PlanNode {
    match node {
        LoweredNode::Atomic(n) => PlanNode {
            id: n.id().to_string(),
            node_type: n.kind().to_string(),
            label: n.label(),
            params: n.parameters_json(),
            order: None,
            condition: None,
            uo: None,
            uo_id: None,
        },
        LoweredNode::PreservedComposite(n) => PlanNode {
            id: n.id().to_string(),
            node_type: n.kind().to_string(),
            label: n.label(),
            params: n.parameters_json(),
            order: None,
            condition: None,
            uo: Some(true),
            uo_id: None,
        },
        LoweredNode::Primitive(op) => PlanNode {
            id: op.id.clone(),
            node_type: op.primitive_type.clone(),
            label: op.label.clone(),
            params: op.params.clone(),
            order: Some(op.order),
            condition: op.condition.clone(),
            uo: None,
            uo_id: Some(op.origin_node_id.clone()),
        },
    }
}

fn plan_edge(edge: &LoweredEdge) -> PlanEdge {
    let (label, animated) = match edge.kind {
        LoweredEdgeKind::Sequential => (Some("Sequential"), None),
        LoweredEdgeKind::Parallel => (Some("Parallel"), Some(true)),
        LoweredEdgeKind::Conditional => (Some("If"), None),
        LoweredEdgeKind::Internal => (None, None),
    };
    PlanEdge {
        id: edge.id.clone(),
        source: edge.source.clone(),
        target: edge.target.clone(),
        source_handle: edge.source_handle.clone(),
        target_handle: edge.target_handle.clone(),
        edge_type: edge.kind.as_str().to_string(),
        data: edge.data.clone(),
        label: label.map(str::to_string),
        animated,
    }
}

/// Per-step duration estimate in seconds.
fn duration_hint(node: &PlanNode) -> u64 {
    match node.node_type.as_str() {
        "initialize_deck" => 120,
        "hplc_instrument_setup" => 60,
        "sample_aliquot" => 30,
        "weigh_container" => 45,
        "add_solvent" => 20,
        "run_extraction" => 300,
        "extraction_vial_from_reactor" => 60,
        "run_hplc" => 600,
        "pump_control" => 30,
        "sensor_read" => node.params.get("duration_s").and_then(|v| v.as_u64()).unwrap_or(30),
        _ => 30,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lower::{lower, IdGenerator};
    use crate::parse::graph::WorkflowGraph;
    use serde_json::json;

    fn emit_json(json: serde_json::Value, expand: bool) -> ExecutionPayload {
        let wf: Workflow = serde_json::from_value(json).unwrap();
        let graph = WorkflowGraph::build(&wf).unwrap();
        let mut ids = IdGenerator::new();
        let plan = lower(&wf, &graph, expand, &mut ids).unwrap();
        emit(&wf, &plan, Some("2026-01-01T00:00:00+00:00")).unwrap()
    }

    #[test]
    fn empty_plan_is_fatal() {
        let wf = Workflow { id: None, name: None, nodes: vec![], edges: vec![] };
        let graph = WorkflowGraph::build(&wf).unwrap();
        let mut ids = IdGenerator::new();
        let plan = lower(&wf, &graph, true, &mut ids).unwrap();
        assert!(matches!(emit(&wf, &plan, None), Err(CompileError::EmptyPlan)));
    }

    #[test]
    fn histogram_counts_internal_edges_separately() {
        let payload = emit_json(
            json!({
                "nodes": [
                    { "kind": "sdl7_deck_initialization", "id": "deck", "parameters": {} },
                    { "kind": "sensor_read", "id": "probe", "parameters": {} },
                ],
                "edges": [
                    { "id": "e0", "source": "deck", "target": "probe" },
                ]
            }),
            true,
        );
        let types = &payload.execution_metadata.edge_analysis.edge_types;
        assert_eq!(types.get("internal"), Some(&1));
        assert_eq!(types.get("sequential"), Some(&1));
        // Absent modes are still indexable at zero.
        assert_eq!(types.get("parallel"), Some(&0));
        assert_eq!(types.get("conditional"), Some(&0));
        assert_eq!(payload.execution_metadata.edge_analysis.total_edges, 2);
    }

    #[test]
    fn preserved_composite_is_flagged_uo() {
        let payload = emit_json(
            json!({
                "nodes": [
                    { "kind": "sdl7_deck_initialization", "id": "deck", "parameters": {} },
                ],
                "edges": []
            }),
            false,
        );
        assert_eq!(payload.nodes.len(), 1);
        assert_eq!(payload.nodes[0].uo, Some(true));
        assert_eq!(payload.nodes[0].uo_id, None);
    }

    #[test]
    fn expanded_primitives_carry_origin_id() {
        let payload = emit_json(
            json!({
                "nodes": [
                    { "kind": "sdl7_deck_initialization", "id": "deck", "parameters": {} },
                ],
                "edges": []
            }),
            true,
        );
        assert_eq!(payload.nodes.len(), 2);
        for node in &payload.nodes {
            assert_eq!(node.uo_id.as_deref(), Some("deck"));
            assert_eq!(node.uo, None);
        }
        assert_eq!(
            payload.execution_metadata.estimated_duration,
            120 + 60
        );
    }

    #[test]
    fn sensor_read_duration_comes_from_params() {
        let payload = emit_json(
            json!({
                "nodes": [
                    { "kind": "sensor_read", "id": "probe",
                      "parameters": { "duration_s": 42 } },
                ],
                "edges": []
            }),
            true,
        );
        assert_eq!(payload.execution_metadata.estimated_duration, 42);
    }

    #[test]
    fn complexity_reflects_edge_modes() {
        let sequential = emit_json(
            json!({
                "nodes": [
                    { "kind": "sensor_read", "id": "a", "parameters": {} },
                    { "kind": "sensor_read", "id": "b", "parameters": {} },
                ],
                "edges": [ { "id": "e0", "source": "a", "target": "b" } ]
            }),
            true,
        );
        assert_eq!(
            sequential.execution_metadata.execution_complexity,
            ExecutionComplexity::Sequential
        );

        let parallel = emit_json(
            json!({
                "nodes": [
                    { "kind": "sensor_read", "id": "a", "parameters": {} },
                    { "kind": "sensor_read", "id": "b", "parameters": {} },
                ],
                "edges": [
                    { "id": "e0", "source": "a", "target": "b", "mode": "parallel" }
                ]
            }),
            true,
        );
        assert_eq!(
            parallel.execution_metadata.execution_complexity,
            ExecutionComplexity::Parallel
        );
        let e0 = &parallel.edges[0];
        assert_eq!(e0.animated, Some(true));
        assert_eq!(e0.label.as_deref(), Some("Parallel"));
    }
}
