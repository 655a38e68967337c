//! Compile-time resolution of conditional edges.
//!
//! Parameter-sourced conditions are decided here, against the source node's
//! parameter bindings. Result-sourced conditions depend on run-time data and
//! are parse-checked only, then deferred to the runner. Edges are never
//! removed; the outcome is annotated on the edge's payload data.

use std::collections::{BTreeMap, HashMap};

use serde_json::json;
use tracing::debug;

use crate::condition::{
    self, bindings_from_params, BindingEnv, SwitchOutcome,
};
use crate::error::{CompileError, Finding};
use crate::parse::graph::WorkflowGraph;
use crate::parse::types::{
    ConditionKind, ConditionSource, EdgeCondition, EdgeMode, Workflow, WorkflowEdge,
    WorkflowNode,
};

/// Resolution annotations keyed by edge id, merged into the emitted edge's
/// `data` object.
#[derive(Debug, Default)]
pub struct BranchResolution {
    pub edge_annotations: BTreeMap<String, serde_json::Value>,
}

impl BranchResolution {
    /// Whether the edge survived resolution as an active path. Deferred
    /// (result-sourced) edges count as active.
    pub fn is_selected(&self, edge_id: &str) -> bool {
        match self.edge_annotations.get(edge_id) {
            Some(data) => data["selected"] != json!(false),
            None => true,
        }
    }
}

pub fn resolve_branches(
    workflow: &Workflow,
    graph: &WorkflowGraph,
) -> Result<BranchResolution, CompileError> {
    let nodes: HashMap<&str, &WorkflowNode> =
        workflow.nodes.iter().map(|n| (n.id(), n)).collect();

    let mut resolution = BranchResolution::default();
    let mut findings = Vec::new();

    for edge in &workflow.edges {
        if edge.mode != EdgeMode::Conditional {
            continue;
        }
        let Some(source) = nodes.get(edge.source.as_str()) else {
            continue;
        };

        let condition = effective_condition(edge, source);
        let Some(condition) = condition else {
            continue;
        };

        match condition.source {
            ConditionSource::UpstreamResult => {
                defer_edge(edge, &condition, &mut resolution, &mut findings);
            }
            ConditionSource::Parameter => {
                let env = binding_env(source, graph, &nodes);
                resolve_edge(edge, source, &condition, &env, &mut resolution, &mut findings);
            }
        }
    }

    if findings.iter().any(Finding::is_error) {
        return Err(CompileError::BranchResolution { findings });
    }

    debug!(
        annotated = resolution.edge_annotations.len(),
        "branch resolution complete"
    );
    Ok(resolution)
}

/// An edge-level condition wins; edges out of a `conditional` node fall back
/// to the node's own configuration.
fn effective_condition(edge: &WorkflowEdge, source: &WorkflowNode) -> Option<EdgeCondition> {
    if let Some(c) = &edge.condition {
        return Some(c.clone());
    }
    match source {
        WorkflowNode::Conditional(n) => Some(n.parameters.as_edge_condition()),
        _ => None,
    }
}

/// Bindings a parameter-sourced condition evaluates against. A routing node
/// has no data parameters of its own, so it sees the merged parameters of
/// its predecessors, in node-id order so later ids win deterministically.
fn binding_env(
    source: &WorkflowNode,
    graph: &WorkflowGraph,
    nodes: &HashMap<&str, &WorkflowNode>,
) -> BindingEnv {
    match source {
        WorkflowNode::Conditional(n) => {
            let mut pred_ids: Vec<&str> = graph
                .predecessors(&n.id)
                .into_iter()
                .map(|(id, _)| id)
                .collect();
            pred_ids.sort_unstable();
            pred_ids.dedup();

            let mut env = BindingEnv::new();
            for id in pred_ids {
                if let Some(pred) = nodes.get(id) {
                    env.extend(bindings_from_params(&pred.parameters_json()));
                }
            }
            env
        }
        other => bindings_from_params(&other.parameters_json()),
    }
}

fn defer_edge(
    edge: &WorkflowEdge,
    condition: &EdgeCondition,
    resolution: &mut BranchResolution,
    findings: &mut Vec<Finding>,
) {
    if let Some(expression) = condition.expression.as_deref() {
        if let Err(e) = condition::parse(expression) {
            findings.push(
                Finding::error("BRANCH_RESOLUTION", e.to_string()).at_edge(edge.id.clone()),
            );
            return;
        }
    }
    // The runner evaluates this at run time, so the full condition rides
    // along on the edge.
    resolution.edge_annotations.insert(
        edge.id.clone(),
        json!({
            "conditionResolved": false,
            "conditionSource": "result",
            "deferred": true,
            "condition": condition,
        }),
    );
}

fn resolve_edge(
    edge: &WorkflowEdge,
    source: &WorkflowNode,
    condition: &EdgeCondition,
    env: &BindingEnv,
    resolution: &mut BranchResolution,
    findings: &mut Vec<Finding>,
) {
    let Some(expression) = condition.expression.as_deref() else {
        // Structural validation already reported the missing expression.
        return;
    };

    match condition.kind {
        ConditionKind::Boolean => match condition::evaluate_boolean(expression, env) {
            Ok(value) => {
                let selected = match edge.source_handle.as_deref() {
                    // Edges out of a routing node are taken on their lane.
                    Some("true") => value,
                    Some("false") => !value,
                    _ => value,
                };
                annotate_resolved(edge, selected, None, resolution);
            }
            Err(e) => findings.push(branch_error(edge, source, e)),
        },
        ConditionKind::Switch => {
            match condition::evaluate_switch(expression, &condition.cases, env) {
                Ok(SwitchOutcome::Matched { case_id })
                | Ok(SwitchOutcome::Default { case_id }) => {
                    let selected = match edge.source_handle.as_deref() {
                        Some(handle) => handle == case_id,
                        // An edge carrying its own case list is taken when
                        // any of its cases matched.
                        None => true,
                    };
                    annotate_resolved(edge, selected, Some(&case_id), resolution);
                }
                Ok(SwitchOutcome::NoMatch { value }) => {
                    findings.push(
                        Finding::error(
                            "BRANCH_RESOLUTION",
                            format!(
                                "Switch expression '{}' evaluated to '{}' but no case matches and no default case exists",
                                expression, value
                            ),
                        )
                        .at_node(source.id().to_string())
                        .at_edge(edge.id.clone())
                        .with_suggestion("Add a matching case or mark one case as default"),
                    );
                }
                Err(e) => findings.push(branch_error(edge, source, e)),
            }
        }
    }
}

fn annotate_resolved(
    edge: &WorkflowEdge,
    selected: bool,
    matched_case: Option<&str>,
    resolution: &mut BranchResolution,
) {
    let mut data = json!({
        "conditionResolved": true,
        "conditionSource": "parameter",
        "selected": selected,
    });
    if let Some(case_id) = matched_case {
        data["matchedCase"] = json!(case_id);
    }
    resolution.edge_annotations.insert(edge.id.clone(), data);
}

fn branch_error(
    edge: &WorkflowEdge,
    source: &WorkflowNode,
    e: condition::ExprError,
) -> Finding {
    Finding::error("BRANCH_RESOLUTION", e.to_string())
        .at_node(source.id().to_string())
        .at_edge(edge.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(json: serde_json::Value) -> (Workflow, WorkflowGraph) {
        let wf: Workflow = serde_json::from_value(json).unwrap();
        let graph = WorkflowGraph::build(&wf).unwrap();
        (wf, graph)
    }

    fn pump(id: &str, extra: serde_json::Value) -> serde_json::Value {
        let mut params = json!({ "volume": 5.0 });
        if let (Some(obj), Some(extra)) = (params.as_object_mut(), extra.as_object()) {
            obj.extend(extra.clone());
        }
        json!({ "kind": "pump_control", "id": id, "parameters": params })
    }

    #[test]
    fn boolean_routing_selects_matching_lane() {
        let (wf, graph) = build(json!({
            "nodes": [
                pump("feed", json!({ "flow_rate": 20.0 })),
                {
                    "kind": "conditional",
                    "id": "gate",
                    "parameters": {
                        "conditionKind": "boolean",
                        "expression": "flow_rate > 10"
                    }
                },
                pump("fast", json!({})),
                pump("slow", json!({})),
            ],
            "edges": [
                { "id": "e0", "source": "feed", "target": "gate" },
                { "id": "e1", "source": "gate", "target": "fast",
                  "sourceHandle": "true", "mode": "conditional" },
                { "id": "e2", "source": "gate", "target": "slow",
                  "sourceHandle": "false", "mode": "conditional" },
            ]
        }));
        let resolution = resolve_branches(&wf, &graph).unwrap();
        assert!(resolution.is_selected("e1"));
        assert!(!resolution.is_selected("e2"));
    }

    #[test]
    fn switch_without_match_or_default_is_fatal() {
        let (wf, graph) = build(json!({
            "nodes": [
                {
                    "kind": "sensor_read",
                    "id": "probe",
                    "parameters": { "sample_name": "medium" }
                },
                {
                    "kind": "conditional",
                    "id": "route",
                    "parameters": {
                        "conditionKind": "switch",
                        "expression": "sample_name",
                        "cases": [
                            { "caseId": "low", "matchValue": "low" },
                            { "caseId": "high", "matchValue": "high" },
                        ]
                    }
                },
                pump("sink-low", json!({})),
                pump("sink-high", json!({})),
            ],
            "edges": [
                { "id": "e0", "source": "probe", "target": "route" },
                { "id": "e1", "source": "route", "target": "sink-low",
                  "sourceHandle": "low", "mode": "conditional" },
                { "id": "e2", "source": "route", "target": "sink-high",
                  "sourceHandle": "high", "mode": "conditional" },
            ]
        }));
        let err = resolve_branches(&wf, &graph).unwrap_err();
        match err {
            CompileError::BranchResolution { findings } => {
                assert!(findings.iter().all(Finding::is_error));
                assert!(findings[0].message.contains("medium"));
            }
            other => panic!("expected branch resolution failure, got {other:?}"),
        }
    }

    #[test]
    fn switch_default_case_selects_its_lane() {
        let (wf, graph) = build(json!({
            "nodes": [
                {
                    "kind": "sensor_read",
                    "id": "probe",
                    "parameters": { "sample_name": "medium" }
                },
                {
                    "kind": "conditional",
                    "id": "route",
                    "parameters": {
                        "conditionKind": "switch",
                        "expression": "sample_name",
                        "cases": [
                            { "caseId": "low", "matchValue": "low" },
                            { "caseId": "other", "isDefault": true },
                        ]
                    }
                },
                pump("sink-low", json!({})),
                pump("sink-other", json!({})),
            ],
            "edges": [
                { "id": "e0", "source": "probe", "target": "route" },
                { "id": "e1", "source": "route", "target": "sink-low",
                  "sourceHandle": "low", "mode": "conditional" },
                { "id": "e2", "source": "route", "target": "sink-other",
                  "sourceHandle": "other", "mode": "conditional" },
            ]
        }));
        let resolution = resolve_branches(&wf, &graph).unwrap();
        assert!(!resolution.is_selected("e1"));
        assert!(resolution.is_selected("e2"));
        assert_eq!(
            resolution.edge_annotations["e2"]["matchedCase"],
            json!("other")
        );
    }

    #[test]
    fn result_sourced_condition_is_deferred() {
        let (wf, graph) = build(json!({
            "nodes": [
                pump("feed", json!({})),
                pump("sink", json!({})),
            ],
            "edges": [
                {
                    "id": "e0", "source": "feed", "target": "sink",
                    "mode": "conditional",
                    "condition": {
                        "kind": "boolean",
                        "source": "result",
                        "expression": "dispensed_volume > 4"
                    }
                },
            ]
        }));
        let resolution = resolve_branches(&wf, &graph).unwrap();
        assert!(resolution.is_selected("e0"));
        let data = &resolution.edge_annotations["e0"];
        assert_eq!(data["deferred"], json!(true));
        assert_eq!(
            data["condition"]["expression"],
            json!("dispensed_volume > 4")
        );
        assert_eq!(data["condition"]["kind"], json!("boolean"));
    }

    #[test]
    fn missing_binding_is_a_branch_error() {
        let (wf, graph) = build(json!({
            "nodes": [
                pump("feed", json!({})),
                pump("sink", json!({})),
            ],
            "edges": [
                {
                    "id": "e0", "source": "feed", "target": "sink",
                    "mode": "conditional",
                    "condition": {
                        "kind": "boolean",
                        "expression": "no_such_param > 4"
                    }
                },
            ]
        }));
        assert!(matches!(
            resolve_branches(&wf, &graph),
            Err(CompileError::BranchResolution { .. })
        ));
    }
}
