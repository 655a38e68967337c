//! Graph-level structural validation rules.

use std::collections::HashSet;

use crate::error::Finding;
use crate::parse::graph::WorkflowGraph;
use crate::parse::types::{ConditionKind, EdgeMode, Workflow, WorkflowNode};

/// Run all structural rules. Returns all findings.
pub fn validate_structural(workflow: &Workflow, graph: &WorkflowGraph) -> Vec<Finding> {
    let mut findings = Vec::new();

    no_self_loops(workflow, &mut findings);
    no_duplicate_edges(workflow, &mut findings);
    conditional_edges_well_formed(workflow, graph, &mut findings);
    conditional_nodes_have_branch_edges(workflow, graph, &mut findings);
    no_isolated_nodes(workflow, graph, &mut findings);

    findings
}

fn no_self_loops(workflow: &Workflow, findings: &mut Vec<Finding>) {
    for edge in &workflow.edges {
        if edge.source == edge.target {
            findings.push(
                Finding::error(
                    "SELF_LOOP",
                    format!("Self-loop detected on node '{}'", edge.source),
                )
                .at_node(edge.source.clone())
                .at_edge(edge.id.clone()),
            );
        }
    }
}

fn no_duplicate_edges(workflow: &Workflow, findings: &mut Vec<Finding>) {
    let mut seen = HashSet::new();
    for edge in &workflow.edges {
        let key = (
            edge.source.clone(),
            edge.target.clone(),
            edge.source_handle.clone(),
            edge.target_handle.clone(),
        );
        if !seen.insert(key) {
            findings.push(
                Finding::error(
                    "DUPLICATE_EDGE",
                    format!("Duplicate edge from '{}' to '{}'", edge.source, edge.target),
                )
                .at_edge(edge.id.clone()),
            );
        }
    }
}

/// A conditional edge must carry exactly one selection mechanism: an
/// expression for boolean conditions, a non-empty case list for switch.
/// Edges out of a `conditional` node may omit the condition and inherit
/// the node's own configuration.
fn conditional_edges_well_formed(
    workflow: &Workflow,
    _graph: &WorkflowGraph,
    findings: &mut Vec<Finding>,
) {
    for edge in &workflow.edges {
        if edge.mode != EdgeMode::Conditional {
            if edge.condition.is_some() {
                findings.push(
                    Finding::error(
                        "CONDITION_ON_PLAIN_EDGE",
                        format!(
                            "Edge '{}' carries a condition but its mode is '{}'",
                            edge.id,
                            edge.mode.as_str()
                        ),
                    )
                    .at_edge(edge.id.clone())
                    .with_suggestion("Set the edge mode to 'conditional' or remove the condition"),
                );
            }
            continue;
        }

        let source_is_conditional = workflow
            .nodes
            .iter()
            .any(|n| n.id() == edge.source && matches!(n, WorkflowNode::Conditional(_)));

        let Some(condition) = &edge.condition else {
            if !source_is_conditional {
                findings.push(
                    Finding::error(
                        "CONDITION_MISSING",
                        format!("Conditional edge '{}' has no condition", edge.id),
                    )
                    .at_edge(edge.id.clone())
                    .with_suggestion(
                        "Attach a condition to the edge or route it through a conditional node",
                    ),
                );
            }
            continue;
        };

        let has_expression = condition
            .expression
            .as_deref()
            .is_some_and(|e| !e.trim().is_empty());
        let has_cases = !condition.cases.is_empty();

        match condition.kind {
            ConditionKind::Boolean => {
                if !has_expression {
                    findings.push(
                        Finding::error(
                            "CONDITION_MISSING_EXPRESSION",
                            format!("Boolean conditional edge '{}' has no expression", edge.id),
                        )
                        .at_edge(edge.id.clone()),
                    );
                }
                if has_cases {
                    findings.push(
                        Finding::error(
                            "CONDITION_AMBIGUOUS",
                            format!(
                                "Boolean conditional edge '{}' must not carry a case list",
                                edge.id
                            ),
                        )
                        .at_edge(edge.id.clone()),
                    );
                }
            }
            ConditionKind::Switch => {
                if !has_cases {
                    findings.push(
                        Finding::error(
                            "CONDITION_MISSING_CASES",
                            format!("Switch conditional edge '{}' has no cases", edge.id),
                        )
                        .at_edge(edge.id.clone()),
                    );
                }
                if !has_expression {
                    findings.push(
                        Finding::error(
                            "CONDITION_MISSING_EXPRESSION",
                            format!("Switch conditional edge '{}' has no expression", edge.id),
                        )
                        .at_edge(edge.id.clone()),
                    );
                }
            }
        }
    }
}

/// A boolean conditional node needs outgoing edges tagged 'true' and
/// 'false'; a switch node needs one outgoing edge per case id.
fn conditional_nodes_have_branch_edges(
    workflow: &Workflow,
    graph: &WorkflowGraph,
    findings: &mut Vec<Finding>,
) {
    for node in &workflow.nodes {
        let WorkflowNode::Conditional(n) = node else {
            continue;
        };
        let outgoing = graph.successors(&n.id);
        let handles: HashSet<Option<&str>> = outgoing
            .iter()
            .map(|(_, label)| label.source_handle.as_deref())
            .collect();

        match n.parameters.condition_kind {
            ConditionKind::Boolean => {
                if !handles.contains(&Some("true")) || !handles.contains(&Some("false")) {
                    findings.push(
                        Finding::error(
                            "BRANCH_HANDLES",
                            format!(
                                "Conditional node '{}' must have outgoing edges tagged 'true' and 'false'",
                                n.id
                            ),
                        )
                        .at_node(n.id.clone()),
                    );
                }
            }
            ConditionKind::Switch => {
                for case in &n.parameters.cases {
                    if !handles.contains(&Some(case.case_id.as_str())) {
                        findings.push(
                            Finding::warning(
                                "BRANCH_CASE_UNWIRED",
                                format!(
                                    "Conditional node '{}' has no outgoing edge for case '{}'",
                                    n.id, case.case_id
                                ),
                            )
                            .at_node(n.id.clone()),
                        );
                    }
                }
            }
        }
    }
}

fn no_isolated_nodes(workflow: &Workflow, graph: &WorkflowGraph, findings: &mut Vec<Finding>) {
    if workflow.nodes.len() < 2 {
        return;
    }
    for node in &workflow.nodes {
        let id = node.id();
        if graph.incoming_count(id) == 0 && graph.outgoing_count(id) == 0 {
            findings.push(
                Finding::warning(
                    "ISOLATED_NODE",
                    format!("Node '{}' is not connected to the rest of the workflow", id),
                )
                .at_node(id.to_string())
                .with_suggestion("Connect the node or remove it before running"),
            );
        }
    }
}
