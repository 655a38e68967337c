//! Connection validation: required input ports and port-type compatibility.

use std::collections::HashMap;

use crate::error::Finding;
use crate::parse::types::{PortDef, PortType, Workflow, WorkflowNode};

pub fn validate_connections(workflow: &Workflow) -> Vec<Finding> {
    let nodes: HashMap<&str, &WorkflowNode> =
        workflow.nodes.iter().map(|n| (n.id(), n)).collect();

    let mut findings = Vec::new();
    required_inputs_wired(workflow, &nodes, &mut findings);
    port_types_compatible(workflow, &nodes, &mut findings);
    findings
}

fn required_inputs_wired(
    workflow: &Workflow,
    nodes: &HashMap<&str, &WorkflowNode>,
    findings: &mut Vec<Finding>,
) {
    for node in &workflow.nodes {
        for port in node.input_ports().iter().filter(|p| p.required) {
            let wired = workflow.edges.iter().any(|e| {
                e.target == node.id()
                    && nodes.contains_key(e.source.as_str())
                    && handle_matches(e.target_handle.as_deref(), port)
            });
            if !wired {
                findings.push(
                    Finding::error(
                        "CONNECTION_REQUIRED",
                        format!(
                            "Required input port '{}' of node '{}' is not connected",
                            port.name,
                            node.id()
                        ),
                    )
                    .at_node(node.id().to_string())
                    .with_suggestion(format!("Connect an upstream output to '{}'", port.name)),
                );
            }
        }
    }
}

/// An edge with no target handle binds the node's first input port.
fn handle_matches(handle: Option<&str>, port: &PortDef) -> bool {
    match handle {
        Some(h) => h == port.name,
        None => true,
    }
}

fn port_types_compatible(
    workflow: &Workflow,
    nodes: &HashMap<&str, &WorkflowNode>,
    findings: &mut Vec<Finding>,
) {
    for edge in &workflow.edges {
        let (Some(source), Some(target)) = (
            nodes.get(edge.source.as_str()),
            nodes.get(edge.target.as_str()),
        ) else {
            continue;
        };

        let out_port = resolve_port(source.output_ports(), edge.source_handle.as_deref());
        let in_port = resolve_port(target.input_ports(), edge.target_handle.as_deref());

        let (Some(out_port), Some(in_port)) = (out_port, in_port) else {
            // Branch handles like 'true'/'case-1' name routing lanes, not
            // data ports, and are checked structurally.
            continue;
        };

        if !compatible(out_port.data_type, in_port.data_type) {
            findings.push(
                Finding::error(
                    "PORT_TYPE_MISMATCH",
                    format!(
                        "Cannot connect '{}' output '{}' ({}) to '{}' input '{}' ({})",
                        edge.source,
                        out_port.name,
                        out_port.data_type.as_str(),
                        edge.target,
                        in_port.name,
                        in_port.data_type.as_str()
                    ),
                )
                .at_edge(edge.id.clone()),
            );
        }
    }
}

fn resolve_port<'a>(ports: &'a [PortDef], handle: Option<&str>) -> Option<&'a PortDef> {
    match handle {
        Some(h) => ports.iter().find(|p| p.name == h),
        None => ports.first(),
    }
}

/// Symmetric compatibility: exact match, the `any` wildcard, the numeric
/// family (integer/float) and the structured family (json/map).
pub fn compatible(a: PortType, b: PortType) -> bool {
    if a == b || a == PortType::Any || b == PortType::Any {
        return true;
    }
    let numeric = |t| matches!(t, PortType::Integer | PortType::Float);
    let structured = |t| matches!(t, PortType::Json | PortType::Map);
    (numeric(a) && numeric(b)) || (structured(a) && structured(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matches_everything() {
        for t in [
            PortType::Integer,
            PortType::Float,
            PortType::Boolean,
            PortType::Text,
            PortType::Json,
            PortType::Map,
        ] {
            assert!(compatible(PortType::Any, t));
            assert!(compatible(t, PortType::Any));
        }
    }

    #[test]
    fn numeric_family_is_interchangeable() {
        assert!(compatible(PortType::Integer, PortType::Float));
        assert!(compatible(PortType::Float, PortType::Integer));
    }

    #[test]
    fn structured_family_is_interchangeable() {
        assert!(compatible(PortType::Json, PortType::Map));
        assert!(compatible(PortType::Map, PortType::Json));
    }

    #[test]
    fn cross_family_is_rejected_symmetrically() {
        assert!(!compatible(PortType::Json, PortType::Float));
        assert!(!compatible(PortType::Float, PortType::Json));
        assert!(!compatible(PortType::Text, PortType::Boolean));
    }
}
