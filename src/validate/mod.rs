//! Logic validation: accumulating rule sets over the parsed workflow.
//!
//! Validators never abort early. Each rule appends findings so a single
//! pass reports the complete defect set.

pub mod connections;
pub mod params;
pub mod structural;

use tracing::debug;

use crate::error::Finding;
use crate::parse::graph::WorkflowGraph;
use crate::parse::types::Workflow;

/// Run the full logic-validation stage.
pub fn validate_workflow(workflow: &Workflow, graph: &WorkflowGraph) -> Vec<Finding> {
    let mut findings = Vec::new();
    findings.extend(structural::validate_structural(workflow, graph));
    findings.extend(params::validate_params(workflow));
    findings.extend(connections::validate_connections(workflow));
    debug!(
        findings = findings.len(),
        errors = findings.iter().filter(|f| f.is_error()).count(),
        "logic validation complete"
    );
    findings
}
