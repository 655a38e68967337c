//! The compile state machine. Each stage either advances or rejects; a
//! rejection carries every finding gathered so far and no partial plan.

use tracing::{debug, info};

use crate::emit::{self, ExecutionPayload};
use crate::error::{Finding, ValidationReport};
use crate::lower::{self, IdGenerator};
use crate::parse::{self, Workflow, WorkflowGraph};
use crate::runner::EnvironmentProbe;
use crate::validate as validation;

#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Expand composite nodes into primitives. Off for storage/inspection
    /// mode, where composites are carried whole and flagged `uo`.
    pub expand_composites: bool,
    /// Pinned RFC 3339 export timestamp. `None` stamps the current time;
    /// pinning makes repeated compiles byte-identical.
    pub timestamp: Option<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions { expand_composites: true, timestamp: None }
    }
}

/// Terminal state of a compile call.
#[derive(Debug)]
pub enum CompileOutcome {
    Emitted {
        payload: ExecutionPayload,
        warnings: Vec<Finding>,
    },
    Rejected(ValidationReport),
}

impl CompileOutcome {
    pub fn is_emitted(&self) -> bool {
        matches!(self, CompileOutcome::Emitted { .. })
    }

    pub fn payload(&self) -> Option<&ExecutionPayload> {
        match self {
            CompileOutcome::Emitted { payload, .. } => Some(payload),
            CompileOutcome::Rejected(_) => None,
        }
    }
}

/// Run logic validation only, without producing a plan.
pub fn validate(workflow: &Workflow) -> ValidationReport {
    let graph = match WorkflowGraph::build(workflow) {
        Ok(graph) => graph,
        Err(e) => return ValidationReport::from_findings(e.into_findings()),
    };
    ValidationReport::from_findings(validation::validate_workflow(workflow, &graph))
}

/// Compile a workflow into an execution payload.
pub fn compile(workflow: &Workflow, options: &CompileOptions) -> CompileOutcome {
    compile_with_probe(workflow, options, &crate::runner::NoopProbe)
}

/// Compile with an embedder-supplied environment probe; probe findings are
/// merged into the logic findings and gate emission the same way.
pub fn compile_with_probe(
    workflow: &Workflow,
    options: &CompileOptions,
    probe: &dyn EnvironmentProbe,
) -> CompileOutcome {
    debug!(
        nodes = workflow.nodes.len(),
        edges = workflow.edges.len(),
        expand = options.expand_composites,
        "compile received"
    );

    let graph = match WorkflowGraph::build(workflow) {
        Ok(graph) => graph,
        Err(e) => return reject(e.into_findings()),
    };

    let mut findings = validation::validate_workflow(workflow, &graph);
    findings.extend(probe.probe(workflow));
    if findings.iter().any(Finding::is_error) {
        return reject(findings);
    }
    // Only warnings survive past this point.
    let warnings = findings;
    debug!("logic validated");

    let mut ids = IdGenerator::new();
    let plan = match lower::lower(workflow, &graph, options.expand_composites, &mut ids) {
        Ok(plan) => plan,
        Err(e) => {
            let mut findings = warnings;
            findings.extend(e.into_findings());
            return reject(findings);
        }
    };
    debug!("order resolved and plan expanded");

    match emit::emit(workflow, &plan, options.timestamp.as_deref()) {
        Ok(payload) => {
            info!(nodes = payload.nodes.len(), "compile emitted");
            CompileOutcome::Emitted { payload, warnings }
        }
        Err(e) => {
            let mut findings = warnings;
            findings.extend(e.into_findings());
            reject(findings)
        }
    }
}

/// Parse-then-compile convenience for embedders holding raw JSON.
pub fn compile_json(json: &str, options: &CompileOptions) -> CompileOutcome {
    match parse::parse(json) {
        Ok(workflow) => compile(&workflow, options),
        Err(findings) => reject(findings),
    }
}

fn reject(findings: Vec<Finding>) -> CompileOutcome {
    let report = ValidationReport::from_findings(findings);
    info!(errors = report.errors.len(), "compile rejected");
    CompileOutcome::Rejected(report)
}
