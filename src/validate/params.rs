//! Per-kind parameter validation rules.

use std::sync::LazyLock;

use regex::Regex;

use crate::condition;
use crate::error::Finding;
use crate::parse::types::{
    AddSolventToVialParams, ConditionKind, ConditionalParams, DeckInitializationParams,
    NodeBase, PrepareInjectHplcParams, PumpControlParams, RunExtractionToHplcParams,
    SensorReadParams, Workflow, WorkflowNode,
};

static VIAL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-C][1-4]$").unwrap());

static SAMPLE_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]*$").unwrap());

pub fn validate_params(workflow: &Workflow) -> Vec<Finding> {
    let mut findings = Vec::new();
    for node in &workflow.nodes {
        match node {
            WorkflowNode::PumpControl(n) => pump_control(n, &mut findings),
            WorkflowNode::SensorRead(n) => sensor_read(n, &mut findings),
            WorkflowNode::Conditional(n) => conditional(n, &mut findings),
            WorkflowNode::DeckInitialization(n) => deck_initialization(n, &mut findings),
            WorkflowNode::PrepareInjectHplc(n) => prepare_inject(n, &mut findings),
            WorkflowNode::AddSolventToVial(n) => add_solvent(n, &mut findings),
            WorkflowNode::RunExtractionToHplc(n) => run_extraction(n, &mut findings),
        }
    }
    findings
}

fn required(node_id: &str, param: &str) -> Finding {
    Finding::error(
        "PARAM_REQUIRED",
        format!("Parameter '{}' is required", param),
    )
    .at_node(node_id.to_string())
    .with_suggestion(format!("Set a value for '{}'", param))
}

fn out_of_range(node_id: &str, param: &str, value: f64, lo: f64, hi: f64) -> Finding {
    Finding::error(
        "PARAM_RANGE",
        format!(
            "Parameter '{}' value {} is outside the allowed range {}..={}",
            param, value, lo, hi
        ),
    )
    .at_node(node_id.to_string())
    .with_details(serde_json::json!({ "param": param, "value": value, "min": lo, "max": hi }))
}

fn check_range(
    node_id: &str,
    param: &str,
    value: f64,
    lo: f64,
    hi: f64,
    findings: &mut Vec<Finding>,
) {
    if !(lo..=hi).contains(&value) {
        findings.push(out_of_range(node_id, param, value, lo, hi));
    }
}

fn check_vial(node_id: &str, param: &str, value: &str, findings: &mut Vec<Finding>) {
    if !VIAL_PATTERN.is_match(value) {
        findings.push(
            Finding::error(
                "PARAM_PATTERN",
                format!(
                    "Parameter '{}' value '{}' is not a valid vial position",
                    param, value
                ),
            )
            .at_node(node_id.to_string())
            .with_suggestion("Vial positions are A1-A4, B1-B4 or C1-C4"),
        );
    }
}

fn check_sample_name(node_id: &str, value: &str, findings: &mut Vec<Finding>) {
    if !SAMPLE_NAME_PATTERN.is_match(value) {
        findings.push(
            Finding::error(
                "PARAM_PATTERN",
                format!("Sample name '{}' contains invalid characters", value),
            )
            .at_node(node_id.to_string())
            .with_suggestion("Use letters, digits, '_' and '-' only"),
        );
    }
}

fn pump_control(n: &NodeBase<PumpControlParams>, findings: &mut Vec<Finding>) {
    match n.parameters.volume {
        None => findings.push(required(&n.id, "volume")),
        Some(v) => check_range(&n.id, "volume", v, 0.1, 1000.0, findings),
    }
    check_range(&n.id, "flow_rate", n.parameters.flow_rate, 0.1, 100.0, findings);
}

fn sensor_read(n: &NodeBase<SensorReadParams>, findings: &mut Vec<Finding>) {
    check_range(&n.id, "duration_s", n.parameters.duration_s as f64, 1.0, 3600.0, findings);
    check_sample_name(&n.id, &n.parameters.sample_name, findings);
    if n.parameters.sensor_type.is_none() {
        findings.push(
            Finding::warning("PARAM_MISSING", "No sensor type selected")
                .at_node(n.id.clone())
                .with_suggestion("Pick temperature, ph or pressure"),
        );
    }
}

fn conditional(n: &NodeBase<ConditionalParams>, findings: &mut Vec<Finding>) {
    let p = &n.parameters;
    match p.condition_kind {
        ConditionKind::Boolean => {
            if !p.cases.is_empty() {
                findings.push(
                    Finding::error(
                        "CONDITION_AMBIGUOUS",
                        "Boolean conditional node must not carry a case list",
                    )
                    .at_node(n.id.clone()),
                );
            }
            check_expression(&n.id, p.expression.as_deref(), findings);
        }
        ConditionKind::Switch => {
            if p.cases.is_empty() {
                findings.push(
                    Finding::error(
                        "CONDITION_MISSING_CASES",
                        "Switch conditional node has no cases",
                    )
                    .at_node(n.id.clone()),
                );
            }
            check_expression(&n.id, p.expression.as_deref(), findings);

            let mut seen = std::collections::HashSet::new();
            for case in &p.cases {
                if !seen.insert(case.case_id.as_str()) {
                    findings.push(
                        Finding::error(
                            "CONDITION_DUPLICATE_CASE",
                            format!("Duplicate case id '{}'", case.case_id),
                        )
                        .at_node(n.id.clone()),
                    );
                }
            }
            if p.cases.iter().filter(|c| c.is_default).count() > 1 {
                findings.push(
                    Finding::error(
                        "CONDITION_MULTIPLE_DEFAULTS",
                        "Switch conditional node has more than one default case",
                    )
                    .at_node(n.id.clone()),
                );
            }
        }
    }
}

/// Expressions are parse-checked during validation regardless of source,
/// so malformed guards surface before any run is attempted.
fn check_expression(node_id: &str, expression: Option<&str>, findings: &mut Vec<Finding>) {
    let Some(expression) = expression.filter(|e| !e.trim().is_empty()) else {
        findings.push(
            Finding::error("CONDITION_MISSING_EXPRESSION", "Condition has no expression")
                .at_node(node_id.to_string()),
        );
        return;
    };
    if let Err(e) = condition::parse(expression) {
        findings.push(
            Finding::error("CONDITION_PARSE", e.to_string())
                .at_node(node_id.to_string())
                .with_details(serde_json::json!({ "expression": expression })),
        );
    }
}

fn deck_initialization(n: &NodeBase<DeckInitializationParams>, findings: &mut Vec<Finding>) {
    check_range(&n.id, "injection_volume", n.parameters.injection_volume, 1.0, 100.0, findings);
    if n.parameters.solvent_file.trim().is_empty() {
        findings.push(required(&n.id, "solvent_file"));
    }
}

fn prepare_inject(n: &NodeBase<PrepareInjectHplcParams>, findings: &mut Vec<Finding>) {
    let p = &n.parameters;
    check_vial(&n.id, "source_vial", &p.source_vial, findings);
    check_vial(&n.id, "dest_vial", &p.dest_vial, findings);
    check_range(&n.id, "aliquot_volume_ul", p.aliquot_volume_ul, 1.0, 1000.0, findings);
    check_range(&n.id, "injection_volume", p.injection_volume, 1.0, 100.0, findings);
    check_sample_name(&n.id, &p.sample_name, findings);
}

fn add_solvent(n: &NodeBase<AddSolventToVialParams>, findings: &mut Vec<Finding>) {
    let p = &n.parameters;
    check_vial(&n.id, "vial", &p.vial, findings);
    if p.solvent.trim().is_empty() {
        findings.push(required(&n.id, "solvent"));
    }
    check_range(&n.id, "solvent_vol", p.solvent_vol, 1.0, 5000.0, findings);
    check_sample_name(&n.id, &p.sample_name, findings);
}

fn run_extraction(n: &NodeBase<RunExtractionToHplcParams>, findings: &mut Vec<Finding>) {
    let p = &n.parameters;
    check_vial(&n.id, "extraction_vial", &p.extraction_vial, findings);
    check_range(&n.id, "aliquot_volume_ul", p.aliquot_volume_ul, 1.0, 1000.0, findings);
    check_range(&n.id, "injection_volume", p.injection_volume, 1.0, 100.0, findings);
    check_sample_name(&n.id, &p.sample_name, findings);
    if p.stir_time <= 0.0 {
        findings.push(
            Finding::error("PARAM_RANGE", "Parameter 'stir_time' must be positive")
                .at_node(n.id.clone()),
        );
    }
    if p.settle_time < 0.0 {
        findings.push(
            Finding::error("PARAM_RANGE", "Parameter 'settle_time' must not be negative")
                .at_node(n.id.clone()),
        );
    }
}
