//! End-to-end pipeline tests: parse → validate → order → expand → emit.

use serde_json::json;
use uo_compiler::compile::{compile_json, CompileOptions, CompileOutcome};
use uo_compiler::emit::{ExecutionComplexity, ExecutionPayload};
use uo_compiler::error::ValidationReport;

const PINNED_TS: &str = "2026-01-01T00:00:00+00:00";

fn options(expand: bool) -> CompileOptions {
    CompileOptions {
        expand_composites: expand,
        timestamp: Some(PINNED_TS.to_string()),
    }
}

fn emitted(json: &str, expand: bool) -> ExecutionPayload {
    match compile_json(json, &options(expand)) {
        CompileOutcome::Emitted { payload, .. } => payload,
        CompileOutcome::Rejected(report) => {
            panic!("expected emission, rejected with {:?}", report.errors)
        }
    }
}

fn rejected(json: &str) -> ValidationReport {
    match compile_json(json, &options(true)) {
        CompileOutcome::Rejected(report) => report,
        CompileOutcome::Emitted { .. } => panic!("expected rejection"),
    }
}

#[test]
fn linear_workflow_flattens_to_primitives() {
    let payload = emitted(include_str!("fixtures/linear_hplc.json"), true);

    let types: Vec<&str> = payload.nodes.iter().map(|n| n.node_type.as_str()).collect();
    assert_eq!(
        types,
        vec![
            "initialize_deck",
            "hplc_instrument_setup",
            "add_solvent",
            "sample_aliquot",
            "weigh_container",
            "run_hplc",
        ]
    );

    // Every primitive points back at its origin composite.
    assert_eq!(payload.nodes[0].uo_id.as_deref(), Some("deck"));
    assert_eq!(payload.nodes[5].uo_id.as_deref(), Some("inject"));
    assert!(payload.nodes.iter().all(|n| n.uo.is_none()));

    // Outer edges land on the expansion boundaries.
    let outer = payload.edges.iter().find(|e| e.id == "e-deck-solvent").unwrap();
    assert_eq!(outer.source, "deck___1");
    assert_eq!(outer.target, "solvent___0");
    let outer = payload.edges.iter().find(|e| e.id == "e-solvent-inject").unwrap();
    assert_eq!(outer.source, "solvent___0");
    assert_eq!(outer.target, "inject___0");

    let meta = &payload.execution_metadata;
    assert_eq!(meta.suggested_execution_order, vec!["deck", "solvent", "inject"]);
    assert_eq!(meta.edge_analysis.edge_types.get("internal"), Some(&3));
    assert_eq!(meta.edge_analysis.edge_types.get("sequential"), Some(&2));
    assert_eq!(meta.edge_analysis.total_edges, 5);
    assert_eq!(meta.execution_complexity, ExecutionComplexity::Sequential);
    // 120 + 60 + 20 + 30 + 45 + 600
    assert_eq!(meta.estimated_duration, 875);
    assert_eq!(meta.export_timestamp, PINNED_TS);
}

#[test]
fn recompiling_is_byte_identical() {
    let fixture = include_str!("fixtures/linear_hplc.json");
    let first = serde_json::to_string(&emitted(fixture, true)).unwrap();
    let second = serde_json::to_string(&emitted(fixture, true)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn storage_mode_preserves_composites() {
    let payload = emitted(include_str!("fixtures/linear_hplc.json"), false);

    assert_eq!(payload.nodes.len(), 3);
    assert!(payload.nodes.iter().all(|n| n.uo == Some(true)));
    assert!(payload.nodes.iter().all(|n| n.uo_id.is_none()));
    assert_eq!(
        payload
            .execution_metadata
            .edge_analysis
            .edge_types
            .get("internal"),
        Some(&0)
    );

    let outer = payload.edges.iter().find(|e| e.id == "e-deck-solvent").unwrap();
    assert_eq!(outer.source, "deck");
    assert_eq!(outer.target, "solvent");
}

#[test]
fn cycle_rejects_with_involved_nodes() {
    let report = rejected(include_str!("fixtures/cycle.json"));
    assert_eq!(report.errors.len(), 1);
    let cycle = &report.errors[0];
    assert_eq!(cycle.code, "CYCLE");
    assert!(cycle.message.contains("pump-a"));
    assert!(cycle.message.contains("pump-b"));
    assert_eq!(
        cycle.details.as_ref().unwrap()["involved"],
        json!(["pump-a", "pump-b"])
    );
}

#[test]
fn unmatched_switch_without_default_is_fatal() {
    let report = rejected(include_str!("fixtures/switch_no_default.json"));
    let branch_errors: Vec<_> = report
        .errors
        .iter()
        .filter(|f| f.code == "BRANCH_RESOLUTION")
        .collect();
    assert_eq!(branch_errors.len(), 1);
    assert!(branch_errors[0].message.contains("medium"));
    assert_eq!(branch_errors[0].node_id.as_deref(), Some("route"));
}

#[test]
fn boolean_branch_resolution_annotates_both_lanes() {
    let outcome = compile_json(include_str!("fixtures/conditional_boolean.json"), &options(true));
    let CompileOutcome::Emitted { payload, warnings } = outcome else {
        panic!("expected emission");
    };
    // Missing sensor types surface as warnings without blocking emission.
    assert_eq!(warnings.len(), 2);

    let taken = payload.edges.iter().find(|e| e.id == "e-true").unwrap();
    let data = taken.data.as_ref().unwrap();
    assert_eq!(data["conditionResolved"], json!(true));
    assert_eq!(data["selected"], json!(true));

    let skipped = payload.edges.iter().find(|e| e.id == "e-false").unwrap();
    assert_eq!(skipped.data.as_ref().unwrap()["selected"], json!(false));

    // Conditional edges stay in the payload; resolution only annotates.
    let meta = &payload.execution_metadata;
    assert_eq!(meta.edge_analysis.edge_types.get("conditional"), Some(&2));
    assert!(meta.edge_analysis.has_conditional_flow);
    assert_eq!(meta.execution_complexity, ExecutionComplexity::Complex);

    let conditional = payload.edges.iter().find(|e| e.id == "e-true").unwrap();
    assert_eq!(conditional.label.as_deref(), Some("If"));
}

#[test]
fn validation_failures_reject_before_lowering() {
    let report = rejected(include_str!("fixtures/invalid_params.json"));
    assert!(!report.is_valid);
    assert!(report.errors.iter().any(|f| f.code == "PARAM_REQUIRED"));
}

#[test]
fn empty_workflow_rejects_with_empty_plan() {
    let report = rejected(r#"{ "nodes": [], "edges": [] }"#);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].code, "EMPTY_PLAN");
}

#[test]
fn unparseable_json_rejects_with_parse_finding() {
    let report = rejected("{ not json");
    assert_eq!(report.errors[0].code, "PARSE");
}
