//! WASM entry points for browser use.

use wasm_bindgen::prelude::*;

use crate::compile::{self, CompileOptions, CompileOutcome};
use crate::error::{Finding, ValidationReport};

/// Validate a workflow JSON: parse + graph construction + logic rules.
/// Returns a ValidationReport object.
#[wasm_bindgen]
pub fn validate_workflow(json: &str) -> JsValue {
    let report = validate_workflow_inner(json);
    serde_wasm_bindgen::to_value(&report).unwrap_or(JsValue::NULL)
}

fn validate_workflow_inner(json: &str) -> ValidationReport {
    let workflow = match crate::parse::parse(json) {
        Ok(w) => w,
        Err(findings) => return ValidationReport::from_findings(findings),
    };
    compile::validate(&workflow)
}

/// Full pipeline: parse → validate → order → expand → emit.
/// Returns `{status: "emitted", payload, warnings}` on success or
/// `{status: "rejected", errors, warnings}` on failure.
#[wasm_bindgen]
pub fn compile_workflow(json: &str, expand_composites: bool) -> JsValue {
    let options = CompileOptions {
        expand_composites,
        ..CompileOptions::default()
    };
    let result = match compile::compile_json(json, &options) {
        CompileOutcome::Emitted { payload, warnings } => ResultDto::Emitted { payload, warnings },
        CompileOutcome::Rejected(report) => ResultDto::Rejected {
            errors: report.errors,
            warnings: report.warnings,
        },
    };
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

#[derive(serde::Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum ResultDto {
    Emitted {
        payload: crate::emit::ExecutionPayload,
        warnings: Vec<Finding>,
    },
    Rejected {
        errors: Vec<Finding>,
        warnings: Vec<Finding>,
    },
}
