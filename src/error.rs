//! Findings model and fatal error taxonomy shared across all phases.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation phase a finding belongs to. The compiler itself only produces
/// `Logic` findings; `Environment` and `Simulation` are reserved for the
/// external collaborators that run between validation and emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Logic,
    Environment,
    Simulation,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Logic => write!(f, "logic"),
            Stage::Environment => write!(f, "environment"),
            Stage::Simulation => write!(f, "simulation"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One validation problem. Validators accumulate findings instead of
/// raising, so a single compile call reports the complete defect set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub stage: Stage,
    pub severity: Severity,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}:{}] {}", self.stage, self.code, self.message)?;
        if let Some(id) = &self.node_id {
            write!(f, " (node '{}')", id)?;
        }
        if let Some(id) = &self.edge_id {
            write!(f, " (edge '{}')", id)?;
        }
        Ok(())
    }
}

impl Finding {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Finding {
            stage: Stage::Logic,
            severity: Severity::Error,
            code: code.into(),
            message: message.into(),
            node_id: None,
            edge_id: None,
            suggestion: None,
            details: None,
        }
    }

    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Finding {
            severity: Severity::Warning,
            ..Finding::error(code, message)
        }
    }

    pub fn at_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn at_edge(mut self, edge_id: impl Into<String>) -> Self {
        self.edge_id = Some(edge_id.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Structural blockers that abort the pipeline. Everything else is
/// accumulated as [`Finding`]s and reported together.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("malformed graph: {} finding(s)", findings.len())]
    MalformedGraph { findings: Vec<Finding> },

    #[error("circular dependency involving nodes: {}", involved.join(", "))]
    Cycle { involved: Vec<String> },

    #[error("branch resolution failed: {} finding(s)", findings.len())]
    BranchResolution { findings: Vec<Finding> },

    #[error("execution plan contains no nodes")]
    EmptyPlan,
}

impl CompileError {
    /// Flatten into findings for the rejection report.
    pub fn into_findings(self) -> Vec<Finding> {
        match self {
            CompileError::MalformedGraph { findings } => findings,
            CompileError::Cycle { involved } => vec![
                Finding::error(
                    "CYCLE",
                    format!(
                        "Workflow contains a circular dependency involving: {}",
                        involved.join(", ")
                    ),
                )
                .with_suggestion("Remove or redirect one of the edges closing the loop")
                .with_details(serde_json::json!({ "involved": involved })),
            ],
            CompileError::BranchResolution { findings } => findings,
            CompileError::EmptyPlan => vec![
                Finding::error("EMPTY_PLAN", "Workflow must contain at least one node")
                    .with_suggestion("Add at least one unit operation to the canvas"),
            ],
        }
    }
}

/// Aggregate validation result returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
}

impl ValidationReport {
    pub fn from_findings(findings: Vec<Finding>) -> Self {
        let (errors, warnings): (Vec<_>, Vec<_>) =
            findings.into_iter().partition(Finding::is_error);
        ValidationReport {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}
