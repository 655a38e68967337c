//! Runner-facing interface types. The transport itself lives outside this
//! crate; these are the serde shapes of its responses plus the probe seam
//! an embedder can hook between validation and emission.

use serde::{Deserialize, Serialize};

use crate::error::Finding;
use crate::parse::types::Workflow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Error,
    Skipped,
}

/// Outcome of one executed plan step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub step_index: usize,
    pub label: String,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Response returned by the external runner after executing a payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerResponse {
    pub status: RunStatus,
    pub results: Vec<StepResult>,
    /// Node ids in the order the runner actually executed them.
    pub execution_order: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
}

/// Environment-stage checks (device availability, deck state) supplied by
/// the embedder. The compiler's own validation covers the logic stage only;
/// probe findings are merged into the same report.
pub trait EnvironmentProbe {
    fn probe(&self, workflow: &Workflow) -> Vec<Finding>;
}

/// Probe that reports nothing, for embedders without an environment check.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProbe;

impl EnvironmentProbe for NoopProbe {
    fn probe(&self, _workflow: &Workflow) -> Vec<Finding> {
        Vec::new()
    }
}
