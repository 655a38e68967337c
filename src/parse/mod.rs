//! Parse phase: JSON → workflow types + graph construction.

pub mod graph;
pub mod types;

pub use graph::WorkflowGraph;
pub use types::*;

use crate::error::Finding;

/// Deserialize a workflow JSON string into a `Workflow` struct.
pub fn parse(json: &str) -> Result<Workflow, Vec<Finding>> {
    serde_json::from_str::<Workflow>(json).map_err(|e| {
        vec![Finding::error(
            "PARSE",
            format!("Failed to parse workflow JSON: {}", e),
        )]
    })
}
