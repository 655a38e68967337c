//! Canonical execution-payload types consumed by the external runner.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One executable step of the flattened plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub label: String,
    pub params: serde_json::Map<String, serde_json::Value>,
    /// Rank within the origin composite; absent for authored nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Set when a composite is carried un-expanded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uo: Option<bool>,
    /// Origin composite id for expanded primitives.
    #[serde(rename = "uo_id", skip_serializing_if = "Option::is_none")]
    pub uo_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(rename = "type")]
    pub edge_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animated: Option<bool>,
}

/// Histogram and flags over the emitted edge set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeAnalysis {
    pub total_edges: usize,
    pub edge_types: BTreeMap<String, usize>,
    pub has_parallel_execution: bool,
    pub has_conditional_flow: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionComplexity {
    Sequential,
    Parallel,
    Complex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionMetadata {
    pub edge_analysis: EdgeAnalysis,
    /// Authored-node order from the resolver, pre-expansion.
    pub suggested_execution_order: Vec<String>,
    pub execution_complexity: ExecutionComplexity,
    /// Seconds, summed per-step hints.
    pub estimated_duration: u64,
    pub export_timestamp: String,
    pub export_version: String,
}

/// The canonical payload handed to the runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_name: Option<String>,
    pub nodes: Vec<PlanNode>,
    pub edges: Vec<PlanEdge>,
    pub execution_metadata: ExecutionMetadata,
}
