//! Composite-node expansion into ordered primitive operations.
//!
//! Expansion is pure per node kind. Guarded steps are included or skipped
//! based on the node's own parameters; the guard expression is carried on
//! the emitted primitive for traceability.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::parse::types::{
    AddSolventToVialParams, DeckInitializationParams, PrepareInjectHplcParams,
    RunExtractionToHplcParams, WorkflowNode,
};

/// One flattened step of a composite unit operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimitiveOp {
    pub id: String,
    pub primitive_type: String,
    pub params: serde_json::Map<String, serde_json::Value>,
    /// Rank within the origin node, 0-based and gapless.
    pub order: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    pub origin_node_id: String,
    pub label: String,
}

struct Step {
    primitive_type: &'static str,
    params: serde_json::Value,
    condition: Option<&'static str>,
    label: String,
}

/// Expand a composite node. Atomic and routing nodes return an empty list.
pub fn expand_node(node: &WorkflowNode) -> Vec<PrimitiveOp> {
    let steps = match node {
        WorkflowNode::DeckInitialization(n) => deck_initialization(&n.parameters),
        WorkflowNode::PrepareInjectHplc(n) => prepare_inject(&n.parameters),
        WorkflowNode::AddSolventToVial(n) => add_solvent(&n.parameters),
        WorkflowNode::RunExtractionToHplc(n) => run_extraction(&n.parameters),
        _ => return Vec::new(),
    };

    let node_id = node.id();
    steps
        .into_iter()
        .enumerate()
        .map(|(i, step)| PrimitiveOp {
            id: format!("{}___{}", node_id, i),
            primitive_type: step.primitive_type.to_string(),
            params: match step.params {
                serde_json::Value::Object(map) => map,
                _ => serde_json::Map::new(),
            },
            order: i as u32,
            condition: step.condition.map(str::to_string),
            origin_node_id: node_id.to_string(),
            label: step.label,
        })
        .collect()
}

fn deck_initialization(p: &DeckInitializationParams) -> Vec<Step> {
    vec![
        Step {
            primitive_type: "initialize_deck",
            params: json!({
                "experiment_name": p.experiment_name,
                "solvent_file": p.solvent_file,
                "method_name": p.method_name,
                "inj_vol": p.injection_volume,
            }),
            condition: None,
            label: "Initialize deck".to_string(),
        },
        Step {
            primitive_type: "hplc_instrument_setup",
            params: json!({
                "method": p.method_name,
                "injection_volume": p.injection_volume,
                "sequence": p.sequence,
            }),
            condition: None,
            label: "HPLC instrument setup".to_string(),
        },
    ]
}

fn prepare_inject(p: &PrepareInjectHplcParams) -> Vec<Step> {
    let sample_name = if p.sample_name.is_empty() {
        format!("Sample_{}", p.dest_vial)
    } else {
        p.sample_name.clone()
    };

    let mut steps = vec![Step {
        primitive_type: "sample_aliquot",
        params: json!({
            "source_tray": p.source_tray,
            "source_vial": p.source_vial,
            "dest_tray": p.dest_tray,
            "dest_vial": p.dest_vial,
            "aliquot_volume_ul": p.aliquot_volume_ul,
        }),
        condition: None,
        label: "Transfer sample to destination vial".to_string(),
    }];

    if p.perform_weighing {
        steps.push(Step {
            primitive_type: "weigh_container",
            params: json!({
                "vial": p.dest_vial,
                "tray": p.dest_tray,
                "sample_name": sample_name,
                "to_hplc_inst": true,
            }),
            condition: Some("perform_weighing == true"),
            label: "Weigh sample for tracking".to_string(),
        });
    }

    steps.push(Step {
        primitive_type: "run_hplc",
        params: json!({
            "method": p.hplc_method,
            "sample_name": sample_name,
            "stall": p.stall,
            "vial": p.dest_vial,
            "vial_hplc_location": format!("P2-{}", p.dest_vial),
            "inj_vol": p.injection_volume,
        }),
        condition: None,
        label: "Inject sample and run HPLC analysis".to_string(),
    });

    steps
}

fn add_solvent(p: &AddSolventToVialParams) -> Vec<Step> {
    let mut steps = vec![Step {
        primitive_type: "add_solvent",
        params: json!({
            "vial": p.vial,
            "tray": p.tray,
            "solvent": p.solvent,
            "solvent_vol": p.solvent_vol,
            "clean": p.clean,
        }),
        condition: None,
        label: format!("Add {} to vial {}", p.solvent, p.vial),
    }];

    if p.perform_weighing {
        let sample_name = if p.sample_name.is_empty() {
            format!("{}_{}", p.solvent, p.vial)
        } else {
            p.sample_name.clone()
        };
        steps.push(Step {
            primitive_type: "weigh_container",
            params: json!({
                "vial": p.vial,
                "tray": p.tray,
                "sample_name": sample_name,
                "to_hplc_inst": false,
            }),
            condition: Some("perform_weighing == true"),
            label: "Weigh vial after solvent addition".to_string(),
        });
    }

    steps
}

fn run_extraction(p: &RunExtractionToHplcParams) -> Vec<Step> {
    let mut steps = vec![
        Step {
            primitive_type: "run_extraction",
            params: json!({
                "stir_time": p.stir_time,
                "settle_time": p.settle_time,
                "rate": p.rate,
                "reactor": p.reactor,
                "time_units": p.time_units,
                "output_file": format!("extraction_{}.csv", p.sample_name),
            }),
            condition: None,
            label: "Run extraction".to_string(),
        },
        Step {
            primitive_type: "extraction_vial_from_reactor",
            params: json!({
                "vial": p.extraction_vial,
            }),
            condition: None,
            label: "Transfer extraction vial from reactor".to_string(),
        },
    ];

    if p.perform_aliquot {
        steps.push(Step {
            primitive_type: "sample_aliquot",
            params: json!({
                "source_tray": "extraction_tray",
                "source_vial": p.extraction_vial,
                "dest_tray": "hplc",
                "dest_vial": p.extraction_vial,
                "aliquot_volume_ul": p.aliquot_volume_ul,
            }),
            condition: Some("perform_aliquot == true"),
            label: "Aliquot extract into HPLC tray".to_string(),
        });
    }

    steps.push(Step {
        primitive_type: "run_hplc",
        params: json!({
            "method": p.hplc_method,
            "sample_name": p.sample_name,
            "stall": false,
            "vial": p.extraction_vial,
            "vial_hplc_location": format!("P2-{}", p.extraction_vial),
            "inj_vol": p.injection_volume,
        }),
        condition: None,
        label: "Inject extract and run HPLC analysis".to_string(),
    });

    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(json: serde_json::Value) -> WorkflowNode {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn prepare_inject_expands_with_weighing_by_default() {
        let n = node(serde_json::json!({
            "kind": "sdl7_prepare_inject_hplc",
            "id": "prep-1",
            "parameters": { "dest_vial": "B2" }
        }));
        let ops = expand_node(&n);
        let types: Vec<&str> = ops.iter().map(|o| o.primitive_type.as_str()).collect();
        assert_eq!(types, vec!["sample_aliquot", "weigh_container", "run_hplc"]);

        assert_eq!(ops[0].id, "prep-1___0");
        assert_eq!(ops[1].condition.as_deref(), Some("perform_weighing == true"));
        assert_eq!(ops[2].params["vial_hplc_location"], "P2-B2");
        assert_eq!(ops[1].params["sample_name"], "Sample_B2");
        assert_eq!(
            ops.iter().map(|o| o.order).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn add_solvent_omits_weighing_by_default() {
        let n = node(serde_json::json!({
            "kind": "sdl7_add_solvent_to_vial",
            "id": "sol-1",
            "parameters": { "vial": "A3", "solvent": "Acetone" }
        }));
        let ops = expand_node(&n);
        let types: Vec<&str> = ops.iter().map(|o| o.primitive_type.as_str()).collect();
        assert_eq!(types, vec!["add_solvent"]);
    }

    #[test]
    fn add_solvent_weighing_uses_solvent_vial_fallback_name() {
        let n = node(serde_json::json!({
            "kind": "sdl7_add_solvent_to_vial",
            "id": "sol-2",
            "parameters": { "vial": "A3", "solvent": "Acetone", "perform_weighing": true }
        }));
        let ops = expand_node(&n);
        assert_eq!(ops[1].primitive_type, "weigh_container");
        assert_eq!(ops[1].params["sample_name"], "Acetone_A3");
        assert_eq!(ops[1].params["to_hplc_inst"], false);
    }

    #[test]
    fn extraction_skips_aliquot_when_disabled() {
        let n = node(serde_json::json!({
            "kind": "sdl7_run_extraction_to_hplc",
            "id": "ext-1",
            "parameters": { "perform_aliquot": false }
        }));
        let ops = expand_node(&n);
        let types: Vec<&str> = ops.iter().map(|o| o.primitive_type.as_str()).collect();
        assert_eq!(
            types,
            vec!["run_extraction", "extraction_vial_from_reactor", "run_hplc"]
        );
        // Order stays gapless after the skipped step.
        assert_eq!(ops.iter().map(|o| o.order).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn deck_initialization_has_no_guarded_steps() {
        let n = node(serde_json::json!({
            "kind": "sdl7_deck_initialization",
            "id": "deck-1",
            "parameters": {}
        }));
        let ops = expand_node(&n);
        assert_eq!(ops.len(), 2);
        assert!(ops.iter().all(|o| o.condition.is_none()));
        assert_eq!(ops[0].params["solvent_file"], "solvents_default.csv");
    }

    #[test]
    fn expansion_is_idempotent() {
        let n = node(serde_json::json!({
            "kind": "sdl7_prepare_inject_hplc",
            "id": "prep-2",
            "parameters": { "sample_name": "Batch7" }
        }));
        let first = serde_json::to_string(&expand_node(&n)).unwrap();
        let second = serde_json::to_string(&expand_node(&n)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn atomic_nodes_do_not_expand() {
        let n = node(serde_json::json!({
            "kind": "pump_control",
            "id": "pump-1",
            "parameters": { "volume": 5.0 }
        }));
        assert!(expand_node(&n).is_empty());
    }
}
