//! Serde types for the workflow snapshot handed over by the canvas.
//!
//! Node kinds form a closed tagged union; each kind carries a typed
//! parameter struct so downstream code never digs through untyped maps.

use serde::{Deserialize, Serialize};

// =============================================================================
// TOP-LEVEL WORKFLOW
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub nodes: Vec<WorkflowNode>,
    pub edges: Vec<WorkflowEdge>,
}

// =============================================================================
// EDGES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EdgeMode {
    #[default]
    Sequential,
    Parallel,
    Conditional,
}

impl EdgeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeMode::Sequential => "sequential",
            EdgeMode::Parallel => "parallel",
            EdgeMode::Conditional => "conditional",
        }
    }

    /// Sequential and parallel edges impose structural ordering; conditional
    /// activation is data-dependent at run time.
    pub fn is_ordering(&self) -> bool {
        matches!(self, EdgeMode::Sequential | EdgeMode::Parallel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionKind {
    Boolean,
    Switch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConditionSource {
    #[default]
    Parameter,
    /// Decided at run time from the upstream node's result.
    #[serde(rename = "result")]
    UpstreamResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionCase {
    pub case_id: String,
    #[serde(default)]
    pub match_value: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    /// A default case matches when no other case does.
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeCondition {
    pub kind: ConditionKind,
    #[serde(default)]
    pub source: ConditionSource,
    #[serde(default)]
    pub expression: Option<String>,
    #[serde(default)]
    pub cases: Vec<ConditionCase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub source_handle: Option<String>,
    #[serde(default)]
    pub target_handle: Option<String>,
    #[serde(default)]
    pub mode: EdgeMode,
    #[serde(default)]
    pub condition: Option<EdgeCondition>,
}

// =============================================================================
// NODE BASE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeBase<P> {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub parameters: P,
    /// Keep this composite un-expanded in the emitted plan (storage mode).
    /// The canvas writes the key with a fully capitalized UO.
    #[serde(default, rename = "preserveAsUO")]
    pub preserve_as_uo: bool,
    /// Per-node override of the caller's expansion mode.
    #[serde(default)]
    pub expand_to_primitives: Option<bool>,
}

// =============================================================================
// WORKFLOW NODE — tagged union over the UO catalog
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum WorkflowNode {
    // Atomic device operations
    #[serde(rename = "pump_control")]
    PumpControl(NodeBase<PumpControlParams>),
    #[serde(rename = "sensor_read")]
    SensorRead(NodeBase<SensorReadParams>),

    // Routing
    #[serde(rename = "conditional")]
    Conditional(NodeBase<ConditionalParams>),

    // SDL7 composite procedures
    #[serde(rename = "sdl7_deck_initialization")]
    DeckInitialization(NodeBase<DeckInitializationParams>),
    #[serde(rename = "sdl7_prepare_inject_hplc")]
    PrepareInjectHplc(NodeBase<PrepareInjectHplcParams>),
    #[serde(rename = "sdl7_add_solvent_to_vial")]
    AddSolventToVial(NodeBase<AddSolventToVialParams>),
    #[serde(rename = "sdl7_run_extraction_to_hplc")]
    RunExtractionToHplc(NodeBase<RunExtractionToHplcParams>),
}

impl WorkflowNode {
    pub fn id(&self) -> &str {
        match self {
            WorkflowNode::PumpControl(n) => &n.id,
            WorkflowNode::SensorRead(n) => &n.id,
            WorkflowNode::Conditional(n) => &n.id,
            WorkflowNode::DeckInitialization(n) => &n.id,
            WorkflowNode::PrepareInjectHplc(n) => &n.id,
            WorkflowNode::AddSolventToVial(n) => &n.id,
            WorkflowNode::RunExtractionToHplc(n) => &n.id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowNode::PumpControl(_) => "pump_control",
            WorkflowNode::SensorRead(_) => "sensor_read",
            WorkflowNode::Conditional(_) => "conditional",
            WorkflowNode::DeckInitialization(_) => "sdl7_deck_initialization",
            WorkflowNode::PrepareInjectHplc(_) => "sdl7_prepare_inject_hplc",
            WorkflowNode::AddSolventToVial(_) => "sdl7_add_solvent_to_vial",
            WorkflowNode::RunExtractionToHplc(_) => "sdl7_run_extraction_to_hplc",
        }
    }

    pub fn label(&self) -> String {
        let explicit = match self {
            WorkflowNode::PumpControl(n) => &n.label,
            WorkflowNode::SensorRead(n) => &n.label,
            WorkflowNode::Conditional(n) => &n.label,
            WorkflowNode::DeckInitialization(n) => &n.label,
            WorkflowNode::PrepareInjectHplc(n) => &n.label,
            WorkflowNode::AddSolventToVial(n) => &n.label,
            WorkflowNode::RunExtractionToHplc(n) => &n.label,
        };
        explicit.clone().unwrap_or_else(|| self.default_label().to_string())
    }

    fn default_label(&self) -> &'static str {
        match self {
            WorkflowNode::PumpControl(_) => "Pump Control",
            WorkflowNode::SensorRead(_) => "Sensor Read",
            WorkflowNode::Conditional(_) => "Conditional",
            WorkflowNode::DeckInitialization(_) => "Deck Initialization",
            WorkflowNode::PrepareInjectHplc(_) => "Prepare & Inject HPLC Sample",
            WorkflowNode::AddSolventToVial(_) => "Add Solvent to Sample Vial",
            WorkflowNode::RunExtractionToHplc(_) => "Run Extraction & Transfer to HPLC",
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            WorkflowNode::DeckInitialization(_)
                | WorkflowNode::PrepareInjectHplc(_)
                | WorkflowNode::AddSolventToVial(_)
                | WorkflowNode::RunExtractionToHplc(_)
        )
    }

    pub fn preserve_as_uo(&self) -> bool {
        match self {
            WorkflowNode::PumpControl(n) => n.preserve_as_uo,
            WorkflowNode::SensorRead(n) => n.preserve_as_uo,
            WorkflowNode::Conditional(n) => n.preserve_as_uo,
            WorkflowNode::DeckInitialization(n) => n.preserve_as_uo,
            WorkflowNode::PrepareInjectHplc(n) => n.preserve_as_uo,
            WorkflowNode::AddSolventToVial(n) => n.preserve_as_uo,
            WorkflowNode::RunExtractionToHplc(n) => n.preserve_as_uo,
        }
    }

    pub fn expand_to_primitives(&self) -> Option<bool> {
        match self {
            WorkflowNode::PumpControl(n) => n.expand_to_primitives,
            WorkflowNode::SensorRead(n) => n.expand_to_primitives,
            WorkflowNode::Conditional(n) => n.expand_to_primitives,
            WorkflowNode::DeckInitialization(n) => n.expand_to_primitives,
            WorkflowNode::PrepareInjectHplc(n) => n.expand_to_primitives,
            WorkflowNode::AddSolventToVial(n) => n.expand_to_primitives,
            WorkflowNode::RunExtractionToHplc(n) => n.expand_to_primitives,
        }
    }

    /// Parameters serialized to a JSON object, used both for parameter-based
    /// condition bindings and for atomic plan-node params.
    pub fn parameters_json(&self) -> serde_json::Map<String, serde_json::Value> {
        let value = match self {
            WorkflowNode::PumpControl(n) => serde_json::to_value(&n.parameters),
            WorkflowNode::SensorRead(n) => serde_json::to_value(&n.parameters),
            WorkflowNode::Conditional(n) => serde_json::to_value(&n.parameters),
            WorkflowNode::DeckInitialization(n) => serde_json::to_value(&n.parameters),
            WorkflowNode::PrepareInjectHplc(n) => serde_json::to_value(&n.parameters),
            WorkflowNode::AddSolventToVial(n) => serde_json::to_value(&n.parameters),
            WorkflowNode::RunExtractionToHplc(n) => serde_json::to_value(&n.parameters),
        };
        match value {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }

    /// Declared input ports for this kind.
    pub fn input_ports(&self) -> &'static [PortDef] {
        match self {
            WorkflowNode::PumpControl(_) => &[
                PortDef { name: "trigger", data_type: PortType::Any, required: false },
                PortDef { name: "volume_override", data_type: PortType::Float, required: false },
            ],
            WorkflowNode::SensorRead(_) => &[
                PortDef { name: "trigger", data_type: PortType::Any, required: false },
            ],
            WorkflowNode::Conditional(_) => &[
                PortDef { name: "in", data_type: PortType::Any, required: true },
            ],
            _ => &[
                PortDef { name: "prev", data_type: PortType::Any, required: false },
            ],
        }
    }

    /// Declared output ports for this kind.
    pub fn output_ports(&self) -> &'static [PortDef] {
        match self {
            WorkflowNode::PumpControl(_) => &[
                PortDef { name: "dispensed_volume", data_type: PortType::Float, required: false },
            ],
            WorkflowNode::SensorRead(_) => &[
                PortDef { name: "reading", data_type: PortType::Float, required: false },
            ],
            WorkflowNode::Conditional(_) => &[
                PortDef { name: "true", data_type: PortType::Any, required: false },
                PortDef { name: "false", data_type: PortType::Any, required: false },
            ],
            _ => &[
                PortDef { name: "result", data_type: PortType::Json, required: false },
            ],
        }
    }
}

// =============================================================================
// PORTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortType {
    Integer,
    Float,
    Boolean,
    Text,
    Json,
    Map,
    /// Wildcard, compatible with everything.
    Any,
}

impl PortType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortType::Integer => "integer",
            PortType::Float => "float",
            PortType::Boolean => "boolean",
            PortType::Text => "text",
            PortType::Json => "json",
            PortType::Map => "map",
            PortType::Any => "any",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PortDef {
    pub name: &'static str,
    pub data_type: PortType,
    pub required: bool,
}

// =============================================================================
// ATOMIC PARAMS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PumpControlParams {
    /// Volume to dispense in mL. Required.
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default = "default_flow_rate")]
    pub flow_rate: f64,
    #[serde(default)]
    pub direction: PumpDirection,
}

fn default_flow_rate() -> f64 {
    10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PumpDirection {
    #[default]
    Forward,
    Reverse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorReadParams {
    #[serde(default)]
    pub sensor_type: Option<SensorType>,
    #[serde(default = "default_duration_s")]
    pub duration_s: u32,
    #[serde(default)]
    pub sample_name: String,
}

fn default_duration_s() -> u32 {
    10
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorType {
    Temperature,
    Ph,
    Pressure,
}

/// Condition configuration owned by a `conditional` routing node. Outgoing
/// conditional edges without their own condition inherit this one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalParams {
    pub condition_kind: ConditionKind,
    #[serde(default)]
    pub condition_source: ConditionSource,
    #[serde(default)]
    pub expression: Option<String>,
    #[serde(default)]
    pub cases: Vec<ConditionCase>,
}

impl ConditionalParams {
    pub fn as_edge_condition(&self) -> EdgeCondition {
        EdgeCondition {
            kind: self.condition_kind,
            source: self.condition_source,
            expression: self.expression.clone(),
            cases: self.cases.clone(),
        }
    }
}

// =============================================================================
// SDL7 COMPOSITE PARAMS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckInitializationParams {
    #[serde(default)]
    pub experiment_name: Option<String>,
    #[serde(default = "default_solvent_file")]
    pub solvent_file: String,
    #[serde(default)]
    pub method_name: Option<String>,
    #[serde(default = "default_injection_volume")]
    pub injection_volume: f64,
    #[serde(default)]
    pub sequence: Option<String>,
}

fn default_solvent_file() -> String {
    "solvents_default.csv".to_string()
}

fn default_injection_volume() -> f64 {
    5.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareInjectHplcParams {
    #[serde(default = "default_tray_reaction")]
    pub source_tray: String,
    #[serde(default = "default_vial_a1")]
    pub source_vial: String,
    #[serde(default = "default_aliquot_volume")]
    pub aliquot_volume_ul: f64,
    #[serde(default = "default_tray_hplc")]
    pub dest_tray: String,
    #[serde(default = "default_vial_a1")]
    pub dest_vial: String,
    /// Weigh before injection. Defaults on for this procedure.
    #[serde(default = "default_true")]
    pub perform_weighing: bool,
    #[serde(default)]
    pub sample_name: String,
    #[serde(default)]
    pub hplc_method: Option<String>,
    #[serde(default = "default_injection_volume")]
    pub injection_volume: f64,
    #[serde(default)]
    pub stall: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddSolventToVialParams {
    #[serde(default = "default_vial_a1")]
    pub vial: String,
    #[serde(default = "default_tray_hplc")]
    pub tray: String,
    #[serde(default = "default_solvent")]
    pub solvent: String,
    #[serde(default = "default_solvent_vol")]
    pub solvent_vol: f64,
    #[serde(default)]
    pub clean: bool,
    /// Weigh after adding solvent. Defaults off for this procedure,
    /// unlike prepare-and-inject.
    #[serde(default)]
    pub perform_weighing: bool,
    #[serde(default)]
    pub sample_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunExtractionToHplcParams {
    #[serde(default = "default_stir_time")]
    pub stir_time: f64,
    #[serde(default = "default_settle_time")]
    pub settle_time: f64,
    #[serde(default = "default_rate")]
    pub rate: f64,
    #[serde(default = "default_reactor")]
    pub reactor: u32,
    #[serde(default = "default_time_units")]
    pub time_units: String,
    #[serde(default = "default_vial_a1")]
    pub extraction_vial: String,
    /// Aliquot into the HPLC tray. Defaults on.
    #[serde(default = "default_true")]
    pub perform_aliquot: bool,
    #[serde(default = "default_aliquot_volume")]
    pub aliquot_volume_ul: f64,
    #[serde(default)]
    pub hplc_method: Option<String>,
    #[serde(default = "default_extraction_inj_vol")]
    pub injection_volume: f64,
    #[serde(default = "default_extraction_sample")]
    pub sample_name: String,
}

fn default_true() -> bool {
    true
}

fn default_tray_reaction() -> String {
    "reaction_tray".to_string()
}

fn default_tray_hplc() -> String {
    "hplc".to_string()
}

fn default_vial_a1() -> String {
    "A1".to_string()
}

fn default_aliquot_volume() -> f64 {
    100.0
}

fn default_solvent() -> String {
    "Methanol".to_string()
}

fn default_solvent_vol() -> f64 {
    900.0
}

fn default_stir_time() -> f64 {
    5.0
}

fn default_settle_time() -> f64 {
    2.0
}

fn default_rate() -> f64 {
    1000.0
}

fn default_reactor() -> u32 {
    1
}

fn default_time_units() -> String {
    "min".to_string()
}

fn default_extraction_inj_vol() -> f64 {
    10.0
}

fn default_extraction_sample() -> String {
    "Extraction_Sample".to_string()
}
