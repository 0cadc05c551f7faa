//! Typed schema for the pipeline definition document.
//!
//! All structs are plain serde targets; defaults match what an omitted key
//! means in the YAML file. The definition is loaded once at process start
//! and is immutable for the lifetime of a run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root of a pipeline definition document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub pipeline_name: String,

    #[serde(default)]
    pub version: String,

    pub layers: Vec<LayerSpec>,

    #[serde(default)]
    pub execution: ExecutionSettings,

    #[serde(default)]
    pub quality_gates: Vec<QualityGateSpec>,

    #[serde(default)]
    pub rollback: RollbackSpec,

    #[serde(default)]
    pub notifications: NotificationsSpec,
}

impl PipelineDefinition {
    /// Look up a layer by id.
    pub fn layer(&self, id: u32) -> Option<&LayerSpec> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Look up a layer by name.
    pub fn layer_by_name(&self, name: &str) -> Option<&LayerSpec> {
        self.layers.iter().find(|l| l.name == name)
    }
}

/// One layer: a named, ordered group of tools with declared dependencies.
///
/// The integer `id` doubles as declared order and as the key other layers
/// use in their `dependencies` lists; validation enforces strictly
/// increasing ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerSpec {
    pub id: u32,
    pub name: String,

    #[serde(default)]
    pub tools: Vec<ToolSpec>,

    /// Run this layer's tools concurrently (bounded by `max_parallel`).
    #[serde(default)]
    pub parallel: bool,

    /// Layer ids that must have succeeded before this layer runs.
    #[serde(default)]
    pub dependencies: Vec<u32>,

    /// An optional layer never fails the pipeline, whatever its tools do.
    #[serde(default)]
    pub optional: bool,

    /// Run even after the pipeline has decided to stop, and keep
    /// dispatching tools after an in-layer failure.
    #[serde(default)]
    pub always_run: bool,

    /// Delay before dispatching the first tool, in seconds.
    #[serde(default)]
    pub delay_seconds: u64,
}

impl LayerSpec {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_seconds)
    }
}

/// One external tool invocation within a layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,

    /// Executable to invoke.
    pub script: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// An optional tool's failure does not fail its layer.
    #[serde(default)]
    pub optional: bool,
}

/// Global execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSettings {
    /// Per-tool timeout in seconds. 0 disables the timeout.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Worker bound for parallel layers.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// Keep executing subsequent layers after a non-optional layer fails.
    #[serde(default)]
    pub continue_on_failure: bool,

    /// Persist the execution state after every layer.
    #[serde(default = "default_true")]
    pub save_state: bool,

    /// Where the execution-state snapshot is written.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

impl ExecutionSettings {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            max_parallel: default_max_parallel(),
            continue_on_failure: false,
            save_state: true,
            state_file: default_state_file(),
        }
    }
}

fn default_timeout_seconds() -> u64 {
    300
}

fn default_max_parallel() -> usize {
    4
}

fn default_true() -> bool {
    true
}

fn default_state_file() -> PathBuf {
    PathBuf::from("pipeline_state.json")
}

/// Comparison operator for quality gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateOperator {
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
}

impl GateOperator {
    /// Apply the comparison: `value <op> threshold`.
    pub fn compare(&self, value: f64, threshold: f64) -> bool {
        match self {
            GateOperator::Gte => value >= threshold,
            GateOperator::Lte => value <= threshold,
            GateOperator::Eq => value == threshold,
            GateOperator::Gt => value > threshold,
            GateOperator::Lt => value < threshold,
        }
    }
}

impl std::fmt::Display for GateOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GateOperator::Gte => ">=",
            GateOperator::Lte => "<=",
            GateOperator::Eq => "==",
            GateOperator::Gt => ">",
            GateOperator::Lt => "<",
        };
        f.write_str(s)
    }
}

/// A post-run threshold check against a metric scraped from tool output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityGateSpec {
    pub name: String,

    /// `"layer.tool"` — layer id or layer name, then tool name.
    pub source: String,

    /// Metric key within the tool's parsed metrics.
    pub metric: String,

    pub operator: GateOperator,

    pub threshold: f64,
}

impl QualityGateSpec {
    /// Parse the `source` field. The layer part is tried as an integer id
    /// first, then treated as a layer name.
    pub fn source_ref(&self) -> Option<SourceRef> {
        let (layer, tool) = self.source.split_once('.')?;
        if layer.is_empty() || tool.is_empty() {
            return None;
        }
        let layer = match layer.parse::<u32>() {
            Ok(id) => SourceLayer::Id(id),
            Err(_) => SourceLayer::Name(layer.to_string()),
        };
        Some(SourceRef {
            layer,
            tool: tool.to_string(),
        })
    }
}

/// Parsed gate source reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub layer: SourceLayer,
    pub tool: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLayer {
    Id(u32),
    Name(String),
}

/// Rollback policy: compensating commands run after a designated failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollbackSpec {
    #[serde(default)]
    pub enabled: bool,

    /// Layer ids whose failure triggers rollback.
    #[serde(default)]
    pub on_failure_at_layers: Vec<u32>,

    #[serde(default)]
    pub actions: Vec<RollbackActionSpec>,
}

impl RollbackSpec {
    pub fn triggers_on(&self, layer_id: u32) -> bool {
        self.enabled && self.on_failure_at_layers.contains(&layer_id)
    }
}

/// One compensating command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackActionSpec {
    pub name: String,
    pub script: String,

    #[serde(default)]
    pub args: Vec<String>,
}

/// Terminal-state notifications.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationsSpec {
    #[serde(default)]
    pub on_success: Vec<NotificationSpec>,

    #[serde(default)]
    pub on_failure: Vec<NotificationSpec>,
}

/// A log-level plus message template. Templates may reference
/// `{layer_id}` and `{pipeline_name}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSpec {
    #[serde(default = "default_level")]
    pub level: String,
    pub message: String,
}

fn default_level() -> String {
    "info".to_string()
}
