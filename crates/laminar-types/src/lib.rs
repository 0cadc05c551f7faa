//! Shared types, errors, and the execution-state model for the Laminar
//! pipeline runner.
//!
//! This crate provides the foundational types used across all other Laminar
//! crates:
//! - `LaminarError` — unified error taxonomy
//! - `ToolResult` / `LayerResult` — immutable per-execution records
//! - `ExecutionState` — the accumulated per-layer results persisted after
//!   every layer
//! - `RunState` — the orchestrator's state machine states

use serde::{Deserialize, Serialize};

/// Unified error type for all Laminar subsystems.
///
/// Tool and layer failures are *not* errors: they are recorded as failed
/// [`ToolResult`]s and [`LayerResult`]s. Errors are reserved for conditions
/// that abort a run before or outside of layer execution — malformed
/// configuration, unreadable state files, and I/O on the runner's own
/// artifacts.
#[derive(Debug, thiserror::Error)]
pub enum LaminarError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Pipeline validation failed: {0}")]
    ValidationError(String),

    #[error("State file error at '{path}': {message}")]
    StateError { path: String, message: String },

    #[error("Cannot resume from layer {start_layer}: {reason}")]
    ResumeError { start_layer: u32, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Other(String),
}

impl LaminarError {
    /// Returns `true` if the error must abort the run before any layer
    /// executes (configuration and validation problems).
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            LaminarError::ConfigError(_)
                | LaminarError::ValidationError(_)
                | LaminarError::Yaml(_)
                | LaminarError::ResumeError { .. }
        )
    }
}

/// A convenience alias for `Result<T, LaminarError>`.
pub type Result<T> = std::result::Result<T, LaminarError>;

// ---------------------------------------------------------------------------
// ToolResult — one external tool invocation
// ---------------------------------------------------------------------------

use std::collections::{BTreeMap, HashMap};

/// Result of executing a single tool inside a layer.
///
/// Created by the tool executor, consumed by the scheduler and the quality
/// gate evaluator. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool name as declared in the layer.
    pub tool_name: String,

    /// Id of the layer this tool ran in.
    pub layer_id: u32,

    /// Whether the tool exited successfully.
    pub success: bool,

    /// Exit code (-1 for timeout or spawn failure).
    pub exit_code: i32,

    /// Captured stdout (possibly truncated).
    pub stdout: String,

    /// Captured stderr (possibly truncated).
    pub stderr: String,

    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,

    /// Whether the tool was killed by its timeout.
    pub timed_out: bool,

    /// Named numeric metrics scraped from the tool's stdout.
    pub metrics: HashMap<String, f64>,

    /// Execution-level error (timeout, spawn failure), if any.
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// LayerResult — one layer's aggregate outcome
// ---------------------------------------------------------------------------

/// Aggregate result of executing one layer.
///
/// Invariant: `success == true` iff every non-optional tool that actually
/// ran succeeded, or the layer itself was marked optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerResult {
    pub layer_id: u32,
    pub layer_name: String,
    pub success: bool,
    /// Tool results in completion order (declaration order for sequential
    /// layers; unspecified order for parallel layers).
    pub tools: Vec<ToolResult>,
    pub duration_ms: u64,
    /// Set when the layer was skipped because a dependency had not
    /// succeeded; no tools were run in that case.
    pub skipped_reason: Option<String>,
}

impl LayerResult {
    /// A failed result for a layer whose dependencies were unmet. No tools
    /// are recorded because none were run.
    pub fn dependency_unmet(layer_id: u32, layer_name: &str, missing: u32) -> Self {
        Self {
            layer_id,
            layer_name: layer_name.to_string(),
            success: false,
            tools: Vec::new(),
            duration_ms: 0,
            skipped_reason: Some(format!("dependency layer {} has not succeeded", missing)),
        }
    }

    /// Number of tools that succeeded.
    pub fn passed_count(&self) -> usize {
        self.tools.iter().filter(|t| t.success).count()
    }

    /// Number of tools that failed.
    pub fn failed_count(&self) -> usize {
        self.tools.iter().filter(|t| !t.success).count()
    }

    /// Look up a tool result by name.
    pub fn tool(&self, name: &str) -> Option<&ToolResult> {
        self.tools.iter().find(|t| t.tool_name == name)
    }
}

// ---------------------------------------------------------------------------
// ExecutionState — accumulated results, persisted after every layer
// ---------------------------------------------------------------------------

/// Snapshot of accumulated per-layer results.
///
/// Overwritten (not appended) on durable storage after each layer completes,
/// so a crashed run can resume from a specific layer. Keyed by layer id,
/// which validation guarantees is also declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionState {
    pub layers: BTreeMap<u32, LayerResult>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ExecutionState {
    pub fn new() -> Self {
        Self {
            layers: BTreeMap::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    /// Record a layer result and refresh the snapshot timestamp.
    pub fn record(&mut self, result: LayerResult) {
        self.layers.insert(result.layer_id, result);
        self.timestamp = chrono::Utc::now();
    }

    pub fn layer(&self, id: u32) -> Option<&LayerResult> {
        self.layers.get(&id)
    }

    /// Whether the given layer ran and succeeded. Absence means "not run",
    /// which is distinct from "ran and failed" but equally unmet as a
    /// dependency.
    pub fn layer_succeeded(&self, id: u32) -> bool {
        self.layers.get(&id).map(|l| l.success).unwrap_or(false)
    }
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// RunState — orchestrator state machine
// ---------------------------------------------------------------------------

/// States of the pipeline orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Pending,
    Running,
    GateCheck,
    RollingBack,
    Succeeded,
    Failed,
}

impl RunState {
    /// Whether this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Succeeded | RunState::Failed)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunState::Pending => "pending",
            RunState::Running => "running",
            RunState::GateCheck => "gate_check",
            RunState::RollingBack => "rolling_back",
            RunState::Succeeded => "succeeded",
            RunState::Failed => "failed",
        };
        f.write_str(s)
    }
}
