//! The run summary artifact produced at every terminal state.

use std::path::Path;

use laminar_types::{LayerResult, Result, RunState};
use serde::{Deserialize, Serialize};

use crate::gates::GateReport;
use crate::rollback::ActionOutcome;

/// Final report of a pipeline run: per-layer pass/fail, per-tool timing,
/// gate verdicts, and any rollback actions. Written once at process end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub pipeline_name: String,
    pub state: RunState,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub duration_ms: u64,
    /// Layer results in declared order.
    pub layers: Vec<LayerResult>,
    pub gates: GateReport,
    pub rollback_actions: Vec<ActionOutcome>,
}

impl RunSummary {
    pub fn succeeded(&self) -> bool {
        self.state == RunState::Succeeded
    }

    /// Human-readable rendering.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Pipeline: {} (run {})\n",
            self.pipeline_name, self.run_id
        ));
        out.push_str(&format!("State: {}\n", self.state));
        out.push_str(&format!("Started: {}\n", self.started_at.to_rfc3339()));
        out.push_str(&format!("Duration: {} ms\n", self.duration_ms));

        out.push_str("\nLayers:\n");
        if self.layers.is_empty() {
            out.push_str("  (none run)\n");
        }
        for layer in &self.layers {
            let verdict = if layer.success { "ok  " } else { "FAIL" };
            out.push_str(&format!(
                "  [{}] {} {} ({} ms)",
                verdict, layer.layer_id, layer.layer_name, layer.duration_ms
            ));
            if let Some(reason) = &layer.skipped_reason {
                out.push_str(&format!(" - skipped: {}", reason));
            }
            out.push('\n');
            for tool in &layer.tools {
                let verdict = if tool.success { "ok  " } else { "FAIL" };
                out.push_str(&format!(
                    "         [{}] {} ({} ms)",
                    verdict, tool.tool_name, tool.duration_ms
                ));
                if let Some(error) = &tool.error {
                    out.push_str(&format!(" - {}", error));
                }
                out.push('\n');
            }
        }

        out.push_str(&format!(
            "\nQuality gates: {} passed, {} failed, {} not evaluated\n",
            self.gates.passed_count,
            self.gates.failures.len(),
            self.gates.skipped.len()
        ));
        for failure in &self.gates.failures {
            out.push_str(&format!("  FAILED  {}\n", failure));
        }
        for skip in &self.gates.skipped {
            out.push_str(&format!("  SKIPPED {}: {}\n", skip.gate_name, skip.reason));
        }

        if !self.rollback_actions.is_empty() {
            out.push_str("\nRollback actions:\n");
            for action in &self.rollback_actions {
                let verdict = if action.success { "ok  " } else { "FAIL" };
                out.push_str(&format!(
                    "  [{}] {} ({} ms)\n",
                    verdict, action.name, action.duration_ms
                ));
            }
        }

        out
    }

    /// Persist the rendered summary.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.render())?;
        Ok(())
    }
}
