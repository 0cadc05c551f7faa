//! Quality gate evaluation.
//!
//! Gates run once, after every declared layer has had its chance to execute.
//! A gate whose metric cannot be located — layer never ran, tool missing,
//! metric never scraped — is *skipped with a warning*, never failed, so
//! instrumentation gaps do not block an otherwise green pipeline.

use laminar_config::{GateOperator, PipelineDefinition, SourceLayer};
use laminar_types::ExecutionState;
use serde::{Deserialize, Serialize};

/// A gate whose metric was found and failed its comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateFailure {
    pub gate_name: String,
    pub source: String,
    pub metric: String,
    pub value: f64,
    pub operator: GateOperator,
    pub threshold: f64,
}

impl std::fmt::Display for GateFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} = {} (required {} {})",
            self.gate_name, self.metric, self.value, self.operator, self.threshold
        )
    }
}

/// A gate that could not be evaluated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateSkip {
    pub gate_name: String,
    pub reason: String,
}

/// Outcome of evaluating every configured gate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateReport {
    pub failures: Vec<GateFailure>,
    pub skipped: Vec<GateSkip>,
    /// Gates whose metric was found and passed.
    pub passed_count: usize,
}

impl GateReport {
    /// Pipeline-level gate verdict: no located metric failed.
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Evaluate all gates in `def` against the accumulated results.
pub fn evaluate_gates(def: &PipelineDefinition, state: &ExecutionState) -> GateReport {
    let mut report = GateReport::default();

    for gate in &def.quality_gates {
        let Some(sref) = gate.source_ref() else {
            skip(&mut report, &gate.name, format!("malformed source '{}'", gate.source));
            continue;
        };

        let layer_spec = match &sref.layer {
            SourceLayer::Id(id) => def.layer(*id),
            SourceLayer::Name(name) => def.layer_by_name(name),
        };
        let Some(layer_spec) = layer_spec else {
            skip(&mut report, &gate.name, format!("unknown layer in source '{}'", gate.source));
            continue;
        };

        let Some(layer_result) = state.layer(layer_spec.id) else {
            skip(&mut report, &gate.name, format!("layer {} did not run", layer_spec.id));
            continue;
        };

        let Some(tool_result) = layer_result.tool(&sref.tool) else {
            skip(
                &mut report,
                &gate.name,
                format!("tool '{}' produced no result in layer {}", sref.tool, layer_spec.id),
            );
            continue;
        };

        let Some(value) = tool_result.metrics.get(&gate.metric).copied() else {
            skip(
                &mut report,
                &gate.name,
                format!("metric '{}' never produced by tool '{}'", gate.metric, sref.tool),
            );
            continue;
        };

        if gate.operator.compare(value, gate.threshold) {
            tracing::info!(gate = %gate.name, value, "Quality gate passed");
            report.passed_count += 1;
        } else {
            tracing::warn!(
                gate = %gate.name,
                value,
                operator = %gate.operator,
                threshold = gate.threshold,
                "Quality gate failed"
            );
            report.failures.push(GateFailure {
                gate_name: gate.name.clone(),
                source: gate.source.clone(),
                metric: gate.metric.clone(),
                value,
                operator: gate.operator,
                threshold: gate.threshold,
            });
        }
    }

    report
}

fn skip(report: &mut GateReport, gate_name: &str, reason: String) {
    tracing::warn!(gate = %gate_name, reason = %reason, "Quality gate not evaluated");
    report.skipped.push(GateSkip {
        gate_name: gate_name.to_string(),
        reason,
    });
}
