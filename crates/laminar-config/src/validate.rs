//! Startup validation: rule-based diagnostics for pipeline definitions.
//!
//! Call [`validate`] for advisory diagnostics or [`validate_or_raise`] to
//! fail on the first `Error`-severity issue. Validation runs before any
//! layer executes; it is the only place where a malformed definition is
//! allowed to abort the run.

use std::collections::HashSet;

use laminar_types::{LaminarError, Result};

use crate::schema::{PipelineDefinition, SourceLayer};

// ---------------------------------------------------------------------------
// Diagnostic types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    pub layer_id: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

// ---------------------------------------------------------------------------
// ConfigRule trait
// ---------------------------------------------------------------------------

pub trait ConfigRule: Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, def: &PipelineDefinition) -> Vec<Diagnostic>;
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

struct LayerOrderRule;
impl ConfigRule for LayerOrderRule {
    fn name(&self) -> &str {
        "layer_order"
    }
    fn apply(&self, def: &PipelineDefinition) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        if def.layers.is_empty() {
            diags.push(Diagnostic {
                rule: self.name().into(),
                severity: Severity::Warning,
                message: "Pipeline declares no layers; a run will trivially succeed".into(),
                layer_id: None,
            });
            return diags;
        }
        let mut prev: Option<u32> = None;
        for layer in &def.layers {
            if let Some(p) = prev {
                if layer.id <= p {
                    diags.push(Diagnostic {
                        rule: self.name().into(),
                        severity: Severity::Error,
                        message: format!(
                            "Layer id {} follows {}; ids must be unique and strictly increasing",
                            layer.id, p
                        ),
                        layer_id: Some(layer.id),
                    });
                }
            }
            prev = Some(layer.id);
        }
        diags
    }
}

struct DependencyRule;
impl ConfigRule for DependencyRule {
    fn name(&self) -> &str {
        "dependencies"
    }
    fn apply(&self, def: &PipelineDefinition) -> Vec<Diagnostic> {
        let declared: HashSet<u32> = def.layers.iter().map(|l| l.id).collect();
        let mut diags = Vec::new();
        for layer in &def.layers {
            for dep in &layer.dependencies {
                if !declared.contains(dep) {
                    diags.push(Diagnostic {
                        rule: self.name().into(),
                        severity: Severity::Error,
                        message: format!(
                            "Layer {} ('{}') depends on undeclared layer {}",
                            layer.id, layer.name, dep
                        ),
                        layer_id: Some(layer.id),
                    });
                } else if *dep >= layer.id {
                    diags.push(Diagnostic {
                        rule: self.name().into(),
                        severity: Severity::Error,
                        message: format!(
                            "Layer {} ('{}') depends on layer {}, which does not run before it",
                            layer.id, layer.name, dep
                        ),
                        layer_id: Some(layer.id),
                    });
                }
            }
        }
        diags
    }
}

struct ToolCommandRule;
impl ConfigRule for ToolCommandRule {
    fn name(&self) -> &str {
        "tool_command"
    }
    fn apply(&self, def: &PipelineDefinition) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        for layer in &def.layers {
            let mut seen = HashSet::new();
            for tool in &layer.tools {
                if tool.script.trim().is_empty() {
                    diags.push(Diagnostic {
                        rule: self.name().into(),
                        severity: Severity::Error,
                        message: format!(
                            "Tool '{}' in layer {} has an empty script",
                            tool.name, layer.id
                        ),
                        layer_id: Some(layer.id),
                    });
                }
                if !seen.insert(tool.name.as_str()) {
                    diags.push(Diagnostic {
                        rule: self.name().into(),
                        severity: Severity::Warning,
                        message: format!(
                            "Layer {} declares tool '{}' more than once; gate sources resolve to the first",
                            layer.id, tool.name
                        ),
                        layer_id: Some(layer.id),
                    });
                }
            }
        }
        diags
    }
}

struct GateSourceRule;
impl ConfigRule for GateSourceRule {
    fn name(&self) -> &str {
        "gate_source"
    }
    fn apply(&self, def: &PipelineDefinition) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        for gate in &def.quality_gates {
            let Some(sref) = gate.source_ref() else {
                diags.push(Diagnostic {
                    rule: self.name().into(),
                    severity: Severity::Error,
                    message: format!(
                        "Gate '{}' has malformed source '{}'; expected \"layer.tool\"",
                        gate.name, gate.source
                    ),
                    layer_id: None,
                });
                continue;
            };
            let layer = match &sref.layer {
                SourceLayer::Id(id) => def.layer(*id),
                SourceLayer::Name(name) => def.layer_by_name(name),
            };
            let Some(layer) = layer else {
                diags.push(Diagnostic {
                    rule: self.name().into(),
                    severity: Severity::Warning,
                    message: format!(
                        "Gate '{}' references unknown layer in source '{}'; it will never be evaluated",
                        gate.name, gate.source
                    ),
                    layer_id: None,
                });
                continue;
            };
            if !layer.tools.iter().any(|t| t.name == sref.tool) {
                diags.push(Diagnostic {
                    rule: self.name().into(),
                    severity: Severity::Warning,
                    message: format!(
                        "Gate '{}' references unknown tool '{}' in layer {}; it will never be evaluated",
                        gate.name, sref.tool, layer.id
                    ),
                    layer_id: Some(layer.id),
                });
            }
        }
        diags
    }
}

struct RollbackRule;
impl ConfigRule for RollbackRule {
    fn name(&self) -> &str {
        "rollback"
    }
    fn apply(&self, def: &PipelineDefinition) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        if !def.rollback.enabled {
            return diags;
        }
        let declared: HashSet<u32> = def.layers.iter().map(|l| l.id).collect();
        for id in &def.rollback.on_failure_at_layers {
            if !declared.contains(id) {
                diags.push(Diagnostic {
                    rule: self.name().into(),
                    severity: Severity::Warning,
                    message: format!("Rollback trigger references undeclared layer {}", id),
                    layer_id: Some(*id),
                });
            }
        }
        if def.rollback.actions.is_empty() {
            diags.push(Diagnostic {
                rule: self.name().into(),
                severity: Severity::Warning,
                message: "Rollback is enabled but declares no actions".into(),
                layer_id: None,
            });
        }
        diags
    }
}

struct ExecutionRule;
impl ConfigRule for ExecutionRule {
    fn name(&self) -> &str {
        "execution"
    }
    fn apply(&self, def: &PipelineDefinition) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        if def.execution.max_parallel == 0 {
            diags.push(Diagnostic {
                rule: self.name().into(),
                severity: Severity::Error,
                message: "execution.max_parallel must be at least 1".into(),
                layer_id: None,
            });
        }
        diags
    }
}

struct NotificationRule;
impl ConfigRule for NotificationRule {
    fn name(&self) -> &str {
        "notifications"
    }
    fn apply(&self, def: &PipelineDefinition) -> Vec<Diagnostic> {
        const LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];
        let mut diags = Vec::new();
        let all = def
            .notifications
            .on_success
            .iter()
            .chain(def.notifications.on_failure.iter());
        for spec in all {
            if !LEVELS.contains(&spec.level.to_lowercase().as_str()) {
                diags.push(Diagnostic {
                    rule: self.name().into(),
                    severity: Severity::Warning,
                    message: format!(
                        "Unknown notification level '{}'; falling back to 'info'",
                        spec.level
                    ),
                    layer_id: None,
                });
            }
        }
        diags
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

fn all_rules() -> Vec<Box<dyn ConfigRule>> {
    vec![
        Box::new(LayerOrderRule),
        Box::new(DependencyRule),
        Box::new(ToolCommandRule),
        Box::new(GateSourceRule),
        Box::new(RollbackRule),
        Box::new(ExecutionRule),
        Box::new(NotificationRule),
    ]
}

/// Run every rule and collect diagnostics.
pub fn validate(def: &PipelineDefinition) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    for rule in all_rules() {
        diags.extend(rule.apply(def));
    }
    diags
}

/// Validate and return an error for the first `Error`-severity diagnostic.
pub fn validate_or_raise(def: &PipelineDefinition) -> Result<()> {
    let diags = validate(def);
    for diag in &diags {
        match diag.severity {
            Severity::Error => {
                return Err(LaminarError::ValidationError(format!(
                    "[{}] {}",
                    diag.rule, diag.message
                )));
            }
            Severity::Warning => {
                tracing::warn!(rule = %diag.rule, "{}", diag.message);
            }
            Severity::Info => {
                tracing::info!(rule = %diag.rule, "{}", diag.message);
            }
        }
    }
    Ok(())
}
