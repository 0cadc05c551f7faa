//! The pipeline orchestrator — the top-level run loop.
//!
//! Drives the state machine `Pending → Running(layer) → {Running(next) |
//! RollingBack} → GateCheck → {Succeeded | Failed}`. Layers execute strictly
//! in declared order; state checkpoints after every layer; rollback fires at
//! most once, when a trigger-listed layer causes the stop decision; gates
//! evaluate after all layers regardless of per-layer outcomes.

use laminar_config::{validate_or_raise, PipelineDefinition};
use laminar_types::{ExecutionState, LaminarError, Result, RunState};

use crate::checkpoint::StateCheckpointer;
use crate::context::RunContext;
use crate::events::{EventEmitter, PipelineEvent};
use crate::gates::evaluate_gates;
use crate::notify::emit_notification;
use crate::rollback::{ActionOutcome, RollbackCoordinator};
use crate::scheduler::LayerScheduler;
use crate::summary::RunSummary;

/// Options for one `run` invocation.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Resume: skip layers with id below this, trusting the persisted state
    /// for their results. Requires an existing state file.
    pub start_layer: Option<u32>,
}

/// One tool in the dry-run plan.
#[derive(Debug, Clone)]
pub struct PlannedTool {
    pub name: String,
    pub script: String,
    pub args: Vec<String>,
    pub optional: bool,
}

/// One layer in the dry-run plan.
#[derive(Debug, Clone)]
pub struct PlannedLayer {
    pub id: u32,
    pub name: String,
    pub parallel: bool,
    pub dependencies: Vec<u32>,
    pub delay_seconds: u64,
    pub tools: Vec<PlannedTool>,
}

/// Top-level driver composing the scheduler, checkpointer, gate evaluator,
/// and rollback coordinator.
#[derive(Debug)]
pub struct PipelineOrchestrator {
    def: PipelineDefinition,
    ctx: RunContext,
}

impl PipelineOrchestrator {
    /// Validate the definition and prepare a run context. Validation errors
    /// are the only fatal errors: nothing has executed yet.
    pub fn new(def: PipelineDefinition) -> Result<Self> {
        validate_or_raise(&def)?;
        let ctx = RunContext::new(&def);
        Ok(Self { def, ctx })
    }

    pub fn definition(&self) -> &PipelineDefinition {
        &self.def
    }

    /// Subscribe point for run progress events.
    pub fn events(&self) -> &EventEmitter {
        &self.ctx.events
    }

    /// The planned execution order, without invoking anything. Used by
    /// `--dry-run`; by construction it cannot touch the state file.
    pub fn plan(&self) -> Vec<PlannedLayer> {
        self.def
            .layers
            .iter()
            .map(|layer| PlannedLayer {
                id: layer.id,
                name: layer.name.clone(),
                parallel: layer.parallel,
                dependencies: layer.dependencies.clone(),
                delay_seconds: layer.delay_seconds,
                tools: layer
                    .tools
                    .iter()
                    .map(|t| PlannedTool {
                        name: t.name.clone(),
                        script: t.script.clone(),
                        args: t.args.clone(),
                        optional: t.optional,
                    })
                    .collect(),
            })
            .collect()
    }

    /// Execute the pipeline to a terminal state and produce the summary.
    ///
    /// Tool and layer failures never surface as errors here; the `Err` path
    /// is reserved for resume problems and I/O on the runner's own state
    /// file.
    pub async fn run(&self, options: RunOptions) -> Result<RunSummary> {
        let settings = &self.ctx.settings;
        let checkpointer = StateCheckpointer::new(settings.state_file.clone());
        let scheduler = LayerScheduler::new(&self.ctx);
        let rollback = RollbackCoordinator::new(&self.ctx);

        let mut state = match options.start_layer {
            Some(n) => {
                let loaded =
                    checkpointer
                        .load()
                        .await?
                        .ok_or_else(|| LaminarError::ResumeError {
                            start_layer: n,
                            reason: format!(
                                "state file '{}' not found",
                                settings.state_file.display()
                            ),
                        })?;
                tracing::info!(
                    start_layer = n,
                    restored_layers = loaded.layers.len(),
                    "Resuming from persisted state"
                );
                loaded
            }
            None => ExecutionState::new(),
        };

        let mut machine = RunState::Pending;
        tracing::debug!(state = %machine, "State transition");
        tracing::info!(
            run_id = %self.ctx.run_id,
            pipeline = %self.ctx.pipeline_name,
            layers = self.def.layers.len(),
            "Starting pipeline"
        );
        self.ctx.events.emit(PipelineEvent::PipelineStarted {
            pipeline_name: self.ctx.pipeline_name.clone(),
            layer_count: self.def.layers.len(),
        });

        let mut stopping = false;
        let mut first_failed_layer: Option<u32> = None;
        let mut rollback_actions: Vec<ActionOutcome> = Vec::new();

        for layer in &self.def.layers {
            if let Some(n) = options.start_layer {
                if layer.id < n {
                    tracing::debug!(layer = layer.id, "Trusting persisted result");
                    continue;
                }
            }
            if stopping && !layer.always_run {
                tracing::info!(layer = layer.id, "Skipping: pipeline is stopping");
                continue;
            }

            machine = RunState::Running;
            tracing::debug!(state = %machine, layer = layer.id, "State transition");
            self.ctx.events.emit(PipelineEvent::LayerStarted {
                layer_id: layer.id,
                layer_name: layer.name.clone(),
                parallel: layer.parallel,
                tool_count: layer.tools.len(),
            });

            let result = scheduler.execute(layer, &state).await;
            let layer_ok = result.success;
            self.ctx.events.emit(PipelineEvent::LayerCompleted {
                layer_id: layer.id,
                success: layer_ok,
                duration_ms: result.duration_ms,
            });
            state.record(result);

            if settings.save_state {
                checkpointer.save(&state).await?;
                self.ctx
                    .events
                    .emit(PipelineEvent::CheckpointSaved { layer_id: layer.id });
            }

            if layer_ok {
                continue;
            }
            if settings.continue_on_failure {
                tracing::warn!(layer = layer.id, "Layer failed; continue_on_failure is set");
                first_failed_layer.get_or_insert(layer.id);
                continue;
            }

            first_failed_layer.get_or_insert(layer.id);
            if !stopping {
                stopping = true;
                tracing::error!(layer = layer.id, "Layer failed; pipeline will stop");
                if RollbackCoordinator::should_trigger(
                    &self.def.rollback,
                    layer.id,
                    settings.continue_on_failure,
                ) {
                    machine = RunState::RollingBack;
                    tracing::debug!(state = %machine, "State transition");
                    self.ctx.events.emit(PipelineEvent::RollbackStarted {
                        failed_layer_id: layer.id,
                        action_count: self.def.rollback.actions.len(),
                    });
                    rollback_actions = rollback.rollback(&self.def.rollback.actions).await;
                }
            }
        }

        // Gates run after all layers regardless of per-layer outcomes.
        machine = RunState::GateCheck;
        tracing::debug!(state = %machine, "State transition");
        let gates = evaluate_gates(&self.def, &state);
        for failure in &gates.failures {
            self.ctx.events.emit(PipelineEvent::GateEvaluated {
                gate_name: failure.gate_name.clone(),
                passed: false,
            });
        }
        for skip in &gates.skipped {
            self.ctx.events.emit(PipelineEvent::GateSkipped {
                gate_name: skip.gate_name.clone(),
                reason: skip.reason.clone(),
            });
        }

        // A non-optional layer failure fails the run even when
        // continue_on_failure kept the remaining layers executing.
        machine = if first_failed_layer.is_none() && gates.passed() {
            RunState::Succeeded
        } else {
            RunState::Failed
        };

        let duration_ms = (chrono::Utc::now() - self.ctx.started_at)
            .num_milliseconds()
            .max(0) as u64;

        self.notify(machine, first_failed_layer);
        self.ctx.events.emit(PipelineEvent::PipelineCompleted {
            pipeline_name: self.ctx.pipeline_name.clone(),
            state: machine.to_string(),
            duration_ms,
        });
        tracing::info!(run_id = %self.ctx.run_id, state = %machine, "Pipeline finished");

        let layers = state.layers.values().cloned().collect();
        Ok(RunSummary {
            run_id: self.ctx.run_id.to_string(),
            pipeline_name: self.ctx.pipeline_name.clone(),
            state: machine,
            started_at: self.ctx.started_at,
            duration_ms,
            layers,
            gates,
            rollback_actions,
        })
    }

    fn notify(&self, state: RunState, first_failed_layer: Option<u32>) {
        let mut vars = std::collections::HashMap::new();
        vars.insert(
            "pipeline_name".to_string(),
            self.ctx.pipeline_name.clone(),
        );
        vars.insert(
            "layer_id".to_string(),
            first_failed_layer
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
        );
        let specs = if state == RunState::Succeeded {
            &self.def.notifications.on_success
        } else {
            &self.def.notifications.on_failure
        };
        for spec in specs {
            emit_notification(spec, &vars);
        }
    }
}
