//! Layer execution: dependency checks, sequential short-circuit, and
//! bounded parallel fan-out.

use std::sync::Arc;

use laminar_config::LayerSpec;
use laminar_exec::ToolExecutor;
use laminar_types::{ExecutionState, LayerResult, ToolResult};
use tokio::sync::{mpsc, Semaphore};

use crate::context::RunContext;
use crate::events::{EventEmitter, PipelineEvent};

/// Executes one layer's tools and produces a [`LayerResult`].
pub struct LayerScheduler {
    executor: Arc<ToolExecutor>,
    max_parallel: usize,
    events: EventEmitter,
}

impl LayerScheduler {
    pub fn new(ctx: &RunContext) -> Self {
        Self {
            executor: Arc::new(ToolExecutor::new(ctx.settings.tool_timeout())),
            max_parallel: ctx.settings.max_parallel,
            events: ctx.events.clone(),
        }
    }

    /// Execute `layer` against the results accumulated so far.
    ///
    /// If any declared dependency is absent from `prior` or failed, the
    /// layer is skipped: the result carries `success=false` and zero tool
    /// results, and no subprocess is spawned.
    pub async fn execute(&self, layer: &LayerSpec, prior: &ExecutionState) -> LayerResult {
        let start = tokio::time::Instant::now();

        for dep in &layer.dependencies {
            if !prior.layer_succeeded(*dep) {
                tracing::warn!(
                    layer = layer.id,
                    name = %layer.name,
                    dependency = dep,
                    "Skipping layer: dependency has not succeeded"
                );
                self.events.emit(PipelineEvent::LayerSkipped {
                    layer_id: layer.id,
                    reason: format!("dependency layer {} has not succeeded", dep),
                });
                return LayerResult::dependency_unmet(layer.id, &layer.name, *dep);
            }
        }

        if layer.delay_seconds > 0 {
            tracing::debug!(layer = layer.id, delay_s = layer.delay_seconds, "Start delay");
            tokio::time::sleep(layer.delay()).await;
        }

        let tools = if layer.parallel {
            self.run_parallel(layer).await
        } else {
            self.run_sequential(layer).await
        };

        let success = layer.optional
            || tools
                .iter()
                .all(|t| t.success || tool_is_optional(layer, &t.tool_name));

        LayerResult {
            layer_id: layer.id,
            layer_name: layer.name.clone(),
            success,
            tools,
            duration_ms: start.elapsed().as_millis() as u64,
            skipped_reason: None,
        }
    }

    /// Fan out every tool as its own task, bounded by the worker limit.
    /// Results arrive in completion order through the aggregation channel.
    async fn run_parallel(&self, layer: &LayerSpec) -> Vec<ToolResult> {
        tracing::info!(
            layer = layer.id,
            tools = layer.tools.len(),
            max_parallel = self.max_parallel,
            "Parallel fan-out"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let (tx, mut rx) = mpsc::channel(layer.tools.len().max(1));

        for tool in layer.tools.iter().cloned() {
            let semaphore = semaphore.clone();
            let executor = self.executor.clone();
            let events = self.events.clone();
            let tx = tx.clone();
            let layer_id = layer.id;
            tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore open");
                events.emit(PipelineEvent::ToolStarted {
                    layer_id,
                    tool_name: tool.name.clone(),
                });
                let result = executor.execute(&tool, layer_id).await;
                events.emit(PipelineEvent::ToolCompleted {
                    layer_id,
                    tool_name: result.tool_name.clone(),
                    success: result.success,
                    duration_ms: result.duration_ms,
                });
                let _ = tx.send(result).await;
            });
        }
        drop(tx);

        let mut results = Vec::with_capacity(layer.tools.len());
        while let Some(result) = rx.recv().await {
            results.push(result);
        }
        results
    }

    /// Execute tools strictly in declared order. A required tool's failure
    /// stops dispatch of the remaining tools unless the layer is
    /// `always_run`.
    async fn run_sequential(&self, layer: &LayerSpec) -> Vec<ToolResult> {
        let mut results = Vec::with_capacity(layer.tools.len());
        for tool in &layer.tools {
            self.events.emit(PipelineEvent::ToolStarted {
                layer_id: layer.id,
                tool_name: tool.name.clone(),
            });
            let result = self.executor.execute(tool, layer.id).await;
            self.events.emit(PipelineEvent::ToolCompleted {
                layer_id: layer.id,
                tool_name: result.tool_name.clone(),
                success: result.success,
                duration_ms: result.duration_ms,
            });

            let required_failure = !result.success && !tool.optional;
            results.push(result);
            if required_failure && !layer.always_run {
                tracing::warn!(
                    layer = layer.id,
                    tool = %tool.name,
                    "Halting layer after required tool failure"
                );
                break;
            }
        }
        results
    }
}

fn tool_is_optional(layer: &LayerSpec, tool_name: &str) -> bool {
    layer
        .tools
        .iter()
        .find(|t| t.name == tool_name)
        .map(|t| t.optional)
        .unwrap_or(false)
}
