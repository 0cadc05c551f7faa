//! Per-run context shared by every component.

use laminar_config::{ExecutionSettings, PipelineDefinition};
use uuid::Uuid;

use crate::events::EventEmitter;

/// Everything a component needs to know about the current run.
///
/// Created once per `run` invocation and passed by reference into every
/// component constructor; discarded at process exit. There is no global
/// mutable state anywhere in the runner.
#[derive(Clone, Debug)]
pub struct RunContext {
    pub run_id: Uuid,
    pub pipeline_name: String,
    pub settings: ExecutionSettings,
    pub events: EventEmitter,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl RunContext {
    pub fn new(def: &PipelineDefinition) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            pipeline_name: def.pipeline_name.clone(),
            settings: def.execution.clone(),
            events: EventEmitter::default(),
            started_at: chrono::Utc::now(),
        }
    }
}
