//! Pipeline event stream for observability.
//!
//! Emits [`PipelineEvent`]s via a [`tokio::sync::broadcast`] channel so that
//! external observers (loggers, dashboards, tests) can follow run progress
//! without coupling to the engine internals.

use serde::{Deserialize, Serialize};

/// Events emitted during a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    PipelineStarted {
        pipeline_name: String,
        layer_count: usize,
    },
    LayerStarted {
        layer_id: u32,
        layer_name: String,
        parallel: bool,
        tool_count: usize,
    },
    LayerCompleted {
        layer_id: u32,
        success: bool,
        duration_ms: u64,
    },
    LayerSkipped {
        layer_id: u32,
        reason: String,
    },
    ToolStarted {
        layer_id: u32,
        tool_name: String,
    },
    ToolCompleted {
        layer_id: u32,
        tool_name: String,
        success: bool,
        duration_ms: u64,
    },
    CheckpointSaved {
        layer_id: u32,
    },
    GateEvaluated {
        gate_name: String,
        passed: bool,
    },
    GateSkipped {
        gate_name: String,
        reason: String,
    },
    RollbackStarted {
        failed_layer_id: u32,
        action_count: usize,
    },
    RollbackActionFinished {
        action_name: String,
        success: bool,
    },
    PipelineCompleted {
        pipeline_name: String,
        state: String,
        duration_ms: u64,
    },
}

/// Event emitter wrapping a broadcast sender.
#[derive(Clone, Debug)]
pub struct EventEmitter {
    sender: tokio::sync::broadcast::Sender<PipelineEvent>,
}

impl EventEmitter {
    /// Create a new emitter with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all current subscribers.
    ///
    /// If there are no active receivers the event is silently dropped.
    pub fn emit(&self, event: PipelineEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(256)
    }
}
