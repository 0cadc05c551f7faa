//! Layer scheduling, quality gates, state checkpointing, rollback, and the
//! pipeline orchestrator.
//!
//! This crate implements the core Laminar runner: layers execute strictly in
//! declared order, tools within a layer run sequentially or as a bounded
//! concurrent fan-out, results checkpoint to disk after every layer, quality
//! gates evaluate once all layers have run, and a configured rollback fires
//! when a designated layer causes the pipeline to stop.

pub mod checkpoint;
pub mod context;
pub mod engine;
pub mod events;
pub mod gates;
pub mod notify;
pub mod rollback;
pub mod scheduler;
pub mod summary;

pub use checkpoint::StateCheckpointer;
pub use context::RunContext;
pub use engine::{PipelineOrchestrator, PlannedLayer, PlannedTool, RunOptions};
pub use events::{EventEmitter, PipelineEvent};
pub use gates::{evaluate_gates, GateFailure, GateReport, GateSkip};
pub use notify::{emit_notification, expand_template};
pub use rollback::{ActionOutcome, RollbackCoordinator};
pub use scheduler::LayerScheduler;
pub use summary::RunSummary;
