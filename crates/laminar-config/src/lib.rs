//! Pipeline definition schema, YAML loading, and startup validation.
//!
//! A pipeline definition is a YAML document declaring ordered layers of
//! external tools, global execution settings, quality gates, a rollback
//! policy, and terminal-state notifications. [`load`] parses a file into a
//! typed [`PipelineDefinition`]; [`validate_or_raise`] rejects malformed
//! definitions before any layer executes.
//!
//! # Example
//! ```
//! let yaml = r#"
//! pipeline_name: nightly-checks
//! version: "1"
//! layers:
//!   - id: 1
//!     name: lint
//!     tools:
//!       - name: fmt
//!         script: cargo-fmt-check.sh
//! "#;
//! let def = laminar_config::parse(yaml).unwrap();
//! assert_eq!(def.pipeline_name, "nightly-checks");
//! assert_eq!(def.layers.len(), 1);
//! ```

pub mod loader;
pub mod schema;
pub mod validate;

pub use loader::{load, parse};
pub use schema::{
    ExecutionSettings, GateOperator, LayerSpec, NotificationSpec, NotificationsSpec,
    PipelineDefinition, QualityGateSpec, RollbackActionSpec, RollbackSpec, SourceLayer, SourceRef,
    ToolSpec,
};
pub use validate::{validate, validate_or_raise, ConfigRule, Diagnostic, Severity};
