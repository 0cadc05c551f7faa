//! Rollback: best-effort compensating commands after a designated failure.

use laminar_config::{RollbackActionSpec, RollbackSpec};
use laminar_exec::CommandRunner;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::context::RunContext;
use crate::events::{EventEmitter, PipelineEvent};

/// Outcome of one compensating action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub name: String,
    pub success: bool,
    pub exit_code: i32,
    pub duration_ms: u64,
}

/// Runs the configured compensating commands when a rollback-listed layer
/// causes the pipeline to stop.
pub struct RollbackCoordinator {
    runner: CommandRunner,
    timeout: Duration,
    events: EventEmitter,
}

impl RollbackCoordinator {
    pub fn new(ctx: &RunContext) -> Self {
        Self {
            runner: CommandRunner::new(),
            timeout: ctx.settings.tool_timeout(),
            events: ctx.events.clone(),
        }
    }

    /// Whether a failure at `layer_id` triggers rollback.
    ///
    /// Rollback is strictly subordinate to the stop decision: it never fires
    /// while `continue_on_failure` keeps the pipeline going, even if the
    /// failing layer is in the trigger list.
    pub fn should_trigger(spec: &RollbackSpec, layer_id: u32, continue_on_failure: bool) -> bool {
        !continue_on_failure && spec.triggers_on(layer_id)
    }

    /// Run every configured action, best-effort: a failing action is logged
    /// and the remaining actions still run. Actions are never retried, and a
    /// rollback is never rolled back.
    pub async fn rollback(&self, actions: &[RollbackActionSpec]) -> Vec<ActionOutcome> {
        let mut outcomes = Vec::with_capacity(actions.len());
        for action in actions {
            tracing::info!(action = %action.name, script = %action.script, "Running rollback action");
            let output = self.runner.run(&action.script, &action.args, self.timeout).await;
            let success = output.success();
            if !success {
                tracing::error!(
                    action = %action.name,
                    exit_code = output.exit_code,
                    stderr = %output.stderr,
                    "Rollback action failed; continuing with remaining actions"
                );
            }
            self.events.emit(PipelineEvent::RollbackActionFinished {
                action_name: action.name.clone(),
                success,
            });
            outcomes.push(ActionOutcome {
                name: action.name.clone(),
                success,
                exit_code: output.exit_code,
                duration_ms: output.duration_ms,
            });
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RunContext {
        let def = laminar_config::parse(
            "pipeline_name: rb-test\nlayers:\n  - id: 1\n    name: l\nexecution:\n  timeout_seconds: 30\n",
        )
        .unwrap();
        RunContext::new(&def)
    }

    fn action(name: &str, script: &str, args: &[&str]) -> RollbackActionSpec {
        RollbackActionSpec {
            name: name.to_string(),
            script: script.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn trigger_requires_stop_decision() {
        let spec = RollbackSpec {
            enabled: true,
            on_failure_at_layers: vec![2],
            actions: vec![],
        };
        assert!(RollbackCoordinator::should_trigger(&spec, 2, false));
        // continue_on_failure keeps the pipeline going: no rollback.
        assert!(!RollbackCoordinator::should_trigger(&spec, 2, true));
        // Unlisted layer: no rollback.
        assert!(!RollbackCoordinator::should_trigger(&spec, 1, false));
    }

    #[test]
    fn trigger_requires_enabled() {
        let spec = RollbackSpec {
            enabled: false,
            on_failure_at_layers: vec![2],
            actions: vec![],
        };
        assert!(!RollbackCoordinator::should_trigger(&spec, 2, false));
    }

    #[tokio::test]
    async fn all_actions_run_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("order.log");

        let coordinator = RollbackCoordinator::new(&ctx());
        let outcomes = coordinator
            .rollback(&[
                action("first", "sh", &["-c", &format!("echo one >> {}", log.display())]),
                action("second", "sh", &["-c", &format!("echo two >> {}", log.display())]),
            ])
            .await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.success));
        let content = std::fs::read_to_string(&log).unwrap();
        assert_eq!(content, "one\ntwo\n");
    }

    #[tokio::test]
    async fn failed_action_does_not_abort_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("still-ran");

        let coordinator = RollbackCoordinator::new(&ctx());
        let outcomes = coordinator
            .rollback(&[
                action("broken", "false", &[]),
                action("cleanup", "touch", &[marker.to_str().unwrap()]),
            ])
            .await;

        assert_eq!(outcomes.len(), 2);
        assert!(!outcomes[0].success);
        assert!(outcomes[1].success);
        assert!(marker.exists(), "later actions must still run");
    }

    #[tokio::test]
    async fn missing_rollback_binary_is_recorded_not_raised() {
        let coordinator = RollbackCoordinator::new(&ctx());
        let outcomes = coordinator
            .rollback(&[action("ghost", "no-such-rollback-binary", &[])])
            .await;
        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].success);
        assert_eq!(outcomes[0].exit_code, -1);
    }

    #[tokio::test]
    async fn empty_action_list_is_a_no_op() {
        let coordinator = RollbackCoordinator::new(&ctx());
        let outcomes = coordinator.rollback(&[]).await;
        assert!(outcomes.is_empty());
    }
}
