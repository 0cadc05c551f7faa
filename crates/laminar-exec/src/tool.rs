//! Tool execution: command + metric scraping → `ToolResult`.

use std::time::Duration;

use laminar_config::ToolSpec;
use laminar_types::ToolResult;

use crate::command::CommandRunner;
use crate::metrics::MetricParser;
use crate::truncation::{truncate_output, TruncationMode};

/// Cap on captured output stored per stream in a `ToolResult`.
const MAX_CAPTURE_CHARS: usize = 30_000;

/// Executes one tool and produces a uniform [`ToolResult`].
pub struct ToolExecutor {
    runner: CommandRunner,
    parser: MetricParser,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            runner: CommandRunner::new(),
            parser: MetricParser::new(),
            timeout,
        }
    }

    /// Run `tool` and convert the raw command output into a `ToolResult`.
    ///
    /// Metrics are scraped from the untruncated stdout before the captured
    /// streams are capped for storage. Failures (nonzero exit, timeout,
    /// spawn error) are encoded in the result, never raised.
    pub async fn execute(&self, tool: &ToolSpec, layer_id: u32) -> ToolResult {
        tracing::info!(tool = %tool.name, layer = layer_id, script = %tool.script, "Executing tool");

        let output = self.runner.run(&tool.script, &tool.args, self.timeout).await;
        let metrics = self.parser.parse(&output.stdout);

        let error = if output.timed_out {
            Some(format!(
                "tool '{}' timed out after {}s",
                tool.name,
                self.timeout.as_secs()
            ))
        } else {
            output.spawn_error.clone()
        };

        let success = output.success();
        if success {
            tracing::info!(
                tool = %tool.name,
                layer = layer_id,
                duration_ms = output.duration_ms,
                "Tool succeeded"
            );
        } else {
            tracing::warn!(
                tool = %tool.name,
                layer = layer_id,
                exit_code = output.exit_code,
                timed_out = output.timed_out,
                "Tool failed"
            );
        }

        ToolResult {
            tool_name: tool.name.clone(),
            layer_id,
            success,
            exit_code: output.exit_code,
            stdout: truncate_output(&output.stdout, MAX_CAPTURE_CHARS, TruncationMode::HeadTail),
            stderr: truncate_output(&output.stderr, MAX_CAPTURE_CHARS, TruncationMode::Tail),
            duration_ms: output.duration_ms,
            timed_out: output.timed_out,
            metrics,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, script: &str, args: &[&str]) -> ToolSpec {
        ToolSpec {
            name: name.to_string(),
            script: script.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            optional: false,
        }
    }

    #[tokio::test]
    async fn successful_tool_with_metrics() {
        let executor = ToolExecutor::new(Duration::from_secs(10));
        let tool = spec("reporter", "sh", &["-c", "echo 'Pass Rate: 96%'"]);

        let result = executor.execute(&tool, 2).await;
        assert!(result.success);
        assert_eq!(result.layer_id, 2);
        assert_eq!(result.tool_name, "reporter");
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.metrics.get("pass_rate"), Some(&96.0));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn failing_tool_is_a_result_not_an_error() {
        let executor = ToolExecutor::new(Duration::from_secs(10));
        let tool = spec("broken", "false", &[]);

        let result = executor.execute(&tool, 1).await;
        assert!(!result.success);
        assert_ne!(result.exit_code, 0);
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn timed_out_tool_reports_error() {
        let executor = ToolExecutor::new(Duration::from_millis(100));
        let tool = spec("slow", "sleep", &["30"]);

        let result = executor.execute(&tool, 1).await;
        assert!(!result.success);
        assert!(result.timed_out);
        assert!(result.error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn missing_executable_reports_spawn_error() {
        let executor = ToolExecutor::new(Duration::from_secs(5));
        let tool = spec("ghost", "no-such-binary-qqq", &[]);

        let result = executor.execute(&tool, 1).await;
        assert!(!result.success);
        assert_eq!(result.exit_code, -1);
        assert!(result.error.as_deref().unwrap().contains("failed to spawn"));
    }

    #[tokio::test]
    async fn metrics_scraped_even_on_failure() {
        let executor = ToolExecutor::new(Duration::from_secs(10));
        let tool = spec(
            "partial",
            "sh",
            &["-c", "echo 'Violations: 5'; exit 1"],
        );

        let result = executor.execute(&tool, 1).await;
        assert!(!result.success);
        assert_eq!(result.metrics.get("violations"), Some(&5.0));
    }

    #[tokio::test]
    async fn oversized_output_is_truncated_for_storage() {
        let executor = ToolExecutor::new(Duration::from_secs(10));
        let tool = spec(
            "chatty",
            "sh",
            &["-c", "head -c 100000 /dev/zero | tr '\\0' 'x'"],
        );

        let result = executor.execute(&tool, 1).await;
        assert!(result.success);
        assert!(result.stdout.len() < 100_000);
        assert!(result.stdout.contains("bytes truncated"));
    }
}
