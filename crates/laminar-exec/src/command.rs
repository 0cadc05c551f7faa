//! External command execution with timeout and process-group termination.

use std::time::Duration;

use tokio::io::AsyncReadExt;

/// Outcome of one external command. Spawn failures and timeouts are encoded
/// here rather than raised: the caller always gets a `CommandOutput`.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code; -1 when the process timed out, was killed by a signal, or
    /// never started.
    pub exit_code: i32,
    pub timed_out: bool,
    pub duration_ms: u64,
    /// Set when the process could not be started at all (missing
    /// executable, permission denied).
    pub spawn_error: Option<String>,
}

impl CommandOutput {
    /// Whether the command ran to completion with exit code 0.
    pub fn success(&self) -> bool {
        !self.timed_out && self.spawn_error.is_none() && self.exit_code == 0
    }
}

/// Runs external tools as subprocesses.
#[derive(Debug, Clone, Default)]
pub struct CommandRunner;

impl CommandRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run `program` with `args`, waiting up to `timeout`.
    ///
    /// A zero `timeout` disables the deadline. On timeout the process group
    /// receives SIGTERM, escalating to SIGKILL after a short grace period.
    /// This method never fails: spawn errors and timeouts come back as a
    /// failed `CommandOutput`.
    pub async fn run(&self, program: &str, args: &[String], timeout: Duration) -> CommandOutput {
        let start = tokio::time::Instant::now();

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());

        // On Unix, a dedicated process group lets the timeout path kill the
        // whole tree, not just the direct child.
        #[cfg(unix)]
        {
            cmd.process_group(0);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let message = format!("failed to spawn '{}': {}", program, e);
                tracing::warn!(program = %program, error = %e, "Spawn failed");
                return CommandOutput {
                    stdout: String::new(),
                    stderr: message.clone(),
                    exit_code: -1,
                    timed_out: false,
                    duration_ms: start.elapsed().as_millis() as u64,
                    spawn_error: Some(message),
                };
            }
        };

        // Drain stdout/stderr concurrently with the wait so a chatty child
        // can never fill its pipe and wedge.
        let mut stdout = child.stdout.take().expect("stdout piped");
        let mut stderr = child.stderr.take().expect("stderr piped");
        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stdout.read_to_end(&mut buf).await;
            buf
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            buf
        });

        let timed_out = if timeout.is_zero() {
            let _ = child.wait().await;
            false
        } else {
            tokio::select! {
                _ = child.wait() => false,
                _ = tokio::time::sleep(timeout) => {
                    Self::terminate(&mut child).await;
                    true
                }
            }
        };

        // `wait` in the select arm may have returned before the status was
        // stored; `try_wait` after termination retrieves it either way.
        let status = child.try_wait().ok().flatten();
        let exit_code = if timed_out {
            -1
        } else {
            status.and_then(|s| s.code()).unwrap_or(-1)
        };

        let stdout_buf = stdout_task.await.unwrap_or_default();
        let stderr_buf = stderr_task.await.unwrap_or_default();
        let duration_ms = start.elapsed().as_millis() as u64;

        let stderr_text = if timed_out {
            format!("command timed out after {}s", timeout.as_secs())
        } else {
            String::from_utf8_lossy(&stderr_buf).to_string()
        };

        CommandOutput {
            stdout: String::from_utf8_lossy(&stdout_buf).to_string(),
            stderr: stderr_text,
            exit_code,
            timed_out,
            duration_ms,
            spawn_error: None,
        }
    }

    /// SIGTERM the process group, then SIGKILL after a grace period.
    async fn terminate(child: &mut tokio::process::Child) {
        #[cfg(unix)]
        {
            if let Some(pid) = child.id() {
                unsafe {
                    libc::kill(-(pid as i32), libc::SIGTERM);
                }
            }
            tokio::select! {
                _ = child.wait() => {}
                _ = tokio::time::sleep(Duration::from_secs(2)) => {
                    let _ = child.kill().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = child.kill().await;
        }
    }
}
