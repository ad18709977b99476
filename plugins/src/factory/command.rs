use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use fanout_core::executor::traits::{TaskFactory, TaskHandle};
use fanout_core::executor::types::{TaskCreateError, TaskSpec};
use fanout_core::executor::CompletionSignal;
use serde_json::json;
use tokio::process::Command;
use tokio::task::AbortHandle;

const MAX_CAPTURE_BYTES: usize = 64 * 1024;

/// Runs `context.command` through the platform shell.
///
/// Optional `context.cwd` sets the working directory and `context.env`
/// (an object of strings) adds environment variables. A non-zero exit
/// status fails the attempt.
pub struct CommandTaskFactory;

impl CommandTaskFactory {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CommandTaskFactory {
    fn default() -> Self {
        Self::new()
    }
}

struct CommandHandle {
    task_id: String,
    abort: AbortHandle,
}

impl TaskHandle for CommandHandle {
    fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Dropping the waiting future drops the child, which kills it.
    fn abort(&self) {
        self.abort.abort();
    }
}

fn shell_command(line: &str) -> Command {
    let (shell, flag) = if cfg!(windows) {
        ("cmd", "/C")
    } else {
        ("sh", "-c")
    };
    let mut cmd = Command::new(shell);
    cmd.arg(flag).arg(line);
    cmd
}

fn tail(bytes: &[u8]) -> String {
    let start = bytes.len().saturating_sub(MAX_CAPTURE_BYTES);
    String::from_utf8_lossy(&bytes[start..]).trim_end().to_string()
}

#[async_trait]
impl TaskFactory for CommandTaskFactory {
    fn name(&self) -> &str {
        "command"
    }

    async fn create(
        &self,
        spec: &TaskSpec,
        attempt: u32,
        signal: CompletionSignal,
    ) -> Result<Arc<dyn TaskHandle>, TaskCreateError> {
        let line = spec.context["command"]
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                TaskCreateError::new(format!("task {} has no context.command", spec.id))
            })?;

        let mut cmd = shell_command(line);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = spec.context["cwd"].as_str() {
            cmd.current_dir(cwd);
        }
        if let Some(env) = spec.context["env"].as_object() {
            for (key, value) in env {
                if let Some(value) = value.as_str() {
                    cmd.env(key, value);
                }
            }
        }

        let child = cmd
            .spawn()
            .map_err(|e| TaskCreateError::new(format!("failed to spawn `{line}`: {e}")))?;
        tracing::debug!(task_id = %spec.id, attempt, pid = ?child.id(), "command started");

        let join = tokio::spawn(async move {
            match child.wait_with_output().await {
                Ok(output) => {
                    let code = output.status.code().unwrap_or(-1);
                    let stdout = tail(&output.stdout);
                    let stderr = tail(&output.stderr);
                    if output.status.success() {
                        signal.complete(json!({
                            "stdout": stdout,
                            "stderr": stderr,
                            "exitCode": code,
                        }));
                    } else if stderr.is_empty() {
                        signal.fail(format!("exit code {code}"));
                    } else {
                        signal.fail(format!("exit code {code}: {stderr}"));
                    }
                }
                Err(e) => signal.fail(format!("failed to wait for command: {e}")),
            }
        });

        Ok(Arc::new(CommandHandle {
            task_id: spec.id.clone(),
            abort: join.abort_handle(),
        }))
    }
}
