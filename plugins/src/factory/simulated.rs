use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use fanout_core::executor::traits::{TaskFactory, TaskHandle};
use fanout_core::executor::types::{TaskCreateError, TaskSpec};
use fanout_core::executor::CompletionSignal;
use serde_json::json;
use tokio::task::AbortHandle;

pub const DEFAULT_SIMULATED_DURATION_MS: u64 = 1000;

/// Stand-in for real work: each attempt sleeps, then reports a canned result.
///
/// Behaviour can be scripted per task through `context`:
/// `durationMs` (attempt length), `failAttempts` (the first n attempts fail)
/// and `failCreate` (creation itself fails).
pub struct SimulatedTaskFactory {
    default_duration: Duration,
}

impl SimulatedTaskFactory {
    pub fn new() -> Self {
        Self::with_duration(Duration::from_millis(DEFAULT_SIMULATED_DURATION_MS))
    }

    pub fn with_duration(default_duration: Duration) -> Self {
        Self { default_duration }
    }
}

impl Default for SimulatedTaskFactory {
    fn default() -> Self {
        Self::new()
    }
}

struct SimulatedHandle {
    task_id: String,
    abort: AbortHandle,
}

impl TaskHandle for SimulatedHandle {
    fn task_id(&self) -> &str {
        &self.task_id
    }

    fn abort(&self) {
        self.abort.abort();
    }
}

#[async_trait]
impl TaskFactory for SimulatedTaskFactory {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn create(
        &self,
        spec: &TaskSpec,
        attempt: u32,
        signal: CompletionSignal,
    ) -> Result<Arc<dyn TaskHandle>, TaskCreateError> {
        let ctx = &spec.context;
        if ctx["failCreate"].as_bool().unwrap_or(false) {
            return Err(TaskCreateError::new(format!(
                "simulated creation failure for {}",
                spec.id
            )));
        }

        let duration = ctx["durationMs"]
            .as_u64()
            .map(Duration::from_millis)
            .unwrap_or(self.default_duration);
        let fail_attempts = ctx["failAttempts"].as_u64().unwrap_or(0);

        let task_id = spec.id.clone();
        let join = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if u64::from(attempt) < fail_attempts {
                signal.fail(format!("simulated failure of {task_id} (attempt {attempt})"));
                return;
            }
            signal.complete(json!({
                "taskId": task_id,
                "result": format!("Result of subtask {task_id}"),
                "timestamp": Utc::now().to_rfc3339(),
            }));
        });

        tracing::debug!(task_id = %spec.id, attempt, duration_ms = duration.as_millis() as u64, "simulated task started");
        Ok(Arc::new(SimulatedHandle {
            task_id: spec.id.clone(),
            abort: join.abort_handle(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanout_core::executor::completion_channel;
    use fanout_core::executor::types::TaskError;

    #[tokio::test(start_paused = true)]
    async fn test_simulated_completes() {
        let factory = SimulatedTaskFactory::new();
        let (signal, rx) = completion_channel();

        factory
            .create(&TaskSpec::new("s1", "demo"), 0, signal)
            .await
            .unwrap();
        let output = rx.wait().await.unwrap();

        assert_eq!(output["taskId"], "s1");
        assert_eq!(output["result"], "Result of subtask s1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_fail_attempts() {
        let factory = SimulatedTaskFactory::new();
        let spec = TaskSpec::new("s2", "").with_context(json!({ "failAttempts": 1, "durationMs": 5 }));

        let (signal, rx) = completion_channel();
        factory.create(&spec, 0, signal).await.unwrap();
        assert!(matches!(rx.wait().await, Err(TaskError::Execution(_))));

        let (signal, rx) = completion_channel();
        factory.create(&spec, 1, signal).await.unwrap();
        assert!(rx.wait().await.is_ok());
    }

    #[tokio::test]
    async fn test_simulated_fail_create() {
        let factory = SimulatedTaskFactory::new();
        let spec = TaskSpec::new("s3", "").with_context(json!({ "failCreate": true }));
        let (signal, _rx) = completion_channel();

        assert!(factory.create(&spec, 0, signal).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_abort_drops_signal() {
        let factory = SimulatedTaskFactory::new();
        let (signal, rx) = completion_channel();

        let handle = factory
            .create(&TaskSpec::new("s4", ""), 0, signal)
            .await
            .unwrap();
        handle.abort();

        let err = rx.wait().await.unwrap_err();
        assert!(err.to_string().contains("dropped"));
    }
}
