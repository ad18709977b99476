//! Per-attempt completion signalling between a task handle and the executor.
//!
//! The factory receives a [`CompletionSignal`] when it creates a handle; the
//! handle's background work consumes it exactly once. The executor awaits the
//! matching [`CompletionReceiver`] under the task's timeout.

use serde_json::Value;
use tokio::sync::oneshot;

use super::types::TaskError;

type Completion = Result<Value, String>;

pub fn completion_channel() -> (CompletionSignal, CompletionReceiver) {
    let (tx, rx) = oneshot::channel();
    (CompletionSignal { tx }, CompletionReceiver { rx })
}

#[derive(Debug)]
pub struct CompletionSignal {
    tx: oneshot::Sender<Completion>,
}

impl CompletionSignal {
    pub fn complete(self, output: Value) {
        // The executor may already have given up on this attempt.
        let _ = self.tx.send(Ok(output));
    }

    pub fn fail(self, error: impl Into<String>) {
        let _ = self.tx.send(Err(error.into()));
    }

    pub fn finish(self, result: Result<Value, String>) {
        let _ = self.tx.send(result);
    }
}

#[derive(Debug)]
pub struct CompletionReceiver {
    rx: oneshot::Receiver<Completion>,
}

impl CompletionReceiver {
    pub async fn wait(self) -> Result<Value, TaskError> {
        match self.rx.await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(msg)) => Err(TaskError::Execution(msg)),
            Err(_) => Err(TaskError::Execution(
                "task handle dropped without signalling completion".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_complete() {
        let (signal, rx) = completion_channel();
        signal.complete(json!({"ok": true}));
        assert_eq!(rx.wait().await.unwrap(), json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_fail() {
        let (signal, rx) = completion_channel();
        signal.fail("boom");
        assert_eq!(
            rx.wait().await.unwrap_err(),
            TaskError::Execution("boom".into())
        );
    }

    #[tokio::test]
    async fn test_dropped_signal_is_failure() {
        let (signal, rx) = completion_channel();
        drop(signal);
        assert!(matches!(rx.wait().await, Err(TaskError::Execution(_))));
    }
}
