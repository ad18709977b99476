use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shared executor error type.
pub type ExecutorError = crate::error::ExecutorError;

/// Raised by a [`TaskFactory`](crate::executor::traits::TaskFactory) that
/// could not build a handle. Never retried.
#[derive(Error, Debug, Clone)]
#[error("failed to create task: {0}")]
pub struct TaskCreateError(pub String);

impl TaskCreateError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Why a single attempt of a task did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("{0}")]
    Creation(String),

    #[error("task failed: {0}")]
    Execution(String),

    #[error("task timed out: {task_id} ({timeout_ms}ms)")]
    Timeout { task_id: String, timeout_ms: u64 },
}

impl TaskError {
    pub fn kind(&self) -> TaskErrorKind {
        match self {
            Self::Creation(_) => TaskErrorKind::Creation,
            Self::Execution(_) => TaskErrorKind::Execution,
            Self::Timeout { .. } => TaskErrorKind::Timeout,
        }
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Creation(_))
    }
}

impl From<TaskCreateError> for TaskError {
    fn from(err: TaskCreateError) -> Self {
        Self::Creation(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskErrorKind {
    Creation,
    Execution,
    Timeout,
}
