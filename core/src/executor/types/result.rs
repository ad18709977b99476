use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{TaskError, TaskErrorKind};

/// Final outcome of one task (after all retries).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutcome {
    pub task_id: String,

    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<TaskErrorKind>,

    /// Retries actually performed (attempts beyond the first).
    pub retries: u32,

    /// Wall-clock time from first attempt to final outcome.
    pub duration_ms: u64,
}

impl TaskOutcome {
    pub fn succeeded(task_id: &str, output: Value, retries: u32, duration_ms: u64) -> Self {
        Self {
            task_id: task_id.to_string(),
            success: true,
            output: Some(output),
            error: None,
            error_kind: None,
            retries,
            duration_ms,
        }
    }

    pub fn failed(task_id: &str, error: &TaskError, retries: u32, duration_ms: u64) -> Self {
        Self {
            task_id: task_id.to_string(),
            success: false,
            output: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            retries,
            duration_ms,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_tasks: usize,
    pub successful_tasks: usize,
    pub failed_tasks: usize,
    /// Percentage in `0.0..=100.0`; 0 for an empty run.
    pub success_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskIds {
    pub all: Vec<String>,
    pub successful: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskErrorEntry {
    pub id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStats {
    pub total_time_ms: u64,
    /// Mean duration of successful tasks.
    pub average_task_time_ms: u64,
    pub total_retries: u32,
}

/// Merged outcome of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub group_id: String,

    /// True iff no failed task was recorded. Skipped tasks don't count.
    pub success: bool,

    /// Outcomes of tasks that actually ran.
    pub results: BTreeMap<String, TaskOutcome>,

    /// Failed IDs in the order they failed.
    pub failed_tasks: Vec<String>,

    pub summary: ReportSummary,

    pub task_ids: TaskIds,

    pub errors: Vec<TaskErrorEntry>,

    pub outputs: BTreeMap<String, Value>,

    pub stats: ExecutionStats,

    /// Tasks never started because an earlier failure halted the run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,

    /// Set when the merge step failed and this is the minimal fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

impl ExecutionReport {
    pub fn outcome(&self, task_id: &str) -> Option<&TaskOutcome> {
        self.results.get(task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_outcome_carries_kind() {
        let err = TaskError::Timeout {
            task_id: "a".into(),
            timeout_ms: 10,
        };
        let outcome = TaskOutcome::failed("a", &err, 2, 30);
        assert!(!outcome.success);
        assert_eq!(outcome.error_kind, Some(TaskErrorKind::Timeout));
        assert_eq!(outcome.retries, 2);
    }

    #[test]
    fn test_outcome_serializes_camel_case() {
        let outcome = TaskOutcome::failed("a", &TaskError::Execution("x".into()), 1, 40);
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["taskId"], "a");
        assert_eq!(value["durationMs"], 40);
        assert_eq!(value["errorKind"], "execution");
        assert!(value.get("task_id").is_none());
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let summary = ReportSummary {
            total_tasks: 3,
            successful_tasks: 2,
            failed_tasks: 1,
            success_rate: 66.0,
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["successRate"], 66.0);
        assert_eq!(value["totalTasks"], 3);
    }
}
