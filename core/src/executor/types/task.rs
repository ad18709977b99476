use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default per-task timeout when a spec does not carry one.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Caller-provided description of one unit of work.
///
/// Batch files may use either snake_case or camelCase keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSpec {
    pub id: String,

    #[serde(default)]
    pub description: String,

    /// Only tasks explicitly marked `true` are eligible for the parallel path.
    #[serde(default)]
    pub parallelizable: bool,

    /// Advisory only: consulted for cycle detection when partitioning a batch.
    /// A task never waits for its dependencies to finish.
    #[serde(default)]
    pub dependencies: Vec<String>,

    #[serde(default, alias = "timeoutMs", skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,

    /// Per-task override of the executor-wide `max_retries`.
    #[serde(
        default,
        alias = "retryLimit",
        alias = "retries",
        skip_serializing_if = "Option::is_none"
    )]
    pub retry_limit: Option<u32>,

    /// Opaque payload handed to the task factory.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub context: Value,
}

impl TaskSpec {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            parallelizable: false,
            dependencies: Vec::new(),
            timeout_ms: None,
            priority: None,
            retry_limit: None,
            context: Value::Null,
        }
    }

    pub fn parallel(mut self) -> Self {
        self.parallelizable = true;
        self
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_retry_limit(mut self, limit: u32) -> Self {
        self.retry_limit = Some(limit);
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    pub fn effective_priority(&self) -> i64 {
        self.priority.unwrap_or(0)
    }

    pub fn effective_timeout_ms(&self, default_ms: u64) -> u64 {
        self.timeout_ms.unwrap_or(default_ms)
    }

    pub fn effective_retry_limit(&self, default_limit: u32) -> u32 {
        self.retry_limit.unwrap_or(default_limit)
    }
}

/// Sort tasks by priority, highest first. Ties keep input order.
pub fn sort_by_priority(tasks: &mut [TaskSpec]) {
    tasks.sort_by_key(|t| std::cmp::Reverse(t.effective_priority()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let task = TaskSpec::new("a", "do a");
        assert!(!task.parallelizable);
        assert_eq!(task.effective_priority(), 0);
        assert_eq!(task.effective_timeout_ms(DEFAULT_TIMEOUT_MS), 60_000);
        assert_eq!(task.effective_retry_limit(3), 3);
    }

    #[test]
    fn test_camel_case_aliases() {
        let json = r#"{
            "id": "t1",
            "description": "x",
            "parallelizable": true,
            "timeoutMs": 500,
            "retryLimit": 1,
            "priority": -2
        }"#;
        let task: TaskSpec = serde_json::from_str(json).unwrap();
        assert_eq!(task.timeout_ms, Some(500));
        assert_eq!(task.retry_limit, Some(1));
        assert_eq!(task.effective_priority(), -2);
        assert!(task.context.is_null());
    }

    #[test]
    fn test_sort_by_priority_is_stable() {
        let mut tasks = vec![
            TaskSpec::new("a", ""),
            TaskSpec::new("b", "").with_priority(5),
            TaskSpec::new("c", ""),
            TaskSpec::new("d", "").with_priority(5),
        ];
        sort_by_priority(&mut tasks);
        let ids: Vec<_> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "a", "c"]);
    }
}
