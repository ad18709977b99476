//! Batch files consumed by the CLI: a group of tasks plus run flags,
//! in JSON or TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ExecutorError;
use crate::executor::types::TaskSpec;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskBatch {
    #[serde(default, alias = "groupId", skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,

    #[serde(default, alias = "continueOnFailure")]
    pub continue_on_failure: bool,

    pub tasks: Vec<TaskSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchFormat {
    Json,
    Toml,
}

impl BatchFormat {
    /// `.toml` is TOML, anything else is treated as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonBatch {
    Batch(TaskBatch),
    Tasks(Vec<TaskSpec>),
}

impl TaskBatch {
    pub fn new(tasks: Vec<TaskSpec>) -> Self {
        Self {
            group_id: None,
            continue_on_failure: false,
            tasks,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ExecutorError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, BatchFormat::from_path(path))
    }

    /// A JSON document may also be a bare array of tasks.
    pub fn parse(content: &str, format: BatchFormat) -> Result<Self, ExecutorError> {
        let batch = match format {
            BatchFormat::Json => match serde_json::from_str::<JsonBatch>(content) {
                Ok(JsonBatch::Batch(batch)) => batch,
                Ok(JsonBatch::Tasks(tasks)) => Self::new(tasks),
                Err(e) => return Err(ExecutorError::InvalidBatch(e.to_string())),
            },
            BatchFormat::Toml => toml::from_str::<TaskBatch>(content)
                .map_err(|e| ExecutorError::InvalidBatch(e.to_string()))?,
        };
        batch.validate()?;
        Ok(batch)
    }

    pub fn validate(&self) -> Result<(), ExecutorError> {
        if self.tasks.is_empty() {
            return Err(ExecutorError::InvalidBatch("batch contains no tasks".into()));
        }
        if let Some(task) = self.tasks.iter().find(|t| t.id.trim().is_empty()) {
            return Err(ExecutorError::InvalidBatch(format!(
                "task with empty id (description: {:?})",
                task.description
            )));
        }
        Ok(())
    }

    /// Explicit group ID, or a fresh one.
    pub fn group_id(&self) -> String {
        match &self.group_id {
            Some(id) if !id.trim().is_empty() => id.clone(),
            _ => format!("group-{}", uuid::Uuid::new_v4()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_json_batch() {
        let batch = TaskBatch::parse(
            r#"{
                "groupId": "g1",
                "continueOnFailure": true,
                "tasks": [
                    {"id": "a", "description": "first", "parallelizable": true, "timeoutMs": 500},
                    {"id": "b", "dependencies": ["a"], "priority": 2, "retryLimit": 1}
                ]
            }"#,
            BatchFormat::Json,
        )
        .unwrap();

        assert_eq!(batch.group_id(), "g1");
        assert!(batch.continue_on_failure);
        assert_eq!(batch.tasks[0].timeout_ms, Some(500));
        assert_eq!(batch.tasks[1].retry_limit, Some(1));
        assert_eq!(batch.tasks[1].dependencies, vec!["a".to_string()]);
    }

    #[test]
    fn test_parse_bare_array() {
        let batch = TaskBatch::parse(r#"[{"id": "x"}]"#, BatchFormat::Json).unwrap();
        assert_eq!(batch.tasks.len(), 1);
        assert!(!batch.continue_on_failure);
        assert!(batch.group_id().starts_with("group-"));
    }

    #[test]
    fn test_parse_toml_batch() {
        let batch = TaskBatch::parse(
            r#"
group_id = "nightly"

[[tasks]]
id = "lint"
parallelizable = true

[[tasks]]
id = "test"
parallelizable = true
context = { command = "echo hi" }
"#,
            BatchFormat::Toml,
        )
        .unwrap();

        assert_eq!(batch.tasks.len(), 2);
        assert_eq!(batch.tasks[1].context["command"], "echo hi");
    }

    #[test]
    fn test_empty_batch_rejected() {
        let err = TaskBatch::parse(r#"{"tasks": []}"#, BatchFormat::Json).unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidBatch(_)));
    }

    #[test]
    fn test_malformed_batch_rejected() {
        let err = TaskBatch::parse("{not json", BatchFormat::Json).unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidBatch(_)));
    }

    #[test]
    fn test_from_path_picks_format_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[[tasks]]\nid = \"only\"").unwrap();

        let batch = TaskBatch::from_path(file.path()).unwrap();
        assert_eq!(batch.tasks[0].id, "only");
    }
}
