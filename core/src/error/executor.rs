use thiserror::Error;

/// Errors of the executor's own bookkeeping. Task failures are never
/// reported through this type; they end up in the execution report.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Duplicate task ID: {0}")]
    DuplicateTaskId(String),

    #[error("Task already active in this executor: {0}")]
    TaskAlreadyActive(String),

    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    #[error("Failed to merge results: {0}")]
    Merge(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecutorError {
    /// Process exit code used by the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::DuplicateTaskId(_) | Self::TaskAlreadyActive(_) | Self::InvalidBatch(_) => 3,
            Self::Io(_) => 20,
            Self::Merge(_) => 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ExecutorError::DuplicateTaskId("a".into()).to_string(),
            "Duplicate task ID: a"
        );
        assert_eq!(ExecutorError::InvalidBatch("empty".into()).exit_code(), 3);
    }
}
