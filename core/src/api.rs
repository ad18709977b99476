//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `fanout_core::api` instead of reaching into internal modules.

pub use crate::batch::{BatchFormat, TaskBatch};
pub use crate::config::{load_default, load_from_path, AppConfig, LoggingConfig};
pub use crate::error::{CliError, ExecutorError};
pub use crate::executor::types::{
    ExecutionReport, ExecutionStats, ExecutorConfig, ExecutorOptions, ReportSummary, RetryConfig,
    RetryPolicy, RetryPolicyPatch, TaskCreateError, TaskError, TaskErrorKind, TaskIds,
    TaskOutcome, TaskSpec,
};
pub use crate::executor::{
    completion_channel, CompletionSignal, OutputRendererPlugin, RenderEvent, RetryStrategyPlugin,
    RunningTaskInfo, TaskExecutor, TaskExecutorBuilder, TaskFactory, TaskHandle, TaskStatus,
    QUEUE_GROUP_ID,
};
