//! Bounded-concurrency task executor
//!
//! Runs groups of asynchronous tasks with a concurrency ceiling, per-task
//! timeouts and retry with backoff, and merges the outcomes into a single
//! [`ExecutionReport`].
//!
//! # Architecture
//!
//! ```text
//! Vec<TaskSpec>
//!   ↓
//! DependencyGraph::from_tasks() → partition()
//!   ↓                        ↓
//! parallel set              sequential set (not parallelizable, or on a cycle)
//!   ↓                        ↓
//! plan_chunks(max)          one at a time, priority order
//!   ↓                        ↓
//! execute_chunk() ────────→ merge_results() → ExecutionReport
//! ```
//!
//! Every task, in either set, goes through the same routine: the injected
//! [`TaskFactory`] creates a handle, the executor waits on a one-shot
//! completion signal under a timeout, and failures are retried with backoff
//! until the retry limit is reached.

mod engine;
mod graph;
mod output;
mod progress;
mod queue;
mod registry;
mod report;
mod scheduler;
mod signal;
pub mod traits;
pub mod types;

pub use engine::{TaskExecutor, TaskExecutorBuilder, QUEUE_GROUP_ID};
pub use graph::{partition, DependencyGraph};
pub use output::log_event;
pub use progress::ProgressMonitor;
pub use queue::{PendingQueue, QueuedTask};
pub use registry::{RegistryGuard, RunningRegistry, RunningTaskInfo, RunningTaskState, TaskStatus};
pub use report::{degraded_report, merge_results};
pub use scheduler::{execute_chunk, plan_chunks};
pub use signal::{completion_channel, CompletionReceiver, CompletionSignal};
pub use traits::{OutputRendererPlugin, RenderEvent, RetryStrategyPlugin, TaskFactory, TaskHandle};
pub use types::{
    ExecutionReport, ExecutorConfig, ExecutorOptions, RetryConfig, RetryPolicy, RetryPolicyPatch,
    TaskCreateError, TaskError, TaskErrorKind, TaskOutcome, TaskSpec,
};
