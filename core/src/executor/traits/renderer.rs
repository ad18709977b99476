use crate::executor::types::{ExecutionReport, TaskOutcome};

/// Output renderer plugin (controls how progress is shown).
pub trait OutputRendererPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn format(&self) -> &str;
    fn supports_streaming(&self) -> bool {
        false
    }
    fn render(&self, event: &RenderEvent);
}

/// Executor lifecycle events.
#[derive(Debug, Clone)]
pub enum RenderEvent {
    BatchStart {
        group_id: String,
        total_tasks: usize,
        parallel: bool,
    },
    Plan {
        group_id: String,
        chunks: Vec<Vec<String>>,
        sequential: Vec<String>,
    },
    ChunkStart {
        group_id: String,
        chunk_id: usize,
        task_ids: Vec<String>,
    },
    TaskStart {
        group_id: String,
        task_id: String,
        attempt: u32,
    },
    TaskRetry {
        group_id: String,
        task_id: String,
        attempt: u32,
        delay_ms: u64,
        error: String,
    },
    TaskComplete {
        group_id: String,
        outcome: TaskOutcome,
    },
    ChunkEnd {
        group_id: String,
        chunk_id: usize,
        failed: usize,
    },
    SequentialSkipped {
        group_id: String,
        task_ids: Vec<String>,
    },
    BatchEnd {
        group_id: String,
        report: ExecutionReport,
    },
    QueueDrained,
}
