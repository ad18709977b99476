//! Default event sink used when no renderer plugin is installed: every
//! executor event becomes a structured `tracing` record.

use super::traits::RenderEvent;

pub fn log_event(event: &RenderEvent) {
    match event {
        RenderEvent::BatchStart {
            group_id,
            total_tasks,
            parallel,
        } => {
            tracing::info!(group_id = %group_id, total_tasks, parallel, "batch start");
        }
        RenderEvent::Plan {
            group_id,
            chunks,
            sequential,
        } => {
            for (idx, chunk) in chunks.iter().enumerate() {
                tracing::debug!(group_id = %group_id, chunk = idx, tasks = %chunk.join(", "), "planned chunk");
            }
            if !sequential.is_empty() {
                tracing::debug!(group_id = %group_id, tasks = %sequential.join(", "), "planned sequential");
            }
        }
        RenderEvent::ChunkStart {
            group_id,
            chunk_id,
            task_ids,
        } => {
            tracing::info!(
                group_id = %group_id,
                chunk_id,
                size = task_ids.len(),
                "executing chunk in parallel"
            );
        }
        RenderEvent::TaskStart {
            group_id,
            task_id,
            attempt,
        } => {
            tracing::debug!(group_id = %group_id, task_id = %task_id, attempt, "task start");
        }
        RenderEvent::TaskRetry {
            group_id,
            task_id,
            attempt,
            delay_ms,
            error,
        } => {
            tracing::warn!(
                group_id = %group_id,
                task_id = %task_id,
                attempt,
                delay_ms,
                error = %error,
                "retrying task"
            );
        }
        RenderEvent::TaskComplete { group_id, outcome } => {
            if outcome.success {
                tracing::info!(
                    group_id = %group_id,
                    task_id = %outcome.task_id,
                    retries = outcome.retries,
                    duration_ms = outcome.duration_ms,
                    "task completed"
                );
            } else {
                tracing::error!(
                    group_id = %group_id,
                    task_id = %outcome.task_id,
                    retries = outcome.retries,
                    error = outcome.error.as_deref().unwrap_or(""),
                    "task failed"
                );
            }
        }
        RenderEvent::ChunkEnd {
            group_id,
            chunk_id,
            failed,
        } => {
            tracing::info!(group_id = %group_id, chunk_id, failed, "chunk completed");
        }
        RenderEvent::SequentialSkipped { group_id, task_ids } => {
            tracing::warn!(
                group_id = %group_id,
                skipped = %task_ids.join(", "),
                "failure halted the run; skipping remaining tasks"
            );
        }
        RenderEvent::BatchEnd { group_id, report } => {
            tracing::info!(
                group_id = %group_id,
                success = report.success,
                total = report.summary.total_tasks,
                failed = report.summary.failed_tasks,
                duration_ms = report.stats.total_time_ms,
                "batch finished"
            );
        }
        RenderEvent::QueueDrained => {
            tracing::debug!("task queue drained");
        }
    }
}
