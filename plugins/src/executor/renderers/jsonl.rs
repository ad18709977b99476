use chrono::Local;
use fanout_core::executor::traits::{OutputRendererPlugin, RenderEvent};
use serde_json::{json, Value};

pub struct JsonlRendererPlugin {
    pretty_print: bool,
}

impl JsonlRendererPlugin {
    pub fn new(pretty_print: bool) -> Self {
        Self { pretty_print }
    }

    fn event_to_json(&self, event: &RenderEvent) -> Value {
        let ts = Local::now().to_rfc3339();
        match event {
            RenderEvent::BatchStart {
                group_id,
                total_tasks,
                parallel,
            } => json!({
                "v": 1,
                "event_type": "batch.start",
                "ts": ts,
                "group_id": group_id,
                "metadata": {
                    "total_tasks": total_tasks,
                    "parallel": parallel,
                }
            }),
            RenderEvent::Plan {
                group_id,
                chunks,
                sequential,
            } => {
                let parallel_tasks: usize = chunks.iter().map(|c| c.len()).sum();
                json!({
                    "v": 1,
                    "event_type": "executor.plan",
                    "ts": ts,
                    "group_id": group_id,
                    "metadata": {
                        "chunks": chunks,
                        "sequential": sequential,
                        "parallel_tasks": parallel_tasks,
                    }
                })
            }
            RenderEvent::ChunkStart {
                group_id,
                chunk_id,
                task_ids,
            } => json!({
                "v": 1,
                "event_type": "chunk.start",
                "ts": ts,
                "group_id": group_id,
                "metadata": {
                    "chunk_id": chunk_id,
                    "tasks": task_ids,
                }
            }),
            RenderEvent::TaskStart {
                group_id,
                task_id,
                attempt,
            } => json!({
                "v": 1,
                "event_type": "task.start",
                "ts": ts,
                "group_id": group_id,
                "task_id": task_id,
                "metadata": {
                    "attempt": attempt,
                }
            }),
            RenderEvent::TaskRetry {
                group_id,
                task_id,
                attempt,
                delay_ms,
                error,
            } => json!({
                "v": 1,
                "event_type": "task.retry",
                "ts": ts,
                "group_id": group_id,
                "task_id": task_id,
                "metadata": {
                    "attempt": attempt,
                    "delay_ms": delay_ms,
                    "error": error,
                }
            }),
            RenderEvent::TaskComplete { group_id, outcome } => json!({
                "v": 1,
                "event_type": "task.end",
                "ts": ts,
                "group_id": group_id,
                "task_id": outcome.task_id,
                "success": outcome.success,
                "metadata": {
                    "duration_ms": outcome.duration_ms,
                    "retries": outcome.retries,
                    "error": outcome.error,
                    "error_kind": outcome.error_kind,
                    "output": outcome.output,
                }
            }),
            RenderEvent::ChunkEnd {
                group_id,
                chunk_id,
                failed,
            } => json!({
                "v": 1,
                "event_type": "chunk.end",
                "ts": ts,
                "group_id": group_id,
                "metadata": {
                    "chunk_id": chunk_id,
                    "failed": failed,
                }
            }),
            RenderEvent::SequentialSkipped { group_id, task_ids } => json!({
                "v": 1,
                "event_type": "tasks.skipped",
                "ts": ts,
                "group_id": group_id,
                "metadata": {
                    "tasks": task_ids,
                }
            }),
            RenderEvent::BatchEnd { group_id, report } => json!({
                "v": 1,
                "event_type": "batch.end",
                "ts": ts,
                "group_id": group_id,
                "success": report.success,
                "metadata": {
                    "summary": report.summary,
                    "stats": report.stats,
                    "failed_tasks": report.failed_tasks,
                    "skipped": report.skipped,
                    "degraded": report.degraded,
                }
            }),
            RenderEvent::QueueDrained => json!({
                "v": 1,
                "event_type": "queue.drained",
                "ts": ts,
            }),
        }
    }
}

impl OutputRendererPlugin for JsonlRendererPlugin {
    fn name(&self) -> &str {
        "jsonl-renderer"
    }

    fn format(&self) -> &str {
        "jsonl"
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    fn render(&self, event: &RenderEvent) {
        let value = self.event_to_json(event);
        if self.pretty_print {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".into()));
        } else {
            println!("{}", serde_json::to_string(&value).unwrap_or_else(|_| "{}".into()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanout_core::executor::merge_results;
    use fanout_core::executor::types::{TaskError, TaskOutcome};
    use std::time::Duration;

    #[test]
    fn test_jsonl_renderer_event_type() {
        let renderer = JsonlRendererPlugin::new(false);
        let event = RenderEvent::BatchStart {
            group_id: "g".to_string(),
            total_tasks: 2,
            parallel: true,
        };

        let value = renderer.event_to_json(&event);
        assert_eq!(value["event_type"], "batch.start");
        assert_eq!(value["v"], 1);
        assert_eq!(value["metadata"]["total_tasks"], 2);
    }

    #[test]
    fn test_jsonl_renderer_task_complete() {
        let renderer = JsonlRendererPlugin::new(false);
        let err = TaskError::Timeout {
            task_id: "task".to_string(),
            timeout_ms: 50,
        };
        let event = RenderEvent::TaskComplete {
            group_id: "g".to_string(),
            outcome: TaskOutcome::failed("task", &err, 1, 12),
        };

        let value = renderer.event_to_json(&event);
        assert_eq!(value["event_type"], "task.end");
        assert_eq!(value["success"], false);
        assert_eq!(value["metadata"]["retries"], 1);
        assert_eq!(value["metadata"]["error_kind"], "timeout");
    }

    #[test]
    fn test_jsonl_renderer_batch_end() {
        let renderer = JsonlRendererPlugin::new(false);
        let outcomes = vec![TaskOutcome::succeeded("a", json!(1), 0, 10)];
        let report = merge_results("g", &outcomes, &[], Duration::from_millis(10)).unwrap();

        let value = renderer.event_to_json(&RenderEvent::BatchEnd {
            group_id: "g".to_string(),
            report,
        });
        assert_eq!(value["metadata"]["summary"]["totalTasks"], 1);
        assert_eq!(value["success"], true);
    }
}
