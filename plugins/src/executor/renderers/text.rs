use fanout_core::executor::traits::{OutputRendererPlugin, RenderEvent};

pub struct TextRendererPlugin {
    ascii_only: bool,
}

impl TextRendererPlugin {
    pub fn new(ascii_only: bool) -> Self {
        Self { ascii_only }
    }

    fn status(&self, success: bool) -> &'static str {
        match (success, self.ascii_only) {
            (true, true) => "OK",
            (true, false) => "✅ SUCCESS",
            (false, true) => "FAIL",
            (false, false) => "❌ FAILED",
        }
    }

    fn format_event(&self, event: &RenderEvent) -> Option<String> {
        let line = match event {
            RenderEvent::BatchStart {
                group_id,
                total_tasks,
                parallel,
            } => format!(
                "BATCH START {} (tasks: {}, mode: {})",
                group_id,
                total_tasks,
                if *parallel { "parallel" } else { "sequential" }
            ),
            RenderEvent::Plan {
                group_id,
                chunks,
                sequential,
            } => {
                let mut out = format!("PLAN {}:", group_id);
                for (idx, chunk) in chunks.iter().enumerate() {
                    out.push_str(&format!("\n  chunk {}: {}", idx, chunk.join(", ")));
                }
                if !sequential.is_empty() {
                    out.push_str(&format!("\n  sequential: {}", sequential.join(", ")));
                }
                out
            }
            RenderEvent::ChunkStart {
                group_id,
                chunk_id,
                task_ids,
            } => format!(
                "CHUNK START {} (chunk {}, tasks: {})",
                group_id,
                chunk_id,
                task_ids.len()
            ),
            RenderEvent::TaskStart {
                group_id,
                task_id,
                attempt,
            } => {
                if *attempt > 0 {
                    return None;
                }
                format!("TASK START {} (task {})", group_id, task_id)
            }
            RenderEvent::TaskRetry {
                group_id,
                task_id,
                attempt,
                delay_ms,
                error,
            } => format!(
                "TASK RETRY {} (task {}, attempt {}, in {}ms): {}",
                group_id, task_id, attempt, delay_ms, error
            ),
            RenderEvent::TaskComplete { group_id, outcome } => {
                let mut line = format!(
                    "TASK END {} (task {}, status {}, duration {}ms, retries {})",
                    group_id,
                    outcome.task_id,
                    self.status(outcome.success),
                    outcome.duration_ms,
                    outcome.retries
                );
                if let Some(err) = &outcome.error {
                    line.push_str(&format!(": {}", err));
                }
                line
            }
            RenderEvent::ChunkEnd {
                group_id,
                chunk_id,
                failed,
            } => format!(
                "CHUNK END {} (chunk {}, failed {})",
                group_id, chunk_id, failed
            ),
            RenderEvent::SequentialSkipped { group_id, task_ids } => format!(
                "SKIPPED {} ({})",
                group_id,
                task_ids.join(", ")
            ),
            RenderEvent::BatchEnd { group_id, report } => {
                let mut line = format!(
                    "BATCH END {} (status {}, succeeded {}/{}, rate {:.1}%, retries {}, duration {}ms)",
                    group_id,
                    self.status(report.success),
                    report.summary.successful_tasks,
                    report.summary.total_tasks,
                    report.summary.success_rate,
                    report.stats.total_retries,
                    report.stats.total_time_ms
                );
                if let Some(reason) = &report.degraded {
                    line.push_str(&format!("\n  degraded: {}", reason));
                }
                line
            }
            RenderEvent::QueueDrained => "QUEUE DRAINED".to_string(),
        };
        Some(line)
    }
}

impl OutputRendererPlugin for TextRendererPlugin {
    fn name(&self) -> &str {
        "text-renderer"
    }

    fn format(&self) -> &str {
        "text"
    }

    fn render(&self, event: &RenderEvent) {
        if let Some(line) = self.format_event(event) {
            println!("{}", line);
        }
    }
}
