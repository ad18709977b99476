use fanout_core::api as core_api;
use fanout_core::api::TaskBatch;

use crate::commands::cli::{OutputFormat, QueueArgs};
use crate::commands::run::{apply_overrides, build_executor, build_renderer, INTERRUPTED_EXIT_CODE};

/// Handle queue command
pub async fn handle_queue(
    args: QueueArgs,
    mut cfg: core_api::AppConfig,
) -> Result<i32, core_api::CliError> {
    apply_overrides(&mut cfg, &args.executor);

    let batch = TaskBatch::from_path(&args.file)?;
    let executor = build_executor(&cfg, Some(build_renderer(&args.executor)), false)?;

    for task in batch.tasks {
        let priority = task.priority;
        executor.enqueue(task, priority)?;
    }

    tokio::select! {
        _ = executor.wait_idle() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!(queued = executor.queued_count(), "interrupted");
            return Ok(INTERRUPTED_EXIT_CODE);
        }
    }

    let outcomes = executor.take_queue_outcomes();
    let failed = outcomes.iter().filter(|o| !o.success).count();

    match args.executor.format {
        OutputFormat::Jsonl => {
            let line = serde_json::to_string(&outcomes)
                .map_err(|e| core_api::CliError::Command(format!("failed to encode outcomes: {e}")))?;
            println!("{line}");
        }
        OutputFormat::Text => {
            println!(
                "queue drained: {} succeeded, {} failed",
                outcomes.len() - failed,
                failed
            );
        }
    }

    Ok(if failed == 0 { 0 } else { 1 })
}
