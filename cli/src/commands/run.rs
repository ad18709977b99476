use std::sync::Arc;

use fanout_core::api as core_api;
use fanout_core::api::{OutputRendererPlugin, TaskBatch, TaskExecutor};
use fanout_plugins::{build_retry_strategy, build_task_factory, JsonlRendererPlugin, TextRendererPlugin};

use crate::commands::cli::{ExecutorArgs, OutputFormat, RunArgs};

/// Exit code when Ctrl-C interrupts a run.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Apply command-line overrides to the `[executor]` section.
pub fn apply_overrides(cfg: &mut core_api::AppConfig, args: &ExecutorArgs) {
    let exec = &mut cfg.executor;
    if let Some(n) = args.max_concurrent.filter(|n| *n > 0) {
        exec.max_concurrent_tasks = n;
    }
    if let Some(n) = args.max_retries {
        exec.retry.max_retries = n;
    }
    if let Some(ms) = args.base_delay_ms {
        exec.retry.base_delay_ms = ms;
    }
    if let Some(ms) = args.timeout_ms {
        exec.default_timeout_ms = ms;
    }
    if let Some(factory) = args.factory.as_ref() {
        exec.task_factory = factory.clone();
    }
}

pub fn build_renderer(args: &ExecutorArgs) -> Arc<dyn OutputRendererPlugin> {
    match args.format {
        OutputFormat::Jsonl => Arc::new(JsonlRendererPlugin::new(false)),
        OutputFormat::Text => Arc::new(TextRendererPlugin::new(args.ascii)),
    }
}

pub fn build_executor(
    cfg: &core_api::AppConfig,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    progress: bool,
) -> Result<Arc<TaskExecutor>, core_api::CliError> {
    let factory = build_task_factory(&cfg.executor.task_factory)
        .map_err(|e| core_api::CliError::Config(e.to_string()))?;

    let mut builder = TaskExecutor::builder(factory)
        .options(cfg.executor.to_options())
        .retry_strategy(build_retry_strategy(&cfg.executor.retry))
        .progress(progress);
    if let Some(renderer) = renderer {
        builder = builder.renderer(renderer);
    }
    Ok(builder.build())
}

/// Handle run command
pub async fn handle_run(
    args: RunArgs,
    mut cfg: core_api::AppConfig,
) -> Result<i32, core_api::CliError> {
    apply_overrides(&mut cfg, &args.executor);

    let mut batch = TaskBatch::from_path(&args.file)?;
    if args.continue_on_failure {
        batch.continue_on_failure = true;
    }
    let group_id = args.group_id.clone().unwrap_or_else(|| batch.group_id());

    // Progress bars and streamed events would fight over the terminal.
    let show_progress = args.progress && args.executor.format == OutputFormat::Text;
    let renderer = (!show_progress).then(|| build_renderer(&args.executor));
    let executor = build_executor(&cfg, renderer, show_progress)?;

    tracing::info!(
        group_id = %group_id,
        tasks = batch.tasks.len(),
        factory = %cfg.executor.task_factory,
        "starting batch"
    );

    let run = async {
        if args.sequential {
            executor
                .run_sequential(&group_id, batch.tasks, batch.continue_on_failure)
                .await
        } else {
            executor
                .run_batch(&group_id, batch.tasks, batch.continue_on_failure)
                .await
        }
    };

    let report = tokio::select! {
        report = run => report?,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!(group_id = %group_id, "interrupted");
            return Ok(INTERRUPTED_EXIT_CODE);
        }
    };

    match args.executor.format {
        OutputFormat::Jsonl => {
            let line = serde_json::to_string(&report)
                .map_err(|e| core_api::CliError::Command(format!("failed to encode report: {e}")))?;
            println!("{line}");
        }
        OutputFormat::Text if show_progress => print_summary(&report),
        OutputFormat::Text => {}
    }

    Ok(if report.success { 0 } else { 1 })
}

fn print_summary(report: &core_api::ExecutionReport) {
    println!(
        "{}: {}/{} succeeded ({:.1}%), {} retries, {}ms",
        report.group_id,
        report.summary.successful_tasks,
        report.summary.total_tasks,
        report.summary.success_rate,
        report.stats.total_retries,
        report.stats.total_time_ms
    );
    for entry in &report.errors {
        println!("  failed {}: {}", entry.id, entry.error);
    }
    if !report.skipped.is_empty() {
        println!("  skipped: {}", report.skipped.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_overrides() {
        let mut cfg = core_api::AppConfig::default();
        let args = ExecutorArgs {
            max_concurrent: Some(0),
            max_retries: Some(1),
            factory: Some("command".into()),
            ..Default::default()
        };
        apply_overrides(&mut cfg, &args);

        assert_eq!(cfg.executor.max_concurrent_tasks, 3);
        assert_eq!(cfg.executor.retry.max_retries, 1);
        assert_eq!(cfg.executor.task_factory, "command");
    }

    #[test]
    fn test_build_executor_rejects_unknown_factory() {
        let mut cfg = core_api::AppConfig::default();
        cfg.executor.task_factory = "nope".into();
        assert!(matches!(
            build_executor(&cfg, None, false),
            Err(core_api::CliError::Config(_))
        ));
    }
}
