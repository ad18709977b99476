use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use crate::error::ExecutorError;

use super::types::{
    ExecutionReport, ExecutionStats, ReportSummary, TaskErrorEntry, TaskIds, TaskOutcome,
};

/// Build the report for one batch from the outcomes recorded, in the order
/// they were recorded. Tasks that never ran are listed in `skipped` only.
pub fn merge_results(
    group_id: &str,
    outcomes: &[TaskOutcome],
    skipped: &[String],
    elapsed: Duration,
) -> Result<ExecutionReport, ExecutorError> {
    let mut seen = HashSet::with_capacity(outcomes.len());
    for outcome in outcomes {
        if !seen.insert(outcome.task_id.as_str()) {
            return Err(ExecutorError::Merge(format!(
                "outcome recorded twice for task '{}'",
                outcome.task_id
            )));
        }
    }

    let mut results = BTreeMap::new();
    let mut task_ids = TaskIds::default();
    let mut errors = Vec::new();
    let mut outputs = BTreeMap::new();
    let mut total_retries = 0u32;
    let mut success_time_ms = 0u64;

    for outcome in outcomes {
        task_ids.all.push(outcome.task_id.clone());
        total_retries = total_retries.saturating_add(outcome.retries);

        if outcome.success {
            task_ids.successful.push(outcome.task_id.clone());
            success_time_ms = success_time_ms.saturating_add(outcome.duration_ms);
            if let Some(output) = outcome.output.as_ref().filter(|v| !v.is_null()) {
                outputs.insert(outcome.task_id.clone(), output.clone());
            }
        } else {
            task_ids.failed.push(outcome.task_id.clone());
            errors.push(TaskErrorEntry {
                id: outcome.task_id.clone(),
                error: outcome
                    .error
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        results.insert(outcome.task_id.clone(), outcome.clone());
    }

    let total = outcomes.len();
    let succeeded = task_ids.successful.len();
    let failed = task_ids.failed.len();
    let success_rate = if total > 0 {
        succeeded as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    let average_task_time_ms = if succeeded > 0 {
        success_time_ms / succeeded as u64
    } else {
        0
    };

    Ok(ExecutionReport {
        group_id: group_id.to_string(),
        success: failed == 0,
        results,
        failed_tasks: task_ids.failed.clone(),
        summary: ReportSummary {
            total_tasks: total,
            successful_tasks: succeeded,
            failed_tasks: failed,
            success_rate,
        },
        task_ids,
        errors,
        outputs,
        stats: ExecutionStats {
            total_time_ms: elapsed.as_millis() as u64,
            average_task_time_ms,
            total_retries,
        },
        skipped: skipped.to_vec(),
        degraded: None,
    })
}

/// Minimal failed report used when [`merge_results`] itself fails.
pub fn degraded_report(
    group_id: &str,
    outcomes: &[TaskOutcome],
    err: &ExecutorError,
) -> ExecutionReport {
    let mut results = BTreeMap::new();
    for outcome in outcomes {
        results.insert(outcome.task_id.clone(), outcome.clone());
    }
    let failed_tasks = outcomes
        .iter()
        .filter(|o| !o.success)
        .map(|o| o.task_id.clone())
        .collect();

    ExecutionReport {
        group_id: group_id.to_string(),
        success: false,
        results,
        failed_tasks,
        summary: ReportSummary::default(),
        task_ids: TaskIds::default(),
        errors: Vec::new(),
        outputs: BTreeMap::new(),
        stats: ExecutionStats::default(),
        skipped: Vec::new(),
        degraded: Some(format!("Failed to merge subtask results: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::types::TaskError;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ok(id: &str, retries: u32, ms: u64) -> TaskOutcome {
        TaskOutcome::succeeded(id, json!({ "id": id }), retries, ms)
    }

    fn failed(id: &str) -> TaskOutcome {
        TaskOutcome::failed(id, &TaskError::Execution("boom".into()), 3, 10)
    }

    #[test]
    fn test_merge_counts_and_rate() {
        let outcomes = vec![ok("a", 0, 100), failed("b"), ok("c", 2, 300)];
        let report = merge_results("g", &outcomes, &[], Duration::from_millis(500)).unwrap();

        assert!(!report.success);
        assert_eq!(report.summary.total_tasks, 3);
        assert_eq!(report.summary.successful_tasks, 2);
        assert!((report.summary.success_rate - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.failed_tasks, vec!["b".to_string()]);
        assert_eq!(report.errors[0].error, "task failed: boom");
        assert_eq!(report.stats.total_retries, 5);
        assert_eq!(report.stats.average_task_time_ms, 200);
        assert_eq!(report.stats.total_time_ms, 500);
        assert_eq!(report.outputs.len(), 2);
    }

    #[test]
    fn test_all_is_union_of_successful_and_failed() {
        let outcomes = vec![failed("x"), ok("y", 0, 1)];
        let report = merge_results("g", &outcomes, &[], Duration::ZERO).unwrap();
        let mut union = report.task_ids.successful.clone();
        union.extend(report.task_ids.failed.clone());
        union.sort();
        let mut all = report.task_ids.all.clone();
        all.sort();
        assert_eq!(all, union);
    }

    #[test]
    fn test_empty_run_is_success_with_zero_rate() {
        let report = merge_results("g", &[], &[], Duration::ZERO).unwrap();
        assert!(report.success);
        assert_eq!(report.summary.success_rate, 0.0);
    }

    #[test]
    fn test_skipped_are_not_failures() {
        let skipped = vec!["s1".to_string(), "s2".to_string()];
        let report = merge_results("g", &[failed("p")], &skipped, Duration::ZERO).unwrap();
        assert_eq!(report.summary.total_tasks, 1);
        assert_eq!(report.skipped, skipped);
        assert!(report.outcome("s1").is_none());
    }

    #[test]
    fn test_duplicate_outcome_degrades() {
        let outcomes = vec![ok("a", 0, 1), ok("a", 0, 1)];
        let err = merge_results("g", &outcomes, &[], Duration::ZERO).unwrap_err();
        let report = degraded_report("g", &outcomes, &err);
        assert!(!report.success);
        assert!(report
            .degraded
            .as_deref()
            .unwrap()
            .starts_with("Failed to merge subtask results"));
    }
}
