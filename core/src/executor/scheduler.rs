use std::future::Future;

use futures::future::join_all;

use super::types::{TaskOutcome, TaskSpec};

/// Split `tasks` into consecutive chunks of at most `max_concurrency`.
pub fn plan_chunks(tasks: &[TaskSpec], max_concurrency: usize) -> Vec<Vec<TaskSpec>> {
    tasks
        .chunks(max_concurrency.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Run every task of one chunk concurrently and wait for all of them.
///
/// A failing task does not cancel its siblings. Outcomes come back in
/// chunk order, whatever order the tasks finished in.
pub async fn execute_chunk<'a, F, Fut>(chunk: &'a [TaskSpec], executor_fn: F) -> Vec<TaskOutcome>
where
    F: Fn(&'a TaskSpec) -> Fut,
    Fut: Future<Output = TaskOutcome>,
{
    join_all(chunk.iter().map(executor_fn)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn tasks(n: usize) -> Vec<TaskSpec> {
        (0..n)
            .map(|i| TaskSpec::new(format!("t{i}"), "").parallel())
            .collect()
    }

    #[test]
    fn test_plan_chunks_sizes() {
        let chunks = plan_chunks(&tasks(7), 3);
        let sizes: Vec<_> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        assert_eq!(chunks[2][0].id, "t6");
    }

    #[test]
    fn test_plan_chunks_zero_is_one() {
        assert_eq!(plan_chunks(&tasks(2), 0).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_chunk_runs_concurrently() {
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let chunk = tasks(3);

        let outcomes = execute_chunk(&chunk, |spec| {
            let in_flight = &in_flight;
            let peak = &peak;
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(100)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                TaskOutcome::succeeded(&spec.id, Value::Null, 0, 100)
            }
        })
        .await;

        assert_eq!(peak.load(Ordering::SeqCst), 3);
        let ids: Vec<_> = outcomes.iter().map(|o| o.task_id.as_str()).collect();
        assert_eq!(ids, vec!["t0", "t1", "t2"]);
    }
}
