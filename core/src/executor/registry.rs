use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::traits::TaskHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Live state of a task owned by the executor.
pub struct RunningTaskState {
    pub handle: Arc<dyn TaskHandle>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub retry_count: u32,
    pub output: Option<Value>,
}

/// Handle-free view of a [`RunningTaskState`].
#[derive(Debug, Clone, Serialize)]
pub struct RunningTaskInfo {
    pub task_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub retry_count: u32,
}

/// Map of live tasks keyed by ID. An entry exists from the first attempt
/// until the task's final outcome is known, including backoff waits.
#[derive(Clone, Default)]
pub struct RunningRegistry {
    tasks: Arc<Mutex<HashMap<String, RunningTaskState>>>,
    peak_running: Arc<AtomicUsize>,
}

impl RunningRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RunningTaskState>> {
        match self.tasks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Insert or replace the entry for `task_id` as `Running`.
    pub fn register(&self, task_id: &str, handle: Arc<dyn TaskHandle>, retry_count: u32) {
        let mut tasks = self.lock();
        tasks.insert(
            task_id.to_string(),
            RunningTaskState {
                handle,
                started_at: Utc::now(),
                ended_at: None,
                status: TaskStatus::Running,
                retry_count,
                output: None,
            },
        );
        let running = tasks
            .values()
            .filter(|s| s.status == TaskStatus::Running)
            .count();
        self.peak_running.fetch_max(running, Ordering::SeqCst);
    }

    /// Record a terminal status for the current attempt.
    pub fn mark(&self, task_id: &str, status: TaskStatus, output: Option<Value>) -> bool {
        let mut tasks = self.lock();
        let Some(state) = tasks.get_mut(task_id) else {
            return false;
        };
        state.status = status;
        state.ended_at = Some(Utc::now());
        if output.is_some() {
            state.output = output;
        }
        true
    }

    /// Mark the task cancelled and ask its handle to stop.
    pub fn cancel(&self, task_id: &str) -> bool {
        let handle = {
            let mut tasks = self.lock();
            let Some(state) = tasks.get_mut(task_id) else {
                return false;
            };
            state.status = TaskStatus::Cancelled;
            state.ended_at = Some(Utc::now());
            state.handle.clone()
        };
        // Outside the lock: abort may be arbitrary host code.
        handle.abort();
        true
    }

    pub fn remove(&self, task_id: &str) -> Option<RunningTaskState> {
        self.lock().remove(task_id)
    }

    pub fn running_count(&self) -> usize {
        self.lock()
            .values()
            .filter(|s| s.status == TaskStatus::Running)
            .count()
    }

    /// Highest number of simultaneously `Running` entries seen so far.
    pub fn peak(&self) -> usize {
        self.peak_running.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Vec<RunningTaskInfo> {
        let mut infos: Vec<_> = self
            .lock()
            .iter()
            .map(|(id, s)| RunningTaskInfo {
                task_id: id.clone(),
                started_at: s.started_at,
                ended_at: s.ended_at,
                status: s.status,
                retry_count: s.retry_count,
            })
            .collect();
        infos.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        infos
    }

    /// Removes `task_id` when dropped.
    pub fn guard(&self, task_id: &str) -> RegistryGuard {
        RegistryGuard {
            registry: self.clone(),
            task_id: task_id.to_string(),
        }
    }
}

pub struct RegistryGuard {
    registry: RunningRegistry,
    task_id: String,
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.task_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    struct FakeHandle {
        id: String,
        aborted: AtomicBool,
    }

    impl TaskHandle for FakeHandle {
        fn task_id(&self) -> &str {
            &self.id
        }

        fn abort(&self) {
            self.aborted.store(true, Ordering::SeqCst);
        }
    }

    fn handle(id: &str) -> Arc<FakeHandle> {
        Arc::new(FakeHandle {
            id: id.to_string(),
            aborted: AtomicBool::new(false),
        })
    }

    #[test]
    fn test_register_and_peak() {
        let registry = RunningRegistry::new();
        registry.register("a", handle("a"), 0);
        registry.register("b", handle("b"), 0);
        registry.mark("a", TaskStatus::Completed, None);
        registry.register("c", handle("c"), 0);

        assert_eq!(registry.snapshot().len(), 3);
        assert_eq!(registry.running_count(), 2);
        assert_eq!(registry.peak(), 2);
    }

    #[test]
    fn test_cancel_aborts_handle() {
        let registry = RunningRegistry::new();
        let h = handle("a");
        registry.register("a", h.clone(), 1);
        assert!(registry.cancel("a"));
        assert!(h.aborted.load(Ordering::SeqCst));
        assert_eq!(registry.snapshot()[0].status, TaskStatus::Cancelled);
        assert!(!registry.cancel("missing"));
    }

    #[test]
    fn test_guard_removes_entry() {
        let registry = RunningRegistry::new();
        {
            let _guard = registry.guard("a");
            registry.register("a", handle("a"), 0);
            assert_eq!(registry.snapshot().len(), 1);
        }
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let registry = RunningRegistry::new();
        registry.register("b", handle("b"), 0);
        registry.register("a", handle("a"), 2);
        let snap = registry.snapshot();
        assert_eq!(snap[0].task_id, "a");
        assert_eq!(snap[0].retry_count, 2);
        assert_eq!(snap[1].status, TaskStatus::Running);
    }
}
