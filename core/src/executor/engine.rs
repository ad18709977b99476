use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::error::ExecutorError;

use super::graph::partition;
use super::output::log_event;
use super::progress::ProgressMonitor;
use super::queue::PendingQueue;
use super::registry::{RunningRegistry, RunningTaskInfo, TaskStatus};
use super::report::{degraded_report, merge_results};
use super::scheduler::{execute_chunk, plan_chunks};
use super::signal::completion_channel;
use super::traits::{OutputRendererPlugin, RenderEvent, RetryStrategyPlugin, TaskFactory};
use super::types::{
    sort_by_priority, ExecutionReport, ExecutorOptions, RetryPolicy, RetryPolicyPatch, TaskError,
    TaskOutcome, TaskSpec,
};

/// Group label used for tasks submitted through [`TaskExecutor::enqueue`].
pub const QUEUE_GROUP_ID: &str = "queue";

const MAX_RECENT_OUTCOMES: usize = 256;

/// Bounded-concurrency task executor.
///
/// Batches are split into a parallel set (run in chunks of at most
/// `max_concurrent_tasks`) and a sequential set. Every task goes through the
/// same retry/backoff/timeout routine. Task failures never surface as
/// `Err`; they are recorded in the returned [`ExecutionReport`].
pub struct TaskExecutor {
    factory: Arc<dyn TaskFactory>,
    options: RwLock<ExecutorOptions>,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    retry_strategy: Option<Arc<dyn RetryStrategyPlugin>>,
    registry: RunningRegistry,
    queue: Mutex<PendingQueue>,
    /// Slots taken by batch and queued tasks that have started.
    active: Arc<AtomicUsize>,
    slot_freed: Arc<Notify>,
    /// Set while a task is parked waiting for a free slot.
    slot_waiter: AtomicBool,
    /// Queued tasks that were spawned and have not finished yet.
    queued_in_flight: AtomicUsize,
    idle: Notify,
    recent: Mutex<VecDeque<TaskOutcome>>,
    /// IDs owned by an accepted batch or a queued task until it finishes.
    active_ids: Arc<Mutex<HashSet<String>>>,
    queued_claims: Mutex<HashMap<String, IdClaim>>,
}

pub struct TaskExecutorBuilder {
    factory: Arc<dyn TaskFactory>,
    options: ExecutorOptions,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    retry_strategy: Option<Arc<dyn RetryStrategyPlugin>>,
}

impl TaskExecutorBuilder {
    pub fn new(factory: Arc<dyn TaskFactory>) -> Self {
        Self {
            factory,
            options: ExecutorOptions::default(),
            renderer: None,
            retry_strategy: None,
        }
    }

    pub fn options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn max_concurrent_tasks(mut self, max: usize) -> Self {
        if max > 0 {
            self.options.max_concurrent_tasks = max;
        }
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.options.retry = policy;
        self
    }

    pub fn progress(mut self, enabled: bool) -> Self {
        self.options.progress_bar = enabled;
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn OutputRendererPlugin>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn retry_strategy(mut self, strategy: Arc<dyn RetryStrategyPlugin>) -> Self {
        self.retry_strategy = Some(strategy);
        self
    }

    pub fn build(self) -> Arc<TaskExecutor> {
        let mut options = self.options;
        options.max_concurrent_tasks = options.max_concurrent_tasks.max(1);
        Arc::new(TaskExecutor {
            factory: self.factory,
            options: RwLock::new(options),
            renderer: self.renderer,
            retry_strategy: self.retry_strategy,
            registry: RunningRegistry::new(),
            queue: Mutex::new(PendingQueue::new()),
            active: Arc::new(AtomicUsize::new(0)),
            slot_freed: Arc::new(Notify::new()),
            slot_waiter: AtomicBool::new(false),
            queued_in_flight: AtomicUsize::new(0),
            idle: Notify::new(),
            recent: Mutex::new(VecDeque::new()),
            active_ids: Arc::new(Mutex::new(HashSet::new())),
            queued_claims: Mutex::new(HashMap::new()),
        })
    }
}

/// Per-run context threaded through the task routine.
struct RunCtx<'a> {
    group_id: &'a str,
    progress: Option<&'a Mutex<ProgressMonitor>>,
}

/// Releases a concurrency slot on drop.
struct SlotGuard {
    active: Arc<AtomicUsize>,
    freed: Arc<Notify>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.freed.notify_waiters();
    }
}

/// Releases claimed task IDs on drop.
struct IdClaim {
    active_ids: Arc<Mutex<HashSet<String>>>,
    ids: Vec<String>,
}

impl Drop for IdClaim {
    fn drop(&mut self) {
        let mut active = lock(&self.active_ids);
        for id in &self.ids {
            active.remove(id);
        }
    }
}

impl TaskExecutor {
    pub fn builder(factory: Arc<dyn TaskFactory>) -> TaskExecutorBuilder {
        TaskExecutorBuilder::new(factory)
    }

    pub fn new(factory: Arc<dyn TaskFactory>, options: ExecutorOptions) -> Arc<Self> {
        TaskExecutorBuilder::new(factory).options(options).build()
    }

    // ---- configuration -------------------------------------------------

    pub fn options(&self) -> ExecutorOptions {
        match self.options.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn update_options(&self, f: impl FnOnce(&mut ExecutorOptions)) {
        let mut guard = match self.options.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard);
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.update_options(|o| o.enabled = enabled);
        tracing::info!(enabled, "parallel task executor toggled");
    }

    /// Ignores 0.
    pub fn set_max_concurrent_tasks(&self, max: usize) {
        if max == 0 {
            return;
        }
        self.update_options(|o| o.max_concurrent_tasks = max);
        tracing::info!(max, "maximum concurrent tasks updated");
    }

    pub fn set_retry_policy(&self, patch: RetryPolicyPatch) {
        self.update_options(|o| o.retry.apply(patch));
    }

    pub fn set_max_retries(&self, max_retries: u32) {
        self.update_options(|o| o.retry.max_retries = max_retries);
        tracing::info!(max_retries, "maximum retries updated");
    }

    // ---- introspection -------------------------------------------------

    /// Tasks currently in `Running` state.
    pub fn running_count(&self) -> usize {
        self.registry.running_count()
    }

    /// Highest number of simultaneously running tasks observed.
    pub fn peak_running(&self) -> usize {
        self.registry.peak()
    }

    pub fn running_tasks(&self) -> Vec<RunningTaskInfo> {
        self.registry.snapshot()
    }

    pub fn queued_count(&self) -> usize {
        self.lock_queue().len()
    }

    /// Outcomes of queued tasks finished since the last call.
    pub fn take_queue_outcomes(&self) -> Vec<TaskOutcome> {
        lock(&self.recent).drain(..).collect()
    }

    // ---- batch execution -----------------------------------------------

    /// Run a batch: parallel-eligible tasks in bounded chunks, the rest one
    /// at a time. With `continue_on_failure == false` a parallel failure
    /// skips the sequential set and a sequential failure stops it.
    ///
    /// Returns `Err` only for invalid input: IDs repeated within `tasks`, or
    /// IDs still owned by another batch or the queue. Accepted IDs stay
    /// reserved until this call returns.
    pub async fn run_batch(
        &self,
        group_id: &str,
        tasks: Vec<TaskSpec>,
        continue_on_failure: bool,
    ) -> Result<ExecutionReport, ExecutorError> {
        let _claim = self.claim_batch(&tasks)?;

        let options = self.options();
        if !options.enabled {
            tracing::info!(group_id, "parallel executor disabled; running sequentially");
            return Ok(self
                .execute_sequential_batch(group_id, tasks, continue_on_failure, &options)
                .await);
        }

        let started = Instant::now();
        let (mut parallel, mut sequential) = partition(&tasks);
        sort_by_priority(&mut parallel);
        sort_by_priority(&mut sequential);
        let chunks = plan_chunks(&parallel, options.max_concurrent_tasks);

        self.emit(&RenderEvent::BatchStart {
            group_id: group_id.to_string(),
            total_tasks: tasks.len(),
            parallel: true,
        });
        self.emit(&RenderEvent::Plan {
            group_id: group_id.to_string(),
            chunks: chunks
                .iter()
                .map(|c| c.iter().map(|t| t.id.clone()).collect())
                .collect(),
            sequential: sequential.iter().map(|t| t.id.clone()).collect(),
        });

        let progress = Mutex::new(ProgressMonitor::new(tasks.len(), options.progress_bar));
        let ctx = RunCtx {
            group_id,
            progress: Some(&progress),
        };

        let mut outcomes = Vec::with_capacity(tasks.len());
        let mut parallel_failures = 0usize;

        for (chunk_id, chunk) in chunks.iter().enumerate() {
            let task_ids: Vec<String> = chunk.iter().map(|t| t.id.clone()).collect();
            self.emit(&RenderEvent::ChunkStart {
                group_id: group_id.to_string(),
                chunk_id,
                task_ids,
            });
            lock(&progress).update_chunk(chunk_id, chunks.len());

            let chunk_outcomes = execute_chunk(chunk, |spec| self.run_slotted(&ctx, spec)).await;
            let failed = chunk_outcomes.iter().filter(|o| !o.success).count();
            parallel_failures += failed;
            outcomes.extend(chunk_outcomes);

            self.emit(&RenderEvent::ChunkEnd {
                group_id: group_id.to_string(),
                chunk_id,
                failed,
            });
        }

        let skipped = if parallel_failures > 0 && !continue_on_failure {
            sequential.iter().map(|t| t.id.clone()).collect()
        } else {
            self.run_sequential_set(&ctx, &sequential, continue_on_failure, &mut outcomes)
                .await
        };
        self.report_skipped(&ctx, &skipped);

        let report = self.finish(group_id, &outcomes, &skipped, started.elapsed());
        lock(&progress).finish(report.success);
        Ok(report)
    }

    /// Same contract as [`run_batch`](Self::run_batch) without the
    /// parallel path: every task runs one at a time in priority order.
    pub async fn run_sequential(
        &self,
        group_id: &str,
        tasks: Vec<TaskSpec>,
        continue_on_failure: bool,
    ) -> Result<ExecutionReport, ExecutorError> {
        let _claim = self.claim_batch(&tasks)?;
        let options = self.options();
        Ok(self
            .execute_sequential_batch(group_id, tasks, continue_on_failure, &options)
            .await)
    }

    async fn execute_sequential_batch(
        &self,
        group_id: &str,
        mut tasks: Vec<TaskSpec>,
        continue_on_failure: bool,
        options: &ExecutorOptions,
    ) -> ExecutionReport {
        let started = Instant::now();
        sort_by_priority(&mut tasks);

        self.emit(&RenderEvent::BatchStart {
            group_id: group_id.to_string(),
            total_tasks: tasks.len(),
            parallel: false,
        });
        self.emit(&RenderEvent::Plan {
            group_id: group_id.to_string(),
            chunks: Vec::new(),
            sequential: tasks.iter().map(|t| t.id.clone()).collect(),
        });

        let progress = Mutex::new(ProgressMonitor::new(tasks.len(), options.progress_bar));
        let ctx = RunCtx {
            group_id,
            progress: Some(&progress),
        };

        let mut outcomes = Vec::with_capacity(tasks.len());
        let skipped = self
            .run_sequential_set(&ctx, &tasks, continue_on_failure, &mut outcomes)
            .await;
        self.report_skipped(&ctx, &skipped);

        let report = self.finish(group_id, &outcomes, &skipped, started.elapsed());
        lock(&progress).finish(report.success);
        report
    }

    /// Runs `tasks` in order; returns the IDs left unrun after a halting failure.
    async fn run_sequential_set(
        &self,
        ctx: &RunCtx<'_>,
        tasks: &[TaskSpec],
        continue_on_failure: bool,
        outcomes: &mut Vec<TaskOutcome>,
    ) -> Vec<String> {
        for (idx, task) in tasks.iter().enumerate() {
            let outcome = self.run_slotted(ctx, task).await;
            let failed = !outcome.success;
            outcomes.push(outcome);

            if failed && !continue_on_failure {
                return tasks[idx + 1..].iter().map(|t| t.id.clone()).collect();
            }
        }
        Vec::new()
    }

    fn report_skipped(&self, ctx: &RunCtx<'_>, skipped: &[String]) {
        if skipped.is_empty() {
            return;
        }
        if let Some(progress) = ctx.progress {
            lock(progress).skip_tasks(skipped.len());
        }
        self.emit(&RenderEvent::SequentialSkipped {
            group_id: ctx.group_id.to_string(),
            task_ids: skipped.to_vec(),
        });
    }

    fn finish(
        &self,
        group_id: &str,
        outcomes: &[TaskOutcome],
        skipped: &[String],
        elapsed: Duration,
    ) -> ExecutionReport {
        let report = match merge_results(group_id, outcomes, skipped, elapsed) {
            Ok(report) => report,
            Err(err) => {
                tracing::error!(group_id, error = %err, "merging results failed");
                degraded_report(group_id, outcomes, &err)
            }
        };
        self.emit(&RenderEvent::BatchEnd {
            group_id: group_id.to_string(),
            report: report.clone(),
        });
        report
    }

    fn claim_batch(&self, tasks: &[TaskSpec]) -> Result<IdClaim, ExecutorError> {
        let mut seen = HashSet::with_capacity(tasks.len());
        for task in tasks {
            if !seen.insert(task.id.as_str()) {
                return Err(ExecutorError::DuplicateTaskId(task.id.clone()));
            }
        }
        self.claim_ids(tasks.iter().map(|t| t.id.clone()).collect())
    }

    /// All-or-nothing: either every ID is free and gets reserved, or none is.
    fn claim_ids(&self, ids: Vec<String>) -> Result<IdClaim, ExecutorError> {
        let mut active = lock(&self.active_ids);
        if let Some(taken) = ids.iter().find(|id| active.contains(id.as_str())) {
            return Err(ExecutorError::TaskAlreadyActive(taken.clone()));
        }
        active.extend(ids.iter().cloned());
        Ok(IdClaim {
            active_ids: Arc::clone(&self.active_ids),
            ids,
        })
    }

    // ---- ad-hoc queue --------------------------------------------------

    /// Queue a task and start it as soon as a concurrency slot is free.
    ///
    /// `priority` overrides the task's own; ties run in enqueue order.
    /// Must be called from within a Tokio runtime.
    pub fn enqueue(
        self: &Arc<Self>,
        task: TaskSpec,
        priority: Option<i64>,
    ) -> Result<String, ExecutorError> {
        let task_id = task.id.clone();
        let claim = self.claim_ids(vec![task_id.clone()])?;
        {
            let mut queue = self.lock_queue();
            let priority = priority.unwrap_or_else(|| task.effective_priority());
            queue.push(task, priority);
            lock(&self.queued_claims).insert(task_id.clone(), claim);
            tracing::debug!(task_id = %task_id, priority, queued = queue.len(), "task queued");
        }

        self.pump_queue();
        Ok(task_id)
    }

    /// Resolves once the queue is empty and no queued task is running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.queue_is_idle() {
                return;
            }
            notified.await;
        }
    }

    fn queue_is_idle(&self) -> bool {
        self.queued_in_flight.load(Ordering::SeqCst) == 0 && self.lock_queue().is_empty()
    }

    fn pump_queue(self: &Arc<Self>) {
        let max = self.options().max_concurrent_tasks;
        let mut queue = self.lock_queue();

        while self.active.load(Ordering::SeqCst) < max {
            let Some(next) = queue.pop() else {
                break;
            };
            let slot = self.take_slot();
            self.queued_in_flight.fetch_add(1, Ordering::SeqCst);

            let executor = Arc::clone(self);
            tokio::spawn(async move {
                let ctx = RunCtx {
                    group_id: QUEUE_GROUP_ID,
                    progress: None,
                };
                let outcome = executor.run_task(&ctx, &next.task).await;
                drop(slot);
                lock(&executor.queued_claims).remove(&next.task.id);
                executor.record_queue_outcome(outcome);
                executor.queued_in_flight.fetch_sub(1, Ordering::SeqCst);
                executor.pump_queue();
                if executor.queue_is_idle() {
                    executor.emit(&RenderEvent::QueueDrained);
                    executor.idle.notify_waiters();
                }
            });
        }

        if !queue.is_empty() {
            drop(queue);
            self.arm_slot_waiter();
        }
    }

    fn record_queue_outcome(&self, outcome: TaskOutcome) {
        let mut recent = lock(&self.recent);
        if recent.len() >= MAX_RECENT_OUTCOMES {
            recent.pop_front();
        }
        recent.push_back(outcome);
    }

    fn lock_queue(&self) -> MutexGuard<'_, PendingQueue> {
        lock(&self.queue)
    }

    fn take_slot(&self) -> SlotGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        SlotGuard {
            active: self.active.clone(),
            freed: self.slot_freed.clone(),
        }
    }

    /// Park one background task until a slot frees up, then pump again.
    /// Covers slots released by batch tasks, which never pump themselves.
    fn arm_slot_waiter(self: &Arc<Self>) {
        if self.slot_waiter.swap(true, Ordering::SeqCst) {
            return;
        }
        let executor = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let freed = executor.slot_freed.notified();
                let max = executor.options().max_concurrent_tasks;
                if executor.active.load(Ordering::SeqCst) < max
                    || executor.lock_queue().is_empty()
                {
                    break;
                }
                freed.await;
            }
            executor.slot_waiter.store(false, Ordering::SeqCst);
            executor.pump_queue();
        });
    }

    // ---- per-task routine ----------------------------------------------

    async fn run_slotted(&self, ctx: &RunCtx<'_>, spec: &TaskSpec) -> TaskOutcome {
        let _slot = self.take_slot();
        self.run_task(ctx, spec).await
    }

    /// Create, await, and retry one task until it succeeds, hits a
    /// non-retryable error, or exhausts its retry limit.
    async fn run_task(&self, ctx: &RunCtx<'_>, spec: &TaskSpec) -> TaskOutcome {
        let started = Instant::now();
        let _entry = self.registry.guard(&spec.id);

        let options = self.options();
        let retry_limit = spec.effective_retry_limit(options.retry.max_retries);
        let timeout_ms = spec.effective_timeout_ms(options.default_timeout_ms);

        if let Some(progress) = ctx.progress {
            lock(progress).add_task(&spec.id);
        }

        let mut attempt = 0u32;
        let outcome = loop {
            self.emit(&RenderEvent::TaskStart {
                group_id: ctx.group_id.to_string(),
                task_id: spec.id.clone(),
                attempt,
            });

            let err = match self.run_attempt(spec, attempt, timeout_ms).await {
                Ok(output) => {
                    break TaskOutcome::succeeded(&spec.id, output, attempt, elapsed_ms(started));
                }
                Err(err) => err,
            };

            let delay = self.retry_delay(&options.retry, attempt, retry_limit, &err);
            let Some(delay) = delay else {
                break TaskOutcome::failed(&spec.id, &err, attempt, elapsed_ms(started));
            };

            self.emit(&RenderEvent::TaskRetry {
                group_id: ctx.group_id.to_string(),
                task_id: spec.id.clone(),
                attempt: attempt + 1,
                delay_ms: delay.as_millis() as u64,
                error: err.to_string(),
            });
            if let Some(progress) = ctx.progress {
                lock(progress).retry_task(&spec.id, attempt + 1);
            }

            tokio::time::sleep(delay).await;
            attempt += 1;
        };

        if let Some(progress) = ctx.progress {
            lock(progress).complete_task(&spec.id, outcome.success, outcome.duration_ms);
        }
        self.emit(&RenderEvent::TaskComplete {
            group_id: ctx.group_id.to_string(),
            outcome: outcome.clone(),
        });
        outcome
    }

    async fn run_attempt(
        &self,
        spec: &TaskSpec,
        attempt: u32,
        timeout_ms: u64,
    ) -> Result<Value, TaskError> {
        let (signal, completion) = completion_channel();
        let handle = self.factory.create(spec, attempt, signal).await?;
        self.registry.register(&spec.id, handle, attempt);

        match tokio::time::timeout(Duration::from_millis(timeout_ms), completion.wait()).await {
            Ok(Ok(output)) => {
                self.registry
                    .mark(&spec.id, TaskStatus::Completed, Some(output.clone()));
                Ok(output)
            }
            Ok(Err(err)) => {
                self.registry.mark(&spec.id, TaskStatus::Failed, None);
                Err(err)
            }
            Err(_) => {
                self.registry.cancel(&spec.id);
                Err(TaskError::Timeout {
                    task_id: spec.id.clone(),
                    timeout_ms,
                })
            }
        }
    }

    /// `None` means give up.
    fn retry_delay(
        &self,
        policy: &RetryPolicy,
        attempt: u32,
        retry_limit: u32,
        err: &TaskError,
    ) -> Option<Duration> {
        if !err.is_retryable() || attempt >= retry_limit {
            return None;
        }
        match &self.retry_strategy {
            Some(strategy) => {
                if strategy.is_fatal_error(err) {
                    return None;
                }
                strategy.next_delay(attempt, err)
            }
            None => Some(policy.delay_for(attempt)),
        }
    }

    fn emit(&self, event: &RenderEvent) {
        match &self.renderer {
            Some(renderer) => renderer.render(event),
            None => log_event(event),
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
