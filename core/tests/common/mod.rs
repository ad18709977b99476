#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::task::AbortHandle;

use fanout_core::api::{
    CompletionSignal, OutputRendererPlugin, RenderEvent, TaskCreateError, TaskFactory, TaskHandle,
    TaskSpec,
};

/// Factory whose behaviour is scripted through each task's `context`:
///
/// - `durationMs`: how long an attempt runs (default 100)
/// - `failAttempts`: the first n attempts fail
/// - `failCreate`: creation itself fails
/// - `hang`: the attempt never signals completion
#[derive(Default)]
pub struct ScriptedFactory {
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    creates: Mutex<HashMap<String, u32>>,
    started: Arc<Mutex<Vec<String>>>,
    aborted: Arc<Mutex<Vec<String>>>,
}

impl ScriptedFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Highest number of attempts running at the same time.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn creates(&self, task_id: &str) -> u32 {
        self.creates
            .lock()
            .unwrap()
            .get(task_id)
            .copied()
            .unwrap_or(0)
    }

    /// Task IDs in the order their first attempt started.
    pub fn start_order(&self) -> Vec<String> {
        let started = self.started.lock().unwrap();
        let mut seen = Vec::new();
        for id in started.iter() {
            if !seen.contains(id) {
                seen.push(id.clone());
            }
        }
        seen
    }

    pub fn aborted(&self) -> Vec<String> {
        self.aborted.lock().unwrap().clone()
    }
}

struct ScriptedHandle {
    id: String,
    abort: AbortHandle,
    aborted: Arc<Mutex<Vec<String>>>,
}

impl TaskHandle for ScriptedHandle {
    fn task_id(&self) -> &str {
        &self.id
    }

    fn abort(&self) {
        self.aborted.lock().unwrap().push(self.id.clone());
        self.abort.abort();
    }
}

/// Decrements the in-flight counter even when the attempt is aborted.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TaskFactory for ScriptedFactory {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn create(
        &self,
        spec: &TaskSpec,
        attempt: u32,
        signal: CompletionSignal,
    ) -> Result<Arc<dyn TaskHandle>, TaskCreateError> {
        *self.creates.lock().unwrap().entry(spec.id.clone()).or_default() += 1;

        let ctx = &spec.context;
        if ctx["failCreate"].as_bool().unwrap_or(false) {
            return Err(TaskCreateError::new(format!("cannot create {}", spec.id)));
        }

        let duration = Duration::from_millis(ctx["durationMs"].as_u64().unwrap_or(100));
        let fail_attempts = ctx["failAttempts"].as_u64().unwrap_or(0) as u32;
        let hang = ctx["hang"].as_bool().unwrap_or(false);

        self.started.lock().unwrap().push(spec.id.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let in_flight = InFlight(self.in_flight.clone());

        let id = spec.id.clone();
        let join = tokio::spawn(async move {
            let _in_flight = in_flight;
            if hang {
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(duration).await;
            if attempt < fail_attempts {
                signal.fail(format!("attempt {attempt} of {id} failed"));
            } else {
                signal.complete(json!({ "taskId": id, "attempt": attempt }));
            }
        });

        Ok(Arc::new(ScriptedHandle {
            id: spec.id.clone(),
            abort: join.abort_handle(),
            aborted: self.aborted.clone(),
        }))
    }
}

/// Renderer that keeps every event for later inspection.
#[derive(Default)]
pub struct RecordingRenderer {
    events: Mutex<Vec<RenderEvent>>,
}

impl RecordingRenderer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<RenderEvent> {
        self.events.lock().unwrap().clone()
    }

    /// `(chunks, sequential)` from the first plan event.
    pub fn plan(&self) -> Option<(Vec<Vec<String>>, Vec<String>)> {
        self.events().into_iter().find_map(|e| match e {
            RenderEvent::Plan {
                chunks, sequential, ..
            } => Some((chunks, sequential)),
            _ => None,
        })
    }
}

impl OutputRendererPlugin for RecordingRenderer {
    fn name(&self) -> &str {
        "recording"
    }

    fn format(&self) -> &str {
        "memory"
    }

    fn render(&self, event: &RenderEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub fn task(id: &str) -> TaskSpec {
    TaskSpec::new(id, format!("task {id}"))
}

pub fn parallel_task(id: &str) -> TaskSpec {
    task(id).parallel()
}

pub fn with_ctx(spec: TaskSpec, ctx: Value) -> TaskSpec {
    spec.with_context(ctx)
}
