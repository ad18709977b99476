use std::sync::Arc;

use async_trait::async_trait;

use crate::executor::signal::CompletionSignal;
use crate::executor::types::{TaskCreateError, TaskSpec};

/// Host-provided facility that turns a [`TaskSpec`] into running work.
///
/// The returned handle's background work must eventually consume `signal`
/// (complete or fail). Returning `Err` is a non-retryable task failure.
#[async_trait]
pub trait TaskFactory: Send + Sync {
    fn name(&self) -> &str;

    /// `attempt` is 0 for the first run and increments on every retry.
    async fn create(
        &self,
        spec: &TaskSpec,
        attempt: u32,
        signal: CompletionSignal,
    ) -> Result<Arc<dyn TaskHandle>, TaskCreateError>;
}

/// A task started by a [`TaskFactory`].
pub trait TaskHandle: Send + Sync {
    fn task_id(&self) -> &str;

    /// Best-effort cancellation, fire and forget.
    fn abort(&self) {}
}
