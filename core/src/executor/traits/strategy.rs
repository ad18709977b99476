use std::time::Duration;

use crate::executor::types::TaskError;

/// Retry strategy plugin. Overrides the delay computed from the executor's
/// [`RetryPolicy`](crate::executor::types::RetryPolicy); the number of
/// retries still comes from the policy or the task's own limit.
pub trait RetryStrategyPlugin: Send + Sync {
    fn name(&self) -> &str;

    /// Delay before retrying after the 0-based `attempt` failed.
    /// `None` stops retrying.
    fn next_delay(&self, attempt: u32, error: &TaskError) -> Option<Duration>;

    fn is_fatal_error(&self, _error: &TaskError) -> bool {
        false
    }
}
