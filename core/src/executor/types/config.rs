use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::task::DEFAULT_TIMEOUT_MS;

/// Executor-wide retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Attempts beyond the first before giving up.
    pub max_retries: u32,
    /// Base wait before a retry.
    pub base_delay_ms: u64,
    /// Double the wait with every attempt.
    pub exponential_backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            exponential_backoff: true,
        }
    }
}

impl RetryPolicy {
    /// Wait before retrying after the 0-based `attempt` failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ms = if self.exponential_backoff {
            let exp = 1u64 << attempt.min(30);
            self.base_delay_ms.saturating_mul(exp)
        } else {
            self.base_delay_ms
        };
        Duration::from_millis(ms)
    }

    pub fn apply(&mut self, patch: RetryPolicyPatch) {
        if let Some(v) = patch.max_retries {
            self.max_retries = v;
        }
        if let Some(v) = patch.base_delay_ms {
            self.base_delay_ms = v;
        }
        if let Some(v) = patch.exponential_backoff {
            self.exponential_backoff = v;
        }
    }
}

/// Partial update merged over the current [`RetryPolicy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicyPatch {
    pub max_retries: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub exponential_backoff: Option<bool>,
}

/// Runtime options of a [`TaskExecutor`](crate::executor::TaskExecutor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// When false every batch runs strictly sequentially.
    pub enabled: bool,

    /// Upper bound on tasks in `Running` state at any instant.
    pub max_concurrent_tasks: usize,

    pub retry: RetryPolicy,

    /// Timeout for tasks that don't carry their own.
    pub default_timeout_ms: u64,

    /// Show indicatif progress bars while a batch runs.
    pub progress_bar: bool,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            max_concurrent_tasks: 3,
            retry: RetryPolicy::default(),
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            progress_bar: false,
        }
    }
}

/// `[executor]` section of the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,

    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Task factory used by the CLI: "simulated" or "command".
    #[serde(default = "default_task_factory")]
    pub task_factory: String,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_concurrent_tasks: default_max_concurrent_tasks(),
            default_timeout_ms: default_timeout_ms(),
            task_factory: default_task_factory(),
            retry: RetryConfig::default(),
        }
    }
}

impl ExecutorConfig {
    pub fn to_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            enabled: self.enabled,
            max_concurrent_tasks: self.max_concurrent_tasks.max(1),
            retry: RetryPolicy {
                max_retries: self.retry.max_retries,
                base_delay_ms: self.retry.base_delay_ms,
                exponential_backoff: self.retry.exponential_backoff,
            },
            default_timeout_ms: self.default_timeout_ms,
            progress_bar: false,
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_max_concurrent_tasks() -> usize {
    3
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_task_factory() -> String {
    "simulated".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// "exponential-backoff", "fixed" or "linear".
    #[serde(default = "default_retry_strategy")]
    pub strategy: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_exponential_backoff")]
    pub exponential_backoff: bool,
    /// Cap for computed delays; 0 means uncapped.
    #[serde(default)]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            strategy: default_retry_strategy(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            exponential_backoff: default_exponential_backoff(),
            max_delay_ms: 0,
        }
    }
}

fn default_retry_strategy() -> String {
    "exponential-backoff".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_exponential_backoff() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
    }

    #[test]
    fn test_constant_delay() {
        let policy = RetryPolicy {
            exponential_backoff: false,
            base_delay_ms: 250,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(250));
        assert_eq!(policy.delay_for(5), Duration::from_millis(250));
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let mut policy = RetryPolicy::default();
        policy.apply(RetryPolicyPatch {
            max_retries: Some(0),
            ..Default::default()
        });
        assert_eq!(policy.max_retries, 0);
        assert_eq!(policy.base_delay_ms, 1000);
        assert!(policy.exponential_backoff);
    }

    #[test]
    fn test_config_to_options_clamps_concurrency() {
        let cfg = ExecutorConfig {
            max_concurrent_tasks: 0,
            ..ExecutorConfig::default()
        };
        assert_eq!(cfg.to_options().max_concurrent_tasks, 1);
    }
}
