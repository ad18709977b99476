use std::sync::Arc;
use std::time::Duration;

use fanout_core::executor::traits::RetryStrategyPlugin;
use fanout_core::executor::types::{RetryConfig, TaskError};

fn capped(config: &RetryConfig, delay_ms: u64) -> Duration {
    let delay_ms = if config.max_delay_ms > 0 {
        delay_ms.min(config.max_delay_ms)
    } else {
        delay_ms
    };
    Duration::from_millis(delay_ms)
}

/// `base * 2^attempt`, optionally capped.
pub struct ExponentialBackoffPlugin {
    config: RetryConfig,
}

/// `base * (attempt + 1)`, optionally capped.
pub struct LinearRetryPlugin {
    config: RetryConfig,
}

/// Always `base`.
pub struct FixedDelayPlugin {
    config: RetryConfig,
}

impl ExponentialBackoffPlugin {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl LinearRetryPlugin {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl FixedDelayPlugin {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl RetryStrategyPlugin for ExponentialBackoffPlugin {
    fn name(&self) -> &str {
        "exponential-backoff"
    }

    fn next_delay(&self, attempt: u32, _error: &TaskError) -> Option<Duration> {
        let exp = 1u64 << attempt.min(30);
        let delay = self.config.base_delay_ms.saturating_mul(exp);
        Some(capped(&self.config, delay))
    }
}

impl RetryStrategyPlugin for LinearRetryPlugin {
    fn name(&self) -> &str {
        "linear"
    }

    fn next_delay(&self, attempt: u32, _error: &TaskError) -> Option<Duration> {
        let multiplier = attempt.saturating_add(1) as u64;
        let delay = self.config.base_delay_ms.saturating_mul(multiplier);
        Some(capped(&self.config, delay))
    }
}

impl RetryStrategyPlugin for FixedDelayPlugin {
    fn name(&self) -> &str {
        "fixed"
    }

    fn next_delay(&self, _attempt: u32, _error: &TaskError) -> Option<Duration> {
        Some(capped(&self.config, self.config.base_delay_ms))
    }
}

/// Pick a strategy by `config.strategy`. Unknown names fall back to
/// exponential backoff, or fixed delay when `exponential_backoff` is off.
pub fn build_retry_strategy(config: &RetryConfig) -> Arc<dyn RetryStrategyPlugin> {
    match config.strategy.as_str() {
        "linear" => Arc::new(LinearRetryPlugin::new(config.clone())),
        "fixed" => Arc::new(FixedDelayPlugin::new(config.clone())),
        "exponential-backoff" | "exponential" if config.exponential_backoff => {
            Arc::new(ExponentialBackoffPlugin::new(config.clone()))
        }
        "exponential-backoff" | "exponential" => Arc::new(FixedDelayPlugin::new(config.clone())),
        other => {
            tracing::warn!(strategy = %other, "unknown retry strategy, using exponential-backoff");
            if config.exponential_backoff {
                Arc::new(ExponentialBackoffPlugin::new(config.clone()))
            } else {
                Arc::new(FixedDelayPlugin::new(config.clone()))
            }
        }
    }
}
