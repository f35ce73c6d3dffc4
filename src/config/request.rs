use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw `[request]` section, kept in whole seconds / milliseconds so it reads
/// naturally from TOML and environment variables.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestConfig {
    pub timeout_secs: u64,
    pub rate_limit_window_secs: u64,
    pub retry_num: usize,
    pub retry_backoff_ms: u64,
    pub rate_limit_cache_capacity: usize,
}

impl Default for RequestConfig {
    fn default() -> Self {
        RequestConfig {
            timeout_secs: 5,
            rate_limit_window_secs: 30,
            retry_num: 5,
            retry_backoff_ms: 300,
            rate_limit_cache_capacity: 10_000,
        }
    }
}

impl RequestConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            per_attempt_timeout: Duration::from_secs(self.timeout_secs),
            rate_limit_window: Duration::from_secs(self.rate_limit_window_secs),
            max_retries: self.retry_num,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

/// Process-wide retry and rate-limit settings, shared by every retryer.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    pub per_attempt_timeout: Duration,
    pub rate_limit_window: Duration,
    pub max_retries: usize,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> usize {
        self.max_retries + 1
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RequestConfig::default().retry_policy()
    }
}
