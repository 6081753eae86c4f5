// Retry logic for failed callback deliveries
use crate::application::constants::{
    DEFAULT_BACKOFF_FACTOR, DEFAULT_CALLBACK_TIMEOUT_MS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_CONCURRENT_CALLBACKS, DEFAULT_RETRY_BASE_DELAY_MS,
};
use crate::domain::JobRecord;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

/// Retry decision result
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the callback (with backoff delay in ms)
    Retry(i64),
    /// Do not retry, job has failed permanently
    Failed,
}

/// Callback delivery settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total delivery attempts before the job goes to ERROR
    pub max_attempts: i32,
    pub base_delay_ms: i64,
    pub backoff_factor: f64,
    /// Per-request timeout for the outbound callback
    pub timeout_ms: u64,
    /// Callbacks in flight at once
    pub max_concurrent: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            timeout_ms: DEFAULT_CALLBACK_TIMEOUT_MS,
            max_concurrent: DEFAULT_MAX_CONCURRENT_CALLBACKS,
        }
    }
}

impl RetryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Retry policy
///
/// Determines if a callback should be retried based on:
/// - Attempts made so far (`JobRecord::retries`, already incremented for the failed attempt)
/// - Maximum attempts allowed
/// - Backoff factor for exponential delay
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Determine if a job should be retried
    ///
    /// Returns:
    /// - `RetryDecision::Retry(delay_ms)` while `retries < max_attempts`
    /// - `RetryDecision::Failed` otherwise
    ///
    /// Backoff formula:
    /// delay = base_delay * (backoff_factor ^ (retries - 1)) * jitter
    ///
    /// # Example
    /// ```text
    /// record.retries += 1;
    /// match policy.should_retry(&record) {
    ///     RetryDecision::Retry(delay_ms) => { /* RETRYING at now + delay_ms */ }
    ///     RetryDecision::Failed => { /* ERROR */ }
    /// }
    /// ```
    pub fn should_retry(&self, record: &JobRecord) -> RetryDecision {
        if record.retries >= self.config.max_attempts {
            warn!(
                job_id = %record.id,
                retries = %record.retries,
                max_attempts = %self.config.max_attempts,
                "Max callback attempts reached"
            );
            return RetryDecision::Failed;
        }

        let exponent = (record.retries - 1).max(0);
        let base_delay_ms = self.config.base_delay_ms as f64 * self.config.backoff_factor.powi(exponent);

        // ±10% jitter, seeded by job id so the delay is deterministic per job
        let jitter_seed = record.id.chars().map(|c| c as u32).sum::<u32>();
        let jitter_factor = 0.9 + ((jitter_seed % 21) as f64 / 100.0); // 0.9 to 1.1

        let delay_ms = (base_delay_ms * jitter_factor) as i64;

        info!(
            job_id = %record.id,
            retries = %record.retries,
            max_attempts = %self.config.max_attempts,
            delay_ms = %delay_ms,
            "Scheduling callback retry"
        );

        RetryDecision::Retry(delay_ms)
    }
}
