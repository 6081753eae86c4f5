// Callback Invoker - fires a due job at its owning application

use crate::application::retry::{RetryDecision, RetryPolicy};
use crate::domain::JobRecord;
use crate::error::Result;
use crate::port::{CallbackOutcome, CallbackRequest, CallbackSender, JobRepository, TimeProvider};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// `last_error` recorded when the callback target answers 404
pub const TARGET_NOT_FOUND: &str = "target not found";

/// Delivers one callback attempt and persists the resulting status
///
/// Delivery is at-least-once with bounded retries; receivers deduplicate on
/// the timer id, which is stable across attempts.
pub struct CallbackInvoker {
    repo: Arc<dyn JobRepository>,
    sender: Arc<dyn CallbackSender>,
    retry_policy: Arc<RetryPolicy>,
    time_provider: Arc<dyn TimeProvider>,
}

impl CallbackInvoker {
    pub fn new(
        repo: Arc<dyn JobRepository>,
        sender: Arc<dyn CallbackSender>,
        retry_policy: Arc<RetryPolicy>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            repo,
            sender,
            retry_policy,
            time_provider,
        }
    }

    pub fn request_for(record: &JobRecord) -> CallbackRequest {
        CallbackRequest {
            job_id: record.id.clone(),
            callback_url: record.callback_url.clone(),
            process_id: record.process_id.clone(),
            process_instance_id: record.process_instance_id.clone(),
            timer_id: record.timer_id(),
            limit: record.repeat_limit,
        }
    }

    /// Fire one attempt for `record`
    ///
    /// Transitions:
    /// - 2xx -> EXECUTED
    /// - 404 -> ERROR ("target not found"), not retried
    /// - anything else -> RETRYING with backoff, or ERROR once attempts are exhausted
    ///
    /// Returns the stored record, or `None` if the job was cancelled or
    /// rescheduled while the callback was in flight. The concurrent change wins
    /// and nothing is written back.
    pub async fn fire(&self, record: JobRecord) -> Result<Option<JobRecord>> {
        if !record.status.is_pending() {
            debug!(job_id = %record.id, status = %record.status, "Skipping non-pending job");
            return Ok(Some(record));
        }
        let expected = record.clone();
        let mut record = record;

        let request = Self::request_for(&record);
        debug!(
            job_id = %record.id,
            timer_id = %request.timer_id,
            attempt = record.retries + 1,
            "Invoking callback"
        );

        let outcome = self.sender.send(&request).await;
        let now = self.time_provider.now_millis();
        record.retries += 1;

        match outcome {
            CallbackOutcome::Delivered => {
                record.mark_executed(now)?;
                info!(job_id = %record.id, attempts = record.retries, "Callback delivered");
            }
            CallbackOutcome::TargetNotFound => {
                warn!(job_id = %record.id, "Callback target not found, giving up");
                record.mark_error(TARGET_NOT_FOUND, now)?;
            }
            CallbackOutcome::Failed(reason) => match self.retry_policy.should_retry(&record) {
                RetryDecision::Retry(delay_ms) => {
                    warn!(
                        job_id = %record.id,
                        attempt = record.retries,
                        delay_ms = delay_ms,
                        error = %reason,
                        "Callback failed, will retry"
                    );
                    record.mark_retrying(now.saturating_add(delay_ms), reason, now)?;
                }
                RetryDecision::Failed => {
                    warn!(job_id = %record.id, error = %reason, "Callback failed permanently");
                    record.mark_error(reason, now)?;
                }
            },
        }

        let saved = self.repo.update(&expected, &record).await?;
        if saved.is_none() {
            info!(job_id = %record.id, "Job changed while callback was in flight, dropping result");
        }
        Ok(saved)
    }
}
