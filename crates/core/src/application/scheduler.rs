//! Timer Scheduler - finds due jobs and hands them to the CallbackInvoker
//!
//! Polling loop over the repository:
//! - SCHEDULED / RETRYING jobs whose `next_attempt_at` has passed are fired
//! - EXECUTED / CANCELED jobs older than the retention window are purged

use crate::application::callback::CallbackInvoker;
use crate::application::constants::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_TERMINAL_RETENTION_MS};
use crate::application::shutdown::ShutdownToken;
use crate::domain::{JobRecord, JobStatus};
use crate::error::Result;
use crate::port::{JobRepository, TimeProvider};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Polling settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub poll_interval_ms: u64,
    /// How long EXECUTED / CANCELED records stay queryable
    pub terminal_retention_ms: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            terminal_retention_ms: DEFAULT_TERMINAL_RETENTION_MS,
        }
    }
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Drives due jobs through the CallbackInvoker
pub struct TimerScheduler {
    repo: Arc<dyn JobRepository>,
    invoker: Arc<CallbackInvoker>,
    time_provider: Arc<dyn TimeProvider>,
    config: SchedulerConfig,
    max_concurrent: usize,
}

impl TimerScheduler {
    pub fn new(
        repo: Arc<dyn JobRepository>,
        invoker: Arc<CallbackInvoker>,
        time_provider: Arc<dyn TimeProvider>,
        config: SchedulerConfig,
        max_concurrent: usize,
    ) -> Self {
        Self {
            repo,
            invoker,
            time_provider,
            config,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Run the polling loop until shutdown is signalled
    pub async fn run(&self, mut shutdown: ShutdownToken) -> Result<()> {
        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            max_concurrent = self.max_concurrent,
            "Timer scheduler started"
        );
        loop {
            if shutdown.is_shutdown() {
                break;
            }

            match self.run_due_jobs().await {
                Ok(0) => {}
                Ok(fired) => debug!(fired, "Fired due jobs"),
                Err(e) => error!(error = %e, "Failed to fire due jobs"),
            }

            if let Err(e) = self.purge_terminal().await {
                error!(error = %e, "Failed to purge terminal jobs");
            }

            tokio::select! {
                _ = sleep(self.config.poll_interval()) => {},
                _ = shutdown.wait() => {
                    info!("Timer scheduler interrupted during idle");
                    break;
                }
            }
        }
        info!("Timer scheduler stopped");
        Ok(())
    }

    /// Pending jobs whose attempt time has arrived, highest priority first
    pub async fn due_jobs(&self) -> Result<Vec<JobRecord>> {
        let now = self.time_provider.now_millis();
        let mut due: Vec<JobRecord> = self
            .repo
            .find_by_status(&[JobStatus::Scheduled, JobStatus::Retrying])
            .await?
            .filter_map(|item| futures::future::ready(readable(item, |r| r.is_due(now))))
            .collect()
            .await;

        due.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.next_attempt_at.cmp(&b.next_attempt_at))
        });
        Ok(due)
    }

    /// Fire every due job (bounded concurrency); returns how many were fired
    pub async fn run_due_jobs(&self) -> Result<usize> {
        let due = self.due_jobs().await?;
        let count = due.len();
        let invoker = &self.invoker;

        stream::iter(due)
            .for_each_concurrent(self.max_concurrent, |record| async move {
                let job_id = record.id.clone();
                if let Err(e) = invoker.fire(record).await {
                    error!(job_id = %job_id, error = %e, "Callback invocation failed");
                }
            })
            .await;

        Ok(count)
    }

    /// Delete terminal records past the retention window; returns how many were removed
    pub async fn purge_terminal(&self) -> Result<usize> {
        let cutoff = self.time_provider.now_millis() - self.config.terminal_retention_ms;
        let expired: Vec<JobRecord> = self
            .repo
            .find_by_status(&[JobStatus::Executed, JobStatus::Canceled])
            .await?
            .filter_map(|item| futures::future::ready(readable(item, |r| r.updated_at < cutoff)))
            .collect()
            .await;

        let mut purged = 0;
        for record in expired {
            if self.repo.delete(&record.id).await?.is_some() {
                purged += 1;
            }
        }
        if purged > 0 {
            info!(purged, "Purged terminal jobs");
        }
        Ok(purged)
    }
}

/// Unreadable records are logged and skipped
fn readable(item: Result<JobRecord>, keep: impl Fn(&JobRecord) -> bool) -> Option<JobRecord> {
    match item {
        Ok(record) if keep(&record) => Some(record),
        Ok(_) => None,
        Err(e) => {
            warn!(error = %e, "Skipping unreadable job record");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::repository::InMemoryJobRepository;
    use crate::application::retry::{RetryConfig, RetryPolicy};
    use crate::application::shutdown::shutdown_channel;
    use crate::domain::{JobDescriptor, TriggerTime};
    use crate::error::AppError;
    use crate::port::callback_sender::MockCallbackSender;
    use crate::port::time_provider::ManualTimeProvider;
    use crate::port::CallbackOutcome;
    use parking_lot::Mutex;

    struct Fixture {
        repo: Arc<InMemoryJobRepository>,
        clock: Arc<ManualTimeProvider>,
        scheduler: TimerScheduler,
    }

    fn fixture(sender: MockCallbackSender, max_concurrent: usize) -> Fixture {
        let repo = Arc::new(InMemoryJobRepository::new());
        let clock = Arc::new(ManualTimeProvider::new(1_000));
        let invoker = Arc::new(CallbackInvoker::new(
            repo.clone(),
            Arc::new(sender),
            Arc::new(RetryPolicy::new(RetryConfig::default())),
            clock.clone(),
        ));
        let scheduler = TimerScheduler::new(
            repo.clone(),
            invoker,
            clock.clone(),
            SchedulerConfig {
                poll_interval_ms: 10,
                terminal_retention_ms: 5_000,
            },
            max_concurrent,
        );
        Fixture {
            repo,
            clock,
            scheduler,
        }
    }

    fn record(id: &str, at_ms: i64, priority: i32) -> JobRecord {
        let mut descriptor = JobDescriptor::for_instance(
            id,
            TriggerTime::at(at_ms),
            "loan",
            format!("pi-{}", id),
            "http://app.local/timers",
        );
        descriptor.priority = priority;
        JobRecord::schedule(descriptor, 0).unwrap()
    }

    #[tokio::test]
    async fn test_only_due_jobs_fire() {
        let mut sender = MockCallbackSender::new();
        sender
            .expect_send()
            .times(2)
            .returning(|_| CallbackOutcome::Delivered);
        let f = fixture(sender, 4);

        f.repo.save(&record("past", 500, 0)).await.unwrap();
        f.repo.save(&record("future", 3_000, 0)).await.unwrap();

        assert_eq!(f.scheduler.run_due_jobs().await.unwrap(), 1);
        assert_eq!(f.repo.get("past").await.unwrap().unwrap().status, JobStatus::Executed);
        assert_eq!(f.repo.get("future").await.unwrap().unwrap().status, JobStatus::Scheduled);

        // Nothing left until the clock moves
        assert_eq!(f.scheduler.run_due_jobs().await.unwrap(), 0);

        f.clock.set(3_000);
        assert_eq!(f.scheduler.run_due_jobs().await.unwrap(), 1);
        assert_eq!(f.repo.get("future").await.unwrap().unwrap().status, JobStatus::Executed);
    }

    #[tokio::test]
    async fn test_priority_orders_due_jobs() {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let log = fired.clone();

        let mut sender = MockCallbackSender::new();
        sender.expect_send().times(3).returning(move |req| {
            log.lock().push(req.job_id.clone());
            CallbackOutcome::Delivered
        });
        let f = fixture(sender, 1);

        f.repo.save(&record("low", 100, 0)).await.unwrap();
        f.repo.save(&record("high", 900, 10)).await.unwrap();
        f.repo.save(&record("early-low", 50, 0)).await.unwrap();

        f.scheduler.run_due_jobs().await.unwrap();
        assert_eq!(*fired.lock(), vec!["high", "early-low", "low"]);
    }

    #[tokio::test]
    async fn test_retrying_job_waits_for_backoff() {
        let mut sender = MockCallbackSender::new();
        sender
            .expect_send()
            .times(1)
            .returning(|_| CallbackOutcome::Failed("connection refused".to_string()));
        let f = fixture(sender, 1);

        f.repo.save(&record("job", 500, 0)).await.unwrap();
        assert_eq!(f.scheduler.run_due_jobs().await.unwrap(), 1);

        let stored = f.repo.get("job").await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Retrying);
        // backoff has not elapsed yet
        assert_eq!(f.scheduler.run_due_jobs().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purge_terminal_after_retention() {
        let f = fixture(MockCallbackSender::new(), 1);

        let mut old = record("old", 0, 0);
        old.mark_executed(1_000).unwrap();
        let mut fresh = record("fresh", 0, 0);
        fresh.mark_executed(5_500).unwrap();
        let pending = record("pending", 99_999, 0);
        for r in [&old, &fresh, &pending] {
            f.repo.save(r).await.unwrap();
        }

        f.clock.set(7_000);
        assert_eq!(f.scheduler.purge_terminal().await.unwrap(), 1);
        assert!(!f.repo.exists("old").await.unwrap());
        assert!(f.repo.exists("fresh").await.unwrap());
        assert!(f.repo.exists("pending").await.unwrap());
    }

    #[test]
    fn test_unreadable_records_are_skipped() {
        let bad: Result<JobRecord> = Err(AppError::Repository("bad row".to_string()));
        assert!(readable(bad, |_| true).is_none());
        assert!(readable(Ok(record("a", 0, 0)), |_| true).is_some());
        assert!(readable(Ok(record("a", 0, 0)), |_| false).is_none());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let f = fixture(MockCallbackSender::new(), 1);
        let (tx, token) = shutdown_channel();
        tx.shutdown();

        let result = tokio::time::timeout(Duration::from_secs(1), f.scheduler.run(token)).await;
        assert!(result.is_ok(), "scheduler should stop promptly");
    }
}
