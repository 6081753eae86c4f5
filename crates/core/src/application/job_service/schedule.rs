// Schedule Use Case

use crate::domain::{JobDescriptor, JobRecord};
use crate::error::{AppError, Result};
use crate::port::{JobRepository, TimeProvider};
use tracing::info;

/// Execute schedule use case
///
/// A new id is stored as SCHEDULED. Re-posting a live id (SCHEDULED, RETRYING
/// or ERROR) reschedules it with a fresh trigger time and zero retries, keeping
/// `created_at`. Re-posting a terminal id is rejected with `InvalidState`, as
/// is a reschedule that loses a race with a concurrent write to the same id.
pub async fn execute(
    repo: &dyn JobRepository,
    time_provider: &dyn TimeProvider,
    descriptor: JobDescriptor,
) -> Result<JobRecord> {
    let now = time_provider.now_millis();

    let saved = match repo.get(&descriptor.id).await? {
        Some(existing) if existing.is_terminal() => {
            return Err(AppError::InvalidState(format!(
                "job {} is already {}",
                existing.id, existing.status
            )));
        }
        Some(existing) => {
            let record = existing.reschedule(descriptor, now)?;
            repo.update(&existing, &record).await?.ok_or_else(|| {
                AppError::InvalidState(format!("job {} changed concurrently", record.id))
            })?
        }
        None => repo.save(&JobRecord::schedule(descriptor, now)?).await?,
    };

    info!(
        job_id = %saved.id,
        process_id = %saved.process_id,
        fire_at = saved.fire_at,
        "Job scheduled"
    );
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::repository::InMemoryJobRepository;
    use crate::domain::{JobStatus, TriggerTime};
    use crate::port::time_provider::ManualTimeProvider;
    use crate::port::JobStream;
    use async_trait::async_trait;
    use tokio_test::assert_ok;

    fn descriptor(id: &str, trigger: TriggerTime) -> JobDescriptor {
        JobDescriptor::for_instance(id, trigger, "loan", "pi-1", "http://app.local/timers")
    }

    #[tokio::test]
    async fn test_schedule_new_job() {
        let repo = InMemoryJobRepository::new();
        let clock = ManualTimeProvider::new(1_000);

        let record = assert_ok!(
            execute(&repo, &clock, descriptor("job-1", TriggerTime::expression("PT30S"))).await
        );
        assert_eq!(record.status, JobStatus::Scheduled);
        assert_eq!(record.fire_at, 31_000);
        assert_eq!(record.created_at, 1_000);
        assert!(repo.exists("job-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_reschedule_live_job() {
        let repo = InMemoryJobRepository::new();
        let clock = ManualTimeProvider::new(1_000);
        execute(&repo, &clock, descriptor("job-1", TriggerTime::at(5_000)))
            .await
            .unwrap();

        let mut stored = repo.get("job-1").await.unwrap().unwrap();
        stored.retries = 1;
        stored.mark_retrying(6_000, "HTTP 500", 5_000).unwrap();
        repo.save(&stored).await.unwrap();

        clock.set(7_000);
        let record = execute(&repo, &clock, descriptor("job-1", TriggerTime::at(9_000)))
            .await
            .unwrap();
        assert_eq!(record.status, JobStatus::Scheduled);
        assert_eq!(record.fire_at, 9_000);
        assert_eq!(record.retries, 0);
        assert_eq!(record.created_at, 1_000);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_terminal_job_is_not_rescheduled() {
        let repo = InMemoryJobRepository::new();
        let clock = ManualTimeProvider::new(1_000);
        let mut record = execute(&repo, &clock, descriptor("job-1", TriggerTime::at(5_000)))
            .await
            .unwrap();
        record.mark_executed(5_000).unwrap();
        repo.save(&record).await.unwrap();

        let err = execute(&repo, &clock, descriptor("job-1", TriggerTime::at(9_000)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_invalid_descriptor_is_rejected() {
        let repo = InMemoryJobRepository::new();
        let clock = ManualTimeProvider::new(1_000);
        let mut bad = descriptor("job-1", TriggerTime::at(5_000));
        bad.process_instance_id = None;

        assert!(execute(&repo, &clock, bad).await.is_err());
        assert!(repo.is_empty());
    }

    /// Serves `get` from a snapshot taken before a concurrent write
    struct StaleReads {
        inner: InMemoryJobRepository,
        snapshot: JobRecord,
    }

    #[async_trait]
    impl JobRepository for StaleReads {
        async fn save(&self, record: &JobRecord) -> Result<JobRecord> {
            self.inner.save(record).await
        }

        async fn get(&self, _id: &str) -> Result<Option<JobRecord>> {
            Ok(Some(self.snapshot.clone()))
        }

        async fn update(
            &self,
            expected: &JobRecord,
            record: &JobRecord,
        ) -> Result<Option<JobRecord>> {
            self.inner.update(expected, record).await
        }

        async fn exists(&self, id: &str) -> Result<bool> {
            self.inner.exists(id).await
        }

        async fn delete(&self, id: &str) -> Result<Option<JobRecord>> {
            self.inner.delete(id).await
        }

        async fn find_all(&self) -> Result<JobStream> {
            self.inner.find_all().await
        }
    }

    #[tokio::test]
    async fn test_reschedule_loses_to_concurrent_write() {
        let inner = InMemoryJobRepository::new();
        let clock = ManualTimeProvider::new(1_000);
        let snapshot = execute(&inner, &clock, descriptor("job-1", TriggerTime::at(5_000)))
            .await
            .unwrap();

        // An invoker persisted a retry after the snapshot was read
        let mut retrying = snapshot.clone();
        retrying.retries = 1;
        retrying.mark_retrying(8_000, "HTTP 503", 5_000).unwrap();
        inner.save(&retrying).await.unwrap();

        let repo = StaleReads { inner, snapshot };
        clock.set(6_000);
        let err = execute(&repo, &clock, descriptor("job-1", TriggerTime::at(9_000)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(repo.inner.get("job-1").await.unwrap(), Some(retrying));
    }
}
