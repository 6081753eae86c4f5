// Cancel Use Case

use crate::domain::{JobRecord, JobStatus};
use crate::error::{AppError, Result};
use crate::port::{JobRepository, TimeProvider};
use tracing::info;

/// Execute cancel use case
///
/// Marks the record CANCELED (when its status allows it) and removes it from
/// the store. A second cancel for the same id reports `NotFound`.
pub async fn execute(
    repo: &dyn JobRepository,
    time_provider: &dyn TimeProvider,
    id: &str,
) -> Result<JobRecord> {
    let mut record = repo
        .delete(id)
        .await?
        .ok_or_else(|| AppError::job_not_found(id))?;

    if record.status != JobStatus::Executed && record.status != JobStatus::Canceled {
        record.cancel(time_provider.now_millis())?;
    }

    info!(job_id = %record.id, status = %record.status, "Job cancelled");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::repository::InMemoryJobRepository;
    use crate::domain::{JobDescriptor, TriggerTime};
    use crate::error::NotFoundKind;
    use crate::port::time_provider::ManualTimeProvider;

    async fn seeded() -> InMemoryJobRepository {
        let repo = InMemoryJobRepository::new();
        let descriptor = JobDescriptor::for_instance(
            "job-1",
            TriggerTime::at(5_000),
            "loan",
            "pi-1",
            "http://app.local/timers",
        );
        repo.save(&JobRecord::schedule(descriptor, 0).unwrap())
            .await
            .unwrap();
        repo
    }

    #[tokio::test]
    async fn test_cancel_marks_and_removes() {
        let repo = seeded().await;
        let clock = ManualTimeProvider::new(2_000);

        let record = execute(&repo, &clock, "job-1").await.unwrap();
        assert_eq!(record.status, JobStatus::Canceled);
        assert_eq!(record.updated_at, 2_000);
        assert!(!repo.exists("job-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_second_cancel_is_not_found() {
        let repo = seeded().await;
        let clock = ManualTimeProvider::new(2_000);

        execute(&repo, &clock, "job-1").await.unwrap();
        let err = execute(&repo, &clock, "job-1").await.unwrap_err();
        assert_eq!(err.not_found_kind(), Some(NotFoundKind::Job));
    }
}
