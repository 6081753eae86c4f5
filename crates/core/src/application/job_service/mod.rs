// Job Service - scheduler-side use cases behind the REST surface

pub mod cancel;
pub mod schedule;

use crate::domain::{JobDescriptor, JobRecord, JobStatus};
use crate::error::{AppError, Result};
use crate::port::{JobRepository, TimeProvider};
use futures::TryStreamExt;
use std::sync::Arc;

pub struct JobService {
    repo: Arc<dyn JobRepository>,
    time_provider: Arc<dyn TimeProvider>,
}

impl JobService {
    pub fn new(repo: Arc<dyn JobRepository>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            repo,
            time_provider,
        }
    }

    /// Create or reschedule a job
    pub async fn schedule(&self, descriptor: JobDescriptor) -> Result<JobRecord> {
        schedule::execute(self.repo.as_ref(), self.time_provider.as_ref(), descriptor).await
    }

    /// Cancel and remove a job, returning the cancelled record
    pub async fn cancel(&self, id: &str) -> Result<JobRecord> {
        cancel::execute(self.repo.as_ref(), self.time_provider.as_ref(), id).await
    }

    pub async fn get(&self, id: &str) -> Result<JobRecord> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| AppError::job_not_found(id))
    }

    /// All jobs, or only those in `statuses` when non-empty
    pub async fn list(&self, statuses: &[JobStatus]) -> Result<Vec<JobRecord>> {
        let stream = if statuses.is_empty() {
            self.repo.find_all().await?
        } else {
            self.repo.find_by_status(statuses).await?
        };
        let mut records: Vec<JobRecord> = stream.try_collect().await?;
        records.sort_by(|a, b| a.fire_at.cmp(&b.fire_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }
}
