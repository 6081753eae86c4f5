// Job Repository Port (Interface)

use crate::domain::{JobRecord, JobStatus};
use crate::error::Result;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};

/// Lazy, finite sequence of records; each call to `find_*` yields a fresh snapshot
pub type JobStream = BoxStream<'static, Result<JobRecord>>;

/// Storage and query contract for job records, keyed by `JobRecord::id`
///
/// Implementations must not block the calling thread. Each operation is a
/// single atomic store operation: a record is never observed half-updated.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Upsert by id (idempotent)
    async fn save(&self, record: &JobRecord) -> Result<JobRecord>;

    /// Find record by id; `None` on miss
    async fn get(&self, id: &str) -> Result<Option<JobRecord>>;

    /// Replace the stored record with `record` only while it still equals
    /// `expected`. Never inserts.
    ///
    /// `None` when the record is gone or was changed since `expected` was read.
    async fn update(&self, expected: &JobRecord, record: &JobRecord) -> Result<Option<JobRecord>>;

    async fn exists(&self, id: &str) -> Result<bool>;

    /// Remove and return the prior value
    async fn delete(&self, id: &str) -> Result<Option<JobRecord>>;

    /// Every stored record, unordered
    async fn find_all(&self) -> Result<JobStream>;

    /// Records whose status is in `statuses`
    ///
    /// Default implementation filters `find_all`; backends with an index on
    /// status should override it.
    async fn find_by_status(&self, statuses: &[JobStatus]) -> Result<JobStream> {
        let wanted = statuses.to_vec();
        let all = self.find_all().await?;
        Ok(all
            .filter(move |item| {
                let keep = match item {
                    Ok(record) => wanted.contains(&record.status),
                    Err(_) => true,
                };
                futures::future::ready(keep)
            })
            .boxed())
    }
}
