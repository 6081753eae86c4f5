// In-memory JobRepository (default backend)

use crate::domain::JobRecord;
use crate::error::{AppError, Result};
use crate::port::{JobRepository, JobStream};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};

/// Key-value map from job id to record. No persistence across restarts.
#[derive(Default)]
pub struct InMemoryJobRepository {
    jobs: DashMap<String, JobRecord>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn save(&self, record: &JobRecord) -> Result<JobRecord> {
        self.jobs.insert(record.id.clone(), record.clone());
        Ok(record.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<JobRecord>> {
        Ok(self.jobs.get(id).map(|entry| entry.value().clone()))
    }

    async fn update(&self, expected: &JobRecord, record: &JobRecord) -> Result<Option<JobRecord>> {
        if record.id != expected.id {
            return Err(AppError::Internal(format!(
                "update of {} cannot change its id to {}",
                expected.id, record.id
            )));
        }
        // The shard stays write-locked between the comparison and the swap
        match self.jobs.get_mut(&expected.id) {
            Some(mut entry) if *entry.value() == *expected => {
                *entry.value_mut() = record.clone();
                Ok(Some(record.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.jobs.contains_key(id))
    }

    async fn delete(&self, id: &str) -> Result<Option<JobRecord>> {
        Ok(self.jobs.remove(id).map(|(_, record)| record))
    }

    async fn find_all(&self) -> Result<JobStream> {
        let snapshot: Vec<Result<JobRecord>> = self
            .jobs
            .iter()
            .map(|entry| Ok(entry.value().clone()))
            .collect();
        Ok(stream::iter(snapshot).boxed())
    }
}
