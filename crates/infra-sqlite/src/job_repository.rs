// SQLite JobRepository Implementation

use crate::error::map_sqlx_error;
use crate::{create_pool, run_migrations};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use kairos_core::application::RepositoryRegistry;
use kairos_core::domain::{JobRecord, JobStatus, TargetKind, TriggerTime};
use kairos_core::error::{AppError, Result};
use kairos_core::port::{JobRepository, JobStream};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::warn;

/// Registry key of the sqlite backend
pub const SQLITE: &str = "sqlite";

/// Register the sqlite backend; it opens `repository.sqlite_path` and migrates it
pub fn register(registry: &mut RepositoryRegistry) {
    registry.register(SQLITE, |config| async move {
        let path = config.sqlite_path.ok_or_else(|| {
            AppError::Config("repository.sqlite_path is required for kind 'sqlite'".to_string())
        })?;
        let pool = create_pool(&path).await?;
        run_migrations(&pool).await?;
        let repo: Arc<dyn JobRepository> = Arc::new(SqliteJobRepository::new(pool));
        Ok(repo)
    });
}

pub struct SqliteJobRepository {
    pool: SqlitePool,
}

impl SqliteJobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Convert fetched rows. Rows without a recognised status are left out;
    /// any other decode failure is yielded as an error item.
    fn snapshot(rows: Vec<JobRow>) -> JobStream {
        let records: Vec<Result<JobRecord>> = rows
            .into_iter()
            .filter(|row| match row.status() {
                Some(Ok(_)) => true,
                Some(Err(e)) => {
                    warn!(job_id = %row.id, error = %e, "Skipping job row with unknown status");
                    false
                }
                None => false,
            })
            .map(JobRow::into_record)
            .collect();
        stream::iter(records).boxed()
    }
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    async fn save(&self, record: &JobRecord) -> Result<JobRecord> {
        let trigger_time = serde_json::to_string(&record.trigger_time)?;

        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, trigger_time, target_kind, process_id, process_instance_id,
                priority, callback_url, repeat_limit,
                fire_at, next_attempt_at, status, retries, last_error,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                trigger_time = excluded.trigger_time,
                target_kind = excluded.target_kind,
                process_id = excluded.process_id,
                process_instance_id = excluded.process_instance_id,
                priority = excluded.priority,
                callback_url = excluded.callback_url,
                repeat_limit = excluded.repeat_limit,
                fire_at = excluded.fire_at,
                next_attempt_at = excluded.next_attempt_at,
                status = excluded.status,
                retries = excluded.retries,
                last_error = excluded.last_error,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&record.id)
        .bind(&trigger_time)
        .bind(record.target_kind.to_string())
        .bind(&record.process_id)
        .bind(&record.process_instance_id)
        .bind(record.priority)
        .bind(&record.callback_url)
        .bind(record.repeat_limit.map(i64::from))
        .bind(record.fire_at)
        .bind(record.next_attempt_at)
        .bind(record.status.as_str())
        .bind(record.retries)
        .bind(&record.last_error)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(record.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<JobRecord>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(JobRow::into_record).transpose()
    }

    async fn update(&self, expected: &JobRecord, record: &JobRecord) -> Result<Option<JobRecord>> {
        if record.id != expected.id {
            return Err(AppError::Internal(format!(
                "update of {} cannot change its id to {}",
                expected.id, record.id
            )));
        }
        let trigger_time = serde_json::to_string(&record.trigger_time)?;
        let expected_trigger_time = serde_json::to_string(&expected.trigger_time)?;

        // Nullable columns compare with `IS` so NULL matches NULL
        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                trigger_time = ?, target_kind = ?, process_id = ?, process_instance_id = ?,
                priority = ?, callback_url = ?, repeat_limit = ?,
                fire_at = ?, next_attempt_at = ?, status = ?, retries = ?, last_error = ?,
                created_at = ?, updated_at = ?
            WHERE id = ?
                AND trigger_time = ? AND target_kind = ? AND process_id = ?
                AND process_instance_id IS ? AND priority = ? AND callback_url = ?
                AND repeat_limit IS ? AND fire_at = ? AND next_attempt_at = ?
                AND status = ? AND retries = ? AND last_error IS ?
                AND created_at = ? AND updated_at = ?
            "#,
        )
        .bind(&trigger_time)
        .bind(record.target_kind.to_string())
        .bind(&record.process_id)
        .bind(&record.process_instance_id)
        .bind(record.priority)
        .bind(&record.callback_url)
        .bind(record.repeat_limit.map(i64::from))
        .bind(record.fire_at)
        .bind(record.next_attempt_at)
        .bind(record.status.as_str())
        .bind(record.retries)
        .bind(&record.last_error)
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(&expected.id)
        .bind(&expected_trigger_time)
        .bind(expected.target_kind.to_string())
        .bind(&expected.process_id)
        .bind(&expected.process_instance_id)
        .bind(expected.priority)
        .bind(&expected.callback_url)
        .bind(expected.repeat_limit.map(i64::from))
        .bind(expected.fire_at)
        .bind(expected.next_attempt_at)
        .bind(expected.status.as_str())
        .bind(expected.retries)
        .bind(&expected.last_error)
        .bind(expected.created_at)
        .bind(expected.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(record.clone()))
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(count > 0)
    }

    async fn delete(&self, id: &str) -> Result<Option<JobRecord>> {
        let row = sqlx::query_as::<_, JobRow>("DELETE FROM jobs WHERE id = ? RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(JobRow::into_record).transpose()
    }

    async fn find_all(&self) -> Result<JobStream> {
        let rows: Vec<JobRow> = sqlx::query_as("SELECT * FROM jobs")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(Self::snapshot(rows))
    }

    async fn find_by_status(&self, statuses: &[JobStatus]) -> Result<JobStream> {
        if statuses.is_empty() {
            return Ok(stream::empty().boxed());
        }

        // `IN` never matches NULL, so rows without a status are excluded
        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!("SELECT * FROM jobs WHERE status IN ({})", placeholders);

        let mut query = sqlx::query_as::<_, JobRow>(&sql);
        for status in statuses {
            query = query.bind(status.as_str());
        }
        let rows = query.fetch_all(&self.pool).await.map_err(map_sqlx_error)?;

        Ok(Self::snapshot(rows))
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    trigger_time: String,
    target_kind: String,
    process_id: String,
    process_instance_id: Option<String>,
    priority: i32,
    callback_url: String,
    repeat_limit: Option<i64>,
    fire_at: i64,
    next_attempt_at: i64,
    status: Option<String>,
    retries: i32,
    last_error: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl JobRow {
    fn status(&self) -> Option<Result<JobStatus>> {
        self.status
            .as_deref()
            .map(|status| status.parse::<JobStatus>().map_err(AppError::from))
    }

    fn into_record(self) -> Result<JobRecord> {
        let status = self
            .status()
            .ok_or_else(|| AppError::Repository(format!("job {} has no status", self.id)))??;

        let target_kind = match self.target_kind.as_str() {
            "PROCESS" => TargetKind::Process,
            "PROCESS_INSTANCE" => TargetKind::ProcessInstance,
            other => {
                return Err(AppError::Repository(format!(
                    "job {} has unknown target kind '{}'",
                    self.id, other
                )))
            }
        };

        let trigger_time: TriggerTime = serde_json::from_str(&self.trigger_time).map_err(|e| {
            AppError::Repository(format!("job {} has invalid trigger_time: {}", self.id, e))
        })?;

        let repeat_limit = self
            .repeat_limit
            .map(u32::try_from)
            .transpose()
            .map_err(|_| AppError::Repository(format!("job {} has invalid repeat_limit", self.id)))?;

        Ok(JobRecord {
            id: self.id,
            trigger_time,
            target_kind,
            process_id: self.process_id,
            process_instance_id: self.process_instance_id,
            priority: self.priority,
            callback_url: self.callback_url,
            repeat_limit,
            fire_at: self.fire_at,
            next_attempt_at: self.next_attempt_at,
            status,
            retries: self.retries,
            last_error: self.last_error,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use kairos_core::application::{JobRepositoryRouter, RepositoryConfig};
    use kairos_core::domain::JobDescriptor;

    async fn setup_test_db() -> SqliteJobRepository {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteJobRepository::new(pool)
    }

    fn record(id: &str, instance: &str) -> JobRecord {
        let mut descriptor = JobDescriptor::for_instance(
            id,
            TriggerTime::expression("PT30S"),
            "loan",
            instance,
            "http://app.local/timers",
        );
        descriptor.repeat_limit = Some(2);
        JobRecord::schedule(descriptor, 1_000).unwrap()
    }

    async fn ids(stream: JobStream) -> Vec<String> {
        let mut ids: Vec<String> = stream
            .map_ok(|record| record.id)
            .try_collect()
            .await
            .unwrap();
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let repo = setup_test_db().await;
        let job = record("job-1", "pi-1");

        repo.save(&job).await.unwrap();

        let found = repo.get("job-1").await.unwrap().unwrap();
        assert_eq!(found, job);
        assert_eq!(found.process_instance_id.as_deref(), Some("pi-1"));
        assert_eq!(found.trigger_time, TriggerTime::expression("PT30S"));
        assert!(repo.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_upserts() {
        let repo = setup_test_db().await;
        let mut job = record("job-1", "pi-1");
        repo.save(&job).await.unwrap();

        job.retries = 1;
        job.mark_retrying(40_000, "HTTP 503", 31_000).unwrap();
        repo.save(&job).await.unwrap();

        let found = repo.get("job-1").await.unwrap().unwrap();
        assert_eq!(found.status, JobStatus::Retrying);
        assert_eq!(found.last_error.as_deref(), Some("HTTP 503"));
        assert_eq!(ids(repo.find_all().await.unwrap()).await, vec!["job-1"]);
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let repo = setup_test_db().await;
        repo.save(&record("job-1", "pi-1")).await.unwrap();

        let first = repo.delete("job-1").await.unwrap();
        assert_eq!(first.map(|r| r.id).as_deref(), Some("job-1"));
        assert!(repo.delete("job-1").await.unwrap().is_none());
        assert!(!repo.exists("job-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_find_by_status_subset() {
        let repo = setup_test_db().await;

        let scheduled = record("scheduled", "pi-1");
        let mut executed = record("executed", "pi-2");
        executed.mark_executed(31_000).unwrap();
        let mut errored = record("errored", "pi-3");
        errored.mark_error("target not found", 31_000).unwrap();
        for job in [&scheduled, &executed, &errored] {
            repo.save(job).await.unwrap();
        }

        let found = repo.find_by_status(&[JobStatus::Executed]).await.unwrap();
        assert_eq!(ids(found).await, vec!["executed"]);

        let pending = repo
            .find_by_status(&[JobStatus::Scheduled, JobStatus::Error])
            .await
            .unwrap();
        assert_eq!(ids(pending).await, vec!["errored", "scheduled"]);

        assert!(ids(repo.find_by_status(&[]).await.unwrap()).await.is_empty());
    }

    #[tokio::test]
    async fn test_null_status_rows_are_excluded() {
        let repo = setup_test_db().await;
        repo.save(&record("job-1", "pi-1")).await.unwrap();
        repo.save(&record("job-2", "pi-2")).await.unwrap();

        sqlx::query("UPDATE jobs SET status = NULL WHERE id = 'job-2'")
            .execute(&repo.pool)
            .await
            .unwrap();

        let found = repo
            .find_by_status(&JobStatus::ALL)
            .await
            .unwrap();
        assert_eq!(ids(found).await, vec!["job-1"]);
        assert_eq!(ids(repo.find_all().await.unwrap()).await, vec!["job-1"]);
    }

    #[tokio::test]
    async fn test_unknown_status_rows_are_excluded() {
        let repo = setup_test_db().await;
        repo.save(&record("job-1", "pi-1")).await.unwrap();
        repo.save(&record("job-2", "pi-2")).await.unwrap();

        sqlx::query("UPDATE jobs SET status = 'PAUSED' WHERE id = 'job-2'")
            .execute(&repo.pool)
            .await
            .unwrap();

        assert_eq!(ids(repo.find_all().await.unwrap()).await, vec!["job-1"]);
    }

    #[tokio::test]
    async fn test_corrupt_rows_surface_as_errors() {
        let repo = setup_test_db().await;
        repo.save(&record("job-1", "pi-1")).await.unwrap();
        repo.save(&record("job-2", "pi-2")).await.unwrap();

        sqlx::query("UPDATE jobs SET trigger_time = 'not json' WHERE id = 'job-2'")
            .execute(&repo.pool)
            .await
            .unwrap();

        let items: Vec<Result<JobRecord>> = repo
            .find_by_status(&[JobStatus::Scheduled])
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(items.len(), 2);
        assert_eq!(items.iter().filter(|item| item.is_ok()).count(), 1);
        assert!(items.iter().any(|item| matches!(item, Err(AppError::Repository(_)))));
    }

    #[tokio::test]
    async fn test_update_only_replaces_unchanged_row() {
        let repo = setup_test_db().await;
        let original = record("job-1", "pi-1");
        repo.save(&original).await.unwrap();

        let mut fired = original.clone();
        fired.retries = 1;
        fired.mark_executed(31_000).unwrap();
        assert_eq!(repo.update(&original, &fired).await.unwrap(), Some(fired.clone()));

        let mut stale = original.clone();
        stale.mark_error("HTTP 404", 31_500).unwrap();
        assert!(repo.update(&original, &stale).await.unwrap().is_none());
        assert_eq!(repo.get("job-1").await.unwrap(), Some(fired));
    }

    #[tokio::test]
    async fn test_update_after_delete_does_not_insert() {
        let repo = setup_test_db().await;
        let original = record("job-1", "pi-1");
        repo.save(&original).await.unwrap();
        repo.delete("job-1").await.unwrap();

        let mut fired = original.clone();
        fired.mark_executed(31_000).unwrap();
        assert!(repo.update(&original, &fired).await.unwrap().is_none());
        assert!(!repo.exists("job-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_find_all_is_restartable() {
        let repo = setup_test_db().await;
        repo.save(&record("job-1", "pi-1")).await.unwrap();

        let first = ids(repo.find_all().await.unwrap()).await;
        repo.save(&record("job-2", "pi-2")).await.unwrap();
        let second = ids(repo.find_all().await.unwrap()).await;

        assert_eq!(first, vec!["job-1"]);
        assert_eq!(second, vec!["job-1", "job-2"]);
    }

    #[tokio::test]
    async fn test_registered_backend_is_selectable() {
        let mut registry = RepositoryRegistry::with_defaults();
        register(&mut registry);

        let config = RepositoryConfig {
            kind: SQLITE.to_string(),
            sqlite_path: Some("sqlite::memory:".to_string()),
        };
        let router = JobRepositoryRouter::select(&registry, &config).await.unwrap();
        assert_eq!(router.kind(), SQLITE);

        router.save(&record("job-1", "pi-1")).await.unwrap();
        assert!(router.exists("job-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_path_is_config_error() {
        let mut registry = RepositoryRegistry::with_defaults();
        register(&mut registry);

        let config = RepositoryConfig {
            kind: SQLITE.to_string(),
            sqlite_path: None,
        };
        let err = JobRepositoryRouter::select(&registry, &config)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::Config(_)));
    }
}
