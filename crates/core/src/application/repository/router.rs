// Repository selection: one backend chosen at startup, every call forwarded

use super::in_memory::InMemoryJobRepository;
use crate::domain::{JobRecord, JobStatus};
use crate::error::{AppError, Result};
use crate::port::{JobRepository, JobStream};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

/// Key of the bundled in-memory backend
pub const IN_MEMORY: &str = "in-memory";

/// Backend selection settings
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryConfig {
    /// Registry key of the backend (e.g. "in-memory", "sqlite")
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Database location for the sqlite backend
    #[serde(default)]
    pub sqlite_path: Option<String>,
}

fn default_kind() -> String {
    IN_MEMORY.to_string()
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            sqlite_path: None,
        }
    }
}

type RepositoryFactory = Arc<
    dyn Fn(RepositoryConfig) -> BoxFuture<'static, Result<Arc<dyn JobRepository>>> + Send + Sync,
>;

/// Maps a configuration key to a backend factory
pub struct RepositoryRegistry {
    factories: BTreeMap<String, RepositoryFactory>,
}

impl RepositoryRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with the in-memory backend under `"in-memory"`
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(IN_MEMORY, |_config| async {
            let repo: Arc<dyn JobRepository> = Arc::new(InMemoryJobRepository::new());
            Ok(repo)
        });
        registry
    }

    /// Register (or replace) a backend factory
    pub fn register<F, Fut>(&mut self, key: impl Into<String>, factory: F)
    where
        F: Fn(RepositoryConfig) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn JobRepository>>> + Send + 'static,
    {
        let factory: RepositoryFactory = Arc::new(move |config| factory(config).boxed());
        self.factories.insert(key.into(), factory);
    }

    pub fn keys(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl Default for RepositoryRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// The single repository every caller depends on
pub struct JobRepositoryRouter {
    kind: String,
    inner: Arc<dyn JobRepository>,
}

impl JobRepositoryRouter {
    /// Resolve `config.kind` against the registry (called once at startup)
    pub async fn select(registry: &RepositoryRegistry, config: &RepositoryConfig) -> Result<Self> {
        let factory = registry.factories.get(&config.kind).ok_or_else(|| {
            AppError::Config(format!(
                "unknown repository kind '{}' (known: {})",
                config.kind,
                registry.keys().join(", ")
            ))
        })?;

        let inner = factory(config.clone()).await?;
        info!(kind = %config.kind, "Job repository selected");

        Ok(Self {
            kind: config.kind.clone(),
            inner,
        })
    }

    /// Wrap an already-built repository
    pub fn new(kind: impl Into<String>, inner: Arc<dyn JobRepository>) -> Self {
        Self {
            kind: kind.into(),
            inner,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }
}

#[async_trait]
impl JobRepository for JobRepositoryRouter {
    async fn save(&self, record: &JobRecord) -> Result<JobRecord> {
        self.inner.save(record).await
    }

    async fn get(&self, id: &str) -> Result<Option<JobRecord>> {
        self.inner.get(id).await
    }

    async fn update(&self, expected: &JobRecord, record: &JobRecord) -> Result<Option<JobRecord>> {
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

    async fn find_by_status(&self, statuses: &[JobStatus]) -> Result<JobStream> {
        self.inner.find_by_status(statuses).await
    }
}
