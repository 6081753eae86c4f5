// Application Layer - Use Cases and Business Logic

pub mod callback;
pub mod constants;
pub mod job_service;
pub mod lock;
pub mod process_instances;
pub mod repository;
pub mod retry;
pub mod scheduler;
pub mod shutdown;

// Re-exports
pub use callback::CallbackInvoker;
pub use job_service::JobService;
pub use lock::{
    current_entity, ContextualLockStrategy, EntityLockStrategy, ReferenceCountedLockStrategy,
};
pub use process_instances::InMemoryProcessInstances;
pub use repository::{
    InMemoryJobRepository, JobRepositoryRouter, RepositoryConfig, RepositoryRegistry,
};
pub use retry::{RetryConfig, RetryPolicy};
pub use scheduler::{SchedulerConfig, TimerScheduler};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
