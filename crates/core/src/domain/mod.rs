// Domain Layer - Pure business logic and entities

pub mod description;
pub mod error;
pub mod job;
pub mod timer;
pub mod trigger;

// Re-exports
pub use description::{ProcessInstanceJobDescription, ProcessJobDescription};
pub use error::DomainError;
pub use job::{JobDescriptor, JobId, JobRecord, JobStatus, Priority, TargetKind};
pub use timer::TimerId;
pub use trigger::TriggerTime;
