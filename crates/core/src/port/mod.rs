// Port Layer - Interfaces for external dependencies

pub mod callback_sender;
pub mod id_provider; // For deterministic testing
pub mod job_repository;
pub mod process_target;
pub mod time_provider;

// Re-exports
pub use callback_sender::{CallbackOutcome, CallbackRequest, CallbackSender};
pub use id_provider::IdProvider;
pub use job_repository::{JobRepository, JobStream};
pub use process_target::{ProcessInstanceTarget, TimerEffect, TimerFired};
pub use time_provider::TimeProvider;
