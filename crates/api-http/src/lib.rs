//! HTTP API Layer
//!
//! Two routers built on axum:
//! - `scheduler::router`: the jobs REST surface served by the scheduler daemon
//! - `callback::router`: the timer endpoint an owning application exposes

pub mod callback;
pub mod error;
pub mod scheduler;

pub use callback::CallbackState;
pub use error::ApiError;
pub use scheduler::SchedulerState;
