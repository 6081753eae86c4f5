// Kairos Infrastructure - SQLite Adapter
// Implements: JobRepository (registry key "sqlite")

mod connection;
mod error;
mod job_repository;
mod migration;

pub use connection::create_pool;
pub use job_repository::{register, SqliteJobRepository, SQLITE};
pub use migration::run_migrations;

// sqlx::Error conversion lives in `error::map_sqlx_error`: orphan rules rule
// out `From<sqlx::Error> for AppError` here
