// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid job state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Invalid trigger time: {0}")]
    InvalidTriggerTime(String),

    #[error("Invalid timer id '{0}': expected <prefix>_<timestamp>")]
    InvalidTimerId(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
