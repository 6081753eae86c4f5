// Central Error Type for the Application

use thiserror::Error;

/// What kind of entity a not-found error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundKind {
    Job,
    Process,
    ProcessInstance,
}

impl std::fmt::Display for NotFoundKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotFoundKind::Job => write!(f, "job"),
            NotFoundKind::Process => write!(f, "process"),
            NotFoundKind::ProcessInstance => write!(f, "process instance"),
        }
    }
}

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: NotFoundKind, id: String },

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn job_not_found(id: impl Into<String>) -> Self {
        AppError::NotFound {
            kind: NotFoundKind::Job,
            id: id.into(),
        }
    }

    pub fn process_not_found(id: impl Into<String>) -> Self {
        AppError::NotFound {
            kind: NotFoundKind::Process,
            id: id.into(),
        }
    }

    pub fn instance_not_found(id: impl Into<String>) -> Self {
        AppError::NotFound {
            kind: NotFoundKind::ProcessInstance,
            id: id.into(),
        }
    }

    /// Returns the entity kind when this is a not-found error
    pub fn not_found_kind(&self) -> Option<NotFoundKind> {
        match self {
            AppError::NotFound { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error and reqwest::Error conversions live in the adapter crates
// (orphan rules), mapped to AppError::Repository / AppError::Transport
