//! SDK Error Types

use thiserror::Error;

/// SDK Result type
pub type Result<T> = std::result::Result<T, SdkError>;

/// SDK Error
#[derive(Debug, Error)]
pub enum SdkError {
    /// The scheduler has no job with this id
    #[error("job not found for {0}")]
    JobNotFound(String),

    /// Operation deliberately unsupported by this client
    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx answer other than 404
    #[error("HTTP error ({status}): {message}")]
    Http { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for SdkError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SdkError::Transport(format!("request timed out: {}", e))
        } else if e.is_decode() {
            SdkError::InvalidResponse(e.to_string())
        } else {
            SdkError::Transport(e.to_string())
        }
    }
}

impl From<url::ParseError> for SdkError {
    fn from(e: url::ParseError) -> Self {
        SdkError::InvalidUrl(e.to_string())
    }
}

impl SdkError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SdkError::JobNotFound(_))
    }
}
