//! SDK Types
//!
//! Job descriptions and records are shared with the scheduler through
//! kairos-core; this module adds the client configuration.

use std::time::Duration;

pub use kairos_core::domain::{
    JobRecord, JobStatus, ProcessInstanceJobDescription, ProcessJobDescription, TriggerTime,
};

const DEFAULT_SCHEDULER_URL: &str = "http://127.0.0.1:8089";
const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8080";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the scheduler's REST surface
    pub scheduler_url: String,
    /// Externally reachable base URL of this service; callbacks are derived from it
    pub service_url: String,
    /// Bound on every outbound request
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            scheduler_url: DEFAULT_SCHEDULER_URL.to_string(),
            service_url: DEFAULT_SERVICE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}
