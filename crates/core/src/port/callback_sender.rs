// Callback Sender Port
// Abstraction for delivering a fired timer to the owning application

use crate::domain::TimerId;
use async_trait::async_trait;

/// Everything needed to compose the callback request for one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackRequest {
    pub job_id: String,
    /// Base callback URL from the job record; the sender appends `/{timer_id}`
    pub callback_url: String,
    pub process_id: String,
    pub process_instance_id: Option<String>,
    pub timer_id: TimerId,
    pub limit: Option<u32>,
}

/// Result of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// 2xx
    Delivered,
    /// 404: the target process or instance is gone (not retried)
    TargetNotFound,
    /// Timeout, connection error, 5xx or any other non-2xx
    Failed(String),
}

/// Delivery transport
///
/// Implementations:
/// - HttpCallbackSender (infra-http): reqwest with a bounded timeout
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CallbackSender: Send + Sync {
    async fn send(&self, request: &CallbackRequest) -> CallbackOutcome;
}
