// reqwest CallbackSender

use async_trait::async_trait;
use kairos_core::error::{AppError, Result};
use kairos_core::port::{CallbackOutcome, CallbackRequest, CallbackSender};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Diagnostic body sent along with the callback; receivers route on the URL
#[derive(Debug, Serialize)]
struct CallbackBody<'a> {
    job_id: &'a str,
    process_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    process_instance_id: Option<&'a str>,
    timer_id: String,
}

/// POSTs `<callback_url>/<timer_id>?limit=<n>` with a bounded timeout
pub struct HttpCallbackSender {
    client: Client,
}

impl HttpCallbackSender {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Callback URL with the timer id appended as a path segment
    pub fn target_url(request: &CallbackRequest) -> Result<Url> {
        let mut url = Url::parse(&request.callback_url).map_err(|e| {
            AppError::Validation(format!("invalid callback url '{}': {}", request.callback_url, e))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                AppError::Validation(format!(
                    "callback url '{}' cannot take a path",
                    request.callback_url
                ))
            })?
            .pop_if_empty()
            .push(&request.timer_id.to_string());

        if let Some(limit) = request.limit {
            url.query_pairs_mut()
                .append_pair("limit", &limit.to_string());
        }
        Ok(url)
    }
}

#[async_trait]
impl CallbackSender for HttpCallbackSender {
    async fn send(&self, request: &CallbackRequest) -> CallbackOutcome {
        let url = match Self::target_url(request) {
            Ok(url) => url,
            Err(e) => return CallbackOutcome::Failed(e.to_string()),
        };

        let body = CallbackBody {
            job_id: &request.job_id,
            process_id: &request.process_id,
            process_instance_id: request.process_instance_id.as_deref(),
            timer_id: request.timer_id.to_string(),
        };

        debug!(job_id = %request.job_id, url = %url, "POST callback");
        match self.client.post(url).json(&body).send().await {
            Ok(response) if response.status().is_success() => CallbackOutcome::Delivered,
            Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                CallbackOutcome::TargetNotFound
            }
            Ok(response) => CallbackOutcome::Failed(format!("HTTP {}", response.status())),
            Err(e) if e.is_timeout() => CallbackOutcome::Failed(format!("timed out: {}", e)),
            Err(e) => CallbackOutcome::Failed(e.to_string()),
        }
    }
}
