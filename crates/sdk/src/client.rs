//! Kairos Client Implementation

use crate::error::{Result, SdkError};
use crate::types::ClientConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kairos_core::domain::{
    JobDescriptor, JobRecord, JobStatus, ProcessInstanceJobDescription, ProcessJobDescription,
    TargetKind,
};
use kairos_core::port::id_provider::UuidProvider;
use kairos_core::port::IdProvider;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Caller-side operations of the jobs service
///
/// Each call issues at most one request to the scheduler.
#[async_trait]
pub trait JobsService: Send + Sync {
    /// Schedule a timer on a running process instance; returns the job id
    async fn schedule_process_instance_job(
        &self,
        description: ProcessInstanceJobDescription,
    ) -> Result<String>;

    /// Always `SdkError::NotImplemented`
    async fn schedule_process_job(&self, description: ProcessJobDescription) -> Result<String>;

    /// Best-effort cancel; `true` when the scheduler removed the job
    async fn cancel_job(&self, id: &str) -> bool;

    /// Resolved fire time of a job
    async fn get_scheduled_time(&self, id: &str) -> Result<DateTime<Utc>>;

    /// Jobs known to the scheduler, optionally restricted to `statuses`
    async fn list_jobs(&self, statuses: &[JobStatus]) -> Result<Vec<JobRecord>>;
}

/// Error body returned by the scheduler
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for a Kairos scheduler
pub struct JobsServiceClient {
    http: Client,
    scheduler_url: Url,
    service_url: Url,
    id_provider: Arc<dyn IdProvider>,
}

impl JobsServiceClient {
    /// Build a client; no request is made until the first call
    pub fn new(config: ClientConfig) -> Result<Self> {
        let scheduler_url = Url::parse(&config.scheduler_url)?;
        let service_url = Url::parse(&config.service_url)?;
        for url in [&scheduler_url, &service_url] {
            if url.cannot_be_a_base() {
                return Err(SdkError::InvalidUrl(format!("{} cannot be a base URL", url)));
            }
        }

        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SdkError::Transport(format!("Failed to create client: {}", e)))?;

        Ok(Self {
            http,
            scheduler_url,
            service_url,
            id_provider: Arc::new(UuidProvider),
        })
    }

    /// Replace the generator used for jobs scheduled without an id
    pub fn with_id_provider(mut self, id_provider: Arc<dyn IdProvider>) -> Self {
        self.id_provider = id_provider;
        self
    }

    /// `<service_url>/management/jobs/{process_id}/instances/{process_instance_id}/timers`
    ///
    /// The scheduler appends `/{timer_id}` when it fires.
    pub fn callback_url(&self, process_id: &str, process_instance_id: &str) -> String {
        Self::with_segments(
            &self.service_url,
            &[
                "management",
                "jobs",
                process_id,
                "instances",
                process_instance_id,
                "timers",
            ],
        )
        .to_string()
    }

    fn jobs_url(&self) -> Url {
        Self::with_segments(&self.scheduler_url, &["jobs"])
    }

    fn job_url(&self, id: &str) -> Url {
        Self::with_segments(&self.scheduler_url, &["jobs", id])
    }

    fn with_segments(base: &Url, segments: &[&str]) -> Url {
        let mut url = base.clone();
        // Bases are checked in `new`, so path segments are always available
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Fetch the full record of a job
    pub async fn get_job(&self, id: &str) -> Result<JobRecord> {
        let response = self.http.get(self.job_url(id)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(SdkError::JobNotFound(id.to_string()));
        }
        let response = Self::ensure_success(response).await?;
        Ok(response.json().await?)
    }

    async fn ensure_success(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or(text);
        Err(SdkError::Http {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl JobsService for JobsServiceClient {
    async fn schedule_process_instance_job(
        &self,
        description: ProcessInstanceJobDescription,
    ) -> Result<String> {
        if description.process_id.trim().is_empty() {
            return Err(SdkError::InvalidRequest("process id is required".to_string()));
        }
        if description.process_instance_id.trim().is_empty() {
            return Err(SdkError::InvalidRequest(
                "process instance id is required".to_string(),
            ));
        }

        let id = description
            .id
            .unwrap_or_else(|| self.id_provider.generate_id());
        let callback_url =
            self.callback_url(&description.process_id, &description.process_instance_id);

        let descriptor = JobDescriptor {
            id,
            trigger_time: description.trigger_time,
            target_kind: TargetKind::ProcessInstance,
            process_id: description.process_id,
            process_instance_id: Some(description.process_instance_id),
            priority: description.priority,
            callback_url,
            repeat_limit: description.repeat_limit,
        };

        debug!(job_id = %descriptor.id, "Scheduling process instance job");
        let response = self
            .http
            .post(self.jobs_url())
            .json(&descriptor)
            .send()
            .await?;
        let record: JobRecord = Self::ensure_success(response).await?.json().await?;
        Ok(record.id)
    }

    async fn schedule_process_job(&self, description: ProcessJobDescription) -> Result<String> {
        Err(SdkError::NotImplemented(format!(
            "scheduling a job on process definition '{}' is not supported",
            description.process_id
        )))
    }

    async fn cancel_job(&self, id: &str) -> bool {
        match self.http.delete(self.job_url(id)).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                debug!(job_id = %id, "Cancel: job not found");
                false
            }
            Ok(response) => {
                warn!(job_id = %id, status = %response.status(), "Cancel rejected by scheduler");
                false
            }
            Err(e) => {
                warn!(job_id = %id, error = %e, "Cancel failed");
                false
            }
        }
    }

    async fn get_scheduled_time(&self, id: &str) -> Result<DateTime<Utc>> {
        let record = self.get_job(id).await?;
        DateTime::<Utc>::from_timestamp_millis(record.fire_at).ok_or_else(|| {
            SdkError::InvalidResponse(format!("fire_at {} is out of range", record.fire_at))
        })
    }

    async fn list_jobs(&self, statuses: &[JobStatus]) -> Result<Vec<JobRecord>> {
        let mut url = self.jobs_url();
        if !statuses.is_empty() {
            let joined = statuses
                .iter()
                .map(|status| status.as_str())
                .collect::<Vec<_>>()
                .join(",");
            url.query_pairs_mut().append_pair("status", &joined);
        }

        let response = self.http.get(url).send().await?;
        Ok(Self::ensure_success(response).await?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_core::domain::TriggerTime;
    use kairos_core::port::id_provider::SequentialIdProvider;
    use mockito::Matcher;
    use std::time::Duration;
    use tokio_test::assert_ok;

    const SERVICE_URL: &str = "http://engine.local:8080";

    fn client(scheduler_url: &str) -> JobsServiceClient {
        JobsServiceClient::new(ClientConfig {
            scheduler_url: scheduler_url.to_string(),
            service_url: SERVICE_URL.to_string(),
            request_timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    fn record_json(id: &str, fire_at: i64) -> String {
        let descriptor = JobDescriptor::for_instance(
            id,
            TriggerTime::at(fire_at),
            "loan",
            "pi-1",
            format!("{}/management/jobs/loan/instances/pi-1/timers", SERVICE_URL),
        );
        serde_json::to_string(&JobRecord::schedule(descriptor, 0).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_schedule_then_cancel_issues_one_request_each() {
        let mut server = mockito::Server::new_async().await;
        let post = server
            .mock("POST", "/jobs")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "id": "job-1",
                "target_kind": "PROCESS_INSTANCE",
                "process_id": "loan",
                "process_instance_id": "pi-1",
                "callback_url": "http://engine.local:8080/management/jobs/loan/instances/pi-1/timers"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(record_json("job-1", 60_000))
            .expect(1)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/jobs/job-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(record_json("job-1", 60_000))
            .expect(1)
            .create_async()
            .await;

        let client = client(&server.url());
        let description =
            ProcessInstanceJobDescription::new(TriggerTime::at(60_000), "loan", "pi-1")
                .with_id("job-1");

        let id = client.schedule_process_instance_job(description).await.unwrap();
        assert_eq!(id, "job-1");
        assert!(client.cancel_job(&id).await);

        post.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_generated_id_when_absent() {
        let mut server = mockito::Server::new_async().await;
        let _post = server
            .mock("POST", "/jobs")
            .match_body(Matcher::PartialJson(serde_json::json!({"id": "timer-1"})))
            .with_status(200)
            .with_body(record_json("timer-1", 60_000))
            .create_async()
            .await;

        let client = client(&server.url())
            .with_id_provider(Arc::new(SequentialIdProvider::new("timer")));
        let id = client
            .schedule_process_instance_job(ProcessInstanceJobDescription::new(
                TriggerTime::at(60_000),
                "loan",
                "pi-1",
            ))
            .await
            .unwrap();
        assert_eq!(id, "timer-1");
    }

    #[tokio::test]
    async fn test_get_scheduled_time_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/jobs/123")
            .with_status(404)
            .with_body(r#"{"error":"job not found: 123","code":"JOB_NOT_FOUND"}"#)
            .create_async()
            .await;

        let err = client(&server.url())
            .get_scheduled_time("123")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "job not found for 123");
    }

    #[tokio::test]
    async fn test_get_scheduled_time_returns_fire_at() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/jobs/job-1")
            .with_status(200)
            .with_body(record_json("job-1", 1_700_000_000_000))
            .create_async()
            .await;

        let at = assert_ok!(client(&server.url()).get_scheduled_time("job-1").await);
        assert_eq!(at.timestamp_millis(), 1_700_000_000_000);
    }

    #[tokio::test]
    async fn test_other_failures_are_not_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/jobs/job-1")
            .with_status(503)
            .with_body(r#"{"error":"Repository error: locked","code":"REPOSITORY_ERROR"}"#)
            .create_async()
            .await;

        match client(&server.url()).get_scheduled_time("job-1").await {
            Err(SdkError::Http { status, message }) => {
                assert_eq!(status, 503);
                assert!(message.contains("locked"));
            }
            other => panic!("expected HTTP error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_schedule_process_job_fails_fast() {
        let mut server = mockito::Server::new_async().await;
        let post = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let err = client(&server.url())
            .schedule_process_job(ProcessJobDescription::new(TriggerTime::at(1), "loan"))
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::NotImplemented(_)));
        post.assert_async().await;
    }

    #[tokio::test]
    async fn test_cancel_is_best_effort() {
        let mut server = mockito::Server::new_async().await;
        let _missing = server
            .mock("DELETE", "/jobs/gone")
            .with_status(404)
            .create_async()
            .await;
        assert!(!client(&server.url()).cancel_job("gone").await);

        // Nothing listening
        assert!(!client("http://127.0.0.1:1").cancel_job("job-1").await);
    }

    #[tokio::test]
    async fn test_list_jobs_sends_status_filter() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/jobs")
            .match_query(Matcher::UrlEncoded(
                "status".into(),
                "SCHEDULED,RETRYING".into(),
            ))
            .with_status(200)
            .with_body(format!("[{}]", record_json("job-1", 60_000)))
            .create_async()
            .await;

        let jobs = client(&server.url())
            .list_jobs(&[JobStatus::Scheduled, JobStatus::Retrying])
            .await
            .unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, "job-1");
    }

    #[test]
    fn test_callback_url_encodes_segments() {
        let client = JobsServiceClient::new(ClientConfig {
            service_url: "http://engine.local:8080/app/".to_string(),
            ..ClientConfig::default()
        })
        .unwrap();

        assert_eq!(
            client.callback_url("loan approval", "pi/1"),
            "http://engine.local:8080/app/management/jobs/loan%20approval/instances/pi%2F1/timers"
        );
    }

    #[tokio::test]
    async fn test_blank_instance_id_is_rejected() {
        let client = client("http://127.0.0.1:1");
        let err = client
            .schedule_process_instance_job(ProcessInstanceJobDescription::new(
                TriggerTime::at(1),
                "loan",
                " ",
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::InvalidRequest(_)));
    }

    #[test]
    fn test_invalid_url() {
        let result = JobsServiceClient::new(ClientConfig {
            scheduler_url: "not a url".to_string(),
            ..ClientConfig::default()
        });
        assert!(matches!(result, Err(SdkError::InvalidUrl(_))));
    }
}
