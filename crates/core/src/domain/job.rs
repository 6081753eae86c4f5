// Job Domain Model

use super::error::{DomainError, Result};
use super::timer::TimerId;
use super::trigger::TriggerTime;
use serde::{Deserialize, Serialize};

/// Job ID (caller-supplied or UUID v4)
pub type JobId = String;

/// Priority (advisory; higher number = fired first when several are due)
pub type Priority = i32;

/// Job Status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Scheduled,
    Retrying,
    Executed,
    Canceled,
    Error,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Scheduled,
        JobStatus::Retrying,
        JobStatus::Executed,
        JobStatus::Canceled,
        JobStatus::Error,
    ];

    /// EXECUTED and CANCELED accept no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Executed | JobStatus::Canceled)
    }

    /// Waiting for a (first or repeated) callback attempt
    pub fn is_pending(self) -> bool {
        matches!(self, JobStatus::Scheduled | JobStatus::Retrying)
    }

    fn can_transition_to(self, to: JobStatus) -> bool {
        match self {
            JobStatus::Scheduled | JobStatus::Retrying => matches!(
                to,
                JobStatus::Executed | JobStatus::Retrying | JobStatus::Error | JobStatus::Canceled
            ),
            JobStatus::Error => to == JobStatus::Canceled,
            JobStatus::Executed | JobStatus::Canceled => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Scheduled => "SCHEDULED",
            JobStatus::Retrying => "RETRYING",
            JobStatus::Executed => "EXECUTED",
            JobStatus::Canceled => "CANCELED",
            JobStatus::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::ValidationError(format!("unknown job status: {}", s)))
    }
}

/// What the job is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetKind {
    /// A process definition (not yet instantiated)
    Process,
    /// A running process instance
    ProcessInstance,
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetKind::Process => write!(f, "PROCESS"),
            TargetKind::ProcessInstance => write!(f, "PROCESS_INSTANCE"),
        }
    }
}

/// Immutable description of what to run and when (wire format of `POST /jobs`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub id: JobId,
    pub trigger_time: TriggerTime,
    pub target_kind: TargetKind,
    pub process_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_instance_id: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    pub callback_url: String,
    /// Forwarded as `limit` on the callback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_limit: Option<u32>,
}

impl JobDescriptor {
    /// Descriptor for a job bound to a running process instance
    pub fn for_instance(
        id: impl Into<String>,
        trigger_time: TriggerTime,
        process_id: impl Into<String>,
        process_instance_id: impl Into<String>,
        callback_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            trigger_time,
            target_kind: TargetKind::ProcessInstance,
            process_id: process_id.into(),
            process_instance_id: Some(process_instance_id.into()),
            priority: 0,
            callback_url: callback_url.into(),
            repeat_limit: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(DomainError::ValidationError("job id must not be empty".into()));
        }
        if self.process_id.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "process_id must not be empty".into(),
            ));
        }
        if self.target_kind == TargetKind::ProcessInstance
            && self
                .process_instance_id
                .as_deref()
                .map_or(true, |id| id.trim().is_empty())
        {
            return Err(DomainError::ValidationError(
                "process_instance_id is required for PROCESS_INSTANCE jobs".into(),
            ));
        }
        if !(self.callback_url.starts_with("http://") || self.callback_url.starts_with("https://"))
        {
            return Err(DomainError::ValidationError(format!(
                "callback_url must be an absolute http(s) URL: '{}'",
                self.callback_url
            )));
        }
        Ok(())
    }
}

/// Persisted record tracking a descriptor through its lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    // Descriptor fields
    pub id: JobId,
    pub trigger_time: TriggerTime,
    pub target_kind: TargetKind,
    pub process_id: String,
    pub process_instance_id: Option<String>,
    pub priority: Priority,
    pub callback_url: String,
    pub repeat_limit: Option<u32>,

    // Lifecycle
    pub fire_at: i64,         // epoch ms, resolved trigger instant
    pub next_attempt_at: i64, // epoch ms
    pub status: JobStatus,
    pub retries: i32,
    pub last_error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl JobRecord {
    /// Validate a descriptor and resolve its trigger time into a new SCHEDULED record
    pub fn schedule(descriptor: JobDescriptor, now_millis: i64) -> Result<Self> {
        descriptor.validate()?;
        let fire_at = descriptor.trigger_time.resolve(now_millis)?;

        Ok(Self {
            id: descriptor.id,
            trigger_time: descriptor.trigger_time,
            target_kind: descriptor.target_kind,
            process_id: descriptor.process_id,
            process_instance_id: descriptor.process_instance_id,
            priority: descriptor.priority,
            callback_url: descriptor.callback_url,
            repeat_limit: descriptor.repeat_limit,
            fire_at,
            next_attempt_at: fire_at,
            status: JobStatus::Scheduled,
            retries: 0,
            last_error: None,
            created_at: now_millis,
            updated_at: now_millis,
        })
    }

    /// Replace this record's descriptor (upsert of a live job); keeps `created_at`
    pub fn reschedule(&self, descriptor: JobDescriptor, now_millis: i64) -> Result<Self> {
        if self.status.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: JobStatus::Scheduled.to_string(),
            });
        }
        let mut record = Self::schedule(descriptor, now_millis)?;
        record.created_at = self.created_at;
        Ok(record)
    }

    pub fn descriptor(&self) -> JobDescriptor {
        JobDescriptor {
            id: self.id.clone(),
            trigger_time: self.trigger_time.clone(),
            target_kind: self.target_kind,
            process_id: self.process_id.clone(),
            process_instance_id: self.process_instance_id.clone(),
            priority: self.priority,
            callback_url: self.callback_url.clone(),
            repeat_limit: self.repeat_limit,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Pending and its next attempt time has arrived
    pub fn is_due(&self, now_millis: i64) -> bool {
        self.status.is_pending() && self.next_attempt_at <= now_millis
    }

    /// `<job id>_<fire_at>`; identical across retries of the same job
    pub fn timer_id(&self) -> TimerId {
        TimerId::new(self.id.clone(), self.fire_at)
    }

    pub fn mark_executed(&mut self, now_millis: i64) -> Result<()> {
        self.transition(JobStatus::Executed, now_millis)?;
        self.last_error = None;
        Ok(())
    }

    /// Record a failed attempt and plan the next one
    pub fn mark_retrying(
        &mut self,
        next_attempt_at: i64,
        error: impl Into<String>,
        now_millis: i64,
    ) -> Result<()> {
        self.transition(JobStatus::Retrying, now_millis)?;
        self.next_attempt_at = next_attempt_at;
        self.last_error = Some(error.into());
        Ok(())
    }

    pub fn mark_error(&mut self, error: impl Into<String>, now_millis: i64) -> Result<()> {
        self.transition(JobStatus::Error, now_millis)?;
        self.last_error = Some(error.into());
        Ok(())
    }

    pub fn cancel(&mut self, now_millis: i64) -> Result<()> {
        self.transition(JobStatus::Canceled, now_millis)
    }

    fn transition(&mut self, to: JobStatus, now_millis: i64) -> Result<()> {
        if !self.status.can_transition_to(to) {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        self.updated_at = now_millis;
        Ok(())
    }
}
