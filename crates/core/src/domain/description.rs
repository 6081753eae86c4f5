// Caller-side job descriptions (converted to JobDescriptor by the client)

use super::job::{JobId, Priority};
use super::trigger::TriggerTime;

/// A timer on a running process instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInstanceJobDescription {
    /// Generated by the client when `None`
    pub id: Option<JobId>,
    pub trigger_time: TriggerTime,
    pub process_id: String,
    pub process_instance_id: String,
    pub priority: Priority,
    pub repeat_limit: Option<u32>,
}

impl ProcessInstanceJobDescription {
    pub fn new(
        trigger_time: TriggerTime,
        process_id: impl Into<String>,
        process_instance_id: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            trigger_time,
            process_id: process_id.into(),
            process_instance_id: process_instance_id.into(),
            priority: 0,
            repeat_limit: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_repeat_limit(mut self, limit: u32) -> Self {
        self.repeat_limit = Some(limit);
        self
    }
}

/// A timer on a process definition (e.g. a timer start event)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessJobDescription {
    pub id: Option<JobId>,
    pub trigger_time: TriggerTime,
    pub process_id: String,
    pub priority: Priority,
}

impl ProcessJobDescription {
    pub fn new(trigger_time: TriggerTime, process_id: impl Into<String>) -> Self {
        Self {
            id: None,
            trigger_time,
            process_id: process_id.into(),
            priority: 0,
        }
    }
}
