// In-memory process instances - reference ProcessInstanceTarget

use crate::domain::TimerId;
use crate::error::{AppError, Result};
use crate::port::{ProcessInstanceTarget, TimerEffect, TimerFired};
use dashmap::{DashMap, DashSet};
use std::collections::HashSet;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct InstanceState {
    process_id: String,
    /// Delivery order of applied timers
    fired: Vec<TimerId>,
    seen: HashSet<TimerId>,
}

/// Registered processes and their running instances
///
/// Applying a timer records it once per `TimerId`; a redelivery is
/// acknowledged as `TimerEffect::Duplicate` and changes nothing.
#[derive(Debug, Default)]
pub struct InMemoryProcessInstances {
    processes: DashSet<String>,
    instances: DashMap<String, InstanceState>,
}

impl InMemoryProcessInstances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_process(&self, process_id: impl Into<String>) {
        self.processes.insert(process_id.into());
    }

    /// Start an instance of a registered process
    pub fn start_instance(
        &self,
        process_id: &str,
        process_instance_id: impl Into<String>,
    ) -> Result<()> {
        if !self.processes.contains(process_id) {
            return Err(AppError::process_not_found(process_id));
        }
        let process_instance_id = process_instance_id.into();
        info!(process_id, process_instance_id = %process_instance_id, "Process instance started");
        self.instances.insert(
            process_instance_id,
            InstanceState {
                process_id: process_id.to_string(),
                ..InstanceState::default()
            },
        );
        Ok(())
    }

    /// Timers applied to an instance, in delivery order
    pub fn fired_timers(&self, process_instance_id: &str) -> Vec<TimerId> {
        self.instances
            .get(process_instance_id)
            .map(|state| state.fired.clone())
            .unwrap_or_default()
    }
}

impl ProcessInstanceTarget for InMemoryProcessInstances {
    fn trigger_timer(&self, event: &TimerFired) -> Result<TimerEffect> {
        if !self.processes.contains(&event.process_id) {
            return Err(AppError::process_not_found(&event.process_id));
        }

        let mut state = self
            .instances
            .get_mut(&event.process_instance_id)
            .filter(|state| state.process_id == event.process_id)
            .ok_or_else(|| AppError::instance_not_found(&event.process_instance_id))?;

        if !state.seen.insert(event.timer_id.clone()) {
            debug!(
                process_instance_id = %event.process_instance_id,
                timer_id = %event.timer_id,
                "Duplicate timer delivery ignored"
            );
            return Ok(TimerEffect::Duplicate);
        }

        state.fired.push(event.timer_id.clone());
        info!(
            process_id = %event.process_id,
            process_instance_id = %event.process_instance_id,
            timer_id = %event.timer_id,
            limit = ?event.limit,
            "Timer applied"
        );
        Ok(TimerEffect::Applied)
    }
}
