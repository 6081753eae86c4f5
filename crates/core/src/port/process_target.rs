// Process Instance Target Port
// The execution engine side of a callback: applies a fired timer to an instance

use crate::domain::TimerId;
use crate::error::Result;

/// A fired timer addressed to one process instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerFired {
    pub process_id: String,
    pub process_instance_id: String,
    pub timer_id: TimerId,
    pub limit: Option<u32>,
}

/// What applying the timer did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEffect {
    Applied,
    /// Same timer id was delivered before; nothing changed
    Duplicate,
}

/// Engine-facing port, called with the instance's entity lock held
///
/// Synchronous on purpose: the callback endpoint runs it on a blocking thread
/// inside `EntityLockStrategy::execute_operation`.
///
/// Errors: `AppError::NotFound` with `NotFoundKind::Process` or
/// `NotFoundKind::ProcessInstance` when the target does not exist.
pub trait ProcessInstanceTarget: Send + Sync {
    fn trigger_timer(&self, event: &TimerFired) -> Result<TimerEffect>;
}
