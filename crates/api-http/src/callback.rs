//! Timer Callback Endpoint
//!
//! `POST /management/jobs/{process_id}/instances/{process_instance_id}/timers/{timer_id}?limit=n`
//!
//! Served by the application that owns the process instances. The effect runs
//! on a blocking thread while the instance's entity lock is held, so two
//! timers for the same instance never mutate it concurrently.

use crate::error::ApiError;
use axum::extract::{Path, Query, State};
use axum::routing::post;
use axum::{Json, Router};
use kairos_core::application::{
    ContextualLockStrategy, EntityLockStrategy, ReferenceCountedLockStrategy,
};
use kairos_core::domain::TimerId;
use kairos_core::error::AppError;
use kairos_core::port::{ProcessInstanceTarget, TimerEffect, TimerFired};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Lock used by the endpoint, keyed by process instance id
pub type InstanceLock = ContextualLockStrategy<ReferenceCountedLockStrategy>;

#[derive(Clone)]
pub struct CallbackState {
    pub target: Arc<dyn ProcessInstanceTarget>,
    pub lock: Arc<InstanceLock>,
}

impl CallbackState {
    pub fn new(target: Arc<dyn ProcessInstanceTarget>) -> Self {
        Self {
            target,
            lock: Arc::new(ContextualLockStrategy::new(ReferenceCountedLockStrategy::new())),
        }
    }
}

pub fn router(state: CallbackState) -> Router {
    Router::new()
        .route(
            "/management/jobs/{process_id}/instances/{process_instance_id}/timers/{timer_id}",
            post(trigger_timer),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct TimerQuery {
    limit: Option<u32>,
}

/// Acknowledgement body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerAck {
    pub process_id: String,
    pub process_instance_id: String,
    pub timer_id: String,
    /// `false` when the same timer id had already been applied
    pub applied: bool,
}

async fn trigger_timer(
    State(state): State<CallbackState>,
    Path((process_id, process_instance_id, timer_id)): Path<(String, String, String)>,
    Query(query): Query<TimerQuery>,
) -> Result<Json<TimerAck>, ApiError> {
    if process_id.trim().is_empty() {
        return Err(ApiError::validation("process id is required"));
    }
    if process_instance_id.trim().is_empty() {
        return Err(ApiError::validation("process instance id is required"));
    }
    let parsed: TimerId = timer_id.parse()?;

    let event = TimerFired {
        process_id: process_id.clone(),
        process_instance_id: process_instance_id.clone(),
        timer_id: parsed,
        limit: query.limit,
    };

    let lock = state.lock.clone();
    let target = state.target.clone();
    let effect = tokio::task::spawn_blocking(move || {
        lock.execute_operation(&event.process_instance_id, || target.trigger_timer(&event))
    })
    .await
    .map_err(|e| AppError::Internal(format!("timer task failed: {}", e)))??;

    info!(
        process_id = %process_id,
        process_instance_id = %process_instance_id,
        timer_id = %timer_id,
        effect = ?effect,
        "Timer callback handled"
    );

    Ok(Json(TimerAck {
        process_id,
        process_instance_id,
        timer_id,
        applied: effect == TimerEffect::Applied,
    }))
}
