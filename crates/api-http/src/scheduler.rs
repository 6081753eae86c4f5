//! Jobs REST Surface
//!
//! - `POST /jobs` create or reschedule
//! - `GET /jobs/{id}` fetch
//! - `DELETE /jobs/{id}` cancel
//! - `GET /jobs?status=A,B` list

use crate::error::ApiError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use kairos_core::application::JobService;
use kairos_core::domain::{DomainError, JobDescriptor, JobRecord, JobStatus};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct SchedulerState {
    pub jobs: Arc<JobService>,
}

impl SchedulerState {
    pub fn new(jobs: Arc<JobService>) -> Self {
        Self { jobs }
    }
}

pub fn router(state: SchedulerState) -> Router {
    Router::new()
        .route("/jobs", post(create_job).get(list_jobs))
        .route("/jobs/{id}", get(get_job).delete(cancel_job))
        .with_state(state)
}

async fn create_job(
    State(state): State<SchedulerState>,
    body: Result<Json<JobDescriptor>, JsonRejection>,
) -> Result<Json<JobRecord>, ApiError> {
    let Json(descriptor) = body.map_err(|e| ApiError::validation(e.body_text()))?;
    debug!(job_id = %descriptor.id, "POST /jobs");
    let record = state.jobs.schedule(descriptor).await?;
    Ok(Json(record))
}

async fn get_job(
    State(state): State<SchedulerState>,
    Path(id): Path<String>,
) -> Result<Json<JobRecord>, ApiError> {
    Ok(Json(state.jobs.get(&id).await?))
}

async fn cancel_job(
    State(state): State<SchedulerState>,
    Path(id): Path<String>,
) -> Result<Json<JobRecord>, ApiError> {
    debug!(job_id = %id, "DELETE /jobs/{{id}}");
    Ok(Json(state.jobs.cancel(&id).await?))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    /// Comma-separated statuses
    status: Option<String>,
}

async fn list_jobs(
    State(state): State<SchedulerState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<JobRecord>>, ApiError> {
    let statuses = parse_statuses(query.status.as_deref().unwrap_or_default())?;
    Ok(Json(state.jobs.list(&statuses).await?))
}

fn parse_statuses(raw: &str) -> Result<Vec<JobStatus>, DomainError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect()
}
