//! Poll endpoint for video compression jobs.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use encore_core::AppError;
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::jobs::JobView;
use crate::state::AppState;

/// A malformed id and an unknown id both surface as 404: from the client's
/// point of view there is no such job either way.
pub async fn job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobView>, HttpAppError> {
    let job_id = Uuid::parse_str(&job_id)
        .map_err(|_| AppError::NotFound(format!("No such job: {}", job_id)))?;

    let view = state
        .jobs
        .get(job_id)
        .ok_or_else(|| AppError::NotFound(format!("No such job: {}", job_id)))?;

    Ok(Json(view))
}
