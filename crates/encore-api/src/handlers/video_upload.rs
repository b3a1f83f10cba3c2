//! Video upload handler.
//!
//! The original is always stored synchronously; compression, when requested
//! via `compressPreset`, happens in a detached worker. The response for a
//! compressing upload carries only the job id, so the client never waits on
//! ffmpeg inside the request.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use encore_core::models::{MediaKind, VideoPreset};
use encore_core::AppError;
use encore_processing::validator_for_kind;
use encore_storage::unique_object_name;
use serde::Serialize;
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::handlers::UploadForm;
use crate::state::AppState;
use crate::workers;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum VideoUploadResponse {
    /// Compression requested: poll the status endpoint with this id.
    #[serde(rename_all = "camelCase")]
    Queued { job_id: Uuid, compressing: bool },
    /// Stored as-is, no compression requested.
    Stored { url: String, filename: String },
}

#[tracing::instrument(skip(state, multipart), fields(operation = "upload_video"))]
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<VideoUploadResponse>), HttpAppError> {
    let form = UploadForm::read(multipart).await?;

    let preset = match form.fields.get("compressPreset") {
        Some(raw) => Some(
            VideoPreset::parse(raw)
                .map_err(|e| AppError::InvalidInput(e.to_string()))?,
        ),
        None => None,
    };

    let validator = validator_for_kind(MediaKind::Video, state.config.video_max_file_size);
    validator.validate_all(
        &form.file.filename,
        &form.file.content_type,
        form.file.data.len(),
    )?;

    let key = unique_object_name(&form.file.filename);
    let object = state.storage.store(&key, form.file.data.to_vec()).await?;

    tracing::info!(
        key = %object.key,
        size_bytes = object.size,
        preset = preset.map(|p| p.as_str()).unwrap_or("none"),
        "Video stored"
    );

    let response = match preset {
        None => VideoUploadResponse::Stored {
            url: object.url,
            filename: object.key,
        },
        Some(preset) => {
            let job_id = state.jobs.create();
            workers::spawn(state.clone(), job_id, object.key, preset);
            VideoUploadResponse::Queued {
                job_id,
                compressing: true,
            }
        }
    };

    Ok((StatusCode::CREATED, Json(response)))
}
