//! Image upload handler.
//!
//! Stores the validated original immediately, then compresses in place when
//! the client asked for it (`compressQuality` and/or `compressMaxWidth`).
//! Compression replaces the original atomically from the client's point of
//! view: the returned URL always points at the surviving artifact, and a
//! failed compression keeps the untouched original in storage.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use encore_core::constants::DEFAULT_IMAGE_QUALITY;
use encore_core::models::MediaKind;
use encore_core::AppError;
use encore_processing::{commit_replacement, validator_for_kind, ImageCompressor, ImageOptions};
use encore_storage::unique_object_name;
use serde::Serialize;
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::handlers::UploadForm;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadResponse {
    pub url: String,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressed_size: Option<u64>,
}

#[tracing::instrument(skip(state, multipart), fields(operation = "upload_image"))]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ImageUploadResponse>), HttpAppError> {
    let form = UploadForm::read(multipart).await?;

    let quality: Option<u8> = form.parse_field("compressQuality")?;
    if let Some(q) = quality {
        if !(1..=100).contains(&q) {
            return Err(
                AppError::InvalidInput(format!("compressQuality out of range 1-100: {}", q))
                    .into(),
            );
        }
    }
    // Zero means no resize, same as absent; the compressor ignores it.
    let max_width: Option<u32> = form.parse_field("compressMaxWidth")?;

    let validator = validator_for_kind(MediaKind::Image, state.config.video_max_file_size);
    validator.validate_all(
        &form.file.filename,
        &form.file.content_type,
        form.file.data.len(),
    )?;

    let original_key = unique_object_name(&form.file.filename);
    let original_size = form.file.data.len() as u64;
    let original = state
        .storage
        .store(&original_key, form.file.data.to_vec())
        .await?;

    tracing::info!(
        key = %original.key,
        size_bytes = original.size,
        "Image stored"
    );

    // No compression parameters: the original is the final artifact.
    if quality.is_none() && max_width.is_none() {
        return Ok((
            StatusCode::CREATED,
            Json(ImageUploadResponse {
                url: original.url,
                filename: original.key,
                original_size: None,
                compressed_size: None,
            }),
        ));
    }

    let options = ImageOptions {
        quality: quality.unwrap_or(DEFAULT_IMAGE_QUALITY),
        max_width,
    };
    let data = form.file.data.clone();
    let compressed = tokio::task::spawn_blocking(move || ImageCompressor::compress(&data, options))
        .await
        .map_err(|e| AppError::Internal(format!("Compression task panicked: {}", e)))?
        .map_err(|e| AppError::CompressionFailed(e.to_string()))?;

    let replacement_key = format!("{}.jpg", Uuid::new_v4().simple());
    let object = commit_replacement(
        state.storage.as_ref(),
        &original_key,
        &replacement_key,
        compressed.data.to_vec(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ImageUploadResponse {
            url: object.url,
            filename: object.key,
            original_size: Some(original_size),
            compressed_size: Some(object.size),
        }),
    ))
}
