//! Background video compression worker.
//!
//! Spawned per job by the video upload handler. The worker owns the whole
//! transcode lifecycle: pull the original from storage into a scratch
//! directory, run ffmpeg while forwarding progress into the job registry,
//! commit the output as the replacement artifact, and record the terminal
//! job state. Every failure path leaves the original in storage and the job
//! in `error`.

use std::sync::Arc;

use anyhow::{Context, Result};
use encore_core::models::{CompressionResult, VideoPreset};
use encore_processing::{commit_replacement, FfmpegTranscoder};
use tempfile::TempDir;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::state::AppState;

/// Launch the compression of `original_key` as a detached task. Returns
/// immediately; callers poll the registry for the outcome.
pub fn spawn(state: Arc<AppState>, job_id: Uuid, original_key: String, preset: VideoPreset) {
    tokio::spawn(async move {
        match run(&state, job_id, &original_key, preset).await {
            Ok(result) => {
                state.jobs.complete(job_id, result);
            }
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = ?e, "Video compression failed");
                state.jobs.fail(job_id, e.to_string());
            }
        }
    });
}

async fn run(
    state: &AppState,
    job_id: Uuid,
    original_key: &str,
    preset: VideoPreset,
) -> Result<CompressionResult> {
    let original = state
        .storage
        .read(original_key)
        .await
        .context("Failed to read original video")?;
    let original_size = original.len() as u64;

    // Scratch directory; dropped on every exit path, taking any partial
    // transcode output with it.
    let scratch = TempDir::new().context("Failed to create scratch directory")?;
    let input_path = scratch.path().join("input");
    let output_path = scratch.path().join("output.mp4");
    tokio::fs::write(&input_path, &original)
        .await
        .context("Failed to stage original video")?;
    drop(original);

    let transcoder = FfmpegTranscoder::new(
        state.config.ffmpeg_path.clone(),
        state.config.ffprobe_path.clone(),
    );

    let (tx, mut rx) = mpsc::channel::<u8>(32);
    let jobs = state.jobs.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(percent) = rx.recv().await {
            jobs.update_progress(job_id, percent);
        }
    });

    let transcode = transcoder
        .transcode(&input_path, &output_path, preset, tx)
        .await;
    let _ = forwarder.await;
    transcode.context("Transcoding failed")?;

    let compressed = tokio::fs::read(&output_path)
        .await
        .context("Failed to read transcoded video")?;
    let compressed_size = compressed.len() as u64;

    let replacement_key = format!("{}.mp4", Uuid::new_v4().simple());
    let object = commit_replacement(
        state.storage.as_ref(),
        original_key,
        &replacement_key,
        compressed,
    )
    .await
    .context("Failed to store transcoded video")?;

    tracing::info!(
        job_id = %job_id,
        preset = preset.as_str(),
        original_size,
        compressed_size,
        "Video compression finished"
    );

    Ok(CompressionResult {
        url: object.url,
        filename: object.key,
        original_size,
        compressed_size,
    })
}
