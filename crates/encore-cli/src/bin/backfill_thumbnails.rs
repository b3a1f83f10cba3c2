//! Offline thumbnail backfill.
//!
//! Scans the media root for stored images and generates the missing
//! `thumb_<stem>.jpg` previews. Thumbnails themselves are skipped, and an
//! existing thumbnail is only regenerated with `--force`. Safe to run while
//! the service is up: thumbnail names are deterministic, so a concurrent
//! regeneration overwrites rather than duplicates.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use encore_core::constants::IMAGE_EXTENSIONS;
use encore_processing::ImageCompressor;
use encore_storage::{thumbnail_name, LocalStorage, Storage};

#[derive(Parser, Debug)]
#[command(name = "backfill_thumbnails")]
#[command(about = "Generate missing thumbnails for stored images")]
struct Args {
    /// Media root directory to scan
    #[arg(long, default_value = "./public/media")]
    media_root: PathBuf,

    /// Base URL the media root is served under (only used for log output)
    #[arg(long, default_value = "http://localhost:3000/media")]
    public_base_url: String,

    /// Regenerate thumbnails that already exist
    #[arg(long)]
    force: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let storage = LocalStorage::new(&args.media_root, args.public_base_url.clone())
        .await
        .context("Failed to open media root")?;

    let stats = backfill(&storage, &args.media_root, args.force).await?;
    tracing::info!(
        created = stats.created,
        skipped = stats.skipped,
        failed = stats.failed,
        "Thumbnail backfill finished"
    );

    if stats.failed > 0 {
        anyhow::bail!("{} thumbnail(s) could not be generated", stats.failed);
    }
    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq)]
struct BackfillStats {
    created: usize,
    skipped: usize,
    failed: usize,
}

async fn backfill(
    storage: &dyn Storage,
    media_root: &std::path::Path,
    force: bool,
) -> Result<BackfillStats> {
    let mut stats = BackfillStats::default();

    let mut entries = tokio::fs::read_dir(media_root)
        .await
        .context("Failed to read media root")?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_thumbnail_source(&name) {
            continue;
        }

        let thumb = thumbnail_name(&name);
        if !force && storage.exists(&thumb).await? {
            stats.skipped += 1;
            continue;
        }

        match generate(storage, &name, &thumb).await {
            Ok(size) => {
                tracing::info!(source = %name, thumbnail = %thumb, size_bytes = size, "Thumbnail created");
                stats.created += 1;
            }
            Err(e) => {
                tracing::warn!(source = %name, error = ?e, "Thumbnail generation failed");
                stats.failed += 1;
            }
        }
    }

    Ok(stats)
}

/// A backfill candidate: an image by extension that is not itself a
/// thumbnail. SVG and ICO are excluded; they have no raster decode path.
fn is_thumbnail_source(name: &str) -> bool {
    if name.starts_with("thumb_") {
        return false;
    }
    let ext = std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    match ext.as_deref() {
        Some("svg") | Some("ico") => false,
        Some(ext) => IMAGE_EXTENSIONS.contains(&ext),
        None => false,
    }
}

async fn generate(storage: &dyn Storage, source: &str, thumb: &str) -> Result<u64> {
    let data = storage.read(source).await?;
    let thumbnail =
        tokio::task::spawn_blocking(move || ImageCompressor::thumbnail(&data)).await??;
    let object = storage.store(thumb, thumbnail.data.to_vec()).await?;
    Ok(object.size)
}
