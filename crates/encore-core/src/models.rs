//! Domain models shared across the service.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Kind of media handled by the pipeline. Selects which allow-lists and
/// size ceiling apply to an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// Outcome of a completed compression (image or video).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompressionResult {
    pub url: String,
    pub filename: String,
    pub original_size: u64,
    pub compressed_size: u64,
}

/// Video transcoding preset: a closed bundle of target vertical resolution
/// and constant-quality factor. The only tuning surface exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoPreset {
    /// 1080p, near-source quality.
    Light,
    /// 720p, balanced.
    Medium,
    /// 480p, smallest output.
    Heavy,
}

impl VideoPreset {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "light" => Ok(VideoPreset::Light),
            "medium" => Ok(VideoPreset::Medium),
            "heavy" => Ok(VideoPreset::Heavy),
            _ => Err(anyhow!("Invalid compression preset: {}", s)),
        }
    }

    /// Target vertical resolution in pixels.
    pub fn target_height(self) -> u32 {
        match self {
            VideoPreset::Light => 1080,
            VideoPreset::Medium => 720,
            VideoPreset::Heavy => 480,
        }
    }

    /// x264 constant rate factor (lower = higher quality).
    pub fn crf(self) -> u8 {
        match self {
            VideoPreset::Light => 20,
            VideoPreset::Medium => 23,
            VideoPreset::Heavy => 28,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VideoPreset::Light => "light",
            VideoPreset::Medium => "medium",
            VideoPreset::Heavy => "heavy",
        }
    }
}
