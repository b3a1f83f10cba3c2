//! Image compression: decode, optional aspect-preserving downscale, and
//! quality-controlled JPEG re-encode via mozjpeg. Thumbnailing reuses the
//! same primitive at a fixed geometry.

use anyhow::{Context, Result};
use bytes::Bytes;
use encore_core::constants::{THUMBNAIL_QUALITY, THUMBNAIL_WIDTH};
use image::{DynamicImage, GenericImageView};

/// Caller-chosen transform parameters for one image compression.
#[derive(Debug, Clone, Copy)]
pub struct ImageOptions {
    /// JPEG quality, 1-100.
    pub quality: u8,
    /// Downscale to at most this width; `None` keeps the source geometry.
    pub max_width: Option<u32>,
}

/// Encoded output plus the dimensions it ended up with.
#[derive(Debug, Clone)]
pub struct CompressedImage {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
}

pub struct ImageCompressor;

impl ImageCompressor {
    /// Compress raw image bytes to JPEG. The source is resized down when it
    /// is wider than `max_width`, never up.
    pub fn compress(data: &[u8], options: ImageOptions) -> Result<CompressedImage> {
        let img = image::load_from_memory(data).context("Failed to decode image")?;
        let img = Self::apply_max_width(img, options.max_width);
        let (width, height) = img.dimensions();

        let jpeg = Self::encode_jpeg(&img, options.quality.clamp(1, 100))?;

        tracing::debug!(
            input_bytes = data.len(),
            output_bytes = jpeg.len(),
            width = width,
            height = height,
            quality = options.quality,
            "Image compressed"
        );

        Ok(CompressedImage {
            data: jpeg,
            width,
            height,
        })
    }

    /// Fixed-width preview of a stored image (overwrites on regeneration).
    pub fn thumbnail(data: &[u8]) -> Result<CompressedImage> {
        Self::compress(
            data,
            ImageOptions {
                quality: THUMBNAIL_QUALITY,
                max_width: Some(THUMBNAIL_WIDTH),
            },
        )
    }

    fn apply_max_width(img: DynamicImage, max_width: Option<u32>) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        match max_width {
            Some(max) if max > 0 && orig_width > max => {
                let aspect_ratio = orig_height as f32 / orig_width as f32;
                let target_height = ((max as f32 * aspect_ratio).round() as u32).max(1);
                let filter = Self::select_filter(orig_width, max);
                img.resize_exact(max, target_height, filter)
            }
            _ => img,
        }
    }

    /// Pick a resampling filter by downscale ratio: cheap filters for heavy
    /// reductions, Lanczos when the geometry barely changes.
    fn select_filter(orig_width: u32, new_width: u32) -> image::imageops::FilterType {
        let ratio = orig_width as f32 / new_width as f32;
        if ratio > 2.0 {
            image::imageops::FilterType::Triangle
        } else if ratio > 1.5 {
            image::imageops::FilterType::CatmullRom
        } else {
            image::imageops::FilterType::Lanczos3
        }
    }

    fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Bytes> {
        let rgb_img = img.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(quality as f32);
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);

        let mut comp = comp
            .start_compress(Vec::new())
            .context("Failed to start JPEG encoder")?;
        comp.write_scanlines(&rgb_img)
            .context("Failed to encode scanlines")?;
        let jpeg_data = comp.finish().context("Failed to finish JPEG encode")?;

        Ok(Bytes::from(jpeg_data))
    }
}
