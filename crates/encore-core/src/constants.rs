//! Service-wide constants: media allow-lists and processing defaults.

/// Content types accepted for image uploads.
pub const IMAGE_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "image/x-icon",
    "image/vnd.microsoft.icon",
    "image/svg+xml",
];

/// File extensions accepted for image uploads.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "ico", "svg"];

/// Content types accepted for video uploads.
pub const VIDEO_CONTENT_TYPES: &[&str] = &["video/mp4", "video/webm", "video/quicktime"];

/// File extensions accepted for video uploads.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov"];

/// Ceiling for a single video upload, enforced before any storage write.
pub const VIDEO_MAX_FILE_SIZE: usize = 100 * 1024 * 1024;

/// JPEG quality used when the caller does not supply one.
pub const DEFAULT_IMAGE_QUALITY: u8 = 80;

/// Fixed geometry for generated thumbnails.
pub const THUMBNAIL_WIDTH: u32 = 800;
pub const THUMBNAIL_QUALITY: u8 = 85;

/// AAC audio bitrate applied to every transcode preset.
pub const VIDEO_AUDIO_BITRATE: &str = "128k";
