//! Object name generation.
//!
//! Uploaded files get a fresh random name per upload (uuid v4, 128 bits)
//! with the original extension preserved, so concurrent uploads can never
//! collide or overwrite each other. Thumbnails are the one exception:
//! they are named deterministically from their source so regeneration
//! overwrites instead of accumulating.

use std::path::Path;

use uuid::Uuid;

/// Generate a collision-free object name preserving the original extension.
///
/// `poster.jpg` becomes e.g. `3f2a9c0e5b6d4f718a90c1d2e3f40516.jpg`;
/// a missing extension yields a bare uuid.
pub fn unique_object_name(original_name: &str) -> String {
    let token = Uuid::new_v4().simple().to_string();
    match Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
    {
        Some(ext) => format!("{}.{}", token, ext.to_lowercase()),
        None => token,
    }
}

/// Deterministic thumbnail name for a stored image: `thumb_<stem>.jpg`.
pub fn thumbnail_name(source_name: &str) -> String {
    let stem = Path::new(source_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(source_name);
    format!("thumb_{}.jpg", stem)
}
