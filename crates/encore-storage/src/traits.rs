//! Storage abstraction trait
//!
//! All storage backends must implement the `Storage` trait. The pipeline
//! never touches the filesystem directly outside an implementation of it,
//! which keeps the cleanup invariant checkable in one place.

use async_trait::async_trait;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Handle to one stored artifact: the key addresses it internally, the URL
/// is what clients receive.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
    pub size: u64,
}

/// Storage abstraction trait
///
/// Keys are flat generated filenames (see `keys::unique_object_name`); the
/// backend decides how they map to physical locations.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write an object under the given key and return its handle. Upload
    /// keys are freshly generated so they never collide; deterministic keys
    /// (thumbnails) overwrite in place.
    async fn store(&self, key: &str, data: Vec<u8>) -> StorageResult<StoredObject>;

    /// Read an object's bytes by key.
    async fn read(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Delete an object by key. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check whether an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Public URL for a key, without touching the backend.
    fn url_for(&self, key: &str) -> String;
}
