//! Commit step for every compression: upload the replacement, then delete
//! the original. Centralized here so the cleanup invariant holds for both
//! compressors: at any moment exactly one of {original, replacement} is
//! durably stored. The original is removed only after the replacement write
//! has fully succeeded; on any earlier failure nothing is uploaded and the
//! original stays.

use encore_storage::{Storage, StorageResult, StoredObject};

/// Store compressed `data` under `replacement_key`, then delete
/// `original_key`. Returns the stored replacement.
///
/// A failed delete after a successful upload is logged and tolerated: the
/// replacement is already the artifact of record, and re-deleting an
/// orphaned original is safe at any later time.
pub async fn commit_replacement(
    storage: &dyn Storage,
    original_key: &str,
    replacement_key: &str,
    data: Vec<u8>,
) -> StorageResult<StoredObject> {
    let object = storage.store(replacement_key, data).await?;

    if let Err(e) = storage.delete(original_key).await {
        tracing::warn!(
            error = %e,
            original_key = %original_key,
            replacement_key = %replacement_key,
            "Replacement stored but original could not be deleted"
        );
    } else {
        tracing::info!(
            original_key = %original_key,
            replacement_key = %replacement_key,
            size_bytes = object.size,
            "Original replaced by compressed output"
        );
    }

    Ok(object)
}
