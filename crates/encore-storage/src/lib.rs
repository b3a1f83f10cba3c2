//! Storage layer: a backend trait plus the local-filesystem implementation
//! used by the media pipeline, and collision-free object naming.

pub mod keys;
pub mod local;
pub mod traits;

pub use keys::{thumbnail_name, unique_object_name};
pub use local::LocalStorage;
pub use traits::{Storage, StorageError, StorageResult, StoredObject};
