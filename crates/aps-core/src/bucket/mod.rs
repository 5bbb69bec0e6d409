//! The transport seam to the staging bucket.
//!
//! Everything the store needs from cloud object storage fits in five
//! operations over bucket-relative keys. Absence is part of the contract,
//! not an error: lookups return `None`/`false` for missing keys, and only
//! genuine transport faults surface as [`BucketError`]. Collapsing the two
//! would break the idempotent retry semantics callers rely on.

mod fs;
mod memory;

use std::path::Path;

use aps_domain::ObjectRecord;

pub use fs::FsBucket;
pub use memory::MemoryBucket;

/// Errors from the backing object store.
#[derive(Debug, thiserror::Error)]
pub enum BucketError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication failure, connectivity fault, or server-side
    /// rejection — anything the service itself reported.
    #[error("storage service rejected the request: {0}")]
    Service(String),

    #[error("object metadata is corrupt: {0}")]
    CorruptMetadata(String),
}

/// Authenticated blob transport: PUT/GET/DELETE of byte blobs identified
/// by key within one bucket.
///
/// Implementations must be safe for concurrent use; the handle is the one
/// piece of state shared across parallel transfers.
pub trait BucketStore: Send + Sync {
    /// Metadata for the object at `key`, or `None` if there is none.
    fn head(&self, key: &str) -> Result<Option<ObjectRecord>, BucketError>;

    /// Download the object at `key` into `dest`, returning the byte count.
    /// Returns `None` and leaves `dest` untouched when the key is absent.
    fn get(&self, key: &str, dest: &Path) -> Result<Option<u64>, BucketError>;

    /// Upload `source` under `key`, recording its content type and the
    /// caller-computed payload checksum as object metadata. Returns the
    /// stored byte count. Re-uploading an existing key replaces it.
    fn put(
        &self,
        key: &str,
        source: &Path,
        content_type: &str,
        checksum: &str,
    ) -> Result<u64, BucketError>;

    /// Delete the object at `key`. Returns whether it existed.
    fn delete(&self, key: &str) -> Result<bool, BucketError>;

    /// Server-side copy. Returns `false` when the source key is absent.
    fn copy(&self, src_key: &str, dest_key: &str) -> Result<bool, BucketError>;
}
