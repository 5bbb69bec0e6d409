use std::path::PathBuf;

use aps_domain::AddressError;

use crate::bucket::BucketError;

/// Failures surfaced by the replica store.
///
/// Absence of an object is never represented here: every operation defines
/// a zero/absent no-op result for missing keys. These variants cover what
/// actually went wrong — bad addresses, transport faults, and packaging
/// faults — with enough context to diagnose from a log line.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Address(#[from] AddressError),

    /// A backing-store fault other than "not found".
    #[error("{op} failed for replica key {key}: {source}")]
    Transport {
        op: &'static str,
        key: String,
        #[source]
        source: BucketError,
    },

    /// The staged file could not be transmitted.
    #[error("file {} not uploaded: {source}", path.display())]
    Upload {
        path: PathBuf,
        #[source]
        source: BucketError,
    },

    #[error(transparent)]
    Packaging(#[from] PackagingError),
}

/// Failures while building or serializing a bag.
///
/// These abort a transfer before any network call; scoped temp directories
/// are released on every exit path.
#[derive(Debug, thiserror::Error)]
pub enum PackagingError {
    #[error("payload {} is not a readable file: {source}", path.display())]
    Payload {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to stage bag contents: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive entry {entry} could not be written: {source}")]
    Entry {
        entry: String,
        #[source]
        source: std::io::Error,
    },
}
