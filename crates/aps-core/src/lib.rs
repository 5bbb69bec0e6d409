#![deny(clippy::all)]

//! Staging pipeline for replicating preservation packages into APTrust.
//!
//! The preservation service never offers a synchronous store/fetch API.
//! Deposits are bagged, serialized, and dropped into an S3 staging bucket;
//! an archive service eventually notices the object, ingests it, and
//! records progress in an event feed that can only be polled. This crate
//! reconciles that asynchronous workflow with the synchronous
//! transfer/fetch/remove/move contract callers expect:
//!
//! - [`ReplicaStore`] — the synchronous facade: checksum-gated transfer,
//!   fetch, exists, remove, move, attribute.
//! - [`BagBuilder`] / [`archive_bag`] — BagIt packaging and deterministic
//!   tarball serialization of single-file payloads.
//! - [`BucketStore`] — the narrow transport seam to the staging bucket,
//!   with [`MemoryBucket`] and [`FsBucket`] implementations; the
//!   production S3 client is injected by the host behind the same trait.
//! - [`PharosClient`] — read-only poller for the member API's event feed,
//!   the only window into a deposit's fate after upload.

mod archive;
mod bag;
mod bucket;
mod checksum;
mod config;
mod error;
mod pharos;
mod store;

pub use archive::{archive_bag, StagedArchive};
pub use bag::{Bag, BagBuilder};
pub use bucket::{BucketError, BucketStore, FsBucket, MemoryBucket};
pub use checksum::{md5_hex, needs_upload, sha256_hex};
pub use config::{ConfigError, EnvSnapshot, PharosConfig, ReplicaConfig};
pub use error::{PackagingError, StoreError};
pub use pharos::{PharosClient, PharosError};
pub use store::ReplicaStore;
