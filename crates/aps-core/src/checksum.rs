//! Content digests and the transfer-necessity gate.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use md5::Md5;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::bucket::{BucketError, BucketStore};

/// Hex MD5 digest of a file's contents.
///
/// MD5 is what the preservation service records in bag manifests and what
/// the gate compares against; it is a content fingerprint here, not a
/// security boundary.
pub fn md5_hex(path: &Path) -> io::Result<String> {
    digest_file::<Md5>(path)
}

/// Hex SHA-256 digest of a file's contents.
pub fn sha256_hex(path: &Path) -> io::Result<String> {
    digest_file::<Sha256>(path)
}

fn digest_file<D: Digest>(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = D::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Decide whether a payload actually needs to be transmitted.
///
/// Returns `true` when the store holds no object at `key`, or when the
/// recorded digest differs from `md5`. Repeated transfers of
/// byte-identical content therefore cost one metadata lookup, not a
/// re-upload. A metadata fault other than "not found" propagates — it must
/// never be mistaken for an absent object.
pub fn needs_upload(
    bucket: &dyn BucketStore,
    key: &str,
    md5: &str,
) -> Result<bool, BucketError> {
    match bucket.head(key)? {
        None => Ok(true),
        Some(record) => {
            if record.checksum == md5 {
                debug!(key, "replica digest unchanged, skipping upload");
                Ok(false)
            } else {
                debug!(
                    key,
                    recorded = %record.checksum,
                    computed = %md5,
                    "replica digest changed"
                );
                Ok(true)
            }
        }
    }
}
