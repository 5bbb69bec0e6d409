//! The synchronous replica store.
//!
//! One instance per process, constructed before first use. Operations
//! block on network I/O and provide no internal locking; callers serialize
//! per address, while distinct addresses may run in parallel because every
//! intermediate artifact is address-scoped. A successful `transfer` means
//! the deposit was *accepted for staging*, not preserved — preservation is
//! observable only through the event feed (see [`crate::PharosClient`]).

use std::fs;
use std::path::Path;
use std::sync::Arc;

use aps_domain::{content_type_for, ObjectAttribute, ReplicaAddress};
use tracing::{debug, info};

use crate::archive::archive_bag;
use crate::bag::BagBuilder;
use crate::bucket::BucketStore;
use crate::checksum::{md5_hex, needs_upload};
use crate::config::ReplicaConfig;
use crate::error::{PackagingError, StoreError};

/// Store/fetch/remove/move facade over the staging bucket.
pub struct ReplicaStore {
    config: ReplicaConfig,
    bucket: Arc<dyn BucketStore>,
}

impl ReplicaStore {
    pub fn new(config: ReplicaConfig, bucket: Arc<dyn BucketStore>) -> Self {
        Self { config, bucket }
    }

    pub fn config(&self) -> &ReplicaConfig {
        &self.config
    }

    /// Stage a local payload into the drop bucket, bagged unless raw mode
    /// is configured. Returns the payload bytes transferred, or 0 when the
    /// replica already holds byte-identical content.
    ///
    /// The payload file is consumed: it is deleted whether or not an
    /// upload turned out to be necessary, and no staging artifact survives
    /// the call.
    pub fn transfer(&self, group: &str, payload: &Path) -> Result<u64, StoreError> {
        let address = ReplicaAddress::for_file(group, payload)?;
        let key = address.key();

        let md5 = md5_hex(payload).map_err(|source| {
            StoreError::Packaging(PackagingError::Payload {
                path: payload.to_path_buf(),
                source,
            })
        })?;
        let payload_size = fs::metadata(payload)
            .map_err(|source| {
                StoreError::Packaging(PackagingError::Payload {
                    path: payload.to_path_buf(),
                    source,
                })
            })?
            .len();

        let wanted = needs_upload(self.bucket.as_ref(), &key, &md5).map_err(|source| {
            StoreError::Transport {
                op: "head",
                key: key.clone(),
                source,
            }
        })?;

        let transferred = if wanted {
            if self.config.bagging {
                let bag = BagBuilder::new(&self.config).stage(payload)?;
                let staged = archive_bag(bag)?;
                let name = staged.name().to_string();
                self.upload(&key, staged.path(), &name, &md5)?;
            } else {
                self.upload(&key, payload, address.id(), &md5)?;
            }
            payload_size
        } else {
            0
        };

        fs::remove_file(payload).map_err(|source| {
            StoreError::Packaging(PackagingError::Payload {
                path: payload.to_path_buf(),
                source,
            })
        })?;

        info!(%key, transferred, "replica transfer complete");
        Ok(transferred)
    }

    /// Download a replica into `dest`. Absence is a no-op returning 0 and
    /// leaving `dest` untouched — "nothing to fetch" is not a failure.
    pub fn fetch(&self, group: &str, id: &str, dest: &Path) -> Result<u64, StoreError> {
        let key = ReplicaAddress::new(group, id)?.key();
        let fetched = self
            .bucket
            .get(&key, dest)
            .map_err(|source| StoreError::Transport {
                op: "get",
                key: key.clone(),
                source,
            })?;
        match fetched {
            Some(size) => {
                debug!(%key, size, "fetched replica");
                Ok(size)
            }
            None => Ok(0),
        }
    }

    pub fn exists(&self, group: &str, id: &str) -> Result<bool, StoreError> {
        let key = ReplicaAddress::new(group, id)?.key();
        Ok(self.head(&key)?.is_some())
    }

    /// Delete a replica, returning the bytes freed. Absence is a no-op
    /// returning 0.
    pub fn remove(&self, group: &str, id: &str) -> Result<u64, StoreError> {
        let key = ReplicaAddress::new(group, id)?.key();
        // Size is read before deletion so callers can account for the
        // space reclaimed.
        let Some(record) = self.head(&key)? else {
            return Ok(0);
        };
        self.bucket
            .delete(&key)
            .map_err(|source| StoreError::Transport {
                op: "delete",
                key: key.clone(),
                source,
            })?;
        info!(%key, freed = record.size_bytes, "removed replica");
        Ok(record.size_bytes)
    }

    /// Relocate a replica between groups server-side, returning the bytes
    /// moved. Absence of the source is a no-op returning 0.
    pub fn move_object(
        &self,
        src_group: &str,
        dest_group: &str,
        id: &str,
    ) -> Result<u64, StoreError> {
        let src_key = ReplicaAddress::new(src_group, id)?.key();
        let dest_key = ReplicaAddress::new(dest_group, id)?.key();

        let Some(record) = self.head(&src_key)? else {
            return Ok(0);
        };
        let copied = self
            .bucket
            .copy(&src_key, &dest_key)
            .map_err(|source| StoreError::Transport {
                op: "copy",
                key: dest_key.clone(),
                source,
            })?;
        if !copied {
            return Ok(0);
        }
        self.bucket
            .delete(&src_key)
            .map_err(|source| StoreError::Transport {
                op: "delete",
                key: src_key.clone(),
                source,
            })?;
        info!(from = %src_key, to = %dest_key, moved = record.size_bytes, "moved replica");
        Ok(record.size_bytes)
    }

    /// Read one attribute of a replica. Unrecognized attribute names and
    /// absent objects both yield `None`, never an error.
    pub fn attribute(
        &self,
        group: &str,
        id: &str,
        name: &str,
    ) -> Result<Option<String>, StoreError> {
        let Some(attr) = ObjectAttribute::parse(name) else {
            return Ok(None);
        };
        let key = ReplicaAddress::new(group, id)?.key();
        let Some(record) = self.head(&key)? else {
            return Ok(None);
        };
        let value = match attr {
            ObjectAttribute::Checksum => record.checksum,
            ObjectAttribute::SizeBytes => record.size_bytes.to_string(),
            ObjectAttribute::Modified => record.modified_rfc3339(),
        };
        Ok(Some(value))
    }

    fn head(&self, key: &str) -> Result<Option<aps_domain::ObjectRecord>, StoreError> {
        self.bucket
            .head(key)
            .map_err(|source| StoreError::Transport {
                op: "head",
                key: key.to_string(),
                source,
            })
    }

    fn upload(
        &self,
        key: &str,
        staged: &Path,
        name: &str,
        checksum: &str,
    ) -> Result<u64, StoreError> {
        let content_type = content_type_for(name);
        let size = self
            .bucket
            .put(key, staged, content_type, checksum)
            .map_err(|source| StoreError::Upload {
                path: staged
                    .canonicalize()
                    .unwrap_or_else(|_| staged.to_path_buf()),
                source,
            })?;
        debug!(key, size, content_type, "uploaded replica");
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bag::tests::test_config;
    use crate::bucket::MemoryBucket;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn store_with_memory_bucket() -> (ReplicaStore, Arc<MemoryBucket>) {
        let bucket = Arc::new(MemoryBucket::new());
        let store = ReplicaStore::new(test_config(), bucket.clone());
        (store, bucket)
    }

    fn payload(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn fresh_transfer_uploads_a_bag_archive_and_consumes_the_payload() {
        let temp = tempdir().unwrap();
        let (store, bucket) = store_with_memory_bucket();
        let report = payload(temp.path(), "report.txt", b"annual report");

        let transferred = store.transfer("backups", &report).unwrap();
        assert_eq!(transferred, 13);
        assert!(!report.exists());
        assert_eq!(bucket.put_count(), 1);

        let record = bucket.head("backups/report.txt").unwrap().unwrap();
        assert_eq!(record.content_type, "application/x-gzip");
        assert_eq!(record.checksum, "a0c1ce8043ad1734257f56e70e1852d9");
    }

    #[test]
    fn byte_identical_retransfer_is_gated_off() {
        let temp = tempdir().unwrap();
        let (store, bucket) = store_with_memory_bucket();

        let first = payload(temp.path(), "report.txt", b"annual report");
        assert_eq!(store.transfer("backups", &first).unwrap(), 13);

        let second = payload(temp.path(), "report.txt", b"annual report");
        assert_eq!(store.transfer("backups", &second).unwrap(), 0);
        assert!(!second.exists());
        assert_eq!(bucket.put_count(), 1);
    }

    #[test]
    fn changed_content_is_retransferred() {
        let temp = tempdir().unwrap();
        let (store, bucket) = store_with_memory_bucket();

        let first = payload(temp.path(), "report.txt", b"annual report");
        store.transfer("backups", &first).unwrap();

        let revised = payload(temp.path(), "report.txt", b"revised annual report");
        assert_eq!(store.transfer("backups", &revised).unwrap(), 21);
        assert_eq!(bucket.put_count(), 2);
    }

    #[test]
    fn raw_mode_uploads_the_payload_unbagged() {
        let temp = tempdir().unwrap();
        let bucket = Arc::new(MemoryBucket::new());
        let mut config = test_config();
        config.bagging = false;
        let store = ReplicaStore::new(config, bucket.clone());

        let report = payload(temp.path(), "report.txt", b"plain payload");
        assert_eq!(store.transfer("backups", &report).unwrap(), 13);

        let record = bucket.head("backups/report.txt").unwrap().unwrap();
        assert_eq!(record.content_type, "text/plain");
        assert_eq!(record.size_bytes, 13);
    }

    #[test]
    fn fetch_against_an_absent_address_is_a_no_op() {
        let temp = tempdir().unwrap();
        let (store, _) = store_with_memory_bucket();
        let dest = temp.path().join("out");
        assert_eq!(store.fetch("backups", "report.txt", &dest).unwrap(), 0);
        assert!(!dest.exists());
    }

    #[test]
    fn remove_reports_freed_bytes_and_tolerates_absence() {
        let temp = tempdir().unwrap();
        let (store, _) = store_with_memory_bucket();

        let report = payload(temp.path(), "report.txt", b"annual report");
        store.transfer("backups", &report).unwrap();

        let freed = store.remove("backups", "report.txt").unwrap();
        assert!(freed > 0);
        assert_eq!(store.remove("backups", "report.txt").unwrap(), 0);
        assert!(!store.exists("backups", "report.txt").unwrap());
    }

    #[test]
    fn move_preserves_size_and_clears_the_source() {
        let temp = tempdir().unwrap();
        let (store, _) = store_with_memory_bucket();

        let report = payload(temp.path(), "report.txt", b"annual report");
        store.transfer("staging", &report).unwrap();
        let before = store
            .attribute("staging", "report.txt", "sizebytes")
            .unwrap()
            .unwrap();

        let moved = store.move_object("staging", "archive", "report.txt").unwrap();
        assert_eq!(moved.to_string(), before);

        assert_eq!(
            store
                .attribute("archive", "report.txt", "sizebytes")
                .unwrap()
                .unwrap(),
            before
        );
        assert_eq!(
            store.attribute("staging", "report.txt", "sizebytes").unwrap(),
            None
        );
        assert_eq!(store.move_object("staging", "archive", "report.txt").unwrap(), 0);
    }

    #[test]
    fn attribute_absence_and_unknown_names_are_none() {
        let (store, _) = store_with_memory_bucket();
        assert_eq!(store.attribute("backups", "ghost.txt", "sizebytes").unwrap(), None);
        assert_eq!(store.attribute("backups", "ghost.txt", "etag").unwrap(), None);
    }

    #[test]
    fn invalid_addresses_are_rejected_before_any_network_io() {
        let (store, bucket) = store_with_memory_bucket();
        let err = store.fetch("a/b", "x", Path::new("/tmp/never")).unwrap_err();
        assert!(matches!(err, StoreError::Address(_)));
        assert_eq!(bucket.put_count(), 0);
    }

    #[test]
    fn no_staging_artifacts_survive_a_transfer() {
        let temp = tempdir().unwrap();
        let (store, _) = store_with_memory_bucket();
        let report = payload(temp.path(), "report.txt", b"annual report");
        store.transfer("backups", &report).unwrap();

        let residue: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert!(residue.is_empty(), "unexpected residue: {residue:?}");
    }
}
