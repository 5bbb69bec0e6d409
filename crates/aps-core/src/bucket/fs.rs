use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use aps_domain::ObjectRecord;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::debug;

use super::{BucketError, BucketStore};

const META_DIR: &str = ".meta";

/// Sidecar metadata stored next to each object's bytes.
#[derive(Serialize, Deserialize)]
struct SidecarRecord {
    size_bytes: u64,
    checksum: String,
    content_type: String,
    modified: String,
}

/// Directory-backed bucket used by the CLI and for local staging trees.
///
/// Object bytes live under the key path below the root; metadata lives as
/// JSON sidecars under `.meta/`. Uploads are written to a temporary file
/// and renamed into place, so a reader never observes a partial object.
pub struct FsBucket {
    root: PathBuf,
}

impl FsBucket {
    /// Open a bucket rooted at `root`, creating the tree if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, BucketError> {
        let root = root.into();
        fs::create_dir_all(root.join(META_DIR))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join(META_DIR).join(format!("{key}.json"))
    }

    fn read_sidecar(&self, key: &str) -> Result<Option<SidecarRecord>, BucketError> {
        let raw = match fs::read(self.meta_path(key)) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let sidecar = serde_json::from_slice(&raw)
            .map_err(|err| BucketError::CorruptMetadata(format!("{key}: {err}")))?;
        Ok(Some(sidecar))
    }

    fn write_sidecar(&self, key: &str, sidecar: &SidecarRecord) -> Result<(), BucketError> {
        let path = self.meta_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_vec_pretty(sidecar)
            .map_err(|err| BucketError::CorruptMetadata(format!("{key}: {err}")))?;
        fs::write(path, raw)?;
        Ok(())
    }
}

impl BucketStore for FsBucket {
    fn head(&self, key: &str) -> Result<Option<ObjectRecord>, BucketError> {
        let Some(sidecar) = self.read_sidecar(key)? else {
            return Ok(None);
        };
        let last_modified = OffsetDateTime::parse(&sidecar.modified, &Rfc3339)
            .map_err(|err| BucketError::CorruptMetadata(format!("{key}: {err}")))?;
        Ok(Some(ObjectRecord {
            size_bytes: sidecar.size_bytes,
            checksum: sidecar.checksum,
            content_type: sidecar.content_type,
            last_modified,
        }))
    }

    fn get(&self, key: &str, dest: &Path) -> Result<Option<u64>, BucketError> {
        match fs::copy(self.object_path(key), dest) {
            Ok(size) => {
                debug!(key, size, "fetched object from staging tree");
                Ok(Some(size))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn put(
        &self,
        key: &str,
        source: &Path,
        content_type: &str,
        checksum: &str,
    ) -> Result<u64, BucketError> {
        let dest = self.object_path(key);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let staging = NamedTempFile::new_in(&self.root)?;
        let size = fs::copy(source, staging.path())?;
        staging.persist(&dest).map_err(|err| err.error)?;
        self.write_sidecar(
            key,
            &SidecarRecord {
                size_bytes: size,
                checksum: checksum.to_string(),
                content_type: content_type.to_string(),
                modified: OffsetDateTime::now_utc()
                    .format(&Rfc3339)
                    .unwrap_or_default(),
            },
        )?;
        debug!(key, size, "stored object in staging tree");
        Ok(size)
    }

    fn delete(&self, key: &str) -> Result<bool, BucketError> {
        match fs::remove_file(self.object_path(key)) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(err.into()),
        }
        match fs::remove_file(self.meta_path(key)) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        debug!(key, "deleted object from staging tree");
        Ok(true)
    }

    fn copy(&self, src_key: &str, dest_key: &str) -> Result<bool, BucketError> {
        let dest = self.object_path(dest_key);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        match fs::copy(self.object_path(src_key), &dest) {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(err.into()),
        }
        if let Some(sidecar) = self.read_sidecar(src_key)? {
            self.write_sidecar(dest_key, &sidecar)?;
        }
        Ok(true)
    }
}
