//! BagIt staging for single-file payloads.
//!
//! Each transfer wraps one payload in a standard bag: the payload under
//! `data/`, one manifest per digest algorithm, a standard descriptive tag
//! file, and the preservation service's own tag file. The bag lives in a
//! scoped temporary directory for the duration of one transfer and leaves
//! no residue on any exit path — success hands the tree to the archiver,
//! failure drops it.

use std::fs::{self, File};
use std::io::{self, ErrorKind, Write};
use std::path::Path;

use tempfile::TempDir;
use time::OffsetDateTime;
use tracing::debug;

use crate::checksum::{md5_hex, sha256_hex};
use crate::config::ReplicaConfig;
use crate::error::PackagingError;

const BAGIT_VERSION: &str = "0.97";
const TAG_ENCODING: &str = "UTF-8";

/// A staged bag awaiting serialization.
///
/// The staging root is unique per transfer; the name the bag travels under
/// (and the archive entry prefix) is deterministic, derived from the
/// institution and the payload's stem, so the same payload always produces
/// the same archive layout.
#[derive(Debug)]
pub struct Bag {
    root: TempDir,
    name: String,
    payload_name: String,
    payload_size: u64,
    payload_md5: String,
    payload_sha256: String,
}

impl Bag {
    /// Deterministic bag name: `{institution}.{payload-stem}`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        self.root.path()
    }

    pub fn payload_name(&self) -> &str {
        &self.payload_name
    }

    pub fn payload_size(&self) -> u64 {
        self.payload_size
    }

    /// MD5 of the bytes actually staged into `data/`.
    pub fn payload_md5(&self) -> &str {
        &self.payload_md5
    }

    pub fn payload_sha256(&self) -> &str {
        &self.payload_sha256
    }

    /// Remove the staging tree, surfacing any cleanup failure.
    pub(crate) fn close(self) -> io::Result<()> {
        self.root.close()
    }
}

/// Builds single-payload bags according to one store configuration.
pub struct BagBuilder<'a> {
    config: &'a ReplicaConfig,
}

impl<'a> BagBuilder<'a> {
    pub fn new(config: &'a ReplicaConfig) -> Self {
        Self { config }
    }

    /// Stage `payload` into a fresh bag.
    ///
    /// The payload file itself is left in place; the caller decides when
    /// to consume it. Manifest digests are recomputed from the staged
    /// copy, never assumed equal to digests computed earlier, so a short
    /// write can never produce a manifest that vouches for bytes that were
    /// not written.
    pub fn stage(&self, payload: &Path) -> Result<Bag, PackagingError> {
        let payload_name = file_name(payload)?;
        let name = format!("{}.{}", self.config.institution, stem(&payload_name));

        let root = tempfile::Builder::new()
            .prefix(&format!("{}-", self.config.bucket))
            .tempdir()?;
        let data_dir = root.path().join("data");
        fs::create_dir(&data_dir)?;

        let staged = data_dir.join(&payload_name);
        fs::copy(payload, &staged).map_err(|source| PackagingError::Payload {
            path: payload.to_path_buf(),
            source,
        })?;

        let payload_size = fs::metadata(&staged)?.len();
        let payload_md5 = md5_hex(&staged)?;
        let payload_sha256 = sha256_hex(&staged)?;

        write_file(
            &root.path().join("bagit.txt"),
            &format!(
                "BagIt-Version: {BAGIT_VERSION}\nTag-File-Character-Encoding: {TAG_ENCODING}\n"
            ),
        )?;
        write_file(
            &root.path().join("manifest-md5.txt"),
            &format!("{payload_md5}  data/{payload_name}\n"),
        )?;
        write_file(
            &root.path().join("manifest-sha256.txt"),
            &format!("{payload_sha256}  data/{payload_name}\n"),
        )?;
        write_file(
            &root.path().join("bag-info.txt"),
            &format!(
                "Source-Organization: {}\nBagging-Date: {}\nBag-Count: 1 of 1\nPayload-Oxum: {payload_size}.1\n",
                self.config.source_organization,
                bagging_date(),
            ),
        )?;
        write_file(
            &root.path().join("aptrust-info.txt"),
            &format!(
                "Title: {payload_name}\nAccess: {}\nStorage-Option: {}\n",
                self.config.access, self.config.storage_option,
            ),
        )?;

        debug!(bag = %name, payload = %payload_name, payload_size, "staged bag");

        Ok(Bag {
            root,
            name,
            payload_name,
            payload_size,
            payload_md5,
            payload_sha256,
        })
    }
}

fn file_name(payload: &Path) -> Result<String, PackagingError> {
    payload
        .file_name()
        .and_then(|name| name.to_str())
        .map(ToString::to_string)
        .ok_or_else(|| PackagingError::Payload {
            path: payload.to_path_buf(),
            source: io::Error::new(ErrorKind::InvalidInput, "payload has no usable file name"),
        })
}

fn stem(payload_name: &str) -> &str {
    Path::new(payload_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(payload_name)
}

fn bagging_date() -> String {
    let today = OffsetDateTime::now_utc().date();
    format!(
        "{:04}-{:02}-{:02}",
        today.year(),
        u8::from(today.month()),
        today.day()
    )
}

fn write_file(path: &Path, contents: &str) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(contents.as_bytes())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{EnvSnapshot, ReplicaConfig};
    use tempfile::tempdir;

    pub(crate) fn test_config() -> ReplicaConfig {
        ReplicaConfig::from_snapshot(&EnvSnapshot::testing(&[
            ("APS_AWS_BUCKET", "aptrust.receiving.test.edu"),
            ("APS_AWS_ACCESS_KEY", "AKIAEXAMPLE"),
            ("APS_AWS_SECRET_ACCESS_KEY", "secret"),
            ("APS_INSTITUTION", "test.edu"),
            ("APS_PHAROS_URL", "https://repo.aptrust.org/member-api/v2/"),
            ("APS_PHAROS_USER", "ops@test.edu"),
            ("APS_PHAROS_KEY", "api-key"),
        ]))
        .unwrap()
    }

    #[test]
    fn stages_payload_manifests_and_tags() {
        let temp = tempdir().unwrap();
        let payload = temp.path().join("report.txt");
        fs::write(&payload, b"annual report").unwrap();

        let config = test_config();
        let bag = BagBuilder::new(&config).stage(&payload).unwrap();

        assert_eq!(bag.name(), "test.edu.report");
        assert_eq!(bag.payload_name(), "report.txt");
        assert_eq!(bag.payload_size(), 13);
        assert!(payload.exists());

        let staged = bag.dir().join("data/report.txt");
        assert_eq!(fs::read(&staged).unwrap(), b"annual report");

        let manifest = fs::read_to_string(bag.dir().join("manifest-md5.txt")).unwrap();
        assert_eq!(
            manifest,
            format!("{}  data/report.txt\n", md5_hex(&staged).unwrap())
        );
        let manifest = fs::read_to_string(bag.dir().join("manifest-sha256.txt")).unwrap();
        assert!(manifest.ends_with("  data/report.txt\n"));

        let info = fs::read_to_string(bag.dir().join("bag-info.txt")).unwrap();
        assert!(info.contains("Source-Organization: test.edu"));
        assert!(info.contains("Bag-Count: 1 of 1"));
        assert!(info.contains("Payload-Oxum: 13.1"));

        let service = fs::read_to_string(bag.dir().join("aptrust-info.txt")).unwrap();
        assert!(service.contains("Title: report.txt"));
        assert!(service.contains("Access: Institution"));
        assert!(service.contains("Storage-Option: Standard"));
    }

    #[test]
    fn dropping_a_bag_releases_the_staging_tree() {
        let temp = tempdir().unwrap();
        let payload = temp.path().join("report.txt");
        fs::write(&payload, b"bytes").unwrap();

        let config = test_config();
        let bag = BagBuilder::new(&config).stage(&payload).unwrap();
        let staging_root = bag.dir().to_path_buf();
        assert!(staging_root.exists());
        drop(bag);
        assert!(!staging_root.exists());
    }

    #[test]
    fn unreadable_payload_aborts_without_residue() {
        let temp = tempdir().unwrap();
        let config = test_config();
        let err = BagBuilder::new(&config)
            .stage(&temp.path().join("does-not-exist.txt"))
            .unwrap_err();
        assert!(matches!(err, PackagingError::Payload { .. }));
    }
}
