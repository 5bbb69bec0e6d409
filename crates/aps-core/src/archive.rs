//! Bag serialization: one deterministic gzip tarball per bag.

use std::fs::{self, File};
use std::io::{self, ErrorKind};
use std::path::Path;

use flate2::{Compression, GzBuilder};
use tar::Header;
use tempfile::NamedTempFile;
use tracing::debug;
use walkdir::WalkDir;

use crate::bag::Bag;
use crate::error::PackagingError;

/// A serialized bag awaiting upload.
///
/// The archive is a temporary file; it disappears when this value is
/// dropped, so a staged transfer unit never outlives the call that made
/// it, on success or failure.
pub struct StagedArchive {
    file: NamedTempFile,
    name: String,
    size: u64,
}

impl StagedArchive {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// File name the archive travels under: `{bag-name}.tgz`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Serialize `bag` into a gzip-compressed tarball with stable entry paths.
///
/// Entries are written in sorted order under the bag's deterministic name,
/// with fixed ownership, modes, and timestamps, so the same bag layout
/// always produces the same archive bytes. Each source file is deleted as
/// soon as its entry is committed — the bag tree and the archive are never
/// both fully resident — and the emptied staging root is removed at the
/// end. Any entry failure aborts, dropping both the partial archive and
/// the remaining staging tree.
pub fn archive_bag(bag: Bag) -> Result<StagedArchive, PackagingError> {
    let name = format!("{}.tgz", bag.name());
    let file = tempfile::Builder::new()
        .prefix(&format!("{}-", bag.name()))
        .suffix(".tgz")
        .tempfile()?;

    {
        let encoder = GzBuilder::new()
            .mtime(0)
            .write(file.as_file(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder.follow_symlinks(false);

        for entry in WalkDir::new(bag.dir()).sort_by(|a, b| a.path().cmp(b.path())) {
            let entry = entry.map_err(|err| PackagingError::Io(io::Error::from(err)))?;
            let path = entry.path();
            if path == bag.dir() {
                continue;
            }
            let rel = path.strip_prefix(bag.dir()).map_err(|err| {
                PackagingError::Io(io::Error::new(ErrorKind::InvalidData, err.to_string()))
            })?;
            let entry_path = format!("{}/{}", bag.name(), normalize_entry_path(rel)?);

            let metadata = fs::symlink_metadata(path).map_err(|source| PackagingError::Entry {
                entry: entry_path.clone(),
                source,
            })?;
            let mut header = Header::new_gnu();
            header.set_mtime(0);
            header.set_uid(0);
            header.set_gid(0);
            let _ = header.set_username("");
            let _ = header.set_groupname("");

            if metadata.is_dir() {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_mode(0o755);
                header.set_size(0);
                builder
                    .append_data(&mut header, Path::new(&entry_path), io::empty())
                    .map_err(|source| PackagingError::Entry {
                        entry: entry_path.clone(),
                        source,
                    })?;
            } else if metadata.is_file() {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_mode(0o644);
                header.set_size(metadata.len());
                let source = File::open(path).map_err(|source| PackagingError::Entry {
                    entry: entry_path.clone(),
                    source,
                })?;
                builder
                    .append_data(&mut header, Path::new(&entry_path), source)
                    .map_err(|source| PackagingError::Entry {
                        entry: entry_path.clone(),
                        source,
                    })?;
                // Entry committed; drop the source so the tree and the
                // archive are never both fully resident.
                fs::remove_file(path).map_err(|source| PackagingError::Entry {
                    entry: entry_path.clone(),
                    source,
                })?;
            }
            // Bags contain only regular files and directories.
        }

        builder.finish().map_err(PackagingError::Io)?;
        let encoder = builder.into_inner().map_err(PackagingError::Io)?;
        encoder.finish().map_err(PackagingError::Io)?;
    }

    let size = file.as_file().metadata()?.len();
    bag.close()?;
    debug!(archive = %name, size, "serialized bag");

    Ok(StagedArchive { file, name, size })
}

fn normalize_entry_path(path: &Path) -> Result<String, PackagingError> {
    let normalized = path.to_string_lossy().replace('\\', "/");
    if normalized.is_empty() || normalized.starts_with('/') {
        return Err(PackagingError::Io(io::Error::new(
            ErrorKind::InvalidData,
            format!("archive entries must be relative (got {normalized})"),
        )));
    }
    Ok(normalized)
}
