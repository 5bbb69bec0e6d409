use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use aps_domain::ObjectRecord;
use time::OffsetDateTime;

use super::{BucketError, BucketStore};

/// In-memory bucket for tests and embedding.
///
/// Tracks how many uploads it accepted so tests can assert that the
/// checksum gate really short-circuited a redundant transfer.
#[derive(Default)]
pub struct MemoryBucket {
    objects: Mutex<HashMap<String, (ObjectRecord, Vec<u8>)>>,
    puts: AtomicUsize,
}

impl MemoryBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of uploads accepted since construction.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }
}

impl BucketStore for MemoryBucket {
    fn head(&self, key: &str) -> Result<Option<ObjectRecord>, BucketError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .get(key)
            .map(|(record, _)| record.clone()))
    }

    fn get(&self, key: &str, dest: &Path) -> Result<Option<u64>, BucketError> {
        let objects = self.objects.lock().unwrap();
        let Some((record, bytes)) = objects.get(key) else {
            return Ok(None);
        };
        fs::write(dest, bytes)?;
        Ok(Some(record.size_bytes))
    }

    fn put(
        &self,
        key: &str,
        source: &Path,
        content_type: &str,
        checksum: &str,
    ) -> Result<u64, BucketError> {
        let bytes = fs::read(source)?;
        let record = ObjectRecord {
            size_bytes: bytes.len() as u64,
            checksum: checksum.to_string(),
            content_type: content_type.to_string(),
            last_modified: OffsetDateTime::now_utc(),
        };
        let size = record.size_bytes;
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (record, bytes));
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(size)
    }

    fn delete(&self, key: &str) -> Result<bool, BucketError> {
        Ok(self.objects.lock().unwrap().remove(key).is_some())
    }

    fn copy(&self, src_key: &str, dest_key: &str) -> Result<bool, BucketError> {
        let mut objects = self.objects.lock().unwrap();
        let Some(entry) = objects.get(src_key).cloned() else {
            return Ok(false);
        };
        objects.insert(dest_key.to_string(), entry);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn put_head_get_delete_round_trip() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("payload.txt");
        fs::write(&source, b"hello").unwrap();

        let bucket = MemoryBucket::new();
        let size = bucket
            .put("backups/payload.txt", &source, "text/plain", "abc123")
            .unwrap();
        assert_eq!(size, 5);
        assert_eq!(bucket.put_count(), 1);

        let record = bucket.head("backups/payload.txt").unwrap().unwrap();
        assert_eq!(record.checksum, "abc123");
        assert_eq!(record.content_type, "text/plain");

        let dest = temp.path().join("out.txt");
        let fetched = bucket.get("backups/payload.txt", &dest).unwrap();
        assert_eq!(fetched, Some(5));
        assert_eq!(fs::read(&dest).unwrap(), b"hello");

        assert!(bucket.delete("backups/payload.txt").unwrap());
        assert!(!bucket.delete("backups/payload.txt").unwrap());
    }

    #[test]
    fn absent_keys_are_none_not_errors() {
        let temp = tempdir().unwrap();
        let bucket = MemoryBucket::new();
        assert!(bucket.head("nowhere/x").unwrap().is_none());
        let dest = temp.path().join("out");
        assert!(bucket.get("nowhere/x", &dest).unwrap().is_none());
        assert!(!dest.exists());
        assert!(!bucket.copy("nowhere/x", "nowhere/y").unwrap());
    }
}
