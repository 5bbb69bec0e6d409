use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Durable metadata the backing store holds for one object.
///
/// Created on upload, refreshed on re-upload, destroyed on removal. The
/// store queries it before mutating operations so it never re-downloads
/// content just to learn its size or digest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectRecord {
    pub size_bytes: u64,
    /// Hex digest of the payload the object was staged from.
    pub checksum: String,
    pub content_type: String,
    pub last_modified: OffsetDateTime,
}

impl ObjectRecord {
    /// RFC 3339 rendering of the last-modified instant.
    pub fn modified_rfc3339(&self) -> String {
        self.last_modified.format(&Rfc3339).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn modified_renders_as_rfc3339() {
        let record = ObjectRecord {
            size_bytes: 42,
            checksum: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
            content_type: "application/x-gzip".to_string(),
            last_modified: datetime!(2019-10-11 12:30:00 UTC),
        };
        assert_eq!(record.modified_rfc3339(), "2019-10-11T12:30:00Z");
    }
}
