/// Select the content type recorded with an uploaded file, from its name.
///
/// The recognized cases are the ones the staging pipeline actually
/// produces: uncompressed bag archives, gzip-compressed bag archives, and
/// plain text. Everything else is generic binary.
pub fn content_type_for(name: &str) -> &'static str {
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        "application/x-gzip"
    } else if name.ends_with(".tar") {
        "application/x-tar"
    } else if name.ends_with(".txt") {
        "text/plain"
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::content_type_for;

    #[test]
    fn recognizes_archive_and_text_extensions() {
        assert_eq!(content_type_for("bag.tgz"), "application/x-gzip");
        assert_eq!(content_type_for("bag.tar.gz"), "application/x-gzip");
        assert_eq!(content_type_for("bag.tar"), "application/x-tar");
        assert_eq!(content_type_for("notes.txt"), "text/plain");
    }

    #[test]
    fn anything_else_is_generic_binary() {
        assert_eq!(content_type_for("data.bin"), "application/octet-stream");
        assert_eq!(content_type_for("tarball"), "application/octet-stream");
    }
}
