//! Filename extraction from URL path.

use super::content_disposition::percent_decode_bytes;

/// Extracts the last path segment from a URL for use as a filename hint,
/// percent-decoding it per spec.md §4.1 ("the final URL's last path segment
/// after stripping query and percent-decoding"). Falls back to the raw
/// (still percent-encoded) segment if decoding produces invalid UTF-8.
///
/// Returns `None` if the URL cannot be parsed or the path is empty/root.
pub fn filename_from_url_path(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let path = parsed.path();
    let segment = path.split('/').filter(|s| !s.is_empty()).last()?;
    if segment.is_empty() || segment == "." || segment == ".." {
        return None;
    }
    let decoded = match std::str::from_utf8(&percent_decode_bytes(segment)) {
        Ok(s) => s.to_string(),
        Err(_) => segment.to_string(),
    };
    Some(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal() {
        assert_eq!(
            filename_from_url_path("https://example.com/a/b/file.deb").as_deref(),
            Some("file.deb")
        );
        assert_eq!(
            filename_from_url_path("https://example.com/single").as_deref(),
            Some("single")
        );
    }

    #[test]
    fn root_or_empty() {
        assert_eq!(filename_from_url_path("https://example.com/"), None);
        assert_eq!(filename_from_url_path("https://example.com"), None);
    }

    #[test]
    fn with_query() {
        assert_eq!(
            filename_from_url_path("https://example.com/file.zip?token=abc").as_deref(),
            Some("file.zip")
        );
    }

    #[test]
    fn percent_encoded_segment_is_decoded() {
        assert_eq!(
            filename_from_url_path("https://example.com/a%20file.zip").as_deref(),
            Some("a file.zip")
        );
        assert_eq!(
            filename_from_url_path("https://example.com/caf%C3%A9.txt").as_deref(),
            Some("café.txt")
        );
    }

    #[test]
    fn invalid_utf8_percent_sequence_falls_back_to_raw_segment() {
        assert_eq!(
            filename_from_url_path("https://example.com/bad%FF%FEname").as_deref(),
            Some("bad%FF%FEname")
        );
    }
}
