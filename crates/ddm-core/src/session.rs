//! Session and Part: the persisted record of one download in progress.
//!
//! A `Session` is built once by the resolver (or loaded from a sidecar) and
//! lives for the whole run; its `Parts` are mutated only by their owning
//! worker and read back by the assembler once every worker has joined.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request headers to replay on every outbound request for this session.
///
/// Ordered so the send order is stable; lookups are case-insensitive (per
/// RFC 7230 field-name comparison) while the case used on the wire is
/// whatever was stored, not normalized. A small `Vec` beats a generic
/// multimap crate for this: headers are few per run and insertion order
/// matters more than lookup speed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeaderMap(pub Vec<(String, String)>);

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert or replace a header, preserving the case given here.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if let Some(entry) = self.0.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            entry.1 = value.into();
        } else {
            self.0.push((name, value.into()));
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.0.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A contiguous byte range of the target resource, owned by one worker for
/// the lifetime of an attempt round. Backed by a `<Suggested>.part<i>` file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Part {
    /// Sidecar file name: `<SuggestedFileName>.part<i>`.
    pub file_name: String,
    /// First byte of the assigned range.
    pub start: i64,
    /// Last byte inclusive; <= 0 means "unknown / open-ended".
    pub stop: i64,
    /// Bytes already appended to `file_name`.
    pub written: i64,
    /// True when this part must be discarded (server returned full content to part 0).
    pub skip: bool,
    /// Accumulated wall-clock across attempts (resume-aware).
    #[serde(with = "duration_secs_f64")]
    pub elapsed: Duration,
}

impl Part {
    pub fn new(index: usize, suggested_file_name: &str, start: i64, stop: i64) -> Self {
        Part {
            file_name: format!("{suggested_file_name}.part{index}"),
            start,
            stop,
            written: 0,
            skip: false,
            elapsed: Duration::ZERO,
        }
    }

    /// A part is done iff it's marked `skip`, or it has written strictly more
    /// than `stop - start` bytes. The strict `>` (rather than `>=`) is
    /// intentional: it forces one final read attempt that returns EOF so the
    /// open-ended single-part case (whose `stop` is only known after the
    /// transfer completes) converges correctly. See DESIGN.md.
    pub fn is_done(&self) -> bool {
        self.skip || self.written > self.stop - self.start
    }

    /// `Range: bytes=<start+written>-<stop>`, or `bytes=0-` when `stop` is
    /// still unknown (open-ended part).
    pub fn range_header(&self) -> String {
        if self.stop > 0 {
            format!("bytes={}-{}", self.start + self.written, self.stop)
        } else {
            "bytes=0-".to_string()
        }
    }
}

mod duration_secs_f64 {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs.max(0.0)))
    }
}

/// The persisted record of a download in progress: URL, size, digest, and
/// per-part state. Serialized as pretty-printed JSON to a sidecar file named
/// `<SuggestedFileName>.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// Last known canonical URL (post-redirect).
    pub location: String,
    /// Output file name; also the base for part and state files.
    pub suggested_file_name: String,
    /// Server-advertised digest (may be empty); used only for resume equivalence.
    pub content_md5: String,
    /// `Accept-Ranges` token; `"bytes"` enables ranged parts.
    pub accept_ranges: String,
    /// Informational media type.
    pub content_type: String,
    /// Status of the resolved response.
    pub status_code: u16,
    /// Total size; -1 when unknown.
    pub content_length: i64,
    /// Request headers to replay on resume.
    pub header_map: HeaderMap,
    /// Per-segment state, index is stable identity.
    pub parts: Vec<Part>,
}

impl Session {
    /// True when the server advertised ranged-request support.
    pub fn accepts_ranges(&self) -> bool {
        self.accept_ranges.eq_ignore_ascii_case("bytes")
    }

    /// Sum of bytes written across all non-skipped parts.
    pub fn total_written(&self) -> i64 {
        self.parts
            .iter()
            .filter(|p| !p.skip)
            .map(|p| p.written)
            .sum()
    }

    /// Success predicate used by the orchestrator before handing off to the
    /// assembler: either the known total was reached, or the size was
    /// unknown and at least one part produced data.
    pub fn transfer_complete(&self) -> bool {
        if self.content_length > 0 {
            self.total_written() == self.content_length
        } else {
            self.parts.iter().any(|p| !p.skip && p.written > 0)
        }
    }

    pub fn sidecar_path(&self) -> String {
        format!("{}.json", self.suggested_file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_map_lookup_is_case_insensitive_and_preserves_send_case() {
        let mut h = HeaderMap::new();
        h.set("User-Agent", "ddm/1");
        assert_eq!(h.get("user-agent"), Some("ddm/1"));
        assert_eq!(h.0[0].0, "User-Agent");
        h.set("USER-AGENT", "ddm/2");
        assert_eq!(h.0.len(), 1);
        assert_eq!(h.get("User-Agent"), Some("ddm/2"));
    }

    #[test]
    fn part_done_requires_strictly_more_than_span() {
        let mut p = Part::new(0, "out.bin", 0, 9);
        p.written = 9;
        assert!(!p.is_done(), "exactly filling the span is not yet done");
        p.written = 10;
        assert!(p.is_done());
    }

    #[test]
    fn part_skip_is_always_done() {
        let mut p = Part::new(1, "out.bin", 10, 19);
        p.skip = true;
        assert!(p.is_done());
    }

    #[test]
    fn range_header_open_ended_vs_bounded() {
        let mut p = Part::new(0, "out.bin", 0, 0);
        assert_eq!(p.range_header(), "bytes=0-");
        p.stop = 99;
        p.written = 10;
        assert_eq!(p.range_header(), "bytes=10-99");
    }

    #[test]
    fn transfer_complete_known_length() {
        let mut s = session_fixture(100);
        s.parts[0].written = 50;
        s.parts[1].written = 50;
        assert!(s.transfer_complete());
        s.parts[1].written = 49;
        assert!(!s.transfer_complete());
    }

    #[test]
    fn transfer_complete_unknown_length_needs_some_data() {
        let mut s = session_fixture(-1);
        assert!(!s.transfer_complete());
        s.parts[0].written = 1;
        assert!(s.transfer_complete());
    }

    fn session_fixture(content_length: i64) -> Session {
        Session {
            location: "https://example.com/file.bin".to_string(),
            suggested_file_name: "file.bin".to_string(),
            content_md5: String::new(),
            accept_ranges: "bytes".to_string(),
            content_type: "application/octet-stream".to_string(),
            status_code: 200,
            content_length,
            header_map: HeaderMap::new(),
            parts: vec![
                Part::new(0, "file.bin", 0, 49),
                Part::new(1, "file.bin", 50, 99),
            ],
        }
    }
}
