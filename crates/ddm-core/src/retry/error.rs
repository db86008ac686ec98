//! Part download error type for retry classification.

use std::fmt;

/// Error returned by a single part-download attempt (curl failure, HTTP
/// error, or storage failure). Kept separate from `anyhow::Error` so the
/// retry loop can classify and decide before the error is ever wrapped for
/// display.
#[derive(Debug)]
pub enum SegmentError {
    /// Curl reported an error (timeout, connection, etc.).
    Curl(curl::Error),
    /// HTTP response had a non-206, non-adopted status.
    Http(u32),
    /// The response had no body at all.
    NilBody,
    /// Transfer completed but fewer bytes were written than expected (e.g.
    /// server closed early).
    PartialTransfer { expected: i64, received: i64 },
    /// Disk/storage write failed (e.g. disk full, permission denied).
    Storage(std::io::Error),
    /// The transfer was aborted mid-flight by the shared cancellation token
    /// (via a `progress_function` callback returning `false`), distinct from
    /// a transport-level failure so the retry loop never treats it as
    /// retryable.
    Canceled,
}

impl fmt::Display for SegmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentError::Curl(e) => write!(f, "{}", e),
            SegmentError::Http(code) => write!(f, "unexpected status {}", code),
            SegmentError::NilBody => write!(f, "nil body"),
            SegmentError::PartialTransfer { expected, received } => {
                write!(f, "partial transfer: expected {} bytes, got {}", expected, received)
            }
            SegmentError::Storage(e) => write!(f, "storage: {}", e),
            SegmentError::Canceled => write!(f, "canceled"),
        }
    }
}

impl std::error::Error for SegmentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SegmentError::Curl(e) => Some(e),
            SegmentError::Storage(e) => Some(e),
            SegmentError::Http(_)
            | SegmentError::NilBody
            | SegmentError::PartialTransfer { .. }
            | SegmentError::Canceled => None,
        }
    }
}
