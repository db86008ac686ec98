//! Maps a `SegmentError` onto the coarse `ErrorKind` the retry policy reasons
//! about.
//!
//! Per spec.md §4.4's status-code branch table, every non-206/non-adopted
//! HTTP response (403, 429, 5xx, anything) falls through to "unexpected
//! status" and is fatal to the attempt round — retries in this engine are a
//! transport-layer concern (timeouts, connection resets), never a status-code
//! one. `classify_http_status` reflects that: it has no retryable case.

use super::error::SegmentError;
use super::policy::ErrorKind;

pub fn classify(err: &SegmentError) -> ErrorKind {
    match err {
        SegmentError::Curl(e) => classify_curl_error(e),
        SegmentError::Http(code) => classify_http_status(*code),
        SegmentError::NilBody => ErrorKind::Other,
        SegmentError::PartialTransfer { .. } => ErrorKind::Connection,
        SegmentError::Storage(_) => ErrorKind::Other,
        // Never actually consulted: `run_with_retry` intercepts `Canceled`
        // before classification and stops with `RetryStop::Canceled`
        // directly. `Other` here is just the exhaustiveness placeholder.
        SegmentError::Canceled => ErrorKind::Other,
    }
}

pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        ErrorKind::Timeout
    } else if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_partial_file()
        || e.is_got_nothing()
    {
        ErrorKind::Connection
    } else {
        ErrorKind::Other
    }
}

pub fn classify_http_status(_code: u32) -> ErrorKind {
    ErrorKind::Other
}
