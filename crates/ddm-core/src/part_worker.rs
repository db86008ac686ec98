//! Part Worker: transfers one byte range into its segment file, resilient to
//! transient failures and obeying cancellation.
//!
//! Per spec.md §9's note on ordering: a non-index-0 worker must learn the
//! response status before any body byte is written, so it can abort cleanly
//! if the server ignored its Range request. `curl`'s header callback always
//! fires before the write callback for the same response, so the abort flag
//! set in `header_function` is always visible to `write_function` before it
//! sees a single byte — the same header-then-body ordering the resolver
//! relies on to abort early.

use crate::cancel::CancelToken;
use crate::config::Credentials;
use crate::cookie_jar::CookieJar;
use crate::retry::{run_with_retry, RetryPolicy, RetryStop, SegmentError};
use crate::session::{HeaderMap, Part};
use std::cell::{Cell, RefCell};
use std::io::Write;
use std::path::Path;
use std::str;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Shared, read-only context every worker needs; one per run, cloned cheaply
/// (everything behind a reference or an `Arc`-backed handle).
pub struct WorkerContext<'a> {
    pub url: &'a str,
    pub part_index: usize,
    pub header_map: &'a HeaderMap,
    pub credentials: Option<&'a Credentials>,
    pub cookie_jar: &'a CookieJar,
    pub cancel: &'a CancelToken,
    pub base_timeout: Duration,
    pub max_retry: u32,
    pub no_check_cert: bool,
    pub dir: &'a Path,
    /// The monotonic attempt counter the progress UI reads. A single
    /// instance is constructed by the orchestrator and shared by reference
    /// across every worker thread, realizing spec.md §9's "the only
    /// process-wide state" as an explicit handle rather than a hidden
    /// `static`, so tests can each start from zero.
    pub attempt_counter: &'a AtomicU64,
}

/// Runs the full retry loop for one part: attempts the transfer, sleeping
/// between retryable failures, until success, a fatal error, give-up, or
/// cancellation.
pub fn run_part(part: &mut Part, ctx: &WorkerContext) -> Result<(), RetryStop> {
    let policy = RetryPolicy::with_max_retry(ctx.max_retry);
    let result = run_with_retry(&policy, ctx.cancel, |attempt_num| {
        ctx.attempt_counter.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();
        let outcome = one_attempt(part, ctx, attempt_num);
        part.elapsed += started.elapsed();
        outcome
    });

    if part.skip {
        let _ = std::fs::remove_file(ctx.dir.join(&part.file_name));
    }

    result.map(|_attempts| ())
}

fn one_attempt(part: &mut Part, ctx: &WorkerContext, attempt_num: u32) -> Result<(), SegmentError> {
    if part.is_done() {
        return Ok(());
    }

    let deadline = per_attempt_deadline(ctx.base_timeout, attempt_num);
    let range_value = part.range_header();
    let range_for_curl = range_value.trim_start_matches("bytes=").to_string();
    let file_path = ctx.dir.join(&part.file_name);

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&file_path)
        .map_err(SegmentError::Storage)?;

    let status_cell = Cell::new(0u32);
    let adopted_total = Cell::new(None::<i64>);
    let abort_wrong_index = Cell::new(false);
    let write_err: RefCell<Option<std::io::Error>> = RefCell::new(None);
    let written_cell = Cell::new(0i64);

    let mut easy = curl::easy::Easy::new();
    easy.url(ctx.url).map_err(SegmentError::Curl)?;
    easy.follow_location(false).map_err(SegmentError::Curl)?;
    easy.range(&range_for_curl).map_err(SegmentError::Curl)?;
    easy.connect_timeout(ctx.base_timeout).map_err(SegmentError::Curl)?;
    easy.low_speed_limit(1).map_err(SegmentError::Curl)?;
    easy.low_speed_time(deadline).map_err(SegmentError::Curl)?;
    easy.buffer_size(4096).map_err(SegmentError::Curl)?;
    easy.ssl_verify_peer(!ctx.no_check_cert).map_err(SegmentError::Curl)?;
    easy.ssl_verify_host(!ctx.no_check_cert).map_err(SegmentError::Curl)?;
    easy.progress(true).map_err(SegmentError::Curl)?;

    let mut list = curl::easy::List::new();
    for (name, value) in ctx.header_map.iter() {
        if name.eq_ignore_ascii_case("Cookie") {
            continue;
        }
        list.append(&format!("{name}: {value}"))
            .map_err(SegmentError::Curl)?;
    }
    if let Some(cookie_header) = url::Url::parse(ctx.url)
        .ok()
        .and_then(|u| ctx.cookie_jar.header_for(&u))
    {
        list.append(&format!("Cookie: {cookie_header}"))
            .map_err(SegmentError::Curl)?;
    }
    easy.http_headers(list).map_err(SegmentError::Curl)?;

    if let Some(ua) = ctx.header_map.get("User-Agent") {
        easy.useragent(ua).map_err(SegmentError::Curl)?;
    }

    if let Some(Credentials { username, password }) = ctx.credentials {
        let mut auth = curl::easy::Auth::new();
        auth.basic(true);
        easy.http_auth(&auth).map_err(SegmentError::Curl)?;
        easy.username(username).map_err(SegmentError::Curl)?;
        easy.password(password).map_err(SegmentError::Curl)?;
    }

    let perform_result = {
        let mut transfer = easy.transfer();
        let part_index = ctx.part_index;
        transfer
            .header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    let line = s.trim();
                    if let Some(code) = parse_status_line(line) {
                        status_cell.set(code);
                        if part_index != 0 && code == 200 {
                            abort_wrong_index.set(true);
                        }
                    } else if part_index == 0 {
                        if let Some((name, value)) = line.split_once(':') {
                            if name.trim().eq_ignore_ascii_case("content-length") {
                                if let Ok(n) = value.trim().parse::<i64>() {
                                    adopted_total.set(Some(n));
                                }
                            }
                        }
                    }
                }
                true
            })
            .map_err(SegmentError::Curl)?;

        transfer
            .write_function(|data| {
                if abort_wrong_index.get() {
                    return Ok(0);
                }
                match file.write_all(data) {
                    Ok(()) => {
                        written_cell.set(written_cell.get() + data.len() as i64);
                        Ok(data.len())
                    }
                    Err(e) => {
                        *write_err.borrow_mut() = Some(e);
                        Ok(0)
                    }
                }
            })
            .map_err(SegmentError::Curl)?;

        // Checked on every progress tick (curl calls this far more often
        // than once per `write_function` invocation), so a SIGINT during a
        // multi-minute GET is observed well within one buffer-fill rather
        // than only between retry attempts.
        transfer
            .progress_function(move |_dltotal, _dlnow, _ultotal, _ulnow| !ctx.cancel.is_canceled())
            .map_err(SegmentError::Curl)?;

        transfer.perform()
    };

    // Credit bytes already flushed to disk *before* inspecting whether the
    // attempt itself errored. Per spec.md §4.4 step 6 ("every successful
    // byte increments Written"), Written tracks real file contents
    // continuously, not just at the end of a wholly-successful attempt —
    // otherwise a transient failure after N bytes would leave Written
    // unchanged while the append-mode file already holds those N bytes, and
    // the next attempt's Range header would re-request and re-append them,
    // corrupting the segment. The 200-adopt case is the one exception: that
    // response restarts the part from byte 0 (the server ignored Range
    // entirely), so Written is replaced, not added.
    let written_this_attempt = written_cell.get();
    let status = status_cell.get();
    let previously_written = part.written;
    if status == 200 && ctx.part_index == 0 {
        part.written = written_this_attempt;
    } else {
        part.written += written_this_attempt;
    }

    match perform_result {
        Ok(()) => {}
        Err(e) if e.is_aborted_by_callback() => {
            // The progress_function saw the cancellation token fire; never a
            // transport failure, so it must not be classified as retryable.
            return Err(SegmentError::Canceled);
        }
        Err(e) if e.is_write_error() => {
            if let Some(io_err) = write_err.borrow_mut().take() {
                return Err(SegmentError::Storage(io_err));
            }
            // otherwise this is the deliberate wrong-index abort; status
            // handling below takes it from here.
        }
        Err(e) => return Err(SegmentError::Curl(e)),
    }

    match status {
        206 => {
            if written_this_attempt == 0 {
                return Err(SegmentError::NilBody);
            }
            // Per the teacher's own segment download (`downloader/segment.rs`):
            // a 206 with a known Stop must deliver exactly the requested span,
            // or the connection dropped the body short without curl itself
            // reporting a transport error. Treat that as retryable, not success.
            if part.stop > 0 {
                let expected = part.stop - (part.start + previously_written) + 1;
                if written_this_attempt != expected {
                    return Err(SegmentError::PartialTransfer {
                        expected,
                        received: written_this_attempt,
                    });
                }
            }
            Ok(())
        }
        200 if ctx.part_index == 0 => {
            if let Some(total) = adopted_total.get() {
                part.stop = total - 1;
            }
            if written_this_attempt == 0 {
                return Err(SegmentError::NilBody);
            }
            Ok(())
        }
        200 => {
            part.skip = true;
            Ok(())
        }
        other => Err(SegmentError::Http(other)),
    }
}

fn parse_status_line(line: &str) -> Option<u32> {
    if !line.starts_with("HTTP/") {
        return None;
    }
    line.split_whitespace().nth(1)?.parse().ok()
}

fn per_attempt_deadline(base: Duration, attempt: u32) -> Duration {
    let exp: u32 = 1u32 << attempt.saturating_sub(1).min(20);
    base.saturating_mul(exp).min(Duration::from_secs(600))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_uses_base_timeout_exactly() {
        assert_eq!(per_attempt_deadline(Duration::from_secs(15), 1), Duration::from_secs(15));
    }

    #[test]
    fn deadline_doubles_each_attempt_and_caps_at_ten_minutes() {
        assert_eq!(per_attempt_deadline(Duration::from_secs(15), 2), Duration::from_secs(30));
        assert_eq!(per_attempt_deadline(Duration::from_secs(15), 3), Duration::from_secs(60));
        assert_eq!(
            per_attempt_deadline(Duration::from_secs(15), 20),
            Duration::from_secs(600)
        );
    }

    #[test]
    fn parses_status_line() {
        assert_eq!(parse_status_line("HTTP/1.1 206 Partial Content"), Some(206));
        assert_eq!(parse_status_line("HTTP/1.1 404 Not Found"), Some(404));
        assert_eq!(parse_status_line("Content-Length: 10"), None);
    }
}
