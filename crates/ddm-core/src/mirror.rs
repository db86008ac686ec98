//! Mirror Selector: races a set of candidate URLs and returns the first that
//! responds 200 within a shared deadline.

use crate::cancel::CancelToken;
use crate::config::{Credentials, RunConfig};
use crate::cookie_jar::CookieJar;
use crate::error::{DdmError, ExpectedKind};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const SELECTION_DEADLINE: Duration = Duration::from_secs(15);
/// How often the rendezvous wait re-checks the shared cancellation token.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Parses candidate URLs from a newline-delimited list: blank lines and `#`
/// comments are ignored, surrounding whitespace is trimmed.
pub fn parse_candidates(text: &str) -> Vec<String> {
    text.lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| l.to_string())
        .collect()
}

/// Races `candidates`, releasing every probe from a start barrier at once and
/// returning the first URL whose GET observes a 200 within 15 seconds.
///
/// Candidates that fail to parse as a request (malformed URL, etc.) are
/// skipped rather than failing the whole race.
pub fn select(
    candidates: &[String],
    run_config: &RunConfig,
    cookie_jar: &CookieJar,
    cancel: &CancelToken,
) -> Result<String, DdmError> {
    if candidates.is_empty() {
        return Err(DdmError::Expected(ExpectedKind::Other(
            "no mirror candidates given".to_string(),
        )));
    }

    let barrier = Arc::new(std::sync::Barrier::new(candidates.len()));
    let (tx, rx) = mpsc::sync_channel::<String>(1);

    thread::scope(|scope| {
        for url in candidates {
            let barrier = Arc::clone(&barrier);
            let tx = tx.clone();
            scope.spawn(move || {
                barrier.wait();
                let deadline_at = Instant::now() + SELECTION_DEADLINE;
                if probe_is_200(url, run_config, cookie_jar, deadline_at, cancel) {
                    let _ = tx.try_send(url.clone());
                }
            });
        }
        drop(tx);

        // Poll in short slices rather than one long `recv_timeout` so the
        // global cancellation token is observed promptly instead of only
        // once the whole 15-second race window elapses.
        let overall_deadline = Instant::now() + SELECTION_DEADLINE + Duration::from_millis(500);
        loop {
            if cancel.is_canceled() {
                return Err(DdmError::Expected(ExpectedKind::Canceled));
            }
            let remaining = overall_deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(DdmError::Expected(ExpectedKind::Other(
                    "mirror selection deadline exceeded".to_string(),
                )));
            }
            match rx.recv_timeout(remaining.min(CANCEL_POLL_INTERVAL)) {
                Ok(winner) => return Ok(winner),
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(DdmError::Expected(ExpectedKind::Other(
                        "mirror selection deadline exceeded".to_string(),
                    )))
                }
            }
        }
    })
}

/// One probe: GET `url`, abort the body the instant the status is known (the
/// winner is re-resolved in full by the resolver afterward), report whether
/// the status was 200.
fn probe_is_200(
    url: &str,
    run_config: &RunConfig,
    cookie_jar: &CookieJar,
    deadline_at: Instant,
    cancel: &CancelToken,
) -> bool {
    let remaining = deadline_at.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        return false;
    }

    let Ok(parsed) = url::Url::parse(url) else {
        return false;
    };

    let mut easy = curl::easy::Easy::new();
    if easy.url(url).is_err() {
        return false;
    }
    let _ = easy.follow_location(true);
    let _ = easy.connect_timeout(remaining);
    let _ = easy.timeout(remaining);
    let _ = easy.ssl_verify_peer(!run_config.no_check_cert);
    let _ = easy.ssl_verify_host(!run_config.no_check_cert);
    if !run_config.headers.contains("User-Agent") && !run_config.user_agent.is_empty() {
        let _ = easy.useragent(crate::user_agent::canned(&run_config.user_agent));
    }
    if let Some(Credentials { username, password }) = &run_config.credentials {
        let mut auth = curl::easy::Auth::new();
        auth.basic(true);
        let _ = easy.http_auth(&auth);
        let _ = easy.username(username);
        let _ = easy.password(password);
    }

    let mut list = curl::easy::List::new();
    for (name, value) in run_config.headers.iter() {
        if name.eq_ignore_ascii_case("Cookie") {
            continue;
        }
        let _ = list.append(&format!("{name}: {value}"));
    }
    if let Some(cookie_header) = cookie_jar.header_for(&parsed) {
        let _ = list.append(&format!("Cookie: {cookie_header}"));
    }
    let _ = easy.http_headers(list);
    let _ = easy.progress(true);

    {
        let mut transfer = easy.transfer();
        let _ = transfer.write_function(|_data| Ok(0));
        let _ = transfer
            .progress_function(|_dltotal, _dlnow, _ultotal, _ulnow| !cancel.is_canceled());
        match transfer.perform() {
            Ok(()) => {}
            Err(e) if e.is_write_error() => {}
            Err(_) => return false,
        }
    }

    easy.response_code().map(|c| c == 200).unwrap_or(false)
}
