//! Resolver / Follower: turns a starting URL into a `Session` describing the
//! final resource, following redirects manually so the `Location` header and
//! the cookie jar stay under this component's control.

use crate::cancel::CancelToken;
use crate::config::{Credentials, RunConfig};
use crate::cookie_jar::CookieJar;
use crate::error::{DdmError, ExpectedKind};
use crate::session::{HeaderMap, Session};
use crate::url_model;
use anyhow::{Context, Result};
use std::str;
use std::time::Duration;
use url::Url;

const MAX_REDIRECTS: u32 = 10;

/// Resolved response headers, collected by `probe` for one hop of the chain.
struct Hop {
    status: u32,
    location: Option<String>,
    content_length: i64,
    accept_ranges: String,
    content_type: String,
    content_md5: String,
    content_disposition: Option<String>,
    set_cookie: Vec<String>,
}

/// Follows redirects from `start_url`, producing a `Session` skeleton.
///
/// `output_name` is the user-supplied `-o/--output` override, if any, and
/// takes precedence over both `Content-Disposition` and the URL path.
pub fn resolve(
    start_url: &str,
    run_config: &RunConfig,
    output_name: Option<&str>,
    cookie_jar: &CookieJar,
    cancel: &CancelToken,
) -> Result<Session, DdmError> {
    if let Some(cookie_header) = run_config.headers.get("Cookie") {
        if let Ok(url) = Url::parse(start_url) {
            cookie_jar.seed_from_header(&url, cookie_header);
        }
    }

    let mut current = start_url.to_string();
    let mut redirects = 0u32;

    loop {
        cancel
            .check()
            .map_err(|_| DdmError::Expected(ExpectedKind::Canceled))?;

        let url = Url::parse(&current)
            .with_context(|| format!("invalid URL: {current}"))
            .map_err(DdmError::Unexpected)?;

        let hop = probe(&url, run_config, cookie_jar, cancel).map_err(|e| {
            if cancel.is_canceled() {
                DdmError::Expected(ExpectedKind::Canceled)
            } else {
                DdmError::Unexpected(e)
            }
        })?;
        cookie_jar.ingest_set_cookie(&url, &hop.set_cookie);

        if (300..400).contains(&hop.status) {
            redirects += 1;
            if redirects > MAX_REDIRECTS {
                return Err(DdmError::Expected(ExpectedKind::MaxRedirects));
            }
            let location = hop
                .location
                .ok_or(DdmError::Expected(ExpectedKind::MaxRedirects))?;
            current = url
                .join(&location)
                .map(|u| u.to_string())
                .unwrap_or(location);
            continue;
        }

        if !(200..300).contains(&hop.status) {
            return Err(DdmError::Expected(ExpectedKind::UnexpectedStatus(
                hop.status,
            )));
        }

        let suggested_file_name = output_name
            .map(|s| s.to_string())
            .unwrap_or_else(|| {
                url_model::derive_filename(current.as_str(), hop.content_disposition.as_deref())
            });

        let mut header_map = run_config.headers.clone();
        header_map.remove("Cookie");

        return Ok(Session {
            location: current,
            suggested_file_name,
            content_md5: hop.content_md5,
            accept_ranges: hop.accept_ranges,
            content_type: hop.content_type,
            status_code: hop.status as u16,
            content_length: hop.content_length,
            header_map,
            parts: Vec::new(),
        });
    }
}

/// Issues one GET, reading only the response headers: the body is aborted
/// via a write callback that returns fewer bytes than offered, forcing
/// `CURLE_WRITE_ERROR` the moment headers are available. This is the same
/// "abort via write_function" technique used to surface storage failures
/// during a part transfer, repurposed here to skip downloading a body this
/// component never needs.
fn probe(url: &Url, run_config: &RunConfig, cookie_jar: &CookieJar, cancel: &CancelToken) -> Result<Hop> {
    let mut header_lines: Vec<String> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url.as_str()).context("invalid URL")?;
    easy.follow_location(false)?;
    easy.connect_timeout(run_config.base_timeout)?;
    easy.timeout(Duration::from_secs(60).max(run_config.base_timeout))?;
    easy.ssl_verify_peer(!run_config.no_check_cert)?;
    easy.ssl_verify_host(!run_config.no_check_cert)?;
    easy.progress(true)?;

    let mut list = curl::easy::List::new();
    for (name, value) in run_config.headers.iter() {
        if name.eq_ignore_ascii_case("Cookie") {
            continue;
        }
        list.append(&format!("{name}: {value}"))?;
    }
    if let Some(cookie_header) = cookie_jar.header_for(url) {
        list.append(&format!("Cookie: {cookie_header}"))?;
    }
    easy.http_headers(list)?;

    if !run_config.headers.contains("User-Agent") && !run_config.user_agent.is_empty() {
        easy.useragent(crate::user_agent::canned(&run_config.user_agent))?;
    }

    if let Some(Credentials { username, password }) = &run_config.credentials {
        easy.http_auth(&{
            let mut auth = curl::easy::Auth::new();
            auth.basic(true);
            auth
        })?;
        easy.username(username)?;
        easy.password(password)?;
    }

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                header_lines.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.write_function(|_data| Ok(0))?;
        // Checked on every progress tick so a hung or slow-redirecting
        // server doesn't keep this blocking call alive past a SIGINT.
        transfer.progress_function(|_dltotal, _dlnow, _ultotal, _ulnow| !cancel.is_canceled())?;
        match transfer.perform() {
            Ok(()) => {}
            Err(e) if e.is_write_error() => {}
            Err(e) => return Err(e).context("GET failed"),
        }
    }

    let status = easy.response_code().context("no response code")?;
    Ok(parse_hop(status, &header_lines))
}

fn parse_hop(status: u32, lines: &[String]) -> Hop {
    let mut content_length = -1i64;
    let mut accept_ranges = String::new();
    let mut content_type = String::new();
    let mut content_md5 = String::new();
    let mut content_disposition = None;
    let mut location = None;
    let mut set_cookie = Vec::new();

    for line in lines {
        let line = line.trim();
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value.parse().unwrap_or(-1);
        } else if name.eq_ignore_ascii_case("accept-ranges") {
            accept_ranges = value.to_string();
        } else if name.eq_ignore_ascii_case("content-type") {
            content_type = value.to_string();
        } else if name.eq_ignore_ascii_case("content-md5") {
            content_md5 = value.to_string();
        } else if name.eq_ignore_ascii_case("content-disposition") {
            content_disposition = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("location") {
            location = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("set-cookie") {
            set_cookie.push(value.to_string());
        }
    }

    Hop {
        status,
        location,
        content_length,
        accept_ranges,
        content_type,
        content_md5,
        content_disposition,
        set_cookie,
    }
}

/// Ensures `header_map` carries a `User-Agent`, injecting the canned string
/// for `profile` when absent.
pub fn ensure_user_agent(header_map: &mut HeaderMap, profile: &str) {
    if !header_map.contains("User-Agent") {
        header_map.set("User-Agent", crate::user_agent::canned(profile));
    }
}
