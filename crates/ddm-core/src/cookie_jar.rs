//! A coarse, registrable-domain-keyed cookie jar shared by the resolver and
//! every part worker.
//!
//! This is deliberately not a general-purpose HTTP cookie implementation —
//! no path matching, no expiry, no Secure/HttpOnly flags. Its only job is
//! keeping a session alive across a redirect chain and N parallel part
//! requests, so registrable-domain matching (via `psl`, which embeds the
//! Mozilla Public Suffix List) is all the precision it needs.

use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

/// Thread-safe; cloned `Arc`-style handles share the same jar.
pub struct CookieJar {
    by_domain: Mutex<HashMap<String, HashMap<String, String>>>,
}

impl Default for CookieJar {
    fn default() -> Self {
        Self::new()
    }
}

impl CookieJar {
    pub fn new() -> Self {
        CookieJar {
            by_domain: Mutex::new(HashMap::new()),
        }
    }

    /// Parse a raw `Cookie: name=value; name2=value2` header and seed the jar
    /// against `url`'s registrable domain.
    pub fn seed_from_header(&self, url: &Url, raw: &str) {
        let Some(domain) = registrable_domain(url) else {
            return;
        };
        let mut jar = self.by_domain.lock().unwrap();
        let entry = jar.entry(domain).or_default();
        for pair in raw.split(';') {
            if let Some((name, value)) = parse_cookie_pair(pair) {
                entry.insert(name, value);
            }
        }
    }

    /// Ingest every `Set-Cookie` header line observed for a response to `url`.
    pub fn ingest_set_cookie(&self, url: &Url, set_cookie_lines: &[String]) {
        let Some(domain) = registrable_domain(url) else {
            return;
        };
        let mut jar = self.by_domain.lock().unwrap();
        let entry = jar.entry(domain).or_default();
        for line in set_cookie_lines {
            // Only the first `name=value` attribute-pair is the cookie itself;
            // everything after the first ';' is Path/Expires/etc, which this
            // jar does not track.
            let first = line.split(';').next().unwrap_or(line);
            if let Some((name, value)) = parse_cookie_pair(first) {
                entry.insert(name, value);
            }
        }
    }

    /// Build the `Cookie:` header value to send for `url`, or `None` if the
    /// jar has nothing for its registrable domain.
    pub fn header_for(&self, url: &Url) -> Option<String> {
        let domain = registrable_domain(url)?;
        let jar = self.by_domain.lock().unwrap();
        let entries = jar.get(&domain)?;
        if entries.is_empty() {
            return None;
        }
        let mut pairs: Vec<String> = entries.iter().map(|(k, v)| format!("{k}={v}")).collect();
        pairs.sort();
        Some(pairs.join("; "))
    }
}

fn parse_cookie_pair(raw: &str) -> Option<(String, String)> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let (name, value) = trimmed.split_once('=')?;
    let name = name.trim();
    let value = value.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.to_string()))
}

fn registrable_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    match psl::domain(host.as_bytes()) {
        Some(domain) => Some(String::from_utf8_lossy(domain.as_bytes()).into_owned()),
        None => Some(host.to_string()),
    }
}
