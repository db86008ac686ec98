//! Content-Disposition filename extraction.
//!
//! Applies the grammar `filename[^;\n=]*=(['"](.*?)['"]|[^;\n]*)` globally
//! rather than hand-parsing `;`-separated parameters: each match's quoted
//! group wins if non-empty, otherwise the whole match is checked for the
//! `UTF-8''...` RFC 5987 shape before being returned as-is.

use regex::Regex;
use std::sync::OnceLock;

fn pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"filename[^;\n=]*=(['"](.*?)['"]|[^;\n]*)"#).unwrap())
}

/// Extracts the filename from a raw Content-Disposition header value per the
/// grammar above. Returns `None` if no match yields a usable filename.
pub fn parse_content_disposition_filename(header_value: &str) -> Option<String> {
    for caps in pattern().captures_iter(header_value) {
        let whole = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let quoted = caps.get(2).map(|m| m.as_str());

        if let Some(q) = quoted {
            if !q.is_empty() {
                return Some(q.to_string());
            }
        }

        let parts: Vec<&str> = whole.split('\'').collect();
        if parts.len() == 3 && parts[0].eq_ignore_ascii_case("utf-8") {
            if let Ok(decoded) = percent_decode(parts[2]) {
                if !decoded.is_empty() {
                    return Some(decoded);
                }
            }
        } else if whole != "\"\"" && !whole.is_empty() {
            return Some(whole.to_string());
        }
    }
    None
}

/// Percent-decodes `input` into raw bytes, also reused by `url_model::path`
/// to decode the final URL path segment.
pub(crate) fn percent_decode_bytes(input: &str) -> Vec<u8> {
    let mut out = Vec::new();
    let mut bytes = input.as_bytes().iter().cloned();
    while let Some(b) = bytes.next() {
        if b == b'%' {
            let h = bytes.next().and_then(hex_digit);
            let l = bytes.next().and_then(hex_digit);
            match (h, l) {
                (Some(high), Some(low)) => out.push(high << 4 | low),
                _ => {
                    out.push(b'%');
                    if let Some(x) = h {
                        out.push(x);
                    }
                    if let Some(x) = l {
                        out.push(x);
                    }
                }
            }
        } else {
            out.push(b);
        }
    }
    out
}

/// Simple percent-decode for the RFC 5987 `filename*` value.
fn percent_decode(input: &str) -> Result<String, std::str::Utf8Error> {
    Ok(String::from_utf8_lossy(&percent_decode_bytes(input)).into_owned())
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quoted() {
        let r = parse_content_disposition_filename("attachment; filename=\"report.pdf\"");
        assert_eq!(r.as_deref(), Some("report.pdf"));
    }

    #[test]
    fn parse_token() {
        let r = parse_content_disposition_filename("attachment; filename=report.pdf");
        assert_eq!(r.as_deref(), Some("report.pdf"));
    }

    #[test]
    fn parse_filename_star_utf8() {
        let r = parse_content_disposition_filename("attachment; filename*=UTF-8''caf%C3%A9.txt");
        assert_eq!(r.as_deref(), Some("café.txt"));
    }

    #[test]
    fn first_matching_param_wins_when_filename_comes_first() {
        let r = parse_content_disposition_filename(
            "attachment; filename=\"fallback.bin\"; filename*=UTF-8''real%20name.dat",
        );
        assert_eq!(r.as_deref(), Some("fallback.bin"));
    }

    #[test]
    fn filename_star_wins_when_listed_first() {
        let r = parse_content_disposition_filename(
            "attachment; filename*=UTF-8''real%20name.dat; filename=\"fallback.bin\"",
        );
        assert_eq!(r.as_deref(), Some("real name.dat"));
    }

    #[test]
    fn empty_quotes_are_skipped_in_favor_of_the_next_match() {
        let r = parse_content_disposition_filename("attachment; filename=\"\"; filename=real.bin");
        assert_eq!(r.as_deref(), Some("real.bin"));
    }

    #[test]
    fn no_filename_param_yields_none() {
        assert_eq!(parse_content_disposition_filename("attachment"), None);
    }
}
