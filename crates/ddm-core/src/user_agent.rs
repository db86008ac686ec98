//! Canned User-Agent strings selectable via `-a/--user-agent`.

pub const CHROME: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_13_4) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/65.0.3325.181 Safari/537.36";
pub const FIREFOX: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.13; rv:59.0) Gecko/20100101 Firefox/59.0";
pub const SAFARI: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_13_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/11.1 Safari/605.1.15";

/// Resolves a profile name (`chrome`, `firefox`, `safari`) to its canned
/// string. Unknown profiles fall back to `chrome`, matching the CLI default.
pub fn canned(profile: &str) -> &'static str {
    match profile.to_ascii_lowercase().as_str() {
        "firefox" => FIREFOX,
        "safari" => SAFARI,
        _ => CHROME,
    }
}
