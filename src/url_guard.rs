use reqwest::Url;

/// True iff `url` parses and its scheme is `http` or `https`.
///
/// This is the only admission check applied to caller-supplied URLs; it
/// keeps `file://`, `ftp://` and malformed targets away from the client.
pub fn is_fetchable(url: &str) -> bool {
    match Url::parse(url.trim()) {
        // the parser lower-cases schemes already
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}
