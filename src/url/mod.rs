//! URL handling module for Crawl-Relay
//!
//! Target URLs arrive as plain strings. They are validated here before the
//! first fetch attempt so a malformed URL fails without touching the network.

use crate::ValidationError;
use url::Url;

/// Parses and validates a URL to be crawled
///
/// Accepts absolute HTTP(S) URLs with a host. Surrounding whitespace is
/// ignored.
///
/// # Examples
///
/// ```
/// use crawl_relay::url::parse_target_url;
///
/// let url = parse_target_url(" https://example.com/page ").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page");
///
/// assert!(parse_target_url("ftp://example.com/").is_err());
/// assert!(parse_target_url("not a url").is_err());
/// ```
pub fn parse_target_url(raw: &str) -> Result<Url, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }

    Ok(url)
}
