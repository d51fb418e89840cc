//! HTML parser for extracting page media
//!
//! This module handles parsing raw HTML to extract:
//! - Image sources (from `<img src>`)
//! - Link targets (from `<a href>`)

use scraper::{Html, Selector};
use url::Url;

/// Images and links found on a page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMedia {
    /// Absolute image URLs, in document order
    pub images: Vec<String>,

    /// Absolute link URLs, in document order
    pub links: Vec<String>,
}

/// Extracts images and/or links from an HTML document
///
/// Only the requested collections are populated; the other stays empty.
///
/// # Reference Rules
///
/// **Excluded:**
/// - `javascript:`, `mailto:`, `tel:` references
/// - Data URIs
/// - Fragment-only references (`#section`)
/// - Anything that does not resolve to an HTTP(S) URL
///
/// Relative references are resolved against `base_url`, which should be the
/// final URL of the page after redirects.
///
/// # Example
///
/// ```
/// use crawl_relay::crawler::extract_media;
/// use url::Url;
///
/// let html = r#"<a href="/next">Next</a><img src="logo.png">"#;
/// let base = Url::parse("https://example.com/").unwrap();
/// let media = extract_media(html, &base, true, true);
/// assert_eq!(media.links, vec!["https://example.com/next"]);
/// assert_eq!(media.images, vec!["https://example.com/logo.png"]);
/// ```
pub fn extract_media(
    html: &str,
    base_url: &Url,
    extract_images: bool,
    extract_links: bool,
) -> PageMedia {
    if !extract_images && !extract_links {
        return PageMedia::default();
    }

    let document = Html::parse_document(html);

    PageMedia {
        images: if extract_images {
            collect_attribute(&document, "img[src]", "src", base_url)
        } else {
            Vec::new()
        },
        links: if extract_links {
            collect_attribute(&document, "a[href]", "href", base_url)
        } else {
            Vec::new()
        },
    }
}

fn collect_attribute(document: &Html, selector: &str, attribute: &str, base_url: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr(attribute))
        .filter_map(|value| resolve_reference(value, base_url))
        .collect()
}

/// Resolves an href/src value to an absolute URL and validates it
///
/// Returns None if the reference should be excluded.
fn resolve_reference(reference: &str, base_url: &Url) -> Option<String> {
    let reference = reference.trim();

    if reference.is_empty() || reference.starts_with('#') {
        return None;
    }

    if reference.starts_with("javascript:")
        || reference.starts_with("mailto:")
        || reference.starts_with("tel:")
        || reference.starts_with("data:")
    {
        return None;
    }

    match base_url.join(reference) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute.to_string())
        }
        _ => None,
    }
}
