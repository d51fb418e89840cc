//! Single-URL crawl operation
//!
//! Wraps one fetcher call with retry and backoff and normalizes the outcome
//! into a [`UrlResult`] or a [`UrlError`]. Each invocation owns its attempt
//! counter and timer, so any number of operations may run concurrently.

use crate::crawler::fetcher::{FetchError, FetchedPage, Fetcher};
use crate::crawler::parser::extract_media;
use crate::crawler::policy::{CrawlPolicy, RetryPolicy};
use crate::output::{CrawlMetadata, UrlError, UrlResult};
use crate::url::parse_target_url;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Crawls one URL, retrying failed attempts per `retry`
///
/// - A syntactically invalid URL fails immediately with zero attempts.
/// - The first successful attempt ends the operation.
/// - Once attempts are exhausted the error carries the last failure message
///   and the number of attempts actually made.
/// - Cancelling `cancel` stops further retries; an attempt already in
///   flight is allowed to finish.
pub async fn crawl_url(
    fetcher: &dyn Fetcher,
    url: &str,
    policy: &CrawlPolicy,
    retry: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<UrlResult, UrlError> {
    let target = match parse_target_url(url) {
        Ok(target) => target,
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "Rejecting invalid URL");
            return Err(UrlError::not_attempted(url, e.to_string()));
        }
    };

    let mut attempts: u32 = 0;

    let (error, last_attempt) = loop {
        attempts += 1;
        let started = Utc::now();

        let error = match fetch_once(fetcher, &target, policy).await {
            Ok(page) => {
                tracing::debug!(url = %url, attempt = attempts, "Crawled page");
                return Ok(build_result(url, &target, page, policy));
            }
            Err(e) => e,
        };

        tracing::warn!(
            url = %url,
            attempt = attempts,
            max_attempts = retry.max_attempts,
            error = %error,
            "Fetch attempt failed"
        );

        if attempts >= retry.max_attempts {
            break (error, started);
        }

        let delay = retry.delay_after(attempts);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(url = %url, attempt = attempts, "Retry cancelled");
                break (error, started);
            }
            _ = tokio::time::sleep(delay) => {}
        }
    };

    Err(UrlError {
        url: url.to_string(),
        error: error.to_string(),
        attempt_count: attempts,
        last_attempt,
    })
}

async fn fetch_once(
    fetcher: &dyn Fetcher,
    target: &Url,
    policy: &CrawlPolicy,
) -> Result<FetchedPage, FetchError> {
    let page = fetcher.fetch(target, policy).await?;

    if page.html.trim().is_empty() {
        return Err(FetchError::EmptyContent);
    }

    Ok(page)
}

fn build_result(url: &str, target: &Url, page: FetchedPage, policy: &CrawlPolicy) -> UrlResult {
    let base = Url::parse(&page.final_url).unwrap_or_else(|_| target.clone());
    let media = extract_media(&page.html, &base, policy.extract_images, policy.extract_links);

    UrlResult {
        url: url.to_string(),
        markdown: page.markdown,
        images: media.images,
        links: media.links,
        metadata: CrawlMetadata {
            crawl_time: Utc::now(),
            content_type: page.content_type,
            status_code: page.status_code,
            headers: page.headers,
            final_url: page.final_url,
        },
        extracted_content: None,
        extraction_error: None,
    }
}
