//! Page fetching
//!
//! This module defines the boundary the crawl operation fetches through:
//! - The [`Fetcher`] trait and the page it returns
//! - Error classification for failed attempts
//! - [`HttpFetcher`], a reqwest-backed implementation that converts the
//!   returned HTML into markdown

use crate::config::UserAgentConfig;
use crate::crawler::policy::CrawlPolicy;
use crate::crawler::session::Authentication;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, redirect::Policy, Client};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A page returned by a successful fetch
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    /// Rendered markdown for the page
    pub markdown: String,

    /// Raw HTML body
    pub html: String,

    /// HTTP status code of the final response
    pub status_code: u16,

    /// Response headers
    pub headers: HashMap<String, String>,

    /// Content-Type header value, if any
    pub content_type: Option<String>,

    /// Final URL after redirects
    pub final_url: String,
}

/// Reasons a single fetch attempt failed
///
/// Every variant counts as a failed attempt and is retried by the crawl
/// operation until its retry policy is exhausted.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("Render error: {0}")]
    Render(String),

    #[error("Page returned no HTML content")]
    EmptyContent,
}

/// Fetches and renders a single page
///
/// Implementations must be safe to call concurrently and must enforce
/// `policy.page_timeout` themselves.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url, policy: &CrawlPolicy) -> Result<FetchedPage, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use crawl_relay::config::UserAgentConfig;
/// use crawl_relay::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Plain HTTP fetcher
///
/// Honors credentials and `wait` steps from the session policy. Steps that
/// need a live browser (click, scroll, type, submit) are skipped.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn fetch_page(&self, url: &Url, policy: &CrawlPolicy) -> Result<FetchedPage, FetchError> {
        let mut request = self.client.get(url.clone());

        if let Some(session) = &policy.session {
            match session.authentication() {
                Some(Authentication::Bearer(token)) => request = request.bearer_auth(token),
                Some(Authentication::Basic { username, password }) => {
                    request = request.basic_auth(username, password)
                }
                None => {}
            }

            for step in session.browser_steps() {
                tracing::debug!(
                    url = %url,
                    action = ?step.action,
                    "Skipping browser interaction step for plain HTTP fetch"
                );
            }
        }

        let response = request.send().await.map_err(classify_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let html = response.text().await.map_err(classify_error)?;

        if let Some(session) = &policy.session {
            let settle = session.wait_duration();
            if !settle.is_zero() {
                tokio::time::sleep(settle).await;
            }
        }

        let markdown = htmd::convert(&html).map_err(|e| FetchError::Render(e.to_string()))?;

        Ok(FetchedPage {
            markdown,
            html,
            status_code: status.as_u16(),
            headers,
            content_type,
            final_url,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, policy: &CrawlPolicy) -> Result<FetchedPage, FetchError> {
        tracing::debug!(url = %url, timeout = ?policy.page_timeout, "Fetching page");

        match tokio::time::timeout(policy.page_timeout, self.fetch_page(url, policy)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(policy.page_timeout)),
        }
    }
}

fn classify_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Network("Request timeout".to_string())
    } else if e.is_connect() {
        FetchError::Network(format!("Connection failed: {}", e))
    } else {
        FetchError::Network(e.to_string())
    }
}
