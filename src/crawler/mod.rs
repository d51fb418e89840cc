//! Crawler module for batch page fetching
//!
//! This module contains the core crawling logic, including:
//! - Crawl, retry and session policies
//! - The fetcher boundary and its reqwest implementation
//! - Image and link extraction from fetched HTML
//! - The single-URL crawl operation with retry and backoff
//! - Batch orchestration under a concurrency limit

mod coordinator;
mod fetcher;
mod operation;
mod parser;
mod policy;
mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{BatchRequest, Coordinator, CANCELLED_BEFORE_START};
pub use fetcher::{build_http_client, FetchError, FetchedPage, Fetcher, HttpFetcher};
pub use operation::crawl_url;
pub use parser::{extract_media, PageMedia};
pub use policy::{CrawlPolicy, RetryPolicy};
pub use session::{
    Authentication, BrowserAction, Credentials, InteractionStep, SessionPolicy, WaitCondition,
};
