//! Crawl-Relay: a batch crawl service
//!
//! This crate fetches many URLs on behalf of a client under a bounded
//! concurrency limit, retries each URL with backoff, and aggregates the
//! per-URL outcomes into a single batch report tracked by an in-memory
//! job registry.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod jobs;
pub mod output;
pub mod server;
pub mod url;

use thiserror::Error;

/// Main error type for Crawl-Relay operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Aggregation error: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("Job error: {0}")]
    Job(#[from] jobs::JobError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors for malformed crawl requests
///
/// These are raised before any work starts and are never retried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("batch must contain at least one URL")]
    EmptyBatch,

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid retry policy: {0}")]
    InvalidRetryPolicy(String),

    #[error("invalid crawl policy: {0}")]
    InvalidCrawlPolicy(String),
}

/// Internal invariant violations detected while joining a batch
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AggregationError {
    #[error("expected {expected} outcomes, received {received}")]
    MissingOutcomes { expected: usize, received: usize },

    #[error("URL at position {index} produced more than one outcome")]
    DuplicateOutcome { index: usize },

    #[error("dispatcher stopped unexpectedly: {0}")]
    Dispatcher(String),
}

// Re-export commonly used types
pub use config::Config;
pub use crawler::{BatchRequest, Coordinator, CrawlPolicy, Fetcher, HttpFetcher, RetryPolicy};
pub use jobs::{Job, JobRegistry, JobStatus};
pub use output::{BatchReport, UrlError, UrlResult};
