//! Per-URL outcomes and the aggregated batch report

use crate::extract::ExtractedContent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Response metadata recorded for a crawled page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlMetadata {
    pub crawl_time: DateTime<Utc>,
    pub content_type: Option<String>,
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    /// URL after redirects
    pub final_url: String,
}

/// A successfully crawled URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlResult {
    pub url: String,
    pub markdown: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub links: Vec<String>,
    pub metadata: CrawlMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_content: Option<ExtractedContent>,
    /// Set when extraction ran and failed; the crawl itself still succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_error: Option<String>,
}

/// A URL that could not be crawled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlError {
    pub url: String,
    /// Message of the last failed attempt
    pub error: String,
    /// Attempts actually made; 0 when the URL was never fetched
    pub attempt_count: u32,
    pub last_attempt: DateTime<Utc>,
}

impl UrlError {
    /// Records a URL that failed without any fetch attempt
    pub fn not_attempted(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            error: error.into(),
            attempt_count: 0,
            last_attempt: Utc::now(),
        }
    }
}

/// Timing and count metadata for a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchMetadata {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_urls: usize,
    pub successful_count: usize,
    pub failed_count: usize,
    pub total_time_seconds: f64,
}

/// Aggregated outcome of a batch
///
/// Every input URL appears exactly once, in either `successful_urls` or
/// `failed_urls`. Neither list follows input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub successful_urls: Vec<UrlResult>,
    pub failed_urls: Vec<UrlError>,
    pub metadata: BatchMetadata,
}

impl BatchReport {
    /// Builds a report and derives its counts and elapsed time
    pub fn new(
        successful_urls: Vec<UrlResult>,
        failed_urls: Vec<UrlError>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        let successful_count = successful_urls.len();
        let failed_count = failed_urls.len();
        let total_time_seconds = (end_time - start_time)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        Self {
            successful_urls,
            failed_urls,
            metadata: BatchMetadata {
                start_time,
                end_time,
                total_urls: successful_count + failed_count,
                successful_count,
                failed_count,
                total_time_seconds,
            },
        }
    }

    /// Percentage of URLs crawled successfully
    pub fn success_rate(&self) -> f64 {
        if self.metadata.total_urls == 0 {
            return 0.0;
        }
        (self.metadata.successful_count as f64 / self.metadata.total_urls as f64) * 100.0
    }
}
