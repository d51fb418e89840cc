//! Request and response bodies of the HTTP API
//!
//! Batch submissions use [`BatchRequest`](crate::crawler::BatchRequest) and
//! status responses serialize [`Job`](crate::jobs::Job) directly.

use crate::crawler::SessionPolicy;
use crate::extract::ExtractionPolicy;
use serde::{Deserialize, Serialize};

/// Single-URL crawl request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlRequest {
    pub url: String,

    #[serde(default)]
    pub extract_images: bool,

    #[serde(default)]
    pub extract_links: bool,

    #[serde(default)]
    pub session_config: Option<SessionPolicy>,
}

/// Single-URL crawl followed by extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractRequest {
    #[serde(flatten)]
    pub crawl: CrawlRequest,

    pub extraction_config: ExtractionPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
