//! Configuration module for Crawl-Relay
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use crawl_relay::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Default concurrency: {}", config.crawler.default_concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, RetryConfig, ServerConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

use crate::crawler::{CrawlPolicy, RetryPolicy};
use std::time::Duration;

impl RetryConfig {
    /// Converts the configured defaults into a retry policy
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            min_delay: self.min_delay_secs,
            max_delay: self.max_delay_secs,
            exponential: self.exponential,
        }
    }
}

impl CrawlerConfig {
    /// Default page timeout as a duration
    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }

    /// Crawl policy used when a request carries no session configuration
    pub fn default_crawl_policy(&self) -> CrawlPolicy {
        CrawlPolicy {
            page_timeout: self.page_timeout(),
            ..CrawlPolicy::default()
        }
    }
}
