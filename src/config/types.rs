use serde::Deserialize;

/// Main configuration structure for Crawl-Relay
///
/// Every section is optional; missing sections fall back to their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
}

/// HTTP API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the API listens on
    #[serde(rename = "bind-address")]
    pub bind_address: String,

    /// Whether any origin may call the API (CORS)
    #[serde(rename = "allow-any-origin")]
    pub allow_any_origin: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            allow_any_origin: true,
        }
    }
}

/// Batch crawling behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Concurrency limit used when a batch does not specify one
    #[serde(rename = "default-concurrency")]
    pub default_concurrency: usize,

    /// Upper bound a batch's concurrency limit is clamped to
    #[serde(rename = "max-concurrency")]
    pub max_concurrency: usize,

    /// Default page timeout (milliseconds)
    #[serde(rename = "page-timeout-ms")]
    pub page_timeout_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            default_concurrency: 5,
            max_concurrency: 100,
            page_timeout_ms: 30_000,
        }
    }
}

/// Default retry behavior for crawl operations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    #[serde(rename = "min-delay-secs")]
    pub min_delay_secs: f64,

    #[serde(rename = "max-delay-secs")]
    pub max_delay_secs: f64,

    pub exponential: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay_secs: 1.0,
            max_delay_secs: 10.0,
            exponential: true,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "crawl-relay".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/bot".to_string(),
            contact_email: "bot@example.com".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the user agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}
