use crate::config::types::{Config, CrawlerConfig, RetryConfig, ServerConfig, UserAgentConfig};
use crate::ConfigError;
use std::net::SocketAddr;
use url::Url;

/// Hard ceiling for any configured concurrency limit
const CONCURRENCY_CEILING: usize = 1000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_server_config(&config.server)?;
    validate_crawler_config(&config.crawler)?;
    validate_retry_config(&config.retry)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    config.bind_address.parse::<SocketAddr>().map_err(|e| {
        ConfigError::Validation(format!(
            "bind_address '{}' is not a socket address: {}",
            config.bind_address, e
        ))
    })?;
    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrency < 1 || config.max_concurrency > CONCURRENCY_CEILING {
        return Err(ConfigError::Validation(format!(
            "max_concurrency must be between 1 and {}, got {}",
            CONCURRENCY_CEILING, config.max_concurrency
        )));
    }

    if config.default_concurrency < 1 || config.default_concurrency > config.max_concurrency {
        return Err(ConfigError::Validation(format!(
            "default_concurrency must be between 1 and max_concurrency ({}), got {}",
            config.max_concurrency, config.default_concurrency
        )));
    }

    if config.page_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "page_timeout_ms must be >= 100ms, got {}ms",
            config.page_timeout_ms
        )));
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    config
        .to_policy()
        .validate()
        .map_err(|e| ConfigError::Validation(e.to_string()))
}

fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
