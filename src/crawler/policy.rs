//! Crawl and retry policies
//!
//! Policies are fixed once a batch starts. The coordinator only interprets
//! the retry policy and the extraction flags; everything else is passed
//! through to the [`Fetcher`](crate::crawler::Fetcher).

use crate::crawler::session::SessionPolicy;
use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Page-level policy handed to the fetcher for every attempt
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlPolicy {
    /// Upper bound for a single fetch attempt
    pub page_timeout: Duration,

    /// Whether `<img src>` references are collected from the page
    pub extract_images: bool,

    /// Whether `<a href>` references are collected from the page
    pub extract_links: bool,

    /// Session/interaction policy, opaque to the coordinator
    pub session: Option<SessionPolicy>,
}

impl Default for CrawlPolicy {
    fn default() -> Self {
        Self {
            page_timeout: Duration::from_millis(30_000),
            extract_images: false,
            extract_links: false,
            session: None,
        }
    }
}

impl CrawlPolicy {
    /// Builds a policy for one request
    ///
    /// The session's own timeout wins over `default_timeout` when a session
    /// is present.
    pub fn new(
        extract_images: bool,
        extract_links: bool,
        session: Option<SessionPolicy>,
        default_timeout: Duration,
    ) -> Self {
        let page_timeout = session
            .as_ref()
            .map(|s| Duration::from_millis(s.timeout))
            .unwrap_or(default_timeout);

        Self {
            page_timeout,
            extract_images,
            extract_links,
            session,
        }
    }

    /// Rejects policies no fetcher could honor
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.page_timeout.is_zero() {
            return Err(ValidationError::InvalidCrawlPolicy(
                "page timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Retry policy for a single URL
///
/// Delays are expressed in seconds, matching the request schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one (>= 1)
    pub max_attempts: u32,

    /// Delay before the first retry, and the fixed delay when not exponential
    pub min_delay: f64,

    /// Cap applied to exponential growth
    pub max_delay: f64,

    /// Whether the delay doubles after every failed attempt
    pub exponential: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay: 1.0,
            max_delay: 10.0,
            exponential: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            min_delay: 0.0,
            max_delay: 0.0,
            exponential: false,
        }
    }

    /// Checks `max_attempts >= 1`, `0 <= min_delay <= max_delay`
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_attempts < 1 {
            return Err(ValidationError::InvalidRetryPolicy(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        for (name, value) in [("min_delay", self.min_delay), ("max_delay", self.max_delay)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::InvalidRetryPolicy(format!(
                    "{} must be a non-negative number of seconds, got {}",
                    name, value
                )));
            }
        }

        if self.min_delay > self.max_delay {
            return Err(ValidationError::InvalidRetryPolicy(format!(
                "min_delay ({}) must not exceed max_delay ({})",
                self.min_delay, self.max_delay
            )));
        }

        Ok(())
    }

    /// Delay to wait after failed attempt `attempt` (1-based) before the next one
    ///
    /// Exponential: `min(max_delay, min_delay * 2^(attempt - 1))`.
    /// Fixed: `min_delay`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let seconds = if self.exponential {
            // 2^exponent stays finite so a zero minimum never becomes NaN
            let exponent = i32::try_from(attempt.saturating_sub(1))
                .unwrap_or(i32::MAX)
                .min(f64::MAX_EXP - 1);
            (self.min_delay * 2f64.powi(exponent)).min(self.max_delay)
        } else {
            self.min_delay
        };

        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exponential(min: f64, max: f64) -> RetryPolicy {
        RetryPolicy {
            max_attempts: 6,
            min_delay: min,
            max_delay: max,
            exponential: true,
        }
    }

    #[test]
    fn test_default_policy_is_valid() {
        assert!(RetryPolicy::default().validate().is_ok());
        assert!(RetryPolicy::no_retry().validate().is_ok());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert!(matches!(
            policy.validate(),
            Err(ValidationError::InvalidRetryPolicy(_))
        ));
    }

    #[test]
    fn test_negative_and_nan_delays_rejected() {
        assert!(exponential(-1.0, 10.0).validate().is_err());
        assert!(exponential(1.0, f64::NAN).validate().is_err());
        assert!(exponential(1.0, f64::INFINITY).validate().is_err());
    }

    #[test]
    fn test_min_above_max_rejected() {
        assert!(exponential(5.0, 1.0).validate().is_err());
    }

    #[test]
    fn test_exponential_delay_doubles_until_cap() {
        let policy = exponential(1.0, 10.0);
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
        assert_eq!(policy.delay_after(4), Duration::from_secs(8));
        assert_eq!(policy.delay_after(5), Duration::from_secs(10));
        assert_eq!(policy.delay_after(60), Duration::from_secs(10));
    }

    #[test]
    fn test_exponential_delay_never_decreases() {
        let policy = exponential(0.25, 7.0);
        let delays: Vec<Duration> = (1..=20).map(|k| policy.delay_after(k)).collect();
        assert!(delays.windows(2).all(|w| w[1] >= w[0]));
        assert!(delays.iter().all(|d| *d <= Duration::from_secs(7)));
    }

    #[test]
    fn test_zero_minimum_stays_zero_for_late_attempts() {
        let policy = RetryPolicy {
            max_attempts: 2000,
            ..exponential(0.0, 10.0)
        };
        assert_eq!(policy.delay_after(1), Duration::ZERO);
        assert_eq!(policy.delay_after(1100), Duration::ZERO);
        assert_eq!(policy.delay_after(u32::MAX), Duration::ZERO);
    }

    #[test]
    fn test_huge_attempt_caps_at_max_delay() {
        let policy = exponential(0.5, 10.0);
        assert_eq!(policy.delay_after(1100), Duration::from_secs(10));
        assert_eq!(policy.delay_after(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn test_fixed_delay() {
        let policy = RetryPolicy {
            max_attempts: 4,
            min_delay: 0.5,
            max_delay: 10.0,
            exponential: false,
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(500));
        assert_eq!(policy.delay_after(3), Duration::from_millis(500));
    }

    #[test]
    fn test_retry_policy_json_defaults() {
        let policy: RetryPolicy = serde_json::from_str(r#"{"max_attempts": 5}"#).unwrap();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.min_delay, 1.0);
        assert_eq!(policy.max_delay, 10.0);
        assert!(policy.exponential);
    }

    #[test]
    fn test_session_timeout_overrides_default() {
        let session = SessionPolicy {
            timeout: 5_000,
            ..SessionPolicy::default()
        };
        let policy = CrawlPolicy::new(true, false, Some(session), Duration::from_secs(30));
        assert_eq!(policy.page_timeout, Duration::from_secs(5));

        let policy = CrawlPolicy::new(true, false, None, Duration::from_secs(30));
        assert_eq!(policy.page_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let policy = CrawlPolicy {
            page_timeout: Duration::ZERO,
            ..CrawlPolicy::default()
        };
        assert!(policy.validate().is_err());
    }
}
