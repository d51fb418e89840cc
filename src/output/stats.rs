//! Statistics derived from a batch report
//!
//! This module provides functionality for summarizing a finished batch and
//! displaying the summary on the console.

use crate::crawler::CANCELLED_BEFORE_START;
use crate::output::BatchReport;
use std::collections::HashMap;

/// Batch statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct BatchStatistics {
    /// Number of URLs in the batch
    pub total_urls: usize,

    /// URLs crawled successfully
    pub successful: usize,

    /// URLs that exhausted their retries or were never attempted
    pub failed: usize,

    /// Failed URLs skipped because the batch was cancelled
    pub cancelled: usize,

    /// Percentage of URLs crawled successfully
    pub success_rate: f64,

    /// Wall-clock duration of the batch
    pub total_time_seconds: f64,

    /// Fetch attempts spent on failed URLs
    pub failed_attempts: u64,

    /// HTTP status codes of successful pages
    pub status_codes: HashMap<u16, usize>,

    /// Failure messages and how often each occurred
    pub error_summary: HashMap<String, usize>,

    /// Successful results whose extraction step failed
    pub extraction_failures: usize,
}

/// Computes statistics for a batch report
pub fn compute_statistics(report: &BatchReport) -> BatchStatistics {
    let mut status_codes = HashMap::new();
    for result in &report.successful_urls {
        *status_codes.entry(result.metadata.status_code).or_insert(0) += 1;
    }

    let mut error_summary = HashMap::new();
    for failure in &report.failed_urls {
        *error_summary.entry(failure.error.clone()).or_insert(0) += 1;
    }

    BatchStatistics {
        total_urls: report.metadata.total_urls,
        successful: report.metadata.successful_count,
        failed: report.metadata.failed_count,
        cancelled: report
            .failed_urls
            .iter()
            .filter(|f| f.error == CANCELLED_BEFORE_START)
            .count(),
        success_rate: report.success_rate(),
        total_time_seconds: report.metadata.total_time_seconds,
        failed_attempts: report
            .failed_urls
            .iter()
            .map(|f| u64::from(f.attempt_count))
            .sum(),
        status_codes,
        error_summary,
        extraction_failures: report
            .successful_urls
            .iter()
            .filter(|r| r.extraction_error.is_some())
            .count(),
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &BatchStatistics) {
    println!("=== Batch Statistics ===\n");

    println!("Overview:");
    println!("  Total URLs: {}", stats.total_urls);
    println!("  Successful: {}", stats.successful);
    println!("  Failed: {}", stats.failed);
    if stats.cancelled > 0 {
        println!("  Cancelled before start: {}", stats.cancelled);
    }
    println!("  Elapsed: {:.2}s", stats.total_time_seconds);
    println!();

    if !stats.status_codes.is_empty() {
        println!("Status Codes:");
        let mut codes: Vec<_> = stats.status_codes.iter().collect();
        codes.sort_by_key(|(code, _)| **code);
        for (code, count) in codes {
            println!("  {}: {}", code, count);
        }
        println!();
    }

    if !stats.error_summary.is_empty() {
        println!("Error Summary:");
        let mut error_counts: Vec<_> = stats.error_summary.iter().collect();
        error_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (error, count) in error_counts {
            println!("  {}: {}", error, count);
        }
        println!("  Attempts spent on failures: {}", stats.failed_attempts);
        println!();
    }

    if stats.extraction_failures > 0 {
        println!(
            "Extraction failed for {} page(s); raw text was kept",
            stats.extraction_failures
        );
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} URLs crawled successfully)",
        stats.success_rate, stats.successful, stats.total_urls
    );
}

/// Computes and prints statistics for a batch report
pub fn print_report_summary(report: &BatchReport) {
    print_statistics(&compute_statistics(report));
}
