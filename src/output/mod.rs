//! Output module for batch results and reports
//!
//! This module handles:
//! - The per-URL outcome and batch report types returned to clients
//! - Computing and printing batch statistics
//! - Generating markdown reports of batch results

mod markdown;
mod report;
pub mod stats;

pub use markdown::{format_markdown_report, write_markdown_report};
pub use report::{BatchMetadata, BatchReport, CrawlMetadata, UrlError, UrlResult};
pub use stats::{compute_statistics, print_report_summary, print_statistics, BatchStatistics};
