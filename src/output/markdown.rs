//! Markdown report generation
//!
//! This module renders a finished batch as a human-readable markdown
//! document: timing, overall statistics, per-URL results and failures.

use crate::output::stats::compute_statistics;
use crate::output::BatchReport;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown report for a batch to `output_path`
pub fn write_markdown_report(report: &BatchReport, output_path: &Path) -> std::io::Result<()> {
    let markdown = format_markdown_report(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a batch report as markdown
pub fn format_markdown_report(report: &BatchReport) -> String {
    let stats = compute_statistics(report);
    let meta = &report.metadata;
    let mut md = String::new();

    md.push_str("# Crawl-Relay Batch Report\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", meta.start_time.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", meta.end_time.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {:.2} seconds\n\n",
        meta.total_time_seconds
    ));

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Total URLs**: {}\n", meta.total_urls));
    md.push_str(&format!("- **Successful**: {}\n", meta.successful_count));
    md.push_str(&format!("- **Failed**: {}\n", meta.failed_count));
    if stats.cancelled > 0 {
        md.push_str(&format!(
            "- **Cancelled Before Start**: {}\n",
            stats.cancelled
        ));
    }
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        stats.success_rate
    ));

    if !report.successful_urls.is_empty() {
        md.push_str("## Successful URLs\n\n");
        md.push_str("| URL | Status | Final URL | Images | Links |\n");
        md.push_str("|-----|--------|-----------|--------|-------|\n");

        for result in &report.successful_urls {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                cell(&result.url),
                result.metadata.status_code,
                cell(&result.metadata.final_url),
                result.images.len(),
                result.links.len()
            ));
        }
        md.push('\n');
    }

    if !report.failed_urls.is_empty() {
        md.push_str("## Failed URLs\n\n");
        md.push_str("| URL | Attempts | Error |\n");
        md.push_str("|-----|----------|-------|\n");

        for failure in &report.failed_urls {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                cell(&failure.url),
                failure.attempt_count,
                cell(&failure.error)
            ));
        }
        md.push('\n');
    }

    // Error summary
    if !stats.error_summary.is_empty() {
        md.push_str("## Error Summary\n\n");
        md.push_str("| Error | Count |\n");
        md.push_str("|-------|-------|\n");

        let mut errors: Vec<_> = stats.error_summary.iter().collect();
        errors.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (error, count) in errors {
            md.push_str(&format!("| {} | {} |\n", cell(error), count));
        }
        md.push('\n');
    }

    md
}

/// Escapes a value for use inside a markdown table cell
fn cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}
