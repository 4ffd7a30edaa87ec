//! Markdown summary generation
//!
//! Renders a `RunReport` as a human-readable markdown file.

use crate::output::report::RunReport;
use chrono::Utc;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown summary for `report` to `output_path`
///
/// # Arguments
///
/// * `report` - The completion report
/// * `top_n` - How many groups to list individually
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(io::Error)` - Failed to write summary
pub fn write_markdown_report(
    report: &RunReport,
    top_n: usize,
    output_path: &Path,
) -> std::io::Result<()> {
    let markdown = format_markdown_report(report, top_n);

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a completion report as markdown
pub fn format_markdown_report(report: &RunReport, top_n: usize) -> String {
    let mut md = String::new();

    md.push_str("# School Harvest Summary\n\n");
    md.push_str(&format!("Generated {}\n\n", Utc::now().to_rfc3339()));

    md.push_str("## Overall\n\n");
    md.push_str(&format!("- **Total Records**: {}\n", report.total_records));
    md.push_str(&format!(
        "- **Enriched Records**: {} ({:.1}%)\n",
        report.enriched_records,
        report.overall_percent()
    ));
    md.push_str(&format!("- **Groups**: {}\n\n", report.groups.len()));

    if let Some(progress) = &report.progress {
        md.push_str("## Last Enrichment Pass\n\n");
        md.push_str("| Range | Processed | Enriched | Failed | Skipped |\n");
        md.push_str("|-------|-----------|----------|--------|---------|\n");
        md.push_str(&format!(
            "| {}..{} | {} | {} | {} | {} |\n\n",
            progress.start_index,
            progress.end_index,
            progress.processed_count,
            progress.success_count,
            progress.fail_count,
            progress.skip_count
        ));
        if progress.interrupted {
            md.push_str(&format!(
                "Interrupted with {} records remaining.\n\n",
                progress.remaining()
            ));
        }
    }

    if !report.groups.is_empty() {
        let (shown, hidden) = report.top(top_n);

        md.push_str("## Completion by Group\n\n");
        md.push_str("| Group | Enriched | Total | Completion |\n");
        md.push_str("|-------|----------|-------|------------|\n");
        for group in shown {
            md.push_str(&format!(
                "| {} | {} | {} | {:.1}% |\n",
                group.group, group.enriched, group.total, group.percent
            ));
        }
        if hidden > 0 {
            md.push_str(&format!("\n... and {} more groups\n", hidden));
        }
        md.push('\n');
    }

    md
}
