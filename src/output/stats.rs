//! Console output for walks, enrichment passes and the run ledger

use crate::crawler::WalkSummary;
use crate::output::report::RunReport;
use crate::storage::RunRecord;

/// Formats the per-group completion lines, top `top_n` first
///
/// Groups beyond `top_n` are summarized as a single "... and N more groups" line.
pub fn format_group_lines(report: &RunReport, top_n: usize) -> Vec<String> {
    let (shown, hidden) = report.top(top_n);

    let mut lines: Vec<String> = shown
        .iter()
        .map(|g| {
            format!(
                "{}: {}/{} ({:.1}%)",
                g.group, g.enriched, g.total, g.percent
            )
        })
        .collect();

    if hidden > 0 {
        lines.push(format!("... and {} more groups", hidden));
    }
    lines
}

/// Prints the completion report to stdout
///
/// # Arguments
///
/// * `report` - The report to display
/// * `top_n` - How many groups to list individually
pub fn print_report(report: &RunReport, top_n: usize) {
    println!("=== Harvest Report ===\n");

    if let Some(progress) = &report.progress {
        println!("Enrichment Pass:");
        println!(
            "  Range: {}..{} ({} records)",
            progress.start_index,
            progress.end_index,
            progress.range_len()
        );
        println!("  Processed: {}", progress.processed_count);
        println!("  Enriched: {}", progress.success_count);
        println!("  Failed: {}", progress.fail_count);
        println!("  Already enriched: {}", progress.skip_count);
        if progress.interrupted {
            println!(
                "  Interrupted with {} records remaining",
                progress.remaining()
            );
        }
        println!();
    }

    println!("Overview:");
    println!("  Total records: {}", report.total_records);
    println!(
        "  Enriched records: {} ({:.1}%)",
        report.enriched_records,
        report.overall_percent()
    );
    println!("  Groups: {}", report.groups.len());
    println!();

    if !report.groups.is_empty() {
        println!("Completion by Group:");
        for line in format_group_lines(report, top_n) {
            println!("  {}", line);
        }
    }
}

/// Prints the result of a pagination walk
pub fn print_walk_summary(summary: &WalkSummary) {
    println!("=== Walk Summary ===\n");

    println!("  Groups walked: {}", summary.groups.len());
    println!("  Pages visited: {}", summary.pages_visited());
    println!("  Records collected: {}", summary.records.len());
    if !summary.skipped_groups.is_empty() {
        println!("  Groups without URL: {}", summary.skipped_groups.len());
    }
    if summary.interrupted {
        println!("  Walk was interrupted");
    }
    println!();

    let failed = summary.failed_groups();
    if failed > 0 {
        println!("Broken Chains ({}):", failed);
        for group in &summary.groups {
            if let crate::crawler::WalkStop::Failed { url, error } = &group.stop {
                println!("  - {} at {}: {}", group.group, url, error);
            }
        }
        println!();
    }

    println!("Records by Group:");
    let mut by_count: Vec<_> = summary.groups.iter().collect();
    by_count.sort_by(|a, b| b.record_count.cmp(&a.record_count));
    for group in by_count {
        println!("  {}: {}", group.group, group.record_count);
    }
}

/// Prints recent runs from the ledger, newest first
pub fn print_run_history(runs: &[RunRecord]) {
    if runs.is_empty() {
        println!("No runs recorded yet");
        return;
    }

    println!("Recent Runs:");
    for run in runs {
        println!(
            "  #{} {} [{}] started {} - {} processed ({} ok, {} failed, {} skipped)",
            run.id,
            run.kind.to_db_string(),
            run.status.to_db_string(),
            run.started_at,
            run.processed,
            run.tally.success,
            run.tally.fail,
            run.tally.skip
        );
    }
}
