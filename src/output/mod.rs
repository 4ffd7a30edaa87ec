//! Output module for reports and summaries
//!
//! This module handles:
//! - Building the per-group completion report
//! - Printing walk, enrichment and ledger summaries to stdout
//! - Writing the markdown summary file

mod markdown;
mod report;
pub mod stats;

pub use markdown::{format_markdown_report, write_markdown_report};
pub use report::{build_report, GroupCompletion, RunReport, UNKNOWN_GROUP};
pub use stats::{format_group_lines, print_report, print_run_history, print_walk_summary};
