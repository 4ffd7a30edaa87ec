//! Per-group completion report
//!
//! Building the report is pure: it only reads the record list, the predicate
//! and (optionally) the tallies of the enrichment pass that just ran.

use crate::crawler::EnrichmentRun;
use crate::record::{EnrichmentPredicate, Record};
use crate::state::{OutcomeTally, RunProgress};
use serde::Serialize;
use std::collections::BTreeMap;

/// Name used for records that carry no group
pub const UNKNOWN_GROUP: &str = "Unknown";

/// Completion figures for one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCompletion {
    pub group: String,
    pub total: usize,
    pub enriched: usize,
    /// `enriched / total * 100`, or 0 when the group is empty
    pub percent: f64,
    /// Outcomes from the last enrichment pass, if one ran for this group
    pub tally: Option<OutcomeTally>,
}

/// Completion report over a whole record list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub total_records: usize,
    pub enriched_records: usize,
    /// Sorted by enriched count, highest first, ties by group name
    pub groups: Vec<GroupCompletion>,
    pub progress: Option<RunProgress>,
}

impl RunReport {
    pub fn overall_percent(&self) -> f64 {
        percent(self.enriched_records, self.total_records)
    }

    /// The first `n` groups and how many were left out
    pub fn top(&self, n: usize) -> (&[GroupCompletion], usize) {
        let shown = n.min(self.groups.len());
        (&self.groups[..shown], self.groups.len() - shown)
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Builds the completion report for `records`
///
/// # Arguments
///
/// * `records` - The final record list
/// * `predicate` - Decides which records count as enriched
/// * `run` - Tallies of the enrichment pass, attached to matching groups
pub fn build_report(
    records: &[Record],
    predicate: &EnrichmentPredicate,
    run: Option<&EnrichmentRun>,
) -> RunReport {
    let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for record in records {
        let group = if record.group.is_empty() {
            UNKNOWN_GROUP
        } else {
            record.group.as_str()
        };
        let entry = counts.entry(group).or_default();
        entry.0 += 1;
        if predicate.is_enriched(record) {
            entry.1 += 1;
        }
    }

    let mut groups: Vec<GroupCompletion> = counts
        .into_iter()
        .map(|(group, (total, enriched))| GroupCompletion {
            group: group.to_string(),
            total,
            enriched,
            percent: percent(enriched, total),
            tally: run.and_then(|r| r.group_tallies.get(group).copied()),
        })
        .collect();

    groups.sort_by(|a, b| {
        b.enriched
            .cmp(&a.enriched)
            .then_with(|| a.group.cmp(&b.group))
    });

    RunReport {
        total_records: records.len(),
        enriched_records: groups.iter().map(|g| g.enriched).sum(),
        groups,
        progress: run.map(|r| r.progress.clone()),
    }
}
