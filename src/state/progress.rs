use crate::state::ItemOutcome;
use serde::Serialize;

/// Success/fail/skip counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeTally {
    pub success: usize,
    pub fail: usize,
    pub skip: usize,
}

impl OutcomeTally {
    pub fn record(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Enriched { .. } => self.success += 1,
            ItemOutcome::Skipped => self.skip += 1,
            ItemOutcome::Failed(_) => self.fail += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.success + self.fail + self.skip
    }
}

/// Progress of one enrichment pass over `[start_index, end_index)`
///
/// Held in memory by the scheduler and handed to observers after every
/// record, so presentation (log lines, reports) stays out of the core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunProgress {
    /// Records handled so far, counted from `start_index`
    pub processed_count: usize,
    pub success_count: usize,
    pub fail_count: usize,
    pub skip_count: usize,
    pub start_index: usize,
    pub end_index: usize,
    /// Set when the pass stopped early on request
    pub interrupted: bool,
}

impl RunProgress {
    pub fn new(start_index: usize, end_index: usize) -> Self {
        Self {
            start_index,
            end_index,
            ..Self::default()
        }
    }

    /// Advances the tally by one record
    pub fn record(&mut self, outcome: &ItemOutcome) {
        self.processed_count += 1;
        match outcome {
            ItemOutcome::Enriched { .. } => self.success_count += 1,
            ItemOutcome::Skipped => self.skip_count += 1,
            ItemOutcome::Failed(_) => self.fail_count += 1,
        }
    }

    /// Number of records in the configured range
    pub fn range_len(&self) -> usize {
        self.end_index.saturating_sub(self.start_index)
    }

    pub fn remaining(&self) -> usize {
        self.range_len().saturating_sub(self.processed_count)
    }

    /// Share of the range handled so far, as a percentage
    pub fn percent_processed(&self) -> f64 {
        let total = self.range_len();
        if total == 0 {
            return 0.0;
        }
        (self.processed_count as f64 / total as f64) * 100.0
    }

    pub fn tally(&self) -> OutcomeTally {
        OutcomeTally {
            success: self.success_count,
            fail: self.fail_count,
            skip: self.skip_count,
        }
    }
}

/// One progress event emitted by the scheduler after each record
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Index of the record in the full list
    pub index: usize,
    pub name: String,
    pub outcome: ItemOutcome,
    /// Tally after this record
    pub progress: RunProgress,
}
