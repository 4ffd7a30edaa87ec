//! Enrichment scheduler
//!
//! Walks a slice of the base record list and merges each record's detail page
//! into it. Records that already satisfy the enrichment predicate are skipped
//! without a request, so rerunning over the same range is idempotent.

use crate::config::EnrichmentConfig;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::Extractor;
use crate::crawler::retry::RetryPolicy;
use crate::record::{EnrichmentPredicate, Record};
use crate::state::{FailureReason, ItemOutcome, OutcomeTally, ProgressUpdate, RunProgress};
use crate::storage::CheckpointStore;
use crate::HarvestError;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Result of one enrichment pass
#[derive(Debug, Clone, Default)]
pub struct EnrichmentRun {
    pub progress: RunProgress,
    /// Outcome counts per group name
    pub group_tallies: BTreeMap<String, OutcomeTally>,
}

pub struct EnrichmentScheduler<'a, F: Fetcher + ?Sized, E: Extractor + ?Sized> {
    fetcher: &'a F,
    extractor: &'a E,
    retry: RetryPolicy,
    predicate: EnrichmentPredicate,
    delay: Duration,
    save_interval: usize,
    stop_flag: Option<Arc<AtomicBool>>,
    progress_tx: Option<UnboundedSender<ProgressUpdate>>,
}

impl<'a, F: Fetcher + ?Sized, E: Extractor + ?Sized> EnrichmentScheduler<'a, F, E> {
    pub fn new(
        fetcher: &'a F,
        extractor: &'a E,
        retry: RetryPolicy,
        config: &EnrichmentConfig,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            retry,
            predicate: EnrichmentPredicate::new(config.required_fields.iter().cloned()),
            delay: config.delay(),
            save_interval: config.save_interval.max(1),
            stop_flag: None,
            progress_tx: None,
        }
    }

    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop_flag = Some(flag);
        self
    }

    /// Streams a `ProgressUpdate` after every processed record
    pub fn with_progress_channel(mut self, tx: UnboundedSender<ProgressUpdate>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn predicate(&self) -> &EnrichmentPredicate {
        &self.predicate
    }

    fn stop_requested(&self) -> bool {
        self.stop_flag
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Enriches a single record in place
    pub async fn enrich_one(&self, record: &mut Record) -> ItemOutcome {
        if self.predicate.is_enriched(record) {
            return ItemOutcome::Skipped;
        }

        if !record.has_detail_url() {
            return ItemOutcome::Failed(FailureReason::MissingDetailUrl);
        }

        let body = match self.retry.fetch(self.fetcher, &record.detail_url).await {
            Ok(body) => body,
            Err(e) => return ItemOutcome::Failed(FailureReason::Fetch(e)),
        };

        match self.extractor.extract_detail(&body) {
            Some(fields) => match record.merge_fields(fields) {
                0 => ItemOutcome::Failed(FailureReason::NoData),
                merged => ItemOutcome::Enriched { fields: merged },
            },
            None => ItemOutcome::Failed(FailureReason::NoData),
        }
    }

    /// Enriches `records[start..start + count]` (clamped to the list length)
    ///
    /// The whole list is saved to `store` every `save-interval` records,
    /// counted from `start`, and once more when the pass ends. That final save
    /// also happens when the pass is interrupted through the stop flag.
    ///
    /// # Returns
    ///
    /// * `Ok(EnrichmentRun)` - Tallies for the processed range
    /// * `Err(HarvestError::Storage)` - A snapshot could not be written
    pub async fn run<S: CheckpointStore + ?Sized>(
        &self,
        records: &mut [Record],
        start: usize,
        count: Option<usize>,
        store: &mut S,
    ) -> Result<EnrichmentRun, HarvestError> {
        let end = count
            .map(|n| start.saturating_add(n))
            .unwrap_or(records.len())
            .min(records.len());
        let start = start.min(end);

        let mut run = EnrichmentRun {
            progress: RunProgress::new(start, end),
            group_tallies: BTreeMap::new(),
        };

        tracing::info!(
            "Enriching records {}..{} of {} (checkpoint every {})",
            start,
            end,
            records.len(),
            self.save_interval
        );

        for index in start..end {
            if self.stop_requested() {
                tracing::info!("Stop requested; ending enrichment before record {}", index);
                run.progress.interrupted = true;
                break;
            }

            let record = &mut records[index];
            let outcome = self.enrich_one(record).await;

            match &outcome {
                ItemOutcome::Enriched { fields } => {
                    tracing::info!("[{}] {}: {} fields", index + 1, record.name, fields)
                }
                ItemOutcome::Skipped => {
                    tracing::debug!("[{}] {}: already enriched", index + 1, record.name)
                }
                ItemOutcome::Failed(reason) => {
                    tracing::warn!("[{}] {}: {}", index + 1, record.name, reason)
                }
            }

            run.progress.record(&outcome);
            run.group_tallies
                .entry(record.group.clone())
                .or_default()
                .record(&outcome);

            if let Some(tx) = &self.progress_tx {
                // A dropped receiver only means nobody is listening
                let _ = tx.send(ProgressUpdate {
                    index,
                    name: record.name.clone(),
                    outcome: outcome.clone(),
                    progress: run.progress.clone(),
                });
            }

            if (index + 1 - start) % self.save_interval == 0 {
                store.save(records)?;
                tracing::info!(
                    "Checkpoint: {} records processed, saved to {}",
                    index + 1,
                    store.location()
                );
            }

            if outcome.made_request() && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        store.save(records)?;
        tracing::info!(
            "Enrichment pass done: {} processed ({} ok, {} failed, {} skipped)",
            run.progress.processed_count,
            run.progress.success_count,
            run.progress.fail_count,
            run.progress.skip_count
        );

        Ok(run)
    }
}
