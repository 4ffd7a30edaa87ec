//! Harvest coordinator - top-level orchestration
//!
//! This module drives a complete harvest:
//! - Loading (or discovering) the group list
//! - Walking every group's listing chain into the base record list
//! - Choosing where to resume enrichment from
//! - Running the enrichment pass and writing the complete record list
//! - Recording runs in the optional SQLite ledger
//! - Building the completion report
//! - Extracting a single detail page on demand

use crate::config::{validate, Config};
use crate::crawler::enricher::{EnrichmentRun, EnrichmentScheduler};
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::parser::{DirectoryExtractor, Extractor};
use crate::crawler::retry::RetryPolicy;
use crate::crawler::walker::{PaginationWalker, WalkSummary};
use crate::output::{build_report, write_markdown_report, RunReport};
use crate::record::{EnrichmentPredicate, Group, Record};
use crate::state::{OutcomeTally, ProgressUpdate};
use crate::storage::{
    open_store, read_json, write_json_atomic, CheckpointStore, RunKind, RunRecord, RunStatus,
    SqliteStorage,
};
use crate::url::parse_page_url;
use crate::HarvestError;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

/// Main harvest coordinator
pub struct Harvester<F: Fetcher = HttpFetcher, E: Extractor = DirectoryExtractor> {
    config: Config,
    config_hash: String,
    fetcher: F,
    extractor: E,
    ledger: Option<SqliteStorage>,
    stop_flag: Arc<AtomicBool>,
    progress_tx: Option<UnboundedSender<ProgressUpdate>>,
}

impl Harvester {
    /// Creates a harvester that fetches over HTTP with the configured selectors
    ///
    /// # Arguments
    ///
    /// * `config` - The harvest configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - Successfully created harvester
    /// * `Err(HarvestError)` - Invalid configuration, or the HTTP client or ledger failed to open
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        validate(&config)?;
        let fetcher = HttpFetcher::from_config(&config.user_agent, &config.http)?;
        let extractor = DirectoryExtractor::new(&config.selectors)?;
        Self::with_parts(config, fetcher, extractor)
    }
}

impl<F: Fetcher, E: Extractor> Harvester<F, E> {
    /// Creates a harvester from explicit parts
    ///
    /// Opens the run ledger when `output.database-path` is set.
    pub fn with_parts(config: Config, fetcher: F, extractor: E) -> Result<Self, HarvestError> {
        let ledger = match &config.output.database_path {
            Some(path) => {
                tracing::info!("Recording runs in {}", path);
                Some(SqliteStorage::new(Path::new(path))?)
            }
            None => None,
        };

        Ok(Self {
            config,
            config_hash: String::new(),
            fetcher,
            extractor,
            ledger,
            stop_flag: Arc::new(AtomicBool::new(false)),
            progress_tx: None,
        })
    }

    /// Sets the configuration hash recorded with every ledger run
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = hash.into();
        self
    }

    pub fn with_progress_channel(mut self, tx: UnboundedSender<ProgressUpdate>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Flag that stops the current walk or enrichment pass at the next boundary
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_flag)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn predicate(&self) -> EnrichmentPredicate {
        EnrichmentPredicate::new(self.config.enrichment.required_fields.iter().cloned())
    }

    fn stop_requested(&self) -> bool {
        self.stop_flag.load(Ordering::SeqCst)
    }

    /// Loads the group list from `output.groups-path`
    ///
    /// A missing, blank or malformed file is an error: without groups there is
    /// nothing to walk.
    pub fn load_groups(&self) -> Result<Vec<Group>, HarvestError> {
        let path = &self.config.output.groups_path;
        let groups = read_json::<Vec<Group>>(Path::new(path))
            .map_err(|e| HarvestError::GroupList {
                path: path.clone(),
                message: e.to_string(),
            })?
            .ok_or_else(|| HarvestError::GroupList {
                path: path.clone(),
                message: "file is missing or empty".to_string(),
            })?;

        tracing::info!("Loaded {} groups from {}", groups.len(), path);
        Ok(groups)
    }

    /// Extracts the group list from a saved group index page and writes it to
    /// `output.groups-path`
    ///
    /// Relative links are resolved against `base_url` when given. Without a base
    /// only absolute links produce usable group URLs.
    pub fn discover_groups(
        &self,
        html_path: &Path,
        base_url: Option<&str>,
    ) -> Result<Vec<Group>, HarvestError> {
        let html = std::fs::read_to_string(html_path)?;

        let base = match base_url {
            Some(url) => parse_page_url(url)?,
            None => file_url(html_path)?,
        };

        let groups = self.extractor.extract_groups(&html, &base);
        tracing::info!(
            "Discovered {} groups in {}",
            groups.len(),
            html_path.display()
        );

        let out = Path::new(&self.config.output.groups_path);
        write_json_atomic(out, &groups)?;
        tracing::info!("Saved group list to {}", out.display());

        Ok(groups)
    }

    /// Extracts one detail page and writes its fields to `output.detail-path`
    ///
    /// `target` is fetched (with retries) when it is an `http(s)://` URL and
    /// read from disk otherwise. Fetched pages get their URL stamped under `url`.
    pub async fn extract_single_detail(
        &self,
        target: &str,
    ) -> Result<BTreeMap<String, String>, HarvestError> {
        let target = target.trim();
        let remote = target.starts_with("http://") || target.starts_with("https://");

        let fields = if remote {
            let url = parse_page_url(target)?;
            let body = RetryPolicy::from_config(&self.config.http)
                .fetch(&self.fetcher, url.as_str())
                .await?;
            self.extractor.extract_detail(&body).map(|mut fields| {
                fields.insert("url".to_string(), target.to_string());
                fields
            })
        } else {
            let html = std::fs::read_to_string(target)?;
            self.extractor.extract_detail(&html)
        };

        let fields = fields
            .filter(|fields| !fields.is_empty())
            .ok_or_else(|| HarvestError::NoDetails {
                target: target.to_string(),
            })?;
        tracing::info!("Extracted {} fields from {}", fields.len(), target);

        let out = Path::new(&self.config.output.detail_path);
        write_json_atomic(out, &fields)?;
        tracing::info!("Saved school details to {}", out.display());

        Ok(fields)
    }

    /// Walks every group and saves the base record list to `output.records-path`
    pub async fn walk(&mut self) -> Result<WalkSummary, HarvestError> {
        let groups = self.load_groups()?;
        let run_id = self.start_ledger_run(RunKind::Walk)?;

        let mut store = open_store(Path::new(&self.config.output.records_path))?;
        let walker = PaginationWalker::new(&self.fetcher, &self.extractor, &self.config.walker)
            .with_stop_flag(Arc::clone(&self.stop_flag));

        let result = walker.walk_all(&groups, store.as_mut()).await;

        let (status, processed) = match &result {
            Ok(summary) if summary.interrupted => (RunStatus::Interrupted, summary.records.len()),
            Ok(summary) => (RunStatus::Completed, summary.records.len()),
            Err(_) => (RunStatus::Failed, 0),
        };
        self.finish_ledger_run(run_id, status, processed, &OutcomeTally::default())?;

        result
    }

    /// Picks the record list an enrichment pass should start from
    ///
    /// Unless `fresh` is set, an existing checkpoint wins over the base list,
    /// so an interrupted pass picks up its merged fields.
    pub fn resume_records(&self, fresh: bool) -> Result<Vec<Record>, HarvestError> {
        let output = &self.config.output;

        if !fresh {
            let checkpoint = open_store(Path::new(&output.checkpoint_path))?.load()?;
            if !checkpoint.is_empty() {
                tracing::info!(
                    "Resuming from checkpoint {} ({} records)",
                    output.checkpoint_path,
                    checkpoint.len()
                );
                return Ok(checkpoint);
            }
        }

        let records = open_store(Path::new(&output.records_path))?.load()?;
        if records.is_empty() {
            tracing::warn!("No base records found in {}", output.records_path);
        } else {
            tracing::info!(
                "Loaded {} base records from {}",
                records.len(),
                output.records_path
            );
        }
        Ok(records)
    }

    /// The most complete record list on disk, for reporting
    pub fn latest_records(&self) -> Result<Vec<Record>, HarvestError> {
        let output = &self.config.output;
        for path in [
            &output.complete_path,
            &output.checkpoint_path,
            &output.records_path,
        ] {
            let records = open_store(Path::new(path))?.load()?;
            if !records.is_empty() {
                tracing::debug!("Reporting on {} ({} records)", path, records.len());
                return Ok(records);
            }
        }
        Ok(Vec::new())
    }

    /// Runs one enrichment pass over the configured range
    ///
    /// Checkpoints go to `output.checkpoint-path`; once the pass ends the full
    /// list is also written to `output.complete-path`.
    pub async fn enrich(&mut self, records: &mut [Record]) -> Result<EnrichmentRun, HarvestError> {
        let run_id = self.start_ledger_run(RunKind::Enrich)?;

        let mut checkpoint = open_store(Path::new(&self.config.output.checkpoint_path))?;
        let mut scheduler = EnrichmentScheduler::new(
            &self.fetcher,
            &self.extractor,
            RetryPolicy::from_config(&self.config.http),
            &self.config.enrichment,
        )
        .with_stop_flag(Arc::clone(&self.stop_flag));
        if let Some(tx) = &self.progress_tx {
            scheduler = scheduler.with_progress_channel(tx.clone());
        }

        let result = scheduler
            .run(
                records,
                self.config.enrichment.start_index,
                self.config.enrichment.count,
                checkpoint.as_mut(),
            )
            .await;

        let result = match result {
            Ok(run) => open_store(Path::new(&self.config.output.complete_path))
                .and_then(|mut complete| complete.save(records))
                .map(|_| {
                    tracing::info!(
                        "Saved complete record list to {}",
                        self.config.output.complete_path
                    );
                    run
                })
                .map_err(HarvestError::from),
            Err(e) => Err(e),
        };

        match &result {
            Ok(run) => {
                let status = if run.progress.interrupted {
                    RunStatus::Interrupted
                } else {
                    RunStatus::Completed
                };
                self.finish_ledger_run(
                    run_id,
                    status,
                    run.progress.processed_count,
                    &run.progress.tally(),
                )?;
            }
            Err(_) => {
                self.finish_ledger_run(run_id, RunStatus::Failed, 0, &OutcomeTally::default())?
            }
        }

        result
    }

    /// Builds the completion report and writes the markdown summary if configured
    pub fn report(
        &self,
        records: &[Record],
        run: Option<&EnrichmentRun>,
    ) -> Result<RunReport, HarvestError> {
        let report = build_report(records, &self.predicate(), run);

        if let Some(path) = &self.config.output.summary_path {
            write_markdown_report(&report, self.config.output.report_top_n, Path::new(path))?;
            tracing::info!("Wrote summary to {}", path);
        }

        Ok(report)
    }

    /// Runs a complete harvest
    ///
    /// Resumes from existing records unless `fresh` is set; walks the groups
    /// only when there is nothing to resume from.
    pub async fn run(&mut self, fresh: bool) -> Result<RunReport, HarvestError> {
        let mut records = if fresh {
            Vec::new()
        } else {
            self.resume_records(false)?
        };

        if records.is_empty() {
            tracing::info!("Walking listing pages to build the base record list");
            let summary = self.walk().await?;
            records = summary.records;

            if self.stop_requested() {
                tracing::info!("Stopped after walk; skipping enrichment");
                return self.report(&records, None);
            }
        }

        let run = self.enrich(&mut records).await?;
        self.report(&records, Some(&run))
    }

    /// Recent ledger runs, newest first; empty without a ledger
    pub fn run_history(&self, limit: usize) -> Result<Vec<RunRecord>, HarvestError> {
        match &self.ledger {
            Some(ledger) => Ok(ledger.list_runs(limit)?),
            None => Ok(Vec::new()),
        }
    }

    fn start_ledger_run(&mut self, kind: RunKind) -> Result<Option<i64>, HarvestError> {
        match self.ledger.as_mut() {
            Some(ledger) => {
                let id = ledger.create_run(kind, &self.config_hash)?;
                tracing::debug!("Started {} run {}", kind.to_db_string(), id);
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }

    fn finish_ledger_run(
        &mut self,
        run_id: Option<i64>,
        status: RunStatus,
        processed: usize,
        tally: &OutcomeTally,
    ) -> Result<(), HarvestError> {
        if let (Some(ledger), Some(id)) = (self.ledger.as_mut(), run_id) {
            ledger.finish_run(id, status, processed, tally)?;
            tracing::debug!("Run {} finished as {}", id, status.to_db_string());
        }
        Ok(())
    }
}

/// `file://` URL of a local file, used as the base for a saved page
fn file_url(path: &Path) -> Result<Url, HarvestError> {
    let absolute = std::fs::canonicalize(path)?;
    Url::from_file_path(&absolute).map_err(|_| HarvestError::GroupList {
        path: path.display().to_string(),
        message: "cannot express path as a URL".to_string(),
    })
}
