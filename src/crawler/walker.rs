//! Pagination walker
//!
//! Follows each group's chain of listing pages until no "next" link is found,
//! collecting one base record per listed school.

use crate::config::WalkerConfig;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::Extractor;
use crate::record::{Group, Record};
use crate::storage::CheckpointStore;
use crate::url::{parse_page_url, visit_key};
use crate::HarvestError;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Why a group's listing chain ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkStop {
    /// The last page had no "next" link
    Exhausted,

    /// A "next" link pointed back at a page already visited in this chain
    CycleDetected { url: String },

    /// A page could not be fetched; records gathered before it are kept
    Failed { url: String, error: String },

    /// The configured per-group page cap was reached
    PageLimit,
}

impl fmt::Display for WalkStop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted => write!(f, "exhausted"),
            Self::CycleDetected { url } => write!(f, "cycle at {}", url),
            Self::Failed { url, error } => write!(f, "failed at {}: {}", url, error),
            Self::PageLimit => write!(f, "page limit reached"),
        }
    }
}

/// Result of walking one group
#[derive(Debug, Clone)]
pub struct GroupWalk {
    pub group: String,
    pub records: Vec<Record>,
    pub pages_visited: usize,
    pub stop: WalkStop,
}

/// Per-group line of a walk summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupWalkSummary {
    pub group: String,
    pub record_count: usize,
    pub pages_visited: usize,
    pub stop: WalkStop,
}

/// Result of walking a whole group list
#[derive(Debug, Clone, Default)]
pub struct WalkSummary {
    pub records: Vec<Record>,
    pub groups: Vec<GroupWalkSummary>,
    /// Groups skipped for having no URL
    pub skipped_groups: Vec<String>,
    pub interrupted: bool,
}

impl WalkSummary {
    pub fn pages_visited(&self) -> usize {
        self.groups.iter().map(|g| g.pages_visited).sum()
    }

    /// Groups whose chain ended on a fetch failure
    pub fn failed_groups(&self) -> usize {
        self.groups
            .iter()
            .filter(|g| matches!(g.stop, WalkStop::Failed { .. }))
            .count()
    }
}

/// Walks listing chains one page at a time
pub struct PaginationWalker<'a, F: Fetcher + ?Sized, E: Extractor + ?Sized> {
    fetcher: &'a F,
    extractor: &'a E,
    page_delay: Duration,
    group_delay: Duration,
    save_interval: usize,
    max_pages: Option<usize>,
    stop_flag: Option<Arc<AtomicBool>>,
}

impl<'a, F: Fetcher + ?Sized, E: Extractor + ?Sized> PaginationWalker<'a, F, E> {
    pub fn new(fetcher: &'a F, extractor: &'a E, config: &WalkerConfig) -> Self {
        Self {
            fetcher,
            extractor,
            page_delay: config.page_delay(),
            group_delay: config.group_delay(),
            save_interval: config.save_interval.max(1),
            max_pages: config.max_pages_per_group,
            stop_flag: None,
        }
    }

    /// Checks `flag` between groups and stops early once it is set
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop_flag = Some(flag);
        self
    }

    fn stop_requested(&self) -> bool {
        self.stop_flag
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Walks one group's chain starting at its source URL
    ///
    /// Listing pages are fetched once, without retry. A failure ends the chain
    /// but keeps everything collected so far.
    pub async fn walk_group(&self, group: &Group) -> GroupWalk {
        let mut visited = HashSet::new();
        let mut records = Vec::new();
        let mut pages_visited = 0;
        let mut next = Some(group.source_url.clone());

        let stop = loop {
            let Some(url) = next.take() else {
                break WalkStop::Exhausted;
            };

            if !visited.insert(visit_key(&url)) {
                tracing::warn!("Listing chain for '{}' loops back to {}", group.name, url);
                break WalkStop::CycleDetected { url };
            }

            if let Some(max) = self.max_pages {
                if pages_visited >= max {
                    tracing::debug!("Page cap of {} reached for '{}'", max, group.name);
                    break WalkStop::PageLimit;
                }
            }

            let page_url = match parse_page_url(&url) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!("Bad listing URL {} for '{}': {}", url, group.name, e);
                    break WalkStop::Failed {
                        url,
                        error: e.to_string(),
                    };
                }
            };

            if pages_visited > 0 && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }

            tracing::debug!("Fetching listing page {}", url);
            let body = match self.fetcher.fetch(&url).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!("Listing chain for '{}' broken: {}", group.name, e);
                    break WalkStop::Failed {
                        url,
                        error: e.to_string(),
                    };
                }
            };
            pages_visited += 1;

            let page = self.extractor.extract_list(&body, &page_url);
            tracing::debug!("Found {} entries on {}", page.entries.len(), url);

            records.extend(page.entries.into_iter().map(|entry| {
                Record::new(entry.name, entry.detail_url, entry.description, &group.name)
            }));
            next = page.next_page;
        };

        GroupWalk {
            group: group.name.clone(),
            records,
            pages_visited,
            stop,
        }
    }

    /// Walks every group in order and accumulates one record list
    ///
    /// Groups with an empty URL are skipped. The accumulated list is saved
    /// every `save-interval` groups (counted by position in `groups`) and once
    /// more at the end, including when the run is interrupted.
    ///
    /// # Returns
    ///
    /// * `Ok(WalkSummary)` - The walk finished or was interrupted cleanly
    /// * `Err(HarvestError::Storage)` - A snapshot could not be written
    pub async fn walk_all<S: CheckpointStore + ?Sized>(
        &self,
        groups: &[Group],
        store: &mut S,
    ) -> Result<WalkSummary, HarvestError> {
        let mut summary = WalkSummary::default();
        let mut walked_any = false;

        for (index, group) in groups.iter().enumerate() {
            if self.stop_requested() {
                tracing::info!("Stop requested; ending walk before '{}'", group.name);
                summary.interrupted = true;
                break;
            }

            if group.source_url.trim().is_empty() {
                tracing::warn!("Skipping group '{}': no URL", group.name);
                summary.skipped_groups.push(group.name.clone());
                continue;
            }

            if walked_any && !self.group_delay.is_zero() {
                tokio::time::sleep(self.group_delay).await;
            }
            walked_any = true;

            tracing::info!("[{}/{}] Walking '{}'", index + 1, groups.len(), group.name);
            let walk = self.walk_group(group).await;
            tracing::info!(
                "'{}': {} records from {} pages ({})",
                walk.group,
                walk.records.len(),
                walk.pages_visited,
                walk.stop
            );

            summary.groups.push(GroupWalkSummary {
                group: walk.group,
                record_count: walk.records.len(),
                pages_visited: walk.pages_visited,
                stop: walk.stop,
            });
            summary.records.extend(walk.records);

            if (index + 1) % self.save_interval == 0 {
                store.save(&summary.records)?;
                tracing::info!(
                    "Saved {} records from {} groups to {}",
                    summary.records.len(),
                    index + 1,
                    store.location()
                );
            }
        }

        store.save(&summary.records)?;
        tracing::info!(
            "Walk finished: {} records saved to {}",
            summary.records.len(),
            store.location()
        );

        Ok(summary)
    }
}
