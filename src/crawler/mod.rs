//! Crawler module for fetching and processing directory pages
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching with bounded retry
//! - HTML extraction of listing entries, detail fields and groups
//! - Walking paginated listing chains
//! - Enriching records from their detail pages
//! - Overall harvest coordination

mod coordinator;
mod enricher;
mod fetcher;
mod parser;
mod retry;
mod walker;

#[cfg(test)]
mod test_support;

pub use coordinator::Harvester;
pub use enricher::{EnrichmentRun, EnrichmentScheduler};
pub use fetcher::{build_http_client, FetchError, FetchErrorKind, Fetcher, HttpFetcher};
pub use parser::{DirectoryExtractor, Extractor, ListingEntry, ListingPage};
pub use retry::RetryPolicy;
pub use walker::{GroupWalk, GroupWalkSummary, PaginationWalker, WalkStop, WalkSummary};
