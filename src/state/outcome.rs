/// Per-record outcome definitions for the enrichment pass
use crate::crawler::FetchError;
use std::fmt;

/// Why a record could not be enriched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The record has no detail URL to fetch
    MissingDetailUrl,

    /// The detail page could not be fetched, even after retries
    Fetch(FetchError),

    /// The detail page was fetched but yielded no fields
    NoData,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDetailUrl => write!(f, "no detail link available"),
            Self::Fetch(error) => write!(f, "{}", error),
            Self::NoData => write!(f, "no detail fields found on page"),
        }
    }
}

/// Outcome of processing a single record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Detail fields were merged into the record
    Enriched {
        /// Number of fields merged
        fields: usize,
    },

    /// The record was already enriched; nothing was fetched
    Skipped,

    /// The record was left as a bare base record
    Failed(FailureReason),
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Enriched { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns true if handling this record issued a network request
    pub fn made_request(&self) -> bool {
        matches!(
            self,
            Self::Enriched { .. } | Self::Failed(FailureReason::Fetch(_) | FailureReason::NoData)
        )
    }
}

impl fmt::Display for ItemOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enriched { fields } => write!(f, "enriched with {} fields", fields),
            Self::Skipped => write!(f, "already enriched"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}
