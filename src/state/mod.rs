//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `ItemOutcome`: what happened to one record during enrichment
//! - `RunProgress`: running success/fail/skip tally for an enrichment range
//! - `OutcomeTally`: the same counters, kept per group

mod outcome;
mod progress;

// Re-export main types
pub use outcome::{FailureReason, ItemOutcome};
pub use progress::{OutcomeTally, ProgressUpdate, RunProgress};
