//! Storage traits and error types
//!
//! This module defines the trait interface for checkpoint backends and
//! associated error types.

use crate::record::Record;
use thiserror::Error;

/// Errors that can occur during storage operations
///
/// Every storage error is fatal for a run: once a snapshot can't be written,
/// progress can no longer be trusted to survive a crash.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error in {location}: {message}")]
    Serialization { location: String, message: String },

    #[error("Run not found: {0}")]
    RunNotFound(i64),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A durable home for the working record list
///
/// Implementations replace the whole snapshot on every save. A save must be
/// atomic from the caller's point of view: either the new snapshot is fully
/// in place, or the previous one still is.
pub trait CheckpointStore {
    /// Replaces the stored snapshot with `records`
    fn save(&mut self, records: &[Record]) -> StorageResult<()>;

    /// Loads the stored snapshot, or an empty list if nothing was saved yet
    fn load(&self) -> StorageResult<Vec<Record>>;

    /// Human-readable location, used in log lines
    fn location(&self) -> String;
}

impl<S: CheckpointStore + ?Sized> CheckpointStore for Box<S> {
    fn save(&mut self, records: &[Record]) -> StorageResult<()> {
        (**self).save(records)
    }

    fn load(&self) -> StorageResult<Vec<Record>> {
        (**self).load()
    }

    fn location(&self) -> String {
        (**self).location()
    }
}
