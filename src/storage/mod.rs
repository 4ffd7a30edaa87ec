//! Storage module for persisting harvest data
//!
//! This module handles all durable state for the harvester:
//! - Record snapshots (base lists, rolling checkpoints, final output)
//! - Atomic replacement of snapshots so a crash never leaves a half-written file
//! - The optional SQLite run ledger

mod json;
mod memory;
mod schema;
mod sqlite;
mod traits;

pub use json::{read_json, write_json_atomic, JsonFileStore};
pub use memory::MemoryStore;
pub use sqlite::SqliteStorage;
pub use traits::{CheckpointStore, StorageError, StorageResult};

use crate::state::OutcomeTally;
use std::path::Path;

/// File extensions that select the SQLite backend
const SQLITE_EXTENSIONS: &[&str] = &["db", "sqlite", "sqlite3"];

/// Opens the checkpoint store for `path`
///
/// Paths ending in `.db`, `.sqlite` or `.sqlite3` are opened as SQLite
/// databases; anything else is treated as a JSON file.
///
/// # Arguments
///
/// * `path` - Location of the snapshot
///
/// # Returns
///
/// * `Ok(Box<dyn CheckpointStore>)` - The opened store
/// * `Err(StorageError)` - The SQLite database could not be opened
pub fn open_store(path: &Path) -> StorageResult<Box<dyn CheckpointStore>> {
    let is_sqlite = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SQLITE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false);

    if is_sqlite {
        Ok(Box::new(SqliteStorage::new(path)?))
    } else {
        Ok(Box::new(JsonFileStore::new(path)))
    }
}

/// Represents a run in the ledger
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub kind: RunKind,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub processed: usize,
    pub tally: OutcomeTally,
}

/// What a run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    /// Walked listing pages to build the base record list
    Walk,
    /// Enriched records from their detail pages
    Enrich,
}

impl RunKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Walk => "walk",
            Self::Enrich => "enrich",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "walk" => Some(Self::Walk),
            "enrich" => Some(Self::Enrich),
            _ => None,
        }
    }
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
