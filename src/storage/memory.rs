//! In-memory storage
//!
//! Keeps every snapshot it is handed, which makes it the store of choice for
//! embedding the harvester in other programs and for tests that inspect the
//! checkpoint history.

use crate::record::Record;
use crate::storage::traits::{CheckpointStore, StorageResult};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshots: Vec<Vec<Record>>,
    fail_saves: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose saves always fail
    pub fn failing() -> Self {
        Self {
            snapshots: Vec::new(),
            fail_saves: true,
        }
    }

    /// Every snapshot saved so far, oldest first
    pub fn snapshots(&self) -> &[Vec<Record>] {
        &self.snapshots
    }

    pub fn latest(&self) -> Option<&[Record]> {
        self.snapshots.last().map(Vec::as_slice)
    }

    pub fn save_count(&self) -> usize {
        self.snapshots.len()
    }
}

impl CheckpointStore for MemoryStore {
    fn save(&mut self, records: &[Record]) -> StorageResult<()> {
        if self.fail_saves {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "memory store is configured to reject saves",
            )
            .into());
        }
        self.snapshots.push(records.to_vec());
        Ok(())
    }

    fn load(&self) -> StorageResult<Vec<Record>> {
        Ok(self.latest().map(<[Record]>::to_vec).unwrap_or_default())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
