//! JSON file storage
//!
//! Snapshots are written to a sibling temp file, flushed to disk and then
//! renamed over the target, so a crash mid-write leaves the old file intact.

use crate::record::Record;
use crate::storage::traits::{CheckpointStore, StorageError, StorageResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Record snapshot stored as a pretty-printed JSON array
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CheckpointStore for JsonFileStore {
    fn save(&mut self, records: &[Record]) -> StorageResult<()> {
        write_json_atomic(&self.path, records)
    }

    fn load(&self) -> StorageResult<Vec<Record>> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Serializes `value` to `path`, replacing any previous content atomically
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> StorageResult<()> {
    let raw = serde_json::to_vec_pretty(value).map_err(|e| StorageError::Serialization {
        location: path.display().to_string(),
        message: e.to_string(),
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = temp_path_for(path);
    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(&raw)?;
        file.sync_all()?;
    }

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    tracing::trace!("Wrote {} bytes to {}", raw.len(), path.display());
    Ok(())
}

/// Reads and deserializes a JSON file
///
/// Returns `Ok(None)` when the file doesn't exist or is blank.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> StorageResult<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    if content.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| StorageError::Serialization {
            location: path.display().to_string(),
            message: e.to_string(),
        })
}

/// `<path>.tmp`, next to the target so the rename stays on one filesystem
fn temp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
