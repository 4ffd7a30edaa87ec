//! SQLite storage implementation
//!
//! The same database holds the record snapshot (replaced inside a single
//! transaction) and the run ledger.

use crate::record::Record;
use crate::state::OutcomeTally;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{CheckpointStore, StorageError, StorageResult};
use crate::storage::{RunKind, RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn, path: None })
    }

    // ===== Run Management =====

    /// Records the start of a run and returns its ID
    pub fn create_run(&mut self, kind: RunKind, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (kind, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                kind.to_db_string(),
                now,
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Marks a run finished with its final status and tallies
    pub fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        processed: usize,
        tally: &OutcomeTally,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs
             SET status = ?1, finished_at = ?2, processed = ?3, success = ?4, fail = ?5, skip = ?6
             WHERE id = ?7",
            params![
                status.to_db_string(),
                now,
                processed as i64,
                tally.success as i64,
                tally.fail as i64,
                tally.skip as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    pub fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("{} WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    /// Gets the most recent run of the given kind
    pub fn get_latest_run(&self, kind: RunKind) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("{} WHERE kind = ?1 ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                params![kind.to_db_string()],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    /// Lists the most recent runs, newest first
    pub fn list_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY id DESC LIMIT ?1", RUN_COLUMNS))?;
        let runs = stmt
            .query_map(params![limit as i64], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    /// When the record snapshot was last replaced, if ever
    pub fn snapshot_saved_at(&self) -> StorageResult<Option<String>> {
        let saved_at = self
            .conn
            .query_row(
                "SELECT saved_at FROM snapshot_meta WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(saved_at)
    }
}

const RUN_COLUMNS: &str = "SELECT id, kind, started_at, finished_at, config_hash, status, \
     processed, success, fail, skip FROM runs";

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        kind: RunKind::from_db_string(&row.get::<_, String>(1)?).unwrap_or(RunKind::Enrich),
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Running),
        processed: row.get::<_, i64>(6)? as usize,
        tally: OutcomeTally {
            success: row.get::<_, i64>(7)? as usize,
            fail: row.get::<_, i64>(8)? as usize,
            skip: row.get::<_, i64>(9)? as usize,
        },
    })
}

impl CheckpointStore for SqliteStorage {
    fn save(&mut self, records: &[Record]) -> StorageResult<()> {
        let location = self.location();
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM records", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO records (position, school_name, school_district, payload)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (position, record) in records.iter().enumerate() {
                let payload =
                    serde_json::to_string(record).map_err(|e| StorageError::Serialization {
                        location: location.clone(),
                        message: e.to_string(),
                    })?;
                stmt.execute(params![
                    position as i64,
                    record.name,
                    record.group,
                    payload
                ])?;
            }
        }
        tx.execute(
            "INSERT INTO snapshot_meta (id, saved_at, record_count) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET saved_at = excluded.saved_at,
                                           record_count = excluded.record_count",
            params![Utc::now().to_rfc3339(), records.len() as i64],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn load(&self) -> StorageResult<Vec<Record>> {
        let mut stmt = self
            .conn
            .prepare("SELECT payload FROM records ORDER BY position")?;
        let payloads = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        payloads
            .iter()
            .map(|payload| {
                serde_json::from_str(payload).map_err(|e| StorageError::Serialization {
                    location: self.location(),
                    message: e.to_string(),
                })
            })
            .collect()
    }

    fn location(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ":memory:".to_string())
    }
}
