//! SQLite-backed position store.
//!
//! Each trait call executes exactly one SQL statement, mirroring the
//! external record store's single-record atomicity. There is deliberately
//! no UNIQUE constraint on (owner_id, position): a crash mid-shift leaves
//! duplicate or skipped positions behind, and the repair pass must be able
//! to read that state back out.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::missing_errors_doc)]

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::model::{EntryId, EntryPayload, ItemId, OwnerId, RankedEntry};
use crate::store::PositionStore;

/// Durable store for ranked entries.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store database at the given path.
    ///
    /// Creates parent directories if they don't exist.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create parent directories: {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    ///
    /// Creates all tables and indexes if they don't exist.
    fn init_schema(&self) -> Result<()> {
        self.lock_conn()
            .execute_batch(SCHEMA_SQL)
            .context("Failed to initialize schema")?;
        Ok(())
    }

    fn lock_conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<(RankedEntry, String)> {
    let payload_json: String = row.get(4)?;
    let entry = RankedEntry {
        id: EntryId::new(row.get::<_, String>(0)?),
        owner_id: OwnerId::new(row.get::<_, String>(1)?),
        item_id: ItemId::new(row.get::<_, String>(2)?),
        position: row.get::<_, i64>(3)? as u32,
        payload: EntryPayload::default(),
        created_at: parse_ts(row, 5)?,
        updated_at: parse_ts(row, 6)?,
    };
    Ok((entry, payload_json))
}

fn parse_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn finish_entry((mut entry, payload_json): (RankedEntry, String)) -> Result<RankedEntry> {
    entry.payload = serde_json::from_str(&payload_json)
        .with_context(|| format!("Malformed payload JSON for entry {}", entry.id))?;
    Ok(entry)
}

const SELECT_COLS: &str = "id, owner_id, item_id, position, payload, created_at, updated_at";

impl PositionStore for SqliteStore {
    fn create_owner(&self, owner_id: &OwnerId) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.lock_conn()
            .execute(
                "INSERT OR IGNORE INTO owners (owner_id, created_at) VALUES (?, ?)",
                params![owner_id.as_str(), now],
            )
            .with_context(|| format!("Failed to register owner {owner_id}"))?;
        Ok(())
    }

    fn owner_exists(&self, owner_id: &OwnerId) -> Result<bool> {
        let found: Option<i64> = self
            .lock_conn()
            .query_row(
                "SELECT 1 FROM owners WHERE owner_id = ?",
                params![owner_id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Failed to query owner {owner_id}"))?;
        Ok(found.is_some())
    }

    fn get(&self, owner_id: &OwnerId, item_id: &ItemId) -> Result<Option<RankedEntry>> {
        let row = self
            .lock_conn()
            .query_row(
                &format!("SELECT {SELECT_COLS} FROM entries WHERE owner_id = ? AND item_id = ?"),
                params![owner_id.as_str(), item_id.as_str()],
                entry_from_row,
            )
            .optional()
            .with_context(|| format!("Failed to query entry ({owner_id}, {item_id})"))?;
        row.map(finish_entry).transpose()
    }

    fn get_by_position(&self, owner_id: &OwnerId, position: u32) -> Result<Option<RankedEntry>> {
        let row = self
            .lock_conn()
            .query_row(
                &format!(
                    "SELECT {SELECT_COLS} FROM entries
                     WHERE owner_id = ? AND position = ?
                     ORDER BY id LIMIT 1"
                ),
                params![owner_id.as_str(), i64::from(position)],
                entry_from_row,
            )
            .optional()
            .with_context(|| format!("Failed to query position {position} for {owner_id}"))?;
        row.map(finish_entry).transpose()
    }

    fn list_by_owner(&self, owner_id: &OwnerId) -> Result<Vec<RankedEntry>> {
        let conn = self.lock_conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SELECT_COLS} FROM entries
                 WHERE owner_id = ?
                 ORDER BY position, id"
            ))
            .context("Failed to prepare list query")?;
        let rows = stmt
            .query_map(params![owner_id.as_str()], entry_from_row)
            .with_context(|| format!("Failed to list entries for {owner_id}"))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(finish_entry(row.context("Failed to read entry row")?)?);
        }
        Ok(entries)
    }

    fn create(&self, entry: &RankedEntry) -> Result<()> {
        let payload_json =
            serde_json::to_string(&entry.payload).context("Failed to serialize payload")?;
        self.lock_conn()
            .execute(
                "INSERT INTO entries (id, owner_id, item_id, position, payload, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    entry.id.as_str(),
                    entry.owner_id.as_str(),
                    entry.item_id.as_str(),
                    i64::from(entry.position),
                    payload_json,
                    entry.created_at.to_rfc3339(),
                    entry.updated_at.to_rfc3339(),
                ],
            )
            .with_context(|| format!("Failed to create entry {}", entry.id))?;
        Ok(())
    }

    fn update_position(&self, id: &EntryId, position: u32) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self
            .lock_conn()
            .execute(
                "UPDATE entries SET position = ?, updated_at = ? WHERE id = ?",
                params![i64::from(position), now, id.as_str()],
            )
            .with_context(|| format!("Failed to update position of {id}"))?;
        anyhow::ensure!(changed == 1, "No entry row with id {id}");
        Ok(())
    }

    fn delete(&self, id: &EntryId) -> Result<()> {
        let changed = self
            .lock_conn()
            .execute("DELETE FROM entries WHERE id = ?", params![id.as_str()])
            .with_context(|| format!("Failed to delete entry {id}"))?;
        anyhow::ensure!(changed == 1, "No entry row with id {id}");
        Ok(())
    }
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS owners (
    owner_id   TEXT PRIMARY KEY,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS entries (
    id         TEXT PRIMARY KEY,
    owner_id   TEXT NOT NULL REFERENCES owners(owner_id),
    item_id    TEXT NOT NULL,
    position   INTEGER NOT NULL,
    payload    TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (owner_id, item_id)
);

CREATE INDEX IF NOT EXISTS idx_entries_owner_position
    ON entries (owner_id, position);
";
