// Persistence backend - key-value contract over SQLite
//
// The triage core only ever needs two durable strings (the flagged
// snapshot and the review ledger), so the backend is a plain key-value
// store. SQLite in WAL mode backs it for crash recovery.

use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Durable key-value contract used by the flagged store and the ledger.
///
/// Writes are synchronous: when `set` returns, the value is durable.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// SQLite-backed key-value store.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::setup(&conn)?;

        Ok(SqliteStore { conn })
    }

    /// In-memory store for tests and ephemeral sessions.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::setup(&conn)?;

        Ok(SqliteStore { conn })
    }

    fn setup(conn: &Connection) -> Result<()> {
        // WAL mode for crash recovery (no-op for in-memory connections,
        // where the pragma reports "memory" instead of "wal")
        if let Err(e) = conn.pragma_update(None, "journal_mode", "WAL") {
            log::warn!("could not enable WAL journal mode: {}", e);
        }

        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        Ok(())
    }
}

impl KvStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;

        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                            updated_at = CURRENT_TIMESTAMP",
            params![key, value],
        )?;

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
