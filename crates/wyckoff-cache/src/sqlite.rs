use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::warn;

use crate::error::CacheError;
use crate::memory::HotEntry;

const DATASET_TABLE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS datasets (
    key         TEXT PRIMARY KEY,
    payload     TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
";

/// Durable dataset blob store on SQLite.
///
/// One row per cache key, overwritten on every `put`. Freshness is decided
/// at read time against a caller-supplied maximum age; stale and unreadable
/// rows are deleted during the read and reported as misses.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self, CacheError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(DATASET_TABLE_DDL)?;
        Ok(Self { conn })
    }

    /// In-memory database for tests.
    pub fn open_in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(DATASET_TABLE_DDL)?;
        Ok(Self { conn })
    }

    /// Get an entry no older than `max_age`. A stale or corrupted row is
    /// purged and reported as a miss, never as an error.
    pub fn get(&self, key: &str, max_age: chrono::Duration) -> Result<Option<HotEntry>, CacheError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT payload, created_at FROM datasets WHERE key = ?1")?;

        let row = stmt
            .query_row(rusqlite::params![key], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            });

        let (payload, created_at_raw) = match row {
            Ok(pair) => pair,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(CacheError::Sqlite(e)),
        };

        let created_at = match created_at_raw.parse::<DateTime<Utc>>() {
            Ok(ts) => ts,
            Err(e) => {
                warn!(key, error = %e, "Purging unreadable cache entry");
                self.delete(key)?;
                return Ok(None);
            }
        };

        if Utc::now().signed_duration_since(created_at) >= max_age {
            self.delete(key)?;
            return Ok(None);
        }

        Ok(Some(HotEntry {
            created_at,
            payload,
        }))
    }

    /// Persist an entry, overwriting any prior value for the key.
    pub fn put(&self, key: &str, payload: &str, created_at: DateTime<Utc>) -> Result<(), CacheError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO datasets (key, payload, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![key, payload, created_at.to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.conn
            .execute("DELETE FROM datasets WHERE key = ?1", rusqlite::params![key])?;
        Ok(())
    }

    /// Number of rows currently stored, fresh or not.
    pub fn len(&self) -> Result<u64, CacheError> {
        let count: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM datasets", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }
}
