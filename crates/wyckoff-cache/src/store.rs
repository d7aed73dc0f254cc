use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;

use crate::error::CacheError;
use crate::memory::{HotEntry, MemoryCache};
use crate::sqlite::SqliteStore;

/// TTL-bounded dataset cache: moka (hot) → SQLite (durable) → miss.
///
/// On a SQLite hit the entry is promoted to the hot layer. Freshness is
/// checked on both paths against the caller's `max_age`, so a dataset that
/// expired while sitting in the hot layer is still reported as a miss.
///
/// SQLite access goes through a `Mutex` (`rusqlite::Connection` is not
/// `Sync`), which also serializes concurrent writes to the same key.
pub struct CacheStore {
    memory: MemoryCache,
    sqlite: Mutex<SqliteStore>,
}

impl CacheStore {
    pub fn new(sqlite: SqliteStore, max_capacity: u64, memory_ttl: Duration) -> Self {
        Self {
            memory: MemoryCache::new(max_capacity, memory_ttl),
            sqlite: Mutex::new(sqlite),
        }
    }

    /// Get the payload for `key` if it is younger than `max_age`.
    ///
    /// Stale entries are purged from both layers during the read. Corrupted
    /// rows are treated as misses, never surfaced as errors to the caller.
    pub async fn get(&self, key: &str, max_age: Duration) -> Result<Option<String>, CacheError> {
        let max_age = chrono::Duration::from_std(max_age)
            .map_err(|e| CacheError::Unavailable(format!("max_age out of range: {e}")))?;

        if let Some(entry) = self.memory.get(key).await {
            if Utc::now().signed_duration_since(entry.created_at) < max_age {
                return Ok(Some(entry.payload));
            }
            // Expired while hot: drop it everywhere and fall through to miss.
            self.memory.invalidate(key).await;
            self.lock()?.delete(key)?;
            return Ok(None);
        }

        let entry = { self.lock()?.get(key, max_age)? };

        if let Some(entry) = entry {
            self.memory.insert(key.to_string(), entry.clone()).await;
            return Ok(Some(entry.payload));
        }

        Ok(None)
    }

    /// Persist `payload` under `key`, overwriting any prior value.
    pub async fn put(&self, key: &str, payload: &str) -> Result<(), CacheError> {
        let created_at = Utc::now();
        self.lock()?.put(key, payload, created_at)?;
        self.memory
            .insert(
                key.to_string(),
                HotEntry {
                    created_at,
                    payload: payload.to_string(),
                },
            )
            .await;
        Ok(())
    }

    pub fn hot_entry_count(&self) -> u64 {
        self.memory.entry_count()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, SqliteStore>, CacheError> {
        self.sqlite
            .lock()
            .map_err(|e| CacheError::Unavailable(format!("SQLite mutex poisoned: {e}")))
    }
}
