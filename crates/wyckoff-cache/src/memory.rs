use chrono::{DateTime, Utc};
use moka::future::Cache;
use std::time::Duration;

/// A dataset payload plus its original creation time.
///
/// The creation time travels with the payload so freshness checks give the
/// same answer whether an entry is served from the hot layer or from SQLite.
#[derive(Debug, Clone, PartialEq)]
pub struct HotEntry {
    pub created_at: DateTime<Utc>,
    pub payload: String,
}

/// In-memory hot cache backed by moka.
///
/// Keeps recently-read datasets close; moka evicts on its own (short) TTL
/// independently of the dataset freshness window.
pub struct MemoryCache {
    inner: Cache<String, HotEntry>,
}

impl MemoryCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<HotEntry> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: String, entry: HotEntry) {
        self.inner.insert(key, entry).await;
    }

    pub async fn invalidate(&self, key: &str) {
        self.inner.invalidate(key).await;
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}
