//! Response cache
//!
//! Content-addressed, TTL-bound store of prior generation outcomes. The
//! whole map sits behind one mutex so check-expiry-then-remove and
//! evict-then-insert are atomic with respect to other mutators.
//!
//! Eviction is deliberately crude: at capacity the oldest 25% of entries by
//! insertion time go, not an LRU. The bounded cost per eviction matters more
//! here than hit-rate, and downstream tests depend on the exact counts.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Counts reported by the observability surface
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CacheStats {
    /// Live entries (including not-yet-purged expired ones)
    pub entries: usize,
    /// Configured capacity
    pub capacity: usize,
}

/// TTL-bound response cache with bulk eviction
pub struct ResponseCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    max_entries: usize,
    ttl: Duration,
}

impl<V: Clone> ResponseCache<V> {
    /// Create a cache with the given capacity and entry TTL
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_entries,
            ttl,
        }
    }

    /// Deterministic key for an (operation, subject, prompt) triple
    ///
    /// The prompt already embeds the assembled context string, so any context
    /// change produces a different key without the cache knowing about the
    /// window at all.
    pub fn cache_key(operation: &str, subject: &str, prompt: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(operation.as_bytes());
        hasher.update([0x1f]);
        hasher.update(subject.as_bytes());
        hasher.update([0x1f]);
        hasher.update(prompt.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Look up a key; an entry past its TTL counts as a miss and is removed
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() <= self.ttl => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert a value, evicting the oldest 25% of entries first when at
    /// capacity
    pub async fn put(&self, key: String, value: V) {
        let mut entries = self.entries.lock().await;

        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            let evict_count = (self.max_entries / 4).max(1);
            let mut by_age: Vec<(String, Instant)> = entries
                .iter()
                .map(|(k, e)| (k.clone(), e.inserted_at))
                .collect();
            by_age.sort_by_key(|(_, inserted_at)| *inserted_at);
            for (old_key, _) in by_age.into_iter().take(evict_count) {
                entries.remove(&old_key);
            }
            debug!(evicted = evict_count, "response cache evicted oldest entries");
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Number of stored entries
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove every entry
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// Snapshot for the observability surface
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len().await,
            capacity: self.max_entries,
        }
    }
}
