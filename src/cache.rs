//! TTL + FIFO cache persisted through a [`Storage`] blob.
//!
//! One store per operation family. Entries are kept oldest-inserted first;
//! a full store drops its oldest entry before inserting, and reads purge
//! entries older than `max_age`. Reads never refresh an entry's position.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::storage::Storage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub max_size: usize,
    pub max_age: Duration,
}

impl CachePolicy {
    pub fn new(max_size: usize, max_age: Duration) -> Self {
        Self { max_size, max_age }
    }

    /// `max_age` in milliseconds, saturating for ages beyond `i64`.
    pub fn max_age_millis(&self) -> i64 {
        i64::try_from(self.max_age.as_millis()).unwrap_or(i64::MAX)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<V> {
    pub key: String,
    pub value: V,
    /// Unix milliseconds.
    pub inserted_at: i64,
}

/// Millisecond clock, swappable in tests.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

fn system_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().timestamp_millis())
}

pub struct CacheStore<V> {
    namespace: String,
    policy: CachePolicy,
    storage: Arc<dyn Storage>,
    entries: Mutex<Vec<CacheEntry<V>>>,
    clock: Clock,
}

impl<V> CacheStore<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    /// Restore the store persisted under `namespace`, dropping anything stale.
    pub fn load(namespace: impl Into<String>, policy: CachePolicy, storage: Arc<dyn Storage>) -> Self {
        Self::load_with_clock(namespace, policy, storage, system_clock())
    }

    pub fn load_with_clock(
        namespace: impl Into<String>,
        policy: CachePolicy,
        storage: Arc<dyn Storage>,
        clock: Clock,
    ) -> Self {
        let namespace = namespace.into();
        let raw = storage.get(&namespace, Value::Array(Vec::new()));

        let mut entries: Vec<CacheEntry<V>> = match serde_json::from_value(raw) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(namespace = %namespace, error = %e, "Ignoring unreadable cache blob");
                Vec::new()
            }
        };

        let now = clock();
        let max_age = policy.max_age_millis();
        entries.retain(|e| now.saturating_sub(e.inserted_at) <= max_age);
        if entries.len() > policy.max_size {
            let excess = entries.len() - policy.max_size;
            entries.drain(..excess);
        }

        debug!(namespace = %namespace, entries = entries.len(), "Loaded cache");
        Self {
            namespace,
            policy,
            storage,
            entries: Mutex::new(entries),
            clock,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let Ok(mut entries) = self.entries.lock() else {
            return None;
        };

        let index = entries.iter().position(|e| e.key == key)?;
        let age = (self.clock)().saturating_sub(entries[index].inserted_at);

        if age > self.policy.max_age_millis() {
            debug!(namespace = %self.namespace, key, "Cache entry expired");
            entries.remove(index);
            self.persist(&entries);
            return None;
        }

        Some(entries[index].value.clone())
    }

    /// Insert or wholesale-replace `key`, evicting the oldest entry when full.
    pub fn set(&self, key: &str, value: V) {
        if self.policy.max_size == 0 {
            return;
        }
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };

        entries.retain(|e| e.key != key);
        while entries.len() >= self.policy.max_size {
            let evicted = entries.remove(0);
            debug!(namespace = %self.namespace, key = %evicted.key, "Evicted cache entry");
        }

        entries.push(CacheEntry {
            key: key.to_string(),
            value,
            inserted_at: (self.clock)(),
        });
        self.persist(&entries);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(&self, entries: &[CacheEntry<V>]) {
        let result = serde_json::to_value(entries)
            .map_err(crate::error::Error::from)
            .and_then(|value| self.storage.set(&self.namespace, value));

        if let Err(e) = result {
            warn!(namespace = %self.namespace, error = %e, "Failed to persist cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn manual_clock() -> (Arc<AtomicI64>, Clock) {
        let now = Arc::new(AtomicI64::new(1_000_000));
        let handle = now.clone();
        (now, Arc::new(move || handle.load(Ordering::SeqCst)))
    }

    fn store(max_size: usize, max_age_secs: u64) -> (Arc<AtomicI64>, Arc<MemoryStorage>, CacheStore<String>) {
        let (now, clock) = manual_clock();
        let storage = Arc::new(MemoryStorage::new());
        let cache = CacheStore::load_with_clock(
            "cache.test",
            CachePolicy::new(max_size, Duration::from_secs(max_age_secs)),
            storage.clone(),
            clock,
        );
        (now, storage, cache)
    }

    #[test]
    fn test_set_then_get() {
        let (_, _, cache) = store(10, 60);
        cache.set("search:naruto:1", "value".to_string());
        assert_eq!(cache.get("search:naruto:1"), Some("value".to_string()));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn test_expired_entry_is_purged_on_read() {
        let (now, _, cache) = store(10, 60);
        cache.set("k", "v".to_string());

        now.fetch_add(60_000, Ordering::SeqCst);
        assert_eq!(cache.get("k"), Some("v".to_string()));

        now.fetch_add(1, Ordering::SeqCst);
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_oldest_inserted_evicted_regardless_of_reads() {
        let (_, _, cache) = store(3, 60);
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());
        cache.set("c", "3".to_string());

        // Reads must not protect "a" from eviction.
        assert!(cache.get("a").is_some());
        assert!(cache.get("a").is_some());

        cache.set("d", "4".to_string());
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some("2".to_string()));
        assert_eq!(cache.get("d"), Some("4".to_string()));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_replacing_key_does_not_evict() {
        let (_, _, cache) = store(2, 60);
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());
        cache.set("a", "1b".to_string());

        assert_eq!(cache.get("a"), Some("1b".to_string()));
        assert_eq!(cache.get("b"), Some("2".to_string()));
    }

    #[test]
    fn test_replaced_key_moves_to_newest() {
        let (_, _, cache) = store(2, 60);
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());
        cache.set("a", "1b".to_string());
        cache.set("c", "3".to_string());

        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some("1b".to_string()));
    }

    #[test]
    fn test_every_write_is_persisted_and_reloadable() {
        let (now, storage, cache) = store(10, 60);
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());

        let persisted = storage.get("cache.test", Value::Null);
        assert_eq!(persisted.as_array().map(|a| a.len()), Some(2));

        let clock_now = now.clone();
        let reloaded: CacheStore<String> = CacheStore::load_with_clock(
            "cache.test",
            CachePolicy::new(10, Duration::from_secs(60)),
            storage,
            Arc::new(move || clock_now.load(Ordering::SeqCst)),
        );
        assert_eq!(reloaded.get("b"), Some("2".to_string()));
    }

    #[test]
    fn test_reload_drops_stale_entries() {
        let (now, storage, cache) = store(10, 60);
        cache.set("a", "1".to_string());
        now.fetch_add(120_000, Ordering::SeqCst);

        let clock_now = now.clone();
        let reloaded: CacheStore<String> = CacheStore::load_with_clock(
            "cache.test",
            CachePolicy::new(10, Duration::from_secs(60)),
            storage,
            Arc::new(move || clock_now.load(Ordering::SeqCst)),
        );
        assert!(reloaded.is_empty());
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let (_, _, cache) = store(0, 60);
        cache.set("a", "1".to_string());
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let (now, _, cache) = store(10, u64::MAX);
        assert_eq!(CachePolicy::new(1, Duration::from_secs(u64::MAX)).max_age_millis(), i64::MAX);

        cache.set("k", "v".to_string());
        now.fetch_add(365 * 24 * 3_600_000, Ordering::SeqCst);
        assert_eq!(cache.get("k"), Some("v".to_string()));
    }
}
