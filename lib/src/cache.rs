//! A single generic TTL store, parameterized by key and value, shared by
//! the resolver, disposable classifier, typo corrector, health probe and
//! bulk scheduler (spec §3 `CacheEntry`, §9 "caches as capabilities").
//!
//! Reads are lock-free-ish (a short shared-lock section); writes take a
//! short exclusive section. Entries are replaced wholesale on refresh,
//! never mutated in place.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// A namespaced, TTL-bounded cache. One instance per keyspace
/// (`domain`, `mx`, `health`, `disposable`, `typo`, `bulk`).
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns a cached value if present and not expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().expect("cache lock poisoned");
        entries.get(key).and_then(|entry| {
            if entry.expires_at > Instant::now() {
                Some(entry.value.clone())
            } else {
                None
            }
        })
    }

    /// Inserts or refreshes a value, resetting its expiry.
    pub fn put(&self, key: K, value: V) {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drops all entries, expired or not.
    pub fn clear(&self) {
        self.entries.write().expect("cache lock poisoned").clear();
    }

    /// Evicts only the entries whose TTL has elapsed.
    pub fn evict_expired(&self) {
        let now = Instant::now();
        self.entries
            .write()
            .expect("cache lock poisoned")
            .retain(|_, entry| entry.expires_at > now);
    }
}

/// Default TTLs from spec §3.
pub mod ttl {
    use std::time::Duration;

    pub const DOMAIN: Duration = Duration::from_secs(5 * 60);
    pub const MX: Duration = Duration::from_secs(5 * 60);
    pub const DISPOSABLE: Duration = Duration::from_secs(24 * 60 * 60);
    pub const TYPO: Duration = Duration::from_secs(60 * 60);
    pub const HEALTH: Duration = Duration::from_secs(5 * 60);
    pub const BULK: Duration = Duration::from_secs(30 * 60);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60));
        cache.put("a".to_string(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        assert_eq!(cache.get(&"missing".to_string()), None);
    }

    #[test]
    fn expired_entries_are_not_returned() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_millis(1));
        cache.put("a", 1);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get(&"a"), None);
    }

    #[test]
    fn clear_removes_everything() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(60));
        cache.put("a", 1);
        cache.clear();
        assert_eq!(cache.get(&"a"), None);
    }

    #[test]
    fn evict_expired_drops_only_stale_entries() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_millis(5));
        cache.put("stale", 1);
        std::thread::sleep(Duration::from_millis(20));
        cache.put("fresh", 2);
        cache.evict_expired();
        assert_eq!(cache.get(&"stale"), None);
        assert_eq!(cache.get(&"fresh"), Some(2));
    }
}
