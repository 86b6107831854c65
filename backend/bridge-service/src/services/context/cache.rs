//! Expiring in-memory cache for context snapshots
//!
//! Owned by whoever constructs it (no process-wide state). Reads are
//! concurrent via `DashMap`. A caller that rebuilds an entry gets back the
//! value it just stored. Concurrent rebuilds of one key may both run; the
//! last insert wins.
//!
//! Expired entries are kept so a failing rebuild can fall back to the stale
//! value instead of surfacing the error. They are the first to go once the
//! cache reaches `max_entries`; after them, the entries closest to expiry.

use dashmap::DashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::Result;
use crate::metrics::context_cache as metrics;

#[derive(Debug)]
struct CachedEntry<V> {
    value: Arc<V>,
    expires_at: Instant,
}

impl<V> CachedEntry<V> {
    #[inline]
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Where a lookup was answered from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Refreshed,
    Stale,
}

impl CacheOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOutcome::Hit => "hit",
            CacheOutcome::Refreshed => "refreshed",
            CacheOutcome::Stale => "stale",
        }
    }
}

/// Entry cap used by `TtlCache::new`
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

pub struct TtlCache<K, V> {
    name: &'static str,
    ttl: Duration,
    max_entries: usize,
    store: DashMap<K, CachedEntry<V>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Display,
{
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self::with_limits(name, ttl, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_limits(name: &'static str, ttl: Duration, max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        debug!(
            cache = name,
            ttl_secs = ttl.as_secs(),
            max_entries,
            "Initializing context cache"
        );
        Self {
            name,
            ttl,
            max_entries,
            store: DashMap::new(),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Unexpired value for `key`
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.store
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone())
    }

    pub fn insert(&self, key: K, value: V) -> Arc<V> {
        self.insert_expiring(key, value, Instant::now() + self.ttl)
    }

    fn insert_expiring(&self, key: K, value: V, expires_at: Instant) -> Arc<V> {
        let value = Arc::new(value);
        if !self.store.contains_key(&key) {
            self.enforce_limit();
        }
        self.store.insert(
            key,
            CachedEntry {
                value: value.clone(),
                expires_at,
            },
        );
        value
    }

    /// Make room for one more entry: drop expired entries, then the ones
    /// that expire soonest.
    fn enforce_limit(&self) {
        if self.store.len() < self.max_entries {
            return;
        }

        let now = Instant::now();
        let before = self.store.len();
        self.store.retain(|_, entry| entry.expires_at > now);
        let expired = before - self.store.len();

        let mut by_expiry = 0;
        let len = self.store.len();
        if len >= self.max_entries {
            let excess = len + 1 - self.max_entries;
            let mut candidates: Vec<(Instant, K)> = self
                .store
                .iter()
                .map(|entry| (entry.expires_at, entry.key().clone()))
                .collect();
            candidates.sort_by_key(|(expires_at, _)| *expires_at);

            for (_, key) in candidates.into_iter().take(excess) {
                if self.store.remove(&key).is_some() {
                    by_expiry += 1;
                }
            }
        }

        metrics::record_evictions(self.name, "expired", expired);
        metrics::record_evictions(self.name, "capacity", by_expiry);
        warn!(
            cache = self.name,
            max_entries = self.max_entries,
            expired,
            by_expiry,
            "Context cache full, evicted entries"
        );
    }

    pub fn invalidate(&self, key: &K) {
        self.store.remove(key);
    }

    pub fn clear(&self) {
        self.store.clear();
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Return the cached value or rebuild it with `loader`.
    ///
    /// On loader failure the stale entry (if any) is served and kept; with no
    /// entry at all the error propagates.
    pub async fn get_or_load<F, Fut>(&self, key: &K, loader: F) -> Result<(Arc<V>, CacheOutcome)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(value) = self.get(key) {
            metrics::record_lookup(self.name, CacheOutcome::Hit.as_str());
            return Ok((value, CacheOutcome::Hit));
        }

        match loader().await {
            Ok(fresh) => {
                metrics::record_lookup(self.name, CacheOutcome::Refreshed.as_str());
                Ok((self.insert(key.clone(), fresh), CacheOutcome::Refreshed))
            }
            Err(e) => {
                // Clone out before returning so the shard guard is released
                let stale = self.store.get(key).map(|entry| entry.value.clone());
                match stale {
                    Some(value) => {
                        warn!(
                            cache = self.name,
                            key = %key,
                            error = %e,
                            "Context rebuild failed, serving stale entry"
                        );
                        metrics::record_lookup(self.name, CacheOutcome::Stale.as_str());
                        Ok((value, CacheOutcome::Stale))
                    }
                    None => {
                        metrics::record_lookup(self.name, "error");
                        Err(e)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[tokio::test]
    async fn hit_skips_loader() {
        let cache: TtlCache<String, u32> = TtlCache::new("test", Duration::from_secs(60));
        let key = "k".to_string();
        let (v, outcome) = cache.get_or_load(&key, || async { Ok(1) }).await.unwrap();
        assert_eq!((*v, outcome), (1, CacheOutcome::Refreshed));

        let (v, outcome) = cache
            .get_or_load(&key, || async { Err(AppError::Internal("must not run".into())) })
            .await
            .unwrap();
        assert_eq!((*v, outcome), (1, CacheOutcome::Hit));
    }

    #[tokio::test]
    async fn expired_entry_is_rebuilt() {
        let cache: TtlCache<String, u32> = TtlCache::new("test", Duration::ZERO);
        let key = "k".to_string();
        cache.insert(key.clone(), 1);
        assert!(cache.get(&key).is_none());

        let (v, outcome) = cache.get_or_load(&key, || async { Ok(2) }).await.unwrap();
        assert_eq!((*v, outcome), (2, CacheOutcome::Refreshed));
    }

    #[tokio::test]
    async fn failed_rebuild_serves_stale() {
        let cache: TtlCache<String, u32> = TtlCache::new("test", Duration::ZERO);
        let key = "k".to_string();
        cache.insert(key.clone(), 7);

        let (v, outcome) = cache
            .get_or_load(&key, || async { Err(AppError::Database("down".into())) })
            .await
            .unwrap();
        assert_eq!((*v, outcome), (7, CacheOutcome::Stale));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn failed_rebuild_without_entry_propagates() {
        let cache: TtlCache<String, u32> = TtlCache::new("test", Duration::from_secs(60));
        let err = cache
            .get_or_load(&"k".to_string(), || async {
                Err(AppError::Database("down".into()))
            })
            .await
            .unwrap_err();
        assert!(err.is_upstream());
        assert!(cache.is_empty());
    }

    #[test]
    fn full_cache_drops_expired_entries_first() {
        let cache: TtlCache<String, u32> =
            TtlCache::with_limits("test", Duration::from_secs(60), 3);
        let now = Instant::now();
        cache.insert_expiring("old".into(), 1, now);
        cache.insert_expiring("soon".into(), 2, now + Duration::from_secs(10));
        cache.insert_expiring("late".into(), 3, now + Duration::from_secs(120));

        cache.insert("new".into(), 4);
        assert_eq!(cache.len(), 3);
        assert!(cache.store.get("old").is_none());
        assert!(cache.get(&"soon".to_string()).is_some());
        assert!(cache.get(&"late".to_string()).is_some());
        assert!(cache.get(&"new".to_string()).is_some());
    }

    #[test]
    fn full_cache_without_expired_drops_soonest_expiry() {
        let cache: TtlCache<String, u32> =
            TtlCache::with_limits("test", Duration::from_secs(600), 3);
        let now = Instant::now();
        cache.insert_expiring("a".into(), 1, now + Duration::from_secs(120));
        cache.insert_expiring("b".into(), 2, now + Duration::from_secs(10));
        cache.insert_expiring("c".into(), 3, now + Duration::from_secs(300));

        cache.insert("d".into(), 4);
        assert_eq!(cache.len(), 3);
        assert!(cache.get(&"b".to_string()).is_none());
        assert!(cache.get(&"a".to_string()).is_some());
        assert!(cache.get(&"c".to_string()).is_some());

        // Replacing an existing key never evicts
        cache.insert("a".into(), 5);
        assert_eq!(cache.len(), 3);
        assert!(cache.get(&"c".to_string()).is_some());
    }

    #[test]
    fn entry_count_stays_bounded() {
        let cache: TtlCache<u32, u32> = TtlCache::with_limits("test", Duration::ZERO, 100);
        for i in 0..10_000 {
            cache.insert(i, i);
        }
        assert!(cache.len() <= 100);
    }
}
