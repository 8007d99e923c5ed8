//! Bounded LRU result cache with per-entry TTL

use super::{CacheConfig, CacheEntry, CacheKey, CacheMetrics, ResultCache};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;
use tracing::trace;

/// Thread-safe LRU cache of optimization results.
///
/// Reads move an entry to the most-recently-used position; entries older
/// than the TTL are dropped on read instead of being returned.
pub struct OptimizationCache {
    entries: Mutex<LruCache<CacheKey, CacheEntry>>,
    metrics: Mutex<CacheMetrics>,
    ttl: Duration,
}

impl OptimizationCache {
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            metrics: Mutex::new(CacheMetrics::default()),
            ttl: config.ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock_entries().clear();
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, LruCache<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_metrics(&self, f: impl FnOnce(&mut CacheMetrics)) {
        let mut metrics = self.metrics.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut metrics);
    }
}

impl Default for OptimizationCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl ResultCache for OptimizationCache {
    fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let mut entries = self.lock_entries();
        let found = entries
            .get(key)
            .map(|entry| (entry.is_expired(self.ttl), entry.clone()));

        match found {
            Some((false, entry)) => {
                drop(entries);
                trace!(key = key.as_str(), "cache hit");
                self.with_metrics(|m| m.record_hit());
                Some(entry)
            }
            Some((true, _)) => {
                entries.pop(key);
                drop(entries);
                trace!(key = key.as_str(), "cache entry expired");
                self.with_metrics(|m| m.record_expiration());
                None
            }
            None => {
                drop(entries);
                trace!(key = key.as_str(), "cache miss");
                self.with_metrics(|m| m.record_miss());
                None
            }
        }
    }

    fn put(&self, key: CacheKey, entry: CacheEntry) {
        let displaced = self.lock_entries().push(key.clone(), entry);
        let evicted = matches!(&displaced, Some((old, _)) if *old != key);

        if evicted {
            trace!("cache full, evicted least recently used entry");
        }
        self.with_metrics(|m| {
            m.record_write();
            if evicted {
                m.record_eviction();
            }
        });
    }

    fn metrics(&self) -> CacheMetrics {
        self.metrics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
