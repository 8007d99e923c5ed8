//! Result caching for the optimization pipeline
//!
//! The pipeline is deterministic, so a finished [`OptimizationResult`] can be
//! reused whenever the same input is optimized with the same options. Caches
//! are injected into [`PromptOptimizer`] through the [`ResultCache`] trait:
//!
//! - [`OptimizationCache`]: bounded LRU with a time-to-live on every entry
//! - [`NoCache`]: stores nothing, for benchmarks and deterministic tests
//!
//! [`OptimizationResult`]: crate::optimization::OptimizationResult
//! [`PromptOptimizer`]: crate::optimization::PromptOptimizer

mod store;
mod tracker;

pub use store::OptimizationCache;
pub use tracker::CacheMetrics;

use crate::optimization::{ContentType, OptimizationOptions};
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

/// Default bound on cached results
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Default lifetime of a cached result
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Storage for finished optimization results
pub trait ResultCache: Send + Sync {
    /// Fetch a live entry, refreshing its recency
    fn get(&self, key: &CacheKey) -> Option<CacheEntry>;

    fn put(&self, key: CacheKey, entry: CacheEntry);

    /// Snapshot of the hit/miss counters
    fn metrics(&self) -> CacheMetrics;
}

/// SHA-256 over the input text and the serialized options
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(input: &str, options: &OptimizationOptions) -> Self {
        let options = serde_json::to_string(options).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(input.as_bytes());
        hasher.update([0u8]);
        hasher.update(options.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub output: String,
    /// Estimated tokens of `output`
    pub tokens: usize,
    pub content_type: ContentType,
    pub created_at: Instant,
}

impl CacheEntry {
    pub fn new(output: String, tokens: usize, content_type: ContentType) -> Self {
        Self {
            output,
            tokens,
            content_type,
            created_at: Instant::now(),
        }
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

/// Sizing for [`OptimizationCache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            ttl: DEFAULT_TTL,
        }
    }
}

/// A cache that never remembers anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl ResultCache for NoCache {
    fn get(&self, _key: &CacheKey) -> Option<CacheEntry> {
        None
    }

    fn put(&self, _key: CacheKey, _entry: CacheEntry) {}

    fn metrics(&self) -> CacheMetrics {
        CacheMetrics::default()
    }
}
