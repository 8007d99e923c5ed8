//! Cache counters for monitoring cache efficiency

use serde::{Deserialize, Serialize};

/// Metrics for cache performance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheMetrics {
    pub hits: u64,
    /// Lookups for keys that were never stored or already evicted
    pub misses: u64,
    /// Lookups that found an entry older than the TTL
    pub expirations: u64,
    pub writes: u64,
    pub evictions: u64,
    /// Hit rate (0.0 - 1.0), expirations count as misses
    pub hit_rate: f64,
}

impl CacheMetrics {
    pub fn record_hit(&mut self) {
        self.hits += 1;
        self.update_hit_rate();
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
        self.update_hit_rate();
    }

    pub fn record_expiration(&mut self) {
        self.expirations += 1;
        self.update_hit_rate();
    }

    pub fn record_write(&mut self) {
        self.writes += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn lookups(&self) -> u64 {
        self.hits + self.misses + self.expirations
    }

    fn update_hit_rate(&mut self) {
        let total = self.lookups();
        self.hit_rate = if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        };
    }

    /// Merge another metrics instance into this one
    pub fn merge(&mut self, other: &CacheMetrics) {
        self.hits += other.hits;
        self.misses += other.misses;
        self.expirations += other.expirations;
        self.writes += other.writes;
        self.evictions += other.evictions;
        self.update_hit_rate();
    }
}

impl std::fmt::Display for CacheMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Cache Metrics ===")?;
        writeln!(f, "Cache hits: {}", self.hits)?;
        writeln!(f, "Cache misses: {}", self.misses)?;
        writeln!(f, "Expired entries: {}", self.expirations)?;
        writeln!(f, "Hit rate: {:.1}%", self.hit_rate * 100.0)?;
        writeln!(f, "Writes: {}", self.writes)?;
        writeln!(f, "Evictions: {}", self.evictions)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_hit_rate() {
        let mut metrics = CacheMetrics::default();

        metrics.record_hit();
        metrics.record_hit();
        metrics.record_miss();

        assert!((metrics.hit_rate - 0.666).abs() < 0.01);
    }

    #[test]
    fn test_expirations_lower_hit_rate() {
        let mut metrics = CacheMetrics::default();
        metrics.record_hit();
        metrics.record_expiration();
        assert_eq!(metrics.lookups(), 2);
        assert!((metrics.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_merge() {
        let mut a = CacheMetrics::default();
        a.record_hit();
        let mut b = CacheMetrics::default();
        b.record_miss();
        b.record_write();

        a.merge(&b);
        assert_eq!(a.hits, 1);
        assert_eq!(a.misses, 1);
        assert_eq!(a.writes, 1);
        assert!((a.hit_rate - 0.5).abs() < f64::EPSILON);
    }
}
