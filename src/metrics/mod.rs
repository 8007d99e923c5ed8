//! Metrics and tracking for token savings

use crate::optimization::{OptimizationResult, Preset, Strategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Token savings aggregated over optimization runs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenMetrics {
    /// Estimated tokens before optimization
    pub total_original_tokens: u64,
    /// Estimated tokens after optimization
    pub total_optimized_tokens: u64,
    pub tokens_saved: u64,
    pub run_count: u64,
    /// Runs answered from the result cache
    pub cache_hits: u64,
    /// How often each strategy tag fired
    pub strategy_counts: BTreeMap<String, u64>,
}

impl TokenMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: &OptimizationResult) {
        self.total_original_tokens += result.original_tokens as u64;
        self.total_optimized_tokens += result.optimized_tokens as u64;
        self.tokens_saved += result.saved as u64;
        self.run_count += 1;

        for strategy in &result.strategies {
            if *strategy == Strategy::Cached {
                self.cache_hits += 1;
            }
            *self.strategy_counts.entry(strategy.tag()).or_insert(0) += 1;
        }
    }

    /// Optimized size as a fraction of the original
    pub fn compression_ratio(&self) -> f64 {
        if self.total_original_tokens == 0 {
            return 1.0;
        }
        self.total_optimized_tokens as f64 / self.total_original_tokens as f64
    }

    pub fn average_saved_per_run(&self) -> f64 {
        if self.run_count == 0 {
            return 0.0;
        }
        self.tokens_saved as f64 / self.run_count as f64
    }
}

/// Thread-safe metrics tracker
#[derive(Clone)]
pub struct MetricsTracker {
    inner: Arc<Mutex<TokenMetrics>>,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(TokenMetrics::new())),
        }
    }

    pub fn record(&self, result: &OptimizationResult) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.record(result);
        }
    }

    pub fn get_metrics(&self) -> TokenMetrics {
        self.inner
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn reset(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            *metrics = TokenMetrics::new();
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let metrics = self.get_metrics();
        MetricsSummary {
            original_tokens: metrics.total_original_tokens,
            optimized_tokens: metrics.total_optimized_tokens,
            tokens_saved: metrics.tokens_saved,
            compression_ratio: metrics.compression_ratio(),
            run_count: metrics.run_count,
            cache_hits: metrics.cache_hits,
            avg_saved_per_run: metrics.average_saved_per_run(),
            strategy_counts: metrics.strategy_counts,
        }
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub original_tokens: u64,
    pub optimized_tokens: u64,
    pub tokens_saved: u64,
    pub compression_ratio: f64,
    pub run_count: u64,
    pub cache_hits: u64,
    pub avg_saved_per_run: f64,
    pub strategy_counts: BTreeMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Token Metrics Summary ===")?;
        writeln!(f, "Original tokens: {}", self.original_tokens)?;
        writeln!(f, "Optimized tokens: {}", self.optimized_tokens)?;
        writeln!(f, "Tokens saved: {}", self.tokens_saved)?;
        writeln!(f, "Compression ratio: {:.2}%", self.compression_ratio * 100.0)?;
        writeln!(f, "Total runs: {}", self.run_count)?;
        writeln!(f, "Cache hits: {}", self.cache_hits)?;
        writeln!(f, "Avg tokens saved/run: {:.1}", self.avg_saved_per_run)?;
        if !self.strategy_counts.is_empty() {
            writeln!(f, "Strategies:")?;
            for (tag, count) in &self.strategy_counts {
                writeln!(f, "  {:<24} {}", tag, count)?;
            }
        }
        Ok(())
    }
}

/// One row of `token-optimizer benchmark`
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkResult {
    pub preset: Preset,
    pub original_tokens: usize,
    pub optimized_tokens: usize,
    pub savings_percent: f64,
    pub strategies: Vec<Strategy>,
    pub processing_time: Duration,
}

impl BenchmarkResult {
    pub fn from_run(preset: Preset, result: &OptimizationResult, processing_time: Duration) -> Self {
        Self {
            preset,
            original_tokens: result.original_tokens,
            optimized_tokens: result.optimized_tokens,
            savings_percent: result.savings_percent,
            strategies: result.strategies.clone(),
            processing_time,
        }
    }

    pub fn tokens_saved(&self) -> usize {
        self.original_tokens.saturating_sub(self.optimized_tokens)
    }
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let strategies: Vec<String> = self.strategies.iter().map(Strategy::tag).collect();
        write!(
            f,
            "{:<13} {:>9} {:>9} {:>7.2}% {:>9.2}ms  {}",
            self.preset.as_str(),
            self.original_tokens,
            self.optimized_tokens,
            self.savings_percent,
            self.processing_time.as_secs_f64() * 1000.0,
            strategies.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::ContentType;

    fn run(original: usize, optimized: usize, strategies: Vec<Strategy>) -> OptimizationResult {
        OptimizationResult::new(
            "out".to_string(),
            original,
            optimized,
            strategies,
            ContentType::Prose,
        )
    }

    #[test]
    fn test_record_runs() {
        let tracker = MetricsTracker::new();
        tracker.record(&run(100, 80, vec![Strategy::Semantic, Strategy::Whitespace]));
        tracker.record(&run(100, 80, vec![Strategy::Cached]));

        let metrics = tracker.get_metrics();
        assert_eq!(metrics.run_count, 2);
        assert_eq!(metrics.tokens_saved, 40);
        assert_eq!(metrics.cache_hits, 1);
        assert_eq!(metrics.strategy_counts.get("semantic"), Some(&1));
        assert!((metrics.compression_ratio() - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = TokenMetrics::new();
        assert_eq!(metrics.compression_ratio(), 1.0);
        assert_eq!(metrics.average_saved_per_run(), 0.0);
    }

    #[test]
    fn test_summary_display() {
        let tracker = MetricsTracker::new();
        tracker.record(&run(10, 5, vec![Strategy::Filler(Preset::Standard)]));
        let text = tracker.summary().to_string();
        assert!(text.contains("Tokens saved: 5"));
        assert!(text.contains("filler:standard"));

        tracker.reset();
        assert_eq!(tracker.get_metrics().run_count, 0);
    }

    #[test]
    fn test_benchmark_row() {
        let result = run(200, 150, vec![Strategy::Whitespace]);
        let row = BenchmarkResult::from_run(Preset::Aggressive, &result, Duration::from_millis(3));
        assert_eq!(row.tokens_saved(), 50);
        let line = row.to_string();
        assert!(line.starts_with("aggressive"));
        assert!(line.contains("25.00%"));
    }
}
