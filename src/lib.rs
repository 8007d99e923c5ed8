//! TokenOptimizer - Shrink text headed for a language model to a token budget
//!
//! This library reduces the estimated token footprint of prompts, logs,
//! documentation and code while keeping their meaning. Filler removal,
//! whitespace compression and summarization keep fenced code blocks intact.
//!
//! ## Key Features
//!
//! - **Content Detection**: Classify input as code, prose, JSON, log, documentation or mixed
//! - **Staged Optimization**: Context-specific cleanup, deduplication, phrase compression,
//!   tiered filler removal, whitespace compression and extractive summarization
//! - **Budget Awareness**: Stop as soon as a target savings percentage or token ceiling is met
//! - **Result Caching**: LRU cache with TTL for repeated inputs
//! - **Metrics Tracking**: Aggregate token savings and strategy usage
//!
//! ```
//! use token_optimizer::{optimize, OptimizationOptions, Preset};
//!
//! let options = OptimizationOptions::new().with_preset(Preset::Standard);
//! let result = optimize("This is basically done.", &options);
//! assert!(result.optimized_tokens <= result.original_tokens);
//! ```

pub mod cache;
pub mod config;
pub mod metrics;
pub mod optimization;

pub use cache::{CacheConfig, CacheMetrics, NoCache, OptimizationCache, ResultCache};
pub use config::{Config, ConfigBuilder, ConfigError};
pub use metrics::{MetricsTracker, TokenMetrics};
pub use optimization::{
    detect_content_type, ContentType, ContentTypeDetection, Estimate, OptimizationOptions,
    OptimizationResult, Preset, PromptOptimizer, StageToggles, Strategy, TokenEstimator,
};

/// Optimize `input` once, without caching
pub fn optimize(input: &str, options: &OptimizationOptions) -> OptimizationResult {
    PromptOptimizer::uncached().optimize(input, options)
}
