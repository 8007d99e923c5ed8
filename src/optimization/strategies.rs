//! Pipeline orchestration

use super::context::optimize_for_content_type;
use super::detector::detect_content_type;
use super::duplicates::{has_duplicate_sentence, remove_duplicates};
use super::estimator::TokenEstimator;
use super::filler::{contains_filler, strip_filler};
use super::semantic::{compress_semantic, contains_verbose_phrase};
use super::summarizer::{summarize, SummarizerOptions};
use super::whitespace::{compress_whitespace, WhitespaceOptions};
use super::{ContentType, OptimizationOptions, OptimizationResult, Strategy};
use crate::cache::{CacheEntry, CacheKey, CacheMetrics, NoCache, ResultCache};
use crate::metrics::MetricsTracker;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

/// Summarization only runs on inputs estimated above this many tokens
pub const SUMMARIZATION_THRESHOLD: usize = 10_000;

/// Context-specific results below this savings percentage are discarded
const CONTEXT_MIN_SAVINGS: f64 = 5.0;

static BLANK_LINE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n(?:[ \t]*\n){3,}").unwrap());
static SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r" {3,}").unwrap());

/// Cheap scan deciding whether the full pipeline is worth running.
///
/// Only looks for filler or verbose phrases, long blank-line or space runs
/// and repeated sentences. Log-only or comment-only savings are not detected.
pub fn has_optimization_potential(text: &str) -> bool {
    if text.trim().is_empty() {
        return false;
    }
    contains_filler(text)
        || contains_verbose_phrase(text)
        || BLANK_LINE_RUN.is_match(text)
        || SPACE_RUN.is_match(text)
        || has_duplicate_sentence(text)
}

/// Runs the optimization stages in order and stops as soon as the token
/// target is met.
pub struct PromptOptimizer {
    cache: Arc<dyn ResultCache>,
    metrics: MetricsTracker,
}

impl PromptOptimizer {
    pub fn new(cache: Arc<dyn ResultCache>) -> Self {
        Self {
            cache,
            metrics: MetricsTracker::new(),
        }
    }

    /// An optimizer whose results are never cached
    pub fn uncached() -> Self {
        Self::new(Arc::new(NoCache))
    }

    /// Record runs into a shared tracker
    pub fn with_metrics(mut self, metrics: MetricsTracker) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &MetricsTracker {
        &self.metrics
    }

    pub fn cache_metrics(&self) -> CacheMetrics {
        self.cache.metrics()
    }

    /// Optimize `input`. Never fails; the worst case is the input unchanged.
    pub fn optimize(&self, input: &str, options: &OptimizationOptions) -> OptimizationResult {
        let result = self.run(input, options);
        self.metrics.record(&result);
        result
    }

    fn run(&self, input: &str, options: &OptimizationOptions) -> OptimizationResult {
        let estimator = TokenEstimator::new(&options.model);
        let original_tokens = estimator.count(input);
        let key = CacheKey::new(input, options);

        if let Some(entry) = self.cache.get(&key) {
            debug!(original_tokens, optimized_tokens = entry.tokens, "served from cache");
            return OptimizationResult::new(
                entry.output,
                original_tokens,
                entry.tokens,
                vec![Strategy::Cached],
                entry.content_type,
            );
        }

        let content_type = options
            .content_type
            .unwrap_or_else(|| detect_content_type(input).content_type);

        if !has_optimization_potential(input) {
            debug!(original_tokens, %content_type, "no optimization potential");
            let result = OptimizationResult::new(
                input.to_string(),
                original_tokens,
                original_tokens,
                Vec::new(),
                content_type,
            );
            self.store(key, &result);
            return result;
        }

        let target = options.target_tokens(original_tokens);
        debug!(original_tokens, ?target, %content_type, "optimizing");

        let mut run = Run::new(input, original_tokens, &estimator, target);
        run.execute(options, content_type);

        let result = OptimizationResult::new(
            run.text,
            original_tokens,
            run.tokens,
            run.strategies,
            content_type,
        );
        self.store(key, &result);
        result
    }

    fn store(&self, key: CacheKey, result: &OptimizationResult) {
        self.cache.put(
            key,
            CacheEntry::new(
                result.output.clone(),
                result.optimized_tokens,
                result.content_type,
            ),
        );
    }
}

impl Default for PromptOptimizer {
    fn default() -> Self {
        Self::new(Arc::new(crate::cache::OptimizationCache::default()))
    }
}

/// Working state of one pipeline pass
struct Run<'a> {
    text: String,
    tokens: usize,
    original_tokens: usize,
    estimator: &'a TokenEstimator,
    target: Option<usize>,
    strategies: Vec<Strategy>,
    /// Position of the filler tag, rewritten as tiers escalate
    filler_slot: Option<usize>,
}

impl<'a> Run<'a> {
    fn new(
        input: &str,
        tokens: usize,
        estimator: &'a TokenEstimator,
        target: Option<usize>,
    ) -> Self {
        Self {
            text: input.to_string(),
            tokens,
            original_tokens: tokens,
            estimator,
            target,
            strategies: Vec::new(),
            filler_slot: None,
        }
    }

    fn execute(&mut self, options: &OptimizationOptions, content_type: ContentType) {
        let toggles = options.toggles;

        if toggles.context {
            if let Some((strategy, result)) =
                optimize_for_content_type(&self.text, content_type, self.estimator)
            {
                if result.savings_percent > CONTEXT_MIN_SAVINGS {
                    self.offer(strategy, result.output);
                } else {
                    debug!(stage = %strategy, savings = result.savings_percent, "below threshold");
                }
                if self.reached_target() {
                    return;
                }
            }
        }

        if toggles.duplicates && content_type != ContentType::Json {
            let report = remove_duplicates(&self.text);
            if report.duplicates_removed > 0 {
                self.offer(Strategy::Duplicates, report.output);
            }
            if self.reached_target() {
                return;
            }
        }

        if toggles.semantic && !matches!(content_type, ContentType::Json | ContentType::Code) {
            let compressed = compress_semantic(&self.text);
            self.offer(Strategy::Semantic, compressed);
            if self.reached_target() {
                return;
            }
        }

        let mut tier = Some(options.preset);
        while let Some(preset) = tier {
            let outcome = strip_filler(&self.text, preset);
            if outcome.changed {
                self.offer_filler(Strategy::Filler(preset), outcome.output);
            }
            if self.target.is_none() || self.reached_target() {
                break;
            }
            tier = preset.next();
        }
        if self.reached_target() {
            return;
        }

        if toggles.whitespace && content_type != ContentType::Json {
            let whitespace = WhitespaceOptions {
                protect_code: true,
                preserve_indentation: content_type == ContentType::Code,
            };
            let compressed = compress_whitespace(&self.text, &whitespace);
            self.offer(Strategy::Whitespace, compressed);
            if self.reached_target() {
                return;
            }
        }

        if toggles.summarization && self.original_tokens > SUMMARIZATION_THRESHOLD {
            let summarizer = SummarizerOptions {
                target_tokens: self.target,
                ..Default::default()
            };
            let summary = summarize(&self.text, &summarizer, self.estimator);
            self.offer(Strategy::Summarization, summary);
        }
    }

    fn reached_target(&self) -> bool {
        self.target.is_some_and(|target| self.tokens <= target)
    }

    /// Take `candidate` if it changed the text without adding tokens
    fn accept(&mut self, strategy: Strategy, candidate: String) -> bool {
        if candidate == self.text {
            return false;
        }
        let tokens = self.estimator.count(&candidate);
        let accepted = tokens <= self.tokens;
        debug!(stage = %strategy, before = self.tokens, after = tokens, accepted, "stage finished");
        if accepted {
            self.text = candidate;
            self.tokens = tokens;
        }
        accepted
    }

    fn offer(&mut self, strategy: Strategy, candidate: String) {
        if self.accept(strategy, candidate) {
            self.strategies.push(strategy);
        }
    }

    fn offer_filler(&mut self, strategy: Strategy, candidate: String) {
        if !self.accept(strategy, candidate) {
            return;
        }
        match self.filler_slot {
            Some(slot) => self.strategies[slot] = strategy,
            None => {
                self.filler_slot = Some(self.strategies.len());
                self.strategies.push(strategy);
            }
        }
    }
}
