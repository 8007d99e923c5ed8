//! Optimization strategies for reducing token consumption
//!
//! The pipeline is made of small, pure text stages that are sequenced by
//! [`PromptOptimizer`]. Each stage can also be used on its own.

mod context;
mod detector;
mod duplicates;
mod estimator;
mod filler;
mod patterns;
mod semantic;
mod strategies;
mod summarizer;
mod whitespace;

pub use context::{
    optimize_code_comments, optimize_documentation, optimize_for_content_type, optimize_logs,
    ContextResult,
};
pub use detector::{detect_content_type, ContentTypeDetection, DetectionFeatures};
pub use duplicates::{remove_duplicates, DuplicateReport};
pub use estimator::{Estimate, TokenEstimator, DEFAULT_MODEL};
pub use filler::{strip_filler, FillerOutcome};
pub use semantic::compress_semantic;
pub use strategies::{has_optimization_potential, PromptOptimizer, SUMMARIZATION_THRESHOLD};
pub use summarizer::{summarize, SummarizerOptions};
pub use whitespace::{compress_whitespace, WhitespaceOptions};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Aggressiveness tier for filler removal.
///
/// Tiers are strictly additive: every phrase removed by a lower tier is also
/// removed by all higher tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Conservative,
    #[default]
    Standard,
    Aggressive,
    Ultra,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::Conservative,
        Preset::Standard,
        Preset::Aggressive,
        Preset::Ultra,
    ];

    /// The next tier up, or `None` at `Ultra`.
    pub fn next(self) -> Option<Preset> {
        match self {
            Preset::Conservative => Some(Preset::Standard),
            Preset::Standard => Some(Preset::Aggressive),
            Preset::Aggressive => Some(Preset::Ultra),
            Preset::Ultra => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Preset::Conservative => "conservative",
            Preset::Standard => "standard",
            Preset::Aggressive => "aggressive",
            Preset::Ultra => "ultra",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conservative" => Ok(Preset::Conservative),
            "standard" => Ok(Preset::Standard),
            "aggressive" => Ok(Preset::Aggressive),
            "ultra" => Ok(Preset::Ultra),
            other => Err(format!(
                "unknown preset '{}' (expected conservative, standard, aggressive or ultra)",
                other
            )),
        }
    }
}

/// Coarse classification of the input text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Code,
    Prose,
    Json,
    Log,
    Documentation,
    Mixed,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Code => "code",
            ContentType::Prose => "prose",
            ContentType::Json => "json",
            ContentType::Log => "log",
            ContentType::Documentation => "documentation",
            ContentType::Mixed => "mixed",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "code" => Ok(ContentType::Code),
            "prose" => Ok(ContentType::Prose),
            "json" => Ok(ContentType::Json),
            "log" => Ok(ContentType::Log),
            "documentation" | "docs" => Ok(ContentType::Documentation),
            "mixed" => Ok(ContentType::Mixed),
            other => Err(format!("unknown content type '{}'", other)),
        }
    }
}

/// Which pipeline stages may run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StageToggles {
    pub semantic: bool,
    pub whitespace: bool,
    pub duplicates: bool,
    pub summarization: bool,
    pub context: bool,
}

impl Default for StageToggles {
    fn default() -> Self {
        Self {
            semantic: true,
            whitespace: true,
            duplicates: true,
            summarization: true,
            context: true,
        }
    }
}

/// Options for a single optimization run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationOptions {
    /// Desired reduction, in percent of the original estimate.
    /// Takes priority over `max_tokens` when both are set.
    pub target_savings_percent: Option<f64>,
    /// Absolute token ceiling
    pub max_tokens: Option<usize>,
    /// Starting filler-removal tier
    pub preset: Preset,
    pub toggles: StageToggles,
    /// Skip detection and treat the input as this type
    pub content_type: Option<ContentType>,
    /// Model name used for token estimates
    pub model: String,
}

impl Default for OptimizationOptions {
    fn default() -> Self {
        Self {
            target_savings_percent: None,
            max_tokens: None,
            preset: Preset::default(),
            toggles: StageToggles::default(),
            content_type: None,
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl OptimizationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.preset = preset;
        self
    }

    pub fn with_target_savings(mut self, percent: f64) -> Self {
        self.target_savings_percent = Some(percent);
        self
    }

    pub fn with_max_tokens(mut self, tokens: usize) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_toggles(mut self, toggles: StageToggles) -> Self {
        self.toggles = toggles;
        self
    }

    /// Token count the pipeline tries to reach, if the caller asked for one.
    ///
    /// `target_savings_percent` wins over `max_tokens`; the two are never combined.
    pub fn target_tokens(&self, original_tokens: usize) -> Option<usize> {
        if let Some(percent) = self.target_savings_percent {
            let percent = if percent.is_finite() {
                percent.clamp(0.0, 100.0)
            } else {
                0.0
            };
            let target = (original_tokens as f64 * (1.0 - percent / 100.0)).floor();
            return Some(target.max(0.0) as usize);
        }
        self.max_tokens
    }
}

/// A transformation that fired during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum Strategy {
    Cached,
    LogCompression,
    DocumentationCleanup,
    CommentRemoval,
    Duplicates,
    Semantic,
    Filler(Preset),
    Whitespace,
    Summarization,
}

impl Strategy {
    pub fn tag(&self) -> String {
        match self {
            Strategy::Cached => "cached".to_string(),
            Strategy::LogCompression => "context:log".to_string(),
            Strategy::DocumentationCleanup => "context:documentation".to_string(),
            Strategy::CommentRemoval => "context:code".to_string(),
            Strategy::Duplicates => "duplicates".to_string(),
            Strategy::Semantic => "semantic".to_string(),
            Strategy::Filler(preset) => format!("filler:{}", preset),
            Strategy::Whitespace => "whitespace".to_string(),
            Strategy::Summarization => "summarization".to_string(),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

impl From<Strategy> for String {
    fn from(strategy: Strategy) -> Self {
        strategy.tag()
    }
}

/// Outcome of an optimization run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub output: String,
    pub original_tokens: usize,
    pub optimized_tokens: usize,
    pub saved: usize,
    pub savings_percent: f64,
    /// Stages that changed the text, in the order they ran
    pub strategies: Vec<Strategy>,
    pub content_type: ContentType,
}

impl OptimizationResult {
    pub fn new(
        output: String,
        original_tokens: usize,
        optimized_tokens: usize,
        strategies: Vec<Strategy>,
        content_type: ContentType,
    ) -> Self {
        let saved = original_tokens.saturating_sub(optimized_tokens);
        Self {
            output,
            original_tokens,
            optimized_tokens,
            saved,
            savings_percent: savings_percent(original_tokens, optimized_tokens),
            strategies,
            content_type,
        }
    }

    /// The summary emitted by `--report`, without the output text
    pub fn report(&self) -> OptimizationReport<'_> {
        OptimizationReport {
            original_tokens: self.original_tokens,
            optimized_tokens: self.optimized_tokens,
            saved: self.saved,
            savings_percent: self.savings_percent,
            strategies: &self.strategies,
            content_type: self.content_type,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationReport<'a> {
    pub original_tokens: usize,
    pub optimized_tokens: usize,
    pub saved: usize,
    pub savings_percent: f64,
    pub strategies: &'a [Strategy],
    pub content_type: ContentType,
}

/// Percentage of `original` removed, rounded to two decimals
pub fn savings_percent(original: usize, optimized: usize) -> f64 {
    if original == 0 {
        return 0.0;
    }
    let saved = original.saturating_sub(optimized) as f64;
    (saved / original as f64 * 10_000.0).round() / 100.0
}
