//! Heuristic token estimation from character counts

use serde::Serialize;

/// Model name used when none is given or the name is unknown
pub const DEFAULT_MODEL: &str = "generic";

/// Characters per token, by model family
const CHARS_PER_TOKEN: &[(&str, f64)] = &[
    ("generic", 4.0),
    ("gpt-4", 4.0),
    ("gpt-4o", 4.0),
    ("gpt-3.5-turbo", 4.0),
    ("o1", 4.0),
    ("claude", 3.5),
    ("llama", 3.8),
    ("mistral", 3.8),
    ("gemini", 4.0),
    ("deepseek", 3.6),
];

/// Extra share of tokens assumed for unified-diff context lines
const DIFF_CONTEXT_BUMP: f64 = 0.15;

/// Token estimate for a piece of text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate {
    pub chars: usize,
    pub tokens: usize,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Estimates tokens as `ceil(chars / ratio)`
#[derive(Debug, Clone)]
pub struct TokenEstimator {
    model: String,
    ratio: f64,
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}

impl TokenEstimator {
    pub fn new(model: &str) -> Self {
        let (model, ratio) = resolve_model(model);
        Self {
            model: model.to_string(),
            ratio,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn count(&self, text: &str) -> usize {
        let chars = text.chars().count();
        (chars as f64 / self.ratio).ceil() as usize
    }

    pub fn estimate(&self, text: &str) -> Estimate {
        let chars = text.chars().count();
        Estimate {
            chars,
            tokens: (chars as f64 / self.ratio).ceil() as usize,
            model: self.model.clone(),
            note: None,
        }
    }

    /// Estimate for diff hunks, whose context lines tokenize worse than prose
    pub fn estimate_diff(&self, text: &str) -> Estimate {
        let mut estimate = self.estimate(text);
        estimate.tokens = (estimate.tokens as f64 * (1.0 + DIFF_CONTEXT_BUMP)).ceil() as usize;
        estimate.note = Some("diff context heuristic (+15%)".to_string());
        estimate
    }
}

/// Exact name, then the longest known prefix, then `generic`
fn resolve_model(name: &str) -> (&'static str, f64) {
    let name = name.trim().to_lowercase();

    if let Some((known, ratio)) = CHARS_PER_TOKEN.iter().find(|(known, _)| *known == name) {
        return (*known, *ratio);
    }

    CHARS_PER_TOKEN
        .iter()
        .filter(|(known, _)| name.starts_with(known))
        .max_by_key(|(known, _)| known.len())
        .map(|(known, ratio)| (*known, *ratio))
        .unwrap_or((DEFAULT_MODEL, 4.0))
}
