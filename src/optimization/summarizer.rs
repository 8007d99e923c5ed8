//! Extractive summarization, the last-resort reduction

use super::estimator::TokenEstimator;
use super::patterns::{map_outside_fences, paragraphs, split_sentences, tidy_gaps};
use once_cell::sync::Lazy;
use regex::Regex;

static IMPORTANCE_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:important|importantly|however|result|results|therefore|conclusion|key|significant|critical|must|because|summary|finally|essential|required|error|warning)\b",
    )
    .unwrap()
});

static STOP_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:the|a|an|is|are|was|were|be|been|of|to|in|on|at|for|with|that|this|it|as|by|from|and|or|so)\b[ \t]*",
    )
    .unwrap()
});

const KEEP_SCORE: f64 = 0.3;
const ELLIPSIS: &str = "…";

#[derive(Debug, Clone)]
pub struct SummarizerOptions {
    /// Keep the first and last paragraph verbatim
    pub keep_first_last: bool,
    /// Sentences shorter than this are not considered
    pub min_sentence_length: usize,
    /// Budget for the aggressive fallback
    pub target_tokens: Option<usize>,
}

impl Default for SummarizerOptions {
    fn default() -> Self {
        Self {
            keep_first_last: true,
            min_sentence_length: 20,
            target_tokens: None,
        }
    }
}

/// Keep the highest-value sentences of each middle paragraph.
///
/// When the result is still above `target_tokens`, stop-words are dropped
/// and the text is finally cut to fit, ending in an ellipsis.
pub fn summarize(text: &str, options: &SummarizerOptions, estimator: &TokenEstimator) -> String {
    let paragraphs = paragraphs(text);
    let last = paragraphs.len().saturating_sub(1);

    let mut summary = Vec::with_capacity(paragraphs.len());
    for (index, paragraph) in paragraphs.iter().enumerate() {
        let edge = index == 0 || index == last;
        if paragraph.fenced || (options.keep_first_last && edge) {
            summary.push(paragraph.text.clone());
        } else {
            summary.push(summarize_paragraph(&paragraph.text, options.min_sentence_length));
        }
    }
    let summary = summary.join("\n\n");

    match options.target_tokens {
        Some(target) if estimator.count(&summary) > target => {
            reduce_to_target(&summary, target, estimator)
        }
        _ => summary,
    }
}

fn summarize_paragraph(paragraph: &str, min_sentence_length: usize) -> String {
    let sentences: Vec<&str> = split_sentences(paragraph)
        .into_iter()
        .map(str::trim)
        .filter(|sentence| sentence.chars().count() >= min_sentence_length)
        .collect();
    if sentences.is_empty() {
        return paragraph.to_string();
    }

    let kept: Vec<&str> = sentences
        .iter()
        .copied()
        .filter(|sentence| score_sentence(sentence) > KEEP_SCORE)
        .collect();

    let candidate = match (kept.is_empty(), sentences.as_slice()) {
        (false, _) => kept.join(" "),
        (true, [only]) => only.to_string(),
        (true, [first, .., last]) => format!("{} {} {}", first, ELLIPSIS, last),
        (true, []) => paragraph.to_string(),
    };

    if candidate.chars().count() < paragraph.chars().count() {
        candidate
    } else {
        paragraph.to_string()
    }
}

fn score_sentence(sentence: &str) -> f64 {
    let mut score = IMPORTANCE_KEYWORDS.find_iter(sentence).count() as f64 * 0.1;
    score += (sentence.chars().count() as f64 / 100.0).min(1.0) * 0.2;
    if sentence.chars().any(|c| c.is_ascii_digit()) {
        score += 0.1;
    }
    if sentence.chars().next().is_some_and(char::is_uppercase) {
        score += 0.05;
    }
    score
}

fn reduce_to_target(text: &str, target: usize, estimator: &TokenEstimator) -> String {
    let without_stop_words =
        map_outside_fences(text, |chunk| tidy_gaps(&STOP_WORDS.replace_all(chunk, "")));
    let current = if estimator.count(&without_stop_words) < estimator.count(text) {
        without_stop_words
    } else {
        text.to_string()
    };

    let tokens = estimator.count(&current);
    if tokens <= target {
        return current;
    }

    let chars = current.chars().count();
    let keep = (chars as f64 * target as f64 / tokens as f64).floor() as usize;
    if keep <= 1 {
        return String::new();
    }
    format!("{}{}", truncate_paragraphs(&current, keep - 1), ELLIPSIS)
}

/// Longest prefix of whole paragraphs within `budget` chars. A prose
/// paragraph may be cut; a fenced one is kept whole or dropped.
fn truncate_paragraphs(text: &str, budget: usize) -> String {
    let mut out = String::new();
    let mut used = 0;

    for paragraph in paragraphs(text) {
        let separator = if out.is_empty() { 0 } else { 2 };
        let len = paragraph.text.chars().count();
        if used + separator + len <= budget {
            if separator > 0 {
                out.push_str("\n\n");
            }
            out.push_str(&paragraph.text);
            used += separator + len;
            continue;
        }

        let room = budget.saturating_sub(used + separator);
        if !paragraph.fenced && room > 0 {
            if separator > 0 {
                out.push_str("\n\n");
            }
            out.extend(paragraph.text.chars().take(room));
        }
        break;
    }

    out.trim_end().to_string()
}
