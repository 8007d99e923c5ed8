//! Paragraph- and sentence-level deduplication

use super::patterns::{normalize_sentence, normalize_words, paragraphs, split_sentences};
use std::collections::HashSet;

/// Paragraphs this short (normalized) are never treated as duplicates,
/// so repeated headers and bullets survive
const MIN_PARAGRAPH_CHARS: usize = 20;
const MIN_SENTENCE_CHARS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateReport {
    pub output: String,
    pub duplicates_removed: usize,
    pub paragraphs_removed: usize,
    pub sentences_removed: usize,
}

/// Drop repeated paragraphs, then repeated sentences within what is left.
///
/// Paragraphs holding a fenced code block are kept as they are.
pub fn remove_duplicates(text: &str) -> DuplicateReport {
    let mut seen_paragraphs = HashSet::new();
    let mut paragraphs_removed = 0;
    let mut kept = Vec::new();

    for paragraph in paragraphs(text) {
        if paragraph.fenced {
            kept.push(paragraph);
            continue;
        }
        let normalized = normalize_words(&paragraph.text);
        if normalized.chars().count() > MIN_PARAGRAPH_CHARS && !seen_paragraphs.insert(normalized) {
            paragraphs_removed += 1;
            continue;
        }
        kept.push(paragraph);
    }

    let mut seen_sentences = HashSet::new();
    let mut sentences_removed = 0;
    let mut rebuilt = Vec::with_capacity(kept.len());

    for paragraph in kept {
        if paragraph.fenced {
            rebuilt.push(paragraph.text);
            continue;
        }
        let mut text = String::with_capacity(paragraph.text.len());
        for sentence in split_sentences(&paragraph.text) {
            let normalized = normalize_sentence(sentence);
            if normalized.chars().count() > MIN_SENTENCE_CHARS
                && !seen_sentences.insert(normalized)
            {
                sentences_removed += 1;
                continue;
            }
            text.push_str(sentence);
        }
        let text = text.trim_end();
        if !text.is_empty() {
            rebuilt.push(text.to_string());
        }
    }

    let duplicates_removed = paragraphs_removed + sentences_removed;
    let output = if duplicates_removed == 0 {
        text.to_string()
    } else {
        rebuilt.join("\n\n")
    };

    DuplicateReport {
        output,
        duplicates_removed,
        paragraphs_removed,
        sentences_removed,
    }
}

/// Any normalized sentence longer than 20 chars occurring twice
pub(crate) fn has_duplicate_sentence(text: &str) -> bool {
    let mut seen = HashSet::new();
    split_sentences(text)
        .into_iter()
        .map(normalize_sentence)
        .filter(|sentence| sentence.chars().count() > MIN_PARAGRAPH_CHARS)
        .any(|sentence| !seen.insert(sentence))
}
