//! Phrase tables and text scanners shared by the pipeline stages

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;
use unicode_normalization::{is_nfc, UnicodeNormalization};

pub(crate) const FENCE_MARKER: &str = "```";

/// A case-insensitive phrase and what it is rewritten to
pub(crate) struct PhraseRule {
    pattern: Regex,
    replacement: &'static str,
}

impl PhraseRule {
    pub(crate) fn new(pattern: &str, replacement: &'static str) -> Self {
        Self {
            pattern: Regex::new(&format!("(?i){}", pattern)).expect("phrase patterns are valid"),
            replacement,
        }
    }

    pub(crate) fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Replace every match, keeping a leading capital on non-empty replacements
    pub(crate) fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        self.pattern.replace_all(text, |caps: &Captures| {
            let matched = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            match_case(matched, self.replacement)
        })
    }
}

fn match_case(matched: &str, replacement: &str) -> String {
    let starts_upper = matched.chars().next().is_some_and(char::is_uppercase);
    let mut chars = replacement.chars();
    match chars.next() {
        Some(first) if starts_upper => first.to_uppercase().chain(chars).collect(),
        _ => replacement.to_string(),
    }
}

/// Apply `rules` in order
pub(crate) fn apply_rules(text: &str, rules: &[&PhraseRule]) -> String {
    let mut result = text.to_string();
    for rule in rules {
        let replaced = match rule.apply(&result) {
            Cow::Owned(replaced) => Some(replaced),
            Cow::Borrowed(_) => None,
        };
        if let Some(replaced) = replaced {
            result = replaced;
        }
    }
    result
}

pub(crate) fn normalize_nfc(text: &str) -> Cow<'_, str> {
    if is_nfc(text) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.nfc().collect())
    }
}

static SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r" +([.,;:!?])").unwrap());
static DANGLING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",+([.;:!?])").unwrap());
static INNER_SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\S)[ \t]{2,}").unwrap());

/// Close the gaps left behind by removed phrases
pub(crate) fn tidy_gaps(text: &str) -> String {
    let text = SPACE_BEFORE_PUNCT.replace_all(text, "$1");
    let text = DANGLING_COMMA.replace_all(&text, "$1");
    INNER_SPACE_RUN.replace_all(&text, "$1 ").into_owned()
}

/// Whole input is a JSON object or array
pub(crate) fn looks_like_json(text: &str) -> bool {
    let trimmed = text.trim();
    (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
}

pub(crate) fn is_fence(line: &str) -> bool {
    line.trim().starts_with(FENCE_MARKER)
}

/// Piece of a line, split on backtick-delimited inline code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Segment<'a> {
    pub text: &'a str,
    pub code: bool,
}

static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`[^`]+`").unwrap());

pub(crate) fn split_inline_code(line: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut last = 0;
    for span in INLINE_CODE.find_iter(line) {
        if span.start() > last {
            segments.push(Segment {
                text: &line[last..span.start()],
                code: false,
            });
        }
        segments.push(Segment {
            text: span.as_str(),
            code: true,
        });
        last = span.end();
    }
    if last < line.len() || segments.is_empty() {
        segments.push(Segment {
            text: &line[last..],
            code: false,
        });
    }
    segments
}

/// A prose segment glued to a code span without whitespace, e.g. the `s` in `` `Vec`s ``
pub(crate) fn touches_code(segments: &[Segment<'_>], index: usize) -> bool {
    let segment = segments[index];
    let glued_before = index > 0
        && segments[index - 1].code
        && segment.text.chars().next().is_some_and(|c| !c.is_whitespace());
    let glued_after = segments.get(index + 1).is_some_and(|next| next.code)
        && segment.text.chars().last().is_some_and(|c| !c.is_whitespace());
    glued_before || glued_after
}

/// Rewrite the text outside fenced code blocks, one contiguous chunk at a time
pub(crate) fn map_outside_fences<F>(text: &str, mut f: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut out: Vec<String> = Vec::new();
    let mut chunk: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in text.split('\n') {
        if is_fence(line) || in_fence {
            if !chunk.is_empty() {
                out.push(f(&chunk.join("\n")));
                chunk.clear();
            }
            if is_fence(line) {
                in_fence = !in_fence;
            }
            out.push(line.to_string());
        } else {
            chunk.push(line);
        }
    }
    if !chunk.is_empty() {
        out.push(f(&chunk.join("\n")));
    }
    out.join("\n")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Paragraph {
    pub text: String,
    /// Contains a fenced code block; treated as one opaque unit
    pub fenced: bool,
}

/// Split on blank lines, never inside a fenced block
pub(crate) fn paragraphs(text: &str) -> Vec<Paragraph> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut fenced = false;
    let mut in_fence = false;

    for line in text.split('\n') {
        if is_fence(line) {
            in_fence = !in_fence;
            fenced = true;
            current.push(line);
            continue;
        }
        if !in_fence && line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(Paragraph {
                    text: current.join("\n"),
                    fenced,
                });
                current.clear();
                fenced = false;
            }
            continue;
        }
        current.push(line);
    }
    if !current.is_empty() {
        paragraphs.push(Paragraph {
            text: current.join("\n"),
            fenced,
        });
    }
    paragraphs
}

/// Sentences with their terminators and trailing whitespace, so that
/// concatenating the pieces yields the input again
pub(crate) fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let mut end = i + c.len_utf8();
        while let Some(&(j, d)) = chars.peek() {
            if !matches!(d, '.' | '!' | '?') {
                break;
            }
            end = j + d.len_utf8();
            chars.next();
        }
        match chars.peek() {
            Some(&(_, d)) if d.is_whitespace() => {
                while let Some(&(j, d)) = chars.peek() {
                    if !d.is_whitespace() {
                        break;
                    }
                    end = j + d.len_utf8();
                    chars.next();
                }
                sentences.push(&text[start..end]);
                start = end;
            }
            None => {
                sentences.push(&text[start..end]);
                start = end;
            }
            // "3.14", "example.com"
            _ => {}
        }
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

/// Lowercase with all whitespace runs collapsed to one space
pub(crate) fn normalize_words(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Like [`normalize_words`], with punctuation dropped
pub(crate) fn normalize_sentence(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    normalize_words(&stripped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_keeps_leading_capital() {
        let rule = PhraseRule::new(r"\bprior to\b", "before");
        assert_eq!(rule.apply("Prior to release, test prior to merge."), "Before release, test before merge.");
    }

    #[test]
    fn test_tidy_gaps() {
        assert_eq!(tidy_gaps("language ."), "language.");
        assert_eq!(tidy_gaps("Done, ."), "Done.");
        assert_eq!(tidy_gaps("    indented  text"), "    indented text");
    }

    #[test]
    fn test_split_inline_code() {
        let segments = split_inline_code("use `foo` and `bar`s");
        let texts: Vec<_> = segments.iter().map(|s| (s.text, s.code)).collect();
        assert_eq!(
            texts,
            vec![("use ", false), ("`foo`", true), (" and ", false), ("`bar`", true), ("s", false)]
        );
        assert!(!touches_code(&segments, 2));
        assert!(touches_code(&segments, 4));
    }

    #[test]
    fn test_split_sentences_round_trips() {
        let text = "First one. Second one!  Pi is 3.14 here? tail";
        let sentences = split_sentences(text);
        assert_eq!(sentences.len(), 4);
        assert_eq!(sentences[2], "Pi is 3.14 here? ");
        assert_eq!(sentences.concat(), text);
    }

    #[test]
    fn test_paragraphs_keep_fences_whole() {
        let text = "Intro text.\n\n```\nlet a = 1;\n\nlet b = 2;\n```\n\nOutro.";
        let paragraphs = paragraphs(text);
        assert_eq!(paragraphs.len(), 3);
        assert!(paragraphs[1].fenced);
        assert!(paragraphs[1].text.contains("\n\nlet b"));
    }

    #[test]
    fn test_map_outside_fences_skips_code() {
        let text = "a b\n```\na b\n```\na b";
        let mapped = map_outside_fences(text, |chunk| chunk.replace("a b", "x"));
        assert_eq!(mapped, "x\n```\na b\n```\nx");
    }

    #[test]
    fn test_looks_like_json() {
        assert!(looks_like_json(" {\"a\": [1, 2]} "));
        assert!(!looks_like_json("{not json"));
        assert!(!looks_like_json("42"));
    }

    #[test]
    fn test_normalize_sentence() {
        assert_eq!(normalize_sentence("  Hello,   World!\n"), "hello world");
    }
}
