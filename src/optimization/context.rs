//! Optimizers tuned for one content type

use super::estimator::TokenEstimator;
use super::patterns::{map_outside_fences, normalize_words, tidy_gaps};
use super::{savings_percent, ContentType, Strategy};
use once_cell::sync::Lazy;
use regex::Regex;

static ISO_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\[?\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(?::\d{2}(?:[.,]\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?\]?[ \t]*",
    )
    .unwrap()
});
static SLASH_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[?\d{1,2}/\d{1,2}/\d{2,4}(?:[ T]\d{2}:\d{2}(?::\d{2})?)?\]?[ \t]*").unwrap()
});
static LEVEL_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\[(?:trace|debug|info|warn|warning|error|fatal|critical)\][ \t]*").unwrap()
});
static EXCESS_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").unwrap());

static BACKREFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bas (?:mentioned|noted|discussed|described|shown|stated|explained) (?:above|below|earlier|previously|before)\b,?[ \t]*",
    )
    .unwrap()
});
static NOTE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^([ \t]*(?:[-*>][ \t]+)?)(?:\*\*)?note:(?:\*\*)?[ \t]*").unwrap()
});
static NUMBERED_EXAMPLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bexample\s+\d+\s*:").unwrap());
static SEE_REFERENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bsee (?:also|above|below)\b").unwrap());
static SEE_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bsee (?:also|above|below)\b[^.\n]*\.?[ \t]*").unwrap());

/// "See also" clauses are only pruned once a document leans on them this much
const MAX_SEE_REFERENCES: usize = 3;

static OBVIOUS_COMMENTS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^(?:set|sets|get|gets|assign|assigns|return|returns|increment|increments|decrement|decrements|initiali[sz]e|initiali[sz]es|create|creates|declare|declares|define|defines|call|calls|update|updates)\b",
        r"(?i)^(?:this|the) \w+ (?:is|does|will|returns|holds|stores)\b",
        r"(?i)^(?:loop|iterate|iterates) (?:over|through)\b",
        r"(?i)^checks? (?:if|whether)\b",
        r"(?i)^(?:constructor|getter|setter|imports?|variables?|constants?|main function)$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Comments longer than this carry intent and are kept
const MAX_OBVIOUS_COMMENT_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct ContextResult {
    pub output: String,
    pub original_tokens: usize,
    pub optimized_tokens: usize,
    pub savings_percent: f64,
}

impl ContextResult {
    fn measure(original: &str, output: String, estimator: &TokenEstimator) -> Self {
        let original_tokens = estimator.count(original);
        let optimized_tokens = estimator.count(&output);
        Self {
            output,
            original_tokens,
            optimized_tokens,
            savings_percent: savings_percent(original_tokens, optimized_tokens),
        }
    }
}

/// Run the optimizer matching `content_type`, if there is one
pub fn optimize_for_content_type(
    text: &str,
    content_type: ContentType,
    estimator: &TokenEstimator,
) -> Option<(Strategy, ContextResult)> {
    match content_type {
        ContentType::Log => Some((Strategy::LogCompression, optimize_logs(text, estimator))),
        ContentType::Documentation => Some((
            Strategy::DocumentationCleanup,
            optimize_documentation(text, estimator),
        )),
        ContentType::Code => Some((
            Strategy::CommentRemoval,
            optimize_code_comments(text, estimator),
        )),
        ContentType::Prose | ContentType::Json | ContentType::Mixed => None,
    }
}

/// Strip timestamps and level tags, then fold runs of repeated lines
pub fn optimize_logs(text: &str, estimator: &TokenEstimator) -> ContextResult {
    let stripped = ISO_TIMESTAMP.replace_all(text, "");
    let stripped = SLASH_TIMESTAMP.replace_all(&stripped, "");
    let stripped = LEVEL_TAG.replace_all(&stripped, "");

    let mut lines: Vec<String> = Vec::new();
    let mut previous: Option<String> = None;
    let mut run = 1;

    for line in stripped.lines() {
        let line = line.trim_end();
        let normalized = normalize_words(line);
        if normalized.chars().count() > 10 && previous.as_deref() == Some(normalized.as_str()) {
            run += 1;
            let marker = format!("[Repeated {}x] {}", run, line.trim());
            match lines.last_mut() {
                Some(last) if run > 2 => *last = marker,
                _ => lines.push(marker),
            }
            continue;
        }
        run = 1;
        previous = Some(normalized);
        lines.push(line.to_string());
    }

    let joined = lines.join("\n");
    let output = EXCESS_BLANK_LINES.replace_all(&joined, "\n\n").into_owned();
    ContextResult::measure(text, output, estimator)
}

/// Drop back-references and redundant prefixes from prose documentation
pub fn optimize_documentation(text: &str, estimator: &TokenEstimator) -> ContextResult {
    let mut see_references = 0;
    map_outside_fences(text, |chunk| {
        see_references += SEE_REFERENCE.find_iter(chunk).count();
        String::new()
    });
    let prune_see = see_references > MAX_SEE_REFERENCES;

    let output = map_outside_fences(text, |chunk| {
        let cleaned = BACKREFERENCE.replace_all(chunk, "");
        let cleaned = NOTE_PREFIX.replace_all(&cleaned, "$1");
        let cleaned = NUMBERED_EXAMPLE.replace_all(&cleaned, "Example:");
        let cleaned = if prune_see {
            SEE_CLAUSE.replace_all(&cleaned, "").into_owned()
        } else {
            cleaned.into_owned()
        };
        if cleaned == chunk {
            chunk.to_string()
        } else {
            tidy_gaps(&cleaned)
        }
    });
    ContextResult::measure(text, output, estimator)
}

/// Remove short comments that only restate the code next to them.
///
/// Doc comments (`///`, `//!`, `/**`, `/*!`) are never touched.
pub fn optimize_code_comments(text: &str, estimator: &TokenEstimator) -> ContextResult {
    let mut lines = Vec::new();
    let mut in_block = false;
    let mut doc_block = false;

    for line in text.split('\n') {
        let trimmed = line.trim();

        if in_block {
            let closes = trimmed.contains("*/");
            let removable = !doc_block && !closes && trimmed.starts_with('*');
            if closes {
                in_block = false;
            }
            if removable && is_obvious_comment(trimmed) {
                continue;
            }
            lines.push(line);
            continue;
        }

        if trimmed.starts_with("//") {
            let doc = trimmed.starts_with("///") || trimmed.starts_with("//!");
            if !doc && is_obvious_comment(trimmed) {
                continue;
            }
        } else if trimmed.starts_with("/*") {
            let doc = trimmed.starts_with("/**") || trimmed.starts_with("/*!");
            if !trimmed.contains("*/") {
                in_block = true;
                doc_block = doc;
            } else if !doc && is_obvious_comment(trimmed) {
                continue;
            }
        }
        lines.push(line);
    }

    ContextResult::measure(text, lines.join("\n"), estimator)
}

fn is_obvious_comment(line: &str) -> bool {
    let text = line
        .trim_start_matches(['/', '*'])
        .trim_end()
        .trim_end_matches("*/")
        .trim();
    !text.is_empty()
        && text.chars().count() <= MAX_OBVIOUS_COMMENT_CHARS
        && OBVIOUS_COMMENTS.iter().any(|pattern| pattern.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> TokenEstimator {
        TokenEstimator::default()
    }

    #[test]
    fn test_log_timestamps_and_levels_removed() {
        let log = "2024-03-01T12:00:00.123Z [INFO] server started on port 8080\n\
                   03/01/2024 12:00:01 [WARN] cache is cold";
        let result = optimize_logs(log, &estimator());
        assert_eq!(result.output, "server started on port 8080\ncache is cold");
        assert!(result.savings_percent > 5.0);
    }

    #[test]
    fn test_log_repeated_lines_fold() {
        let log = [
            "2024-03-01T12:00:00Z [ERROR] connection refused by upstream",
            "2024-03-01T12:00:01Z [ERROR] connection refused by upstream",
            "2024-03-01T12:00:02Z [ERROR] connection refused by upstream",
            "2024-03-01T12:00:03Z [ERROR] connection refused by upstream",
            "2024-03-01T12:00:04Z [INFO] retry scheduled",
        ]
        .join("\n");
        let result = optimize_logs(&log, &estimator());
        assert_eq!(
            result.output,
            "connection refused by upstream\n[Repeated 4x] connection refused by upstream\nretry scheduled"
        );
    }

    #[test]
    fn test_log_blank_lines_collapse() {
        let result = optimize_logs("first entry here\n\n\n\nsecond entry here", &estimator());
        assert_eq!(result.output, "first entry here\n\nsecond entry here");
    }

    #[test]
    fn test_documentation_cleanup() {
        let doc = "As mentioned above, the cache is optional.\nNote: it expires hourly.\nExample 2: run it twice.";
        let result = optimize_documentation(doc, &estimator());
        assert_eq!(
            result.output,
            "the cache is optional.\nit expires hourly.\nExample: run it twice."
        );
    }

    #[test]
    fn test_see_clauses_pruned_only_when_frequent() {
        let few = "Setup is simple. See also the install guide. Done.";
        assert_eq!(optimize_documentation(few, &estimator()).output, few);

        let many = "A. See also one. B. See above two. C. See below three. D. See also four. E.";
        assert_eq!(optimize_documentation(many, &estimator()).output, "A. B. C. D. E.");
    }

    #[test]
    fn test_documentation_leaves_fences_alone() {
        let doc = "Text.\n```\n// Note: as mentioned above\n```";
        assert_eq!(optimize_documentation(doc, &estimator()).output, doc);
    }

    #[test]
    fn test_obvious_comments_removed() {
        let code = "// Set the counter\nlet counter = 0;\n// Retry because the upstream drops the first request after a deploy\nretry();\n/* the loop does nothing */\n/// Returns the counter\nfn get() {}";
        let result = optimize_code_comments(code, &estimator());
        assert_eq!(
            result.output,
            "let counter = 0;\n// Retry because the upstream drops the first request after a deploy\nretry();\n/// Returns the counter\nfn get() {}"
        );
    }

    #[test]
    fn test_long_obvious_comment_kept() {
        let code = "// Set the counter to zero before every single iteration of the retry loop\nlet x = 0;";
        assert_eq!(optimize_code_comments(code, &estimator()).output, code);
    }

    #[test]
    fn test_block_comment_structure_kept() {
        let code = "/*\n * Set the value\n * of the thing\n */\nlet x = 1;";
        let result = optimize_code_comments(code, &estimator());
        assert_eq!(result.output, "/*\n * of the thing\n */\nlet x = 1;");
    }

    #[test]
    fn test_prose_has_no_context_optimizer() {
        assert!(optimize_for_content_type("plain words", ContentType::Prose, &estimator()).is_none());
    }
}
