//! Tiered filler-phrase removal that leaves code untouched

use super::patterns::{
    apply_rules, is_fence, looks_like_json, normalize_nfc, split_inline_code, tidy_gaps,
    touches_code, PhraseRule,
};
use super::Preset;
use once_cell::sync::Lazy;

static CONSERVATIVE: Lazy<Vec<PhraseRule>> = Lazy::new(|| {
    vec![
        PhraseRule::new(r"\bin order to\b", "to"),
        PhraseRule::new(r"\bplease note that\b\s*", ""),
        PhraseRule::new(r"\bit should be noted that\b\s*", ""),
        PhraseRule::new(r"\bit is worth noting that\b\s*", ""),
        PhraseRule::new(r"\bneedless to say\b,?\s*", ""),
        PhraseRule::new(r"\bas a matter of fact\b,?\s*", ""),
        PhraseRule::new(r"\bfor all intents and purposes\b,?\s*", ""),
        PhraseRule::new(r"\bat the end of the day\b,?\s*", ""),
    ]
});

static STANDARD: Lazy<Vec<PhraseRule>> = Lazy::new(|| {
    vec![
        PhraseRule::new(r"\bbasically\b,?\s*", ""),
        PhraseRule::new(r"\bactually\b,?\s*", ""),
        PhraseRule::new(r"\bin fact\b,?\s*", ""),
        PhraseRule::new(r"\bessentially\b,?\s*", ""),
        PhraseRule::new(r"\bliterally\b\s*", ""),
        PhraseRule::new(r"\bobviously\b,?\s*", ""),
        PhraseRule::new(r"\bof course\b,?\s*", ""),
        PhraseRule::new(r"\bto be honest\b,?\s*", ""),
        PhraseRule::new(r"\bkind of\b\s*", ""),
        PhraseRule::new(r"\bsort of\b\s*", ""),
    ]
});

static AGGRESSIVE: Lazy<Vec<PhraseRule>> = Lazy::new(|| {
    vec![
        PhraseRule::new(r"\bvery\b\s+", ""),
        PhraseRule::new(r"\breally\b\s+", ""),
        PhraseRule::new(r"\bquite\b\s+", ""),
        PhraseRule::new(r"\bjust\b\s+", ""),
        PhraseRule::new(r"\bsimply\b\s+", ""),
        PhraseRule::new(r"\bsomewhat\b\s+", ""),
        PhraseRule::new(r"\bperhaps\b,?\s*", ""),
        PhraseRule::new(r"\bI think(?: that)?\b\s*", ""),
        PhraseRule::new(r"\bI believe(?: that)?\b\s*", ""),
    ]
});

static ULTRA: Lazy<Vec<PhraseRule>> = Lazy::new(|| {
    vec![
        PhraseRule::new(r"\bplease\b,?\s*", ""),
        PhraseRule::new(r"\bmake sure(?: that| to)?\b\s*", ""),
        PhraseRule::new(r"\byou should\b\s*", ""),
        PhraseRule::new(r"\bI would like to\b\s*", ""),
        PhraseRule::new(r"\bin this case\b,?\s*", ""),
        PhraseRule::new(r"\bthe following\b\s*", ""),
        PhraseRule::new(r"\bcertainly\b,?\s*", ""),
        PhraseRule::new(r"\bdefinitely\b\s*", ""),
    ]
});

/// Rules active at `preset`, lower tiers first
pub(crate) fn rules_for(preset: Preset) -> Vec<&'static PhraseRule> {
    let tiers: [(Preset, &'static Lazy<Vec<PhraseRule>>); 4] = [
        (Preset::Conservative, &CONSERVATIVE),
        (Preset::Standard, &STANDARD),
        (Preset::Aggressive, &AGGRESSIVE),
        (Preset::Ultra, &ULTRA),
    ];
    tiers
        .into_iter()
        .filter(|(tier, _)| *tier <= preset)
        .flat_map(|(_, rules)| rules.iter())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillerOutcome {
    pub output: String,
    pub changed: bool,
    /// Fenced blocks passed through verbatim
    pub preserved_fences: usize,
    /// Inline code spans passed through verbatim
    pub preserved_inline: usize,
}

/// Remove filler phrases for `preset` outside fenced and inline code.
///
/// JSON documents are returned unchanged.
pub fn strip_filler(text: &str, preset: Preset) -> FillerOutcome {
    if looks_like_json(text) {
        return FillerOutcome {
            output: text.to_string(),
            changed: false,
            preserved_fences: 0,
            preserved_inline: 0,
        };
    }

    let rules = rules_for(preset);
    let mut preserved_fences = 0;
    let mut preserved_inline = 0;
    let mut in_fence = false;
    let mut lines = Vec::new();

    for line in text.split('\n') {
        if is_fence(line) {
            if !in_fence {
                preserved_fences += 1;
            }
            in_fence = !in_fence;
            lines.push(line.to_string());
            continue;
        }
        if in_fence {
            lines.push(line.to_string());
            continue;
        }

        let segments = split_inline_code(line);
        let mut rebuilt = String::with_capacity(line.len());
        for (index, segment) in segments.iter().enumerate() {
            if segment.code {
                preserved_inline += 1;
                rebuilt.push_str(segment.text);
            } else if touches_code(&segments, index) {
                rebuilt.push_str(segment.text);
            } else {
                rebuilt.push_str(&strip_segment(segment.text, &rules));
            }
        }
        lines.push(rebuilt);
    }

    let output = lines.join("\n");
    FillerOutcome {
        changed: output != text,
        output,
        preserved_fences,
        preserved_inline,
    }
}

fn strip_segment(segment: &str, rules: &[&PhraseRule]) -> String {
    let normalized = normalize_nfc(segment);
    let stripped = apply_rules(&normalized, rules);
    if stripped == normalized {
        segment.to_string()
    } else {
        restore_capital(segment, tidy_gaps(&stripped))
    }
}

/// Removing a sentence's first word must not leave it starting lowercase
fn restore_capital(original: &str, mut stripped: String) -> String {
    let was_upper = original
        .trim_start()
        .chars()
        .next()
        .is_some_and(char::is_uppercase);
    if let Some((index, first)) = stripped.char_indices().find(|(_, c)| !c.is_whitespace()) {
        if was_upper && first.is_lowercase() {
            let upper: String = first.to_uppercase().collect();
            stripped.replace_range(index..index + first.len_utf8(), &upper);
        }
    }
    stripped
}

/// True when any filler phrase of any tier occurs in `text`
pub(crate) fn contains_filler(text: &str) -> bool {
    rules_for(Preset::Ultra).iter().any(|rule| rule.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_removes_fillers() {
        let input = "This is basically a very simple test that contains actually quite verbose language in fact.";
        let outcome = strip_filler(input, Preset::Standard);
        assert!(outcome.changed);
        assert_eq!(
            outcome.output,
            "This is a very simple test that contains quite verbose language."
        );
    }

    #[test]
    fn test_presets_are_additive() {
        let counts: Vec<usize> = Preset::ALL.iter().map(|p| rules_for(*p).len()).collect();
        assert!(counts.windows(2).all(|pair| pair[0] < pair[1]));

        let input = "It is really very basically done in order to help.";
        assert_eq!(strip_filler(input, Preset::Conservative).output, "It is really very basically done to help.");
        assert_eq!(strip_filler(input, Preset::Standard).output, "It is really very done to help.");
        assert_eq!(strip_filler(input, Preset::Aggressive).output, "It is done to help.");
    }

    #[test]
    fn test_fenced_code_untouched() {
        let input = "Basically read this.\n```\n// basically   in order to\nlet very  = 1;\n```\nDone, actually.";
        let outcome = strip_filler(input, Preset::Ultra);
        assert!(outcome.output.contains("```\n// basically   in order to\nlet very  = 1;\n```"));
        assert!(outcome.output.starts_with("Read this."));
        assert!(outcome.output.ends_with("Done."));
        assert_eq!(outcome.preserved_fences, 1);
    }

    #[test]
    fn test_inline_code_untouched() {
        let input = "Call `basically()` and it will actually work.";
        let outcome = strip_filler(input, Preset::Standard);
        assert_eq!(outcome.output, "Call `basically()` and it will work.");
        assert_eq!(outcome.preserved_inline, 1);
    }

    #[test]
    fn test_segment_glued_to_code_untouched() {
        let input = "the `x`basically value";
        let outcome = strip_filler(input, Preset::Standard);
        assert_eq!(outcome.output, input);
        assert!(!outcome.changed);
    }

    #[test]
    fn test_json_passthrough() {
        let input = r#"{"note": "this is basically actually in fact filler"}"#;
        let outcome = strip_filler(input, Preset::Ultra);
        assert_eq!(outcome.output, input);
        assert!(!outcome.changed);
    }

    #[test]
    fn test_empty_input() {
        let outcome = strip_filler("", Preset::Ultra);
        assert_eq!(outcome.output, "");
        assert!(!outcome.changed);
    }

    #[test]
    fn test_decomposed_text_without_filler_is_unchanged() {
        let input = "The cafe\u{301} opens at noon.";
        let outcome = strip_filler(input, Preset::Ultra);
        assert_eq!(outcome.output, input);
        assert!(!outcome.changed);
    }
}
