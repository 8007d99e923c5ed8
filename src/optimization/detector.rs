//! Content classification by feature scoring

use super::patterns::{is_fence, looks_like_json};
use super::ContentType;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Ratio of structural symbols to words above which a line counts as code
const CODE_SYMBOL_RATIO: f64 = 0.3;

static LOG_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        \d{4}-\d{2}-\d{2}[T\ ]\d{2}:\d{2}   # ISO timestamp
        | \d{1,2}/\d{1,2}/\d{2,4}\ \d{2}:\d{2}   # slash timestamp
        | \[(?:TRACE|DEBUG|INFO|WARN|WARNING|ERROR|FATAL)\]
        | ^\s*(?:TRACE|DEBUG|INFO|WARN|WARNING|ERROR|FATAL)[\s:]
        ",
    )
    .unwrap()
});

static DOC_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s{0,3}#{1,6}\s").unwrap());
static DOC_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(?:[-*+]|\d+\.)\s").unwrap());
static DOC_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]+\]\([^)]+\)").unwrap());
static JSON_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*(?:[{}\[\]],?\s*$|"[^"]*"\s*:)"#).unwrap());

/// Raw counts gathered while scanning
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectionFeatures {
    pub code_chars: usize,
    pub prose_chars: usize,
    pub json_chars: usize,
    pub log_patterns: usize,
    pub doc_patterns: usize,
}

impl DetectionFeatures {
    fn total_chars(&self) -> usize {
        self.code_chars + self.prose_chars + self.json_chars
    }

    fn share(&self, chars: usize) -> f64 {
        let total = self.total_chars();
        if total == 0 {
            0.0
        } else {
            chars as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentTypeDetection {
    #[serde(rename = "type")]
    pub content_type: ContentType,
    /// In `[0, 1]`
    pub confidence: f64,
    pub features: DetectionFeatures,
}

/// Classify `text`. Pure: identical input always yields an identical result.
pub fn detect_content_type(text: &str) -> ContentTypeDetection {
    if looks_like_json(text) {
        let chars = text.trim().chars().count();
        return ContentTypeDetection {
            content_type: ContentType::Json,
            confidence: 0.9,
            features: DetectionFeatures {
                json_chars: chars,
                ..Default::default()
            },
        };
    }

    let features = scan(text);
    let (content_type, confidence) = classify(&features);

    ContentTypeDetection {
        content_type,
        confidence: confidence.clamp(0.0, 1.0),
        features,
    }
}

fn scan(text: &str) -> DetectionFeatures {
    let mut features = DetectionFeatures::default();
    let mut in_fence = false;

    for line in text.lines() {
        let chars = line.chars().count();

        if is_fence(line) {
            in_fence = !in_fence;
            features.code_chars += chars;
            features.doc_patterns += 1;
            continue;
        }
        if in_fence {
            features.code_chars += chars;
            continue;
        }

        if LOG_LINE.is_match(line) {
            features.log_patterns += 1;
        }
        if DOC_HEADER.is_match(line) || DOC_BULLET.is_match(line) {
            features.doc_patterns += 1;
        }
        features.doc_patterns += DOC_LINK.find_iter(line).count();

        let words = line.split_whitespace().count();
        if words == 0 {
            continue;
        }
        if JSON_LINE.is_match(line) {
            features.json_chars += chars;
            continue;
        }
        let symbols = line.chars().filter(|c| "{}();=<>[]".contains(*c)).count();
        if symbols as f64 / words as f64 > CODE_SYMBOL_RATIO {
            features.code_chars += chars;
        } else {
            features.prose_chars += chars;
        }
    }

    features
}

fn classify(features: &DetectionFeatures) -> (ContentType, f64) {
    let json_share = features.share(features.json_chars);
    let code_share = features.share(features.code_chars);
    let prose_share = features.share(features.prose_chars);

    if json_share > 0.8 {
        return (ContentType::Json, json_share);
    }
    if features.log_patterns > 5 {
        let confidence = (0.5 + features.log_patterns as f64 * 0.05).min(0.95);
        return (ContentType::Log, confidence);
    }
    if code_share > 0.6 {
        return (ContentType::Code, code_share);
    }
    if features.doc_patterns > 3 && prose_share > 0.7 {
        let confidence = (0.6 + features.doc_patterns as f64 * 0.05).min(0.95);
        return (ContentType::Documentation, confidence);
    }
    if prose_share > 0.7 {
        return (ContentType::Prose, prose_share);
    }
    (ContentType::Mixed, 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_json_document() {
        let detection = detect_content_type(r#"{"name": "demo", "tags": ["a", "b"], "nested": {"x": 1}}"#);
        assert_eq!(detection.content_type, ContentType::Json);
        assert!(detection.confidence > 0.8);
    }

    #[test]
    fn test_detects_logs() {
        let log = (0..6)
            .map(|i| format!("2024-03-01T12:00:0{}Z INFO request {} handled", i, i))
            .collect::<Vec<_>>()
            .join("\n");
        let detection = detect_content_type(&log);
        assert_eq!(detection.content_type, ContentType::Log);
        assert_eq!(detection.features.log_patterns, 6);
    }

    #[test]
    fn test_detects_code() {
        let code = "fn main() {\n    let x = vec![1, 2, 3];\n    println!(\"{:?}\", x);\n}\n";
        assert_eq!(detect_content_type(code).content_type, ContentType::Code);
    }

    #[test]
    fn test_detects_prose() {
        let prose = "The quick brown fox jumps over the lazy dog. It was a sunny day and everyone was happy.";
        let detection = detect_content_type(prose);
        assert_eq!(detection.content_type, ContentType::Prose);
        assert_eq!(detection.confidence, 1.0);
    }

    #[test]
    fn test_detects_documentation() {
        let doc = "# Guide\n\nSome introduction to the tool and what it does for you.\n\n\
                   ## Install\n\n- Download the release archive for your platform\n\
                   - Unpack it somewhere on your path\n\n\
                   Everything else works out of the box with sensible defaults.\n\nRead the [manual](https://example.com/manual) for more.";
        assert_eq!(detect_content_type(doc).content_type, ContentType::Documentation);
    }

    #[test]
    fn test_fenced_lines_count_as_code() {
        let text = "Intro line here.\n```\nplain words inside the fence\n```\n";
        let features = detect_content_type(text).features;
        assert_eq!(features.prose_chars, "Intro line here.".len());
        assert!(features.code_chars > features.prose_chars);
    }

    #[test]
    fn test_detection_is_deterministic() {
        let text = "Mixed { content } with = some ( symbols ) and words.\nAnother line of prose.";
        assert_eq!(detect_content_type(text), detect_content_type(text));
    }

    #[test]
    fn test_empty_input_is_mixed() {
        let detection = detect_content_type("");
        assert_eq!(detection.content_type, ContentType::Mixed);
    }
}
