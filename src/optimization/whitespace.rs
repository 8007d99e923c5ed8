//! Whitespace compression that leaves code intact

use super::patterns::{is_fence, split_inline_code};
use once_cell::sync::Lazy;
use regex::Regex;

static SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WhitespaceOptions {
    /// Pass fenced blocks and inline code spans through verbatim
    pub protect_code: bool,
    /// Keep each line's leading indentation (for unfenced source code)
    pub preserve_indentation: bool,
}

impl Default for WhitespaceOptions {
    fn default() -> Self {
        Self {
            protect_code: true,
            preserve_indentation: false,
        }
    }
}

/// Trim lines, collapse space runs and squeeze blank lines to at most one
pub fn compress_whitespace(text: &str, options: &WhitespaceOptions) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut in_fence = false;
    let mut blank_run = 0;

    for line in text.split('\n') {
        if options.protect_code && is_fence(line) {
            in_fence = !in_fence;
            blank_run = 0;
            lines.push(line.to_string());
            continue;
        }
        if in_fence {
            lines.push(line.to_string());
            continue;
        }

        let compressed = compress_line(line, options);
        if compressed.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        lines.push(compressed);
    }

    lines.join("\n")
}

fn compress_line(line: &str, options: &WhitespaceOptions) -> String {
    let trimmed_end = line.trim_end();
    let (indent, body) = if options.preserve_indentation {
        let body = trimmed_end.trim_start();
        (&trimmed_end[..trimmed_end.len() - body.len()], body)
    } else {
        ("", trimmed_end.trim_start())
    };
    if body.is_empty() {
        return String::new();
    }

    let mut out = String::with_capacity(line.len());
    out.push_str(indent);
    if !options.protect_code {
        out.push_str(&SPACE_RUN.replace_all(body, " "));
        return out;
    }
    for segment in split_inline_code(body) {
        if segment.code {
            out.push_str(segment.text);
        } else {
            out.push_str(&SPACE_RUN.replace_all(segment.text, " "));
        }
    }
    out
}
