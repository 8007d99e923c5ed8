//! Pipeline properties exercised through the public API

use std::sync::Arc;
use std::time::Duration;
use token_optimizer::cache::{CacheConfig, OptimizationCache};
use token_optimizer::optimization::{
    compress_whitespace, detect_content_type, remove_duplicates, strip_filler, ContentType,
    OptimizationOptions, Preset, PromptOptimizer, Strategy, WhitespaceOptions,
};
use token_optimizer::optimize;

const EXAMPLE: &str =
    "This is basically a very simple test that contains actually quite verbose language in fact.";

fn samples() -> Vec<String> {
    vec![
        String::new(),
        "Hello world.".to_string(),
        EXAMPLE.to_string(),
        "In order to deploy, you should basically run the script.   Then wait.\n\n\n\nDone."
            .to_string(),
        "Use `basically_fn()` here. Please note that the majority of users agree.".to_string(),
        "Intro.\n```rust\nlet  x = 1; // basically\n```\nIt is worth noting that we are able to ship."
            .to_string(),
        r#"{"message": "this is basically   fine"}"#.to_string(),
        (0..8)
            .map(|i| format!("2024-01-0{}T00:00:00Z [WARN] disk usage is really high", i + 1))
            .collect::<Vec<_>>()
            .join("\n"),
        "Ünïcödé text that is basically fine.  Really.".to_string(),
    ]
}

fn fence_body(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let body_start = start + text[start..].find('\n')? + 1;
    let end = body_start + text[body_start..].find("```")?;
    Some(&text[body_start..end])
}

#[test]
fn test_monotonic_reduction() {
    let targets = [
        OptimizationOptions::new(),
        OptimizationOptions::new().with_target_savings(30.0),
        OptimizationOptions::new().with_max_tokens(1),
    ];
    for input in samples() {
        for preset in Preset::ALL {
            for base in &targets {
                let options = base.clone().with_preset(preset);
                let result = optimize(&input, &options);
                assert!(
                    result.optimized_tokens <= result.original_tokens,
                    "{:?} grew under {:?}",
                    input,
                    options
                );
                assert_eq!(result.saved, result.original_tokens - result.optimized_tokens);
            }
        }
    }
}

#[test]
fn test_idempotent_at_fixed_point() {
    let options = OptimizationOptions::new();
    for input in samples() {
        let first = optimize(&input, &options);
        let second = optimize(&first.output, &options);
        assert_eq!(second.optimized_tokens, first.optimized_tokens, "{:?}", input);
        assert!(second.strategies.is_empty(), "{:?} -> {:?}", input, second.strategies);
    }
}

/// Duplicates run before filler removal, so a repeat that only appears once
/// filler is gone is caught on the next pass.
#[test]
fn test_filler_exposed_duplicate_needs_second_pass() {
    let options = OptimizationOptions::new();
    let first = optimize("Basically the build failed today. The build failed today.", &options);
    assert_eq!(first.output, "The build failed today. The build failed today.");
    assert_eq!(first.strategies, vec![Strategy::Filler(Preset::Standard)]);

    let second = optimize(&first.output, &options);
    assert_eq!(second.output, "The build failed today.");
    assert_eq!(second.strategies, vec![Strategy::Duplicates]);

    let third = optimize(&second.output, &options);
    assert_eq!(third.output, second.output);
    assert!(third.strategies.is_empty());
}

#[test]
fn test_code_fences_are_inviolable() {
    let body = "def  run():\n    basically_do_it()   \n\n\n\n    # very   important\n";
    let text = format!("Basically,   read this.\n```python\n{}```\nIt is really done.", body);

    for preset in Preset::ALL {
        let stripped = strip_filler(&text, preset);
        assert_eq!(fence_body(&stripped.output), Some(body));
        assert_eq!(stripped.preserved_fences, 1);
    }
    let compressed = compress_whitespace(&text, &WhitespaceOptions::default());
    assert_eq!(fence_body(&compressed), Some(body));

    let result = optimize(&text, &OptimizationOptions::new().with_target_savings(90.0));
    assert_eq!(fence_body(&result.output), Some(body));
}

#[test]
fn test_content_type_detection() {
    let json = r#"{"users": [{"id": 1, "name": "Ada"}, {"id": 2, "name": "Lin"}]}"#;
    let detection = detect_content_type(json);
    assert_eq!(detection.content_type, ContentType::Json);
    assert!(detection.confidence > 0.8);

    let log = (0..6)
        .map(|i| format!("2024-02-01T08:15:0{}Z request {} served in 12ms", i, i))
        .collect::<Vec<_>>()
        .join("\n");
    assert_eq!(detect_content_type(&log).content_type, ContentType::Log);

    assert_eq!(detect_content_type(&log), detect_content_type(&log));
}

#[test]
fn test_duplicate_paragraph_removed() {
    let paragraph = "Rotate the signing keys before the end of the quarter.";
    let input = format!("{}\n\n{}", paragraph, paragraph);
    let report = remove_duplicates(&input);
    assert!(report.duplicates_removed >= 1);
    assert_eq!(report.output.split("\n\n").count(), 1);
}

#[test]
fn test_cache_hit_is_deterministic() {
    let optimizer = PromptOptimizer::new(Arc::new(OptimizationCache::default()));
    let options = OptimizationOptions::new();

    let first = optimizer.optimize(EXAMPLE, &options);
    let second = optimizer.optimize(EXAMPLE, &options);

    assert_eq!(first.output, second.output);
    assert_eq!(second.strategies, vec![Strategy::Cached]);
    assert_eq!(second.optimized_tokens, first.optimized_tokens);
    assert_eq!(optimizer.cache_metrics().hits, 1);

    let other = optimizer.optimize(EXAMPLE, &options.clone().with_preset(Preset::Ultra));
    assert!(!other.strategies.contains(&Strategy::Cached));
}

#[test]
fn test_gate_negative_result_is_cached() {
    let optimizer = PromptOptimizer::new(Arc::new(OptimizationCache::default()));
    let options = OptimizationOptions::new();
    optimizer.optimize("Hello world.", &options);
    let second = optimizer.optimize("Hello world.", &options);
    assert_eq!(second.output, "Hello world.");
    assert_eq!(second.strategies, vec![Strategy::Cached]);
}

#[test]
fn test_expired_cache_entry_is_recomputed() {
    let cache = OptimizationCache::new(CacheConfig {
        max_entries: 10,
        ttl: Duration::ZERO,
    });
    let optimizer = PromptOptimizer::new(Arc::new(cache));
    let options = OptimizationOptions::new();

    optimizer.optimize(EXAMPLE, &options);
    std::thread::sleep(Duration::from_millis(5));
    let second = optimizer.optimize(EXAMPLE, &options);

    assert!(!second.strategies.contains(&Strategy::Cached));
    assert_eq!(optimizer.cache_metrics().expirations, 1);
}

#[test]
fn test_example_scenario() {
    let result = optimize(EXAMPLE, &OptimizationOptions::new().with_preset(Preset::Standard));
    for filler in ["basically", "actually", "in fact"] {
        assert!(!result.output.contains(filler), "{} survived", filler);
    }
    assert_eq!(result.original_tokens, 23);
    assert!(result.optimized_tokens < result.original_tokens);
}

#[test]
fn test_no_op_gate() {
    let result = optimize("Hello world.", &OptimizationOptions::new());
    assert_eq!(result.output, "Hello world.");
    assert!(result.strategies.is_empty());
    assert_eq!(result.savings_percent, 0.0);
}

#[test]
fn test_large_input_is_summarized_to_target() {
    let mut paragraphs = vec!["This report is basically an overview of every item.".to_string()];
    paragraphs.extend((0..400).map(|i| {
        format!(
            "Paragraph {i} describes item {i} in plain words without anything special at all here. \
             It continues with detail {i} for the reader."
        )
    }));
    paragraphs.push("That is the whole report.".to_string());
    let input = paragraphs.join("\n\n");

    let options = OptimizationOptions::new().with_target_savings(50.0);
    let result = optimize(&input, &options);

    assert!(result.original_tokens > 10_000);
    let target = options.target_tokens(result.original_tokens).unwrap();
    assert!(result.optimized_tokens <= target);
    assert!(result.strategies.contains(&Strategy::Summarization));
}

#[test]
fn test_summarization_toggle() {
    let input = (0..1200)
        .map(|i| format!("Sentence number {i} is basically filler for the budget."))
        .collect::<Vec<_>>()
        .join("\n\n");
    let toggles = token_optimizer::StageToggles {
        summarization: false,
        ..Default::default()
    };
    let options = OptimizationOptions::new()
        .with_target_savings(80.0)
        .with_toggles(toggles);
    let result = optimize(&input, &options);
    assert!(!result.strategies.contains(&Strategy::Summarization));
}
