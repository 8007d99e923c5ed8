//! Verbose phrase to concise phrase substitution

use super::patterns::{apply_rules, PhraseRule};
use once_cell::sync::Lazy;

static SUBSTITUTIONS: Lazy<Vec<PhraseRule>> = Lazy::new(|| {
    vec![
        // ability
        PhraseRule::new(r"\b(?:is|are) able to\b", "can"),
        PhraseRule::new(r"\b(?:has|have) the ability to\b", "can"),
        PhraseRule::new(r"\b(?:is|are) unable to\b", "cannot"),
        // time
        PhraseRule::new(r"\bat this point in time\b", "now"),
        PhraseRule::new(r"\bat this moment in time\b", "now"),
        PhraseRule::new(r"\bat the present time\b", "now"),
        PhraseRule::new(r"\bin the near future\b", "soon"),
        PhraseRule::new(r"\bin a timely manner\b", "promptly"),
        // prepositional
        PhraseRule::new(r"\bdue to the fact that\b", "because"),
        PhraseRule::new(r"\bin spite of the fact that\b", "although"),
        PhraseRule::new(r"\bin the event that\b", "if"),
        PhraseRule::new(r"\bfor the purpose of\b", "for"),
        PhraseRule::new(r"\bwith (?:regard|respect) to\b", "about"),
        PhraseRule::new(r"\bin relation to\b", "about"),
        PhraseRule::new(r"\bin close proximity to\b", "near"),
        PhraseRule::new(r"\bprior to\b", "before"),
        PhraseRule::new(r"\bsubsequent to\b", "after"),
        PhraseRule::new(r"\bon a daily basis\b", "daily"),
        PhraseRule::new(r"\bmake a decision\b", "decide"),
        // quantifiers
        PhraseRule::new(r"\bthe (?:vast )?majority of\b", "most"),
        PhraseRule::new(r"\ba (?:large|great) number of\b", "many"),
        PhraseRule::new(r"\ba small number of\b", "few"),
        PhraseRule::new(r"\beach and every\b", "every"),
    ]
});

/// Rewrite verbose phrases across the whole text.
///
/// Every replacement is a non-empty word, so no spacing is adjusted.
pub fn compress_semantic(text: &str) -> String {
    let rules: Vec<&PhraseRule> = SUBSTITUTIONS.iter().collect();
    apply_rules(text, &rules)
}

pub(crate) fn contains_verbose_phrase(text: &str) -> bool {
    SUBSTITUTIONS.iter().any(|rule| rule.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitutes_phrases() {
        let input = "The service is able to retry requests in the event that the upstream fails.";
        assert_eq!(
            compress_semantic(input),
            "The service can retry requests if the upstream fails."
        );
    }

    #[test]
    fn test_case_insensitive_and_capitalized() {
        assert_eq!(
            compress_semantic("At this point in time we ship. The majority of users agree."),
            "Now we ship. Most users agree."
        );
    }

    #[test]
    fn test_quantifiers() {
        assert_eq!(
            compress_semantic("a large number of files and a small number of dirs"),
            "many files and few dirs"
        );
    }

    #[test]
    fn test_spacing_inside_fences_untouched() {
        let input = "We are able to ship this today.\n```python\nx  = f(a , b)\n```\nDone.";
        assert_eq!(
            compress_semantic(input),
            "We can ship this today.\n```python\nx  = f(a , b)\n```\nDone."
        );
    }

    #[test]
    fn test_no_match_is_identity() {
        let input = "Nothing verbose here.";
        assert_eq!(compress_semantic(input), input);
        assert!(!contains_verbose_phrase(input));
    }
}
