//! Stateless text measurement helpers.
//!
//! Everything here is a total function of its string input: malformed markup
//! is stripped best-effort, never rejected.

use regex::Regex;
use std::sync::OnceLock;

fn tag_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"))
}

fn entity_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&[a-zA-Z][a-zA-Z0-9]{1,30};|&#\d{1,7};").expect("entity pattern is valid"))
}

fn whitespace_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

fn sentence_split_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]\s+").expect("sentence pattern is valid"))
}

/// Strip tag-delimited markup and character entities from `html`.
///
/// Common named entities are decoded; anything else entity-shaped is
/// removed. Whitespace is collapsed and the result trimmed. Never fails on
/// malformed markup.
pub fn strip_markup(html: &str) -> String {
    let without_tags = tag_pattern().replace_all(html, " ");
    let decoded = entity_pattern().replace_all(&without_tags, |caps: &regex::Captures<'_>| {
        match &caps[0] {
            "&nbsp;" => " ",
            "&amp;" => "&",
            "&lt;" => "<",
            "&gt;" => ">",
            "&quot;" => "\"",
            "&apos;" | "&#39;" => "'",
            "&eacute;" => "é",
            "&egrave;" => "è",
            "&agrave;" => "à",
            "&ccedil;" => "ç",
            _ => " ",
        }
        .to_string()
    });
    whitespace_pattern()
        .replace_all(&decoded, " ")
        .trim()
        .to_string()
}

/// Ratio of generic-phrase words to total words in `html`.
///
/// Tokenizes the stripped text on whitespace into a word count `W`, then for
/// every phrase sums the word length of each occurrence into `M` and returns
/// `M / W` (`0` when `W` is zero). Overlapping phrase matches may double
/// count words, so the ratio is not capped at 1; downstream tolerances are
/// tuned against the uncapped value.
pub fn generic_phrase_ratio(html: &str, phrases: &[String]) -> f64 {
    let text = strip_markup(html).to_lowercase();
    let total_words = text.split_whitespace().count();
    if total_words == 0 {
        return 0.0;
    }

    let mut matched_words = 0usize;
    for phrase in phrases {
        let needle = phrase.to_lowercase();
        if needle.is_empty() {
            continue;
        }
        let occurrences = text.matches(&needle).count();
        if occurrences > 0 {
            matched_words += occurrences * needle.split_whitespace().count();
        }
    }

    matched_words as f64 / total_words as f64
}

/// Extract normalized paragraphs for cross-section duplicate detection.
///
/// Splits the stripped text on sentence-terminal punctuation followed by
/// whitespace, lower-cases and trims each fragment, and discards fragments
/// shorter than `min_len` characters to avoid false positives.
pub fn extract_dedup_paragraphs(html: &str, min_len: usize) -> Vec<String> {
    let text = strip_markup(html);
    sentence_split_pattern()
        .split(&text)
        .map(|fragment| fragment.trim().to_lowercase())
        .filter(|fragment| fragment.chars().count() >= min_len)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phrases(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_strip_markup_removes_tags() {
        let html = "<p>Le disque de frein <strong>avant</strong> s'use.</p>";
        assert_eq!(strip_markup(html), "Le disque de frein avant s'use.");
    }

    #[test]
    fn test_strip_markup_decodes_entities() {
        let html = "freins&nbsp;&amp;&nbsp;plaquettes &eacute;tat";
        assert_eq!(strip_markup(html), "freins & plaquettes état");
    }

    #[test]
    fn test_strip_markup_drops_unknown_entities() {
        let html = "a&copy;b";
        assert_eq!(strip_markup(html), "a b");
    }

    #[test]
    fn test_strip_markup_malformed_is_best_effort() {
        let html = "<p>unclosed <b>bold";
        assert_eq!(strip_markup(html), "unclosed bold");
    }

    #[test]
    fn test_strip_markup_collapses_whitespace() {
        assert_eq!(strip_markup("  a \n\n  b\t c  "), "a b c");
    }

    #[test]
    fn test_ratio_zero_for_empty_content() {
        assert_eq!(generic_phrase_ratio("", &phrases(&["de nos jours"])), 0.0);
        assert_eq!(generic_phrase_ratio("<p></p>", &phrases(&["de nos jours"])), 0.0);
    }

    #[test]
    fn test_ratio_counts_matched_words() {
        // 8 words total, one 4-word phrase match
        let html = "il est important de purger le circuit correctement";
        let ratio = generic_phrase_ratio(html, &phrases(&["il est important de"]));
        assert!((ratio - 4.0 / 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_ratio_is_case_insensitive() {
        let html = "De Nos Jours le freinage est surveillé";
        let ratio = generic_phrase_ratio(html, &phrases(&["de nos jours"]));
        assert!(ratio > 0.0);
    }

    #[test]
    fn test_ratio_can_exceed_one_on_overlap() {
        // Two phrases cover the same words; the sum is not capped.
        let html = "il est important de";
        let ratio = generic_phrase_ratio(
            html,
            &phrases(&["il est important de", "est important"]),
        );
        assert!(ratio > 1.0);
    }

    #[test]
    fn test_ratio_zero_when_no_phrase_matches() {
        let html = "couple de serrage 110 Nm pour les vis de roue";
        assert_eq!(generic_phrase_ratio(html, &phrases(&["en conclusion"])), 0.0);
    }

    #[test]
    fn test_extract_paragraphs_splits_on_sentences() {
        let html = "<p>Le disque de frein doit être remplacé par paire sur le même essieu. \
                    Un voile supérieur à 0,05 mm impose le remplacement immédiat du disque.</p>";
        let paragraphs = extract_dedup_paragraphs(html, 40);
        assert_eq!(paragraphs.len(), 2);
        assert!(paragraphs[0].starts_with("le disque de frein"));
    }

    #[test]
    fn test_extract_paragraphs_discards_short_fragments() {
        let html = "Court. Un fragment suffisamment long pour franchir le seuil de quarante caractères.";
        let paragraphs = extract_dedup_paragraphs(html, 40);
        assert_eq!(paragraphs.len(), 1);
    }

    #[test]
    fn test_extract_paragraphs_normalizes_case() {
        let html = "LE LIQUIDE DE FREIN DOIT ÊTRE REMPLACÉ TOUS LES DEUX ANS SELON CONSTRUCTEUR.";
        let paragraphs = extract_dedup_paragraphs(html, 40);
        assert_eq!(paragraphs.len(), 1);
        assert!(paragraphs[0].starts_with("le liquide"));
    }
}
