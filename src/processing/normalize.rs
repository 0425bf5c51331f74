//! Text normalization shared by extraction, cleaning, and segmentation.
//!
//! [`normalize_text`] applies three passes in a fixed order: Unicode canonical composition,
//! typographic punctuation folding, and whitespace normalization. The composition is idempotent,
//! so normalized text can be fed back through without drifting.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static SPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r" +").expect("valid space regex"));
static EXCESS_NEWLINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("valid newline regex"));

/// Quote and prime glyphs folded to their ASCII counterparts.
const QUOTE_MAP: [(char, &str); 6] = [
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{2032}', "'"),
    ('\u{2033}', "\""),
];

/// Dash glyphs folded to ASCII hyphens.
const DASH_MAP: [(char, &str); 3] = [('\u{2013}', "-"), ('\u{2014}', "--"), ('\u{2015}', "--")];

/// Apply the full normalization pipeline.
pub fn normalize_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let composed = normalize_unicode(text);
    let folded = normalize_special_characters(&composed);
    normalize_whitespace(&folded)
}

/// Canonical composition (NFC).
pub fn normalize_unicode(text: &str) -> String {
    text.nfc().collect()
}

/// Fold smart quotes, primes, and long dashes to ASCII. Bullets and other symbols are kept.
pub fn normalize_special_characters(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    for ch in text.chars() {
        match QUOTE_MAP
            .iter()
            .chain(DASH_MAP.iter())
            .find(|(glyph, _)| *glyph == ch)
        {
            Some((_, replacement)) => output.push_str(replacement),
            None => output.push(ch),
        }
    }
    output
}

/// Normalize line endings, tabs, and space runs while keeping paragraph breaks.
///
/// Lines are trimmed individually, three or more consecutive newlines collapse to exactly two,
/// and the whole text is trimmed.
pub fn normalize_whitespace(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let unified = text.replace("\r\n", "\n").replace('\r', "\n").replace('\t', " ");
    let lines: Vec<String> = unified
        .split('\n')
        .map(|line| SPACE_RUNS.replace_all(line, " ").trim().to_string())
        .collect();
    collapse_blank_lines(&lines.join("\n")).trim().to_string()
}

/// Collapse three or more consecutive newlines to exactly two.
pub(crate) fn collapse_blank_lines(text: &str) -> String {
    EXCESS_NEWLINES.replace_all(text, "\n\n").into_owned()
}

/// Split text on blank-line paragraph breaks, dropping empty paragraphs.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .map(str::to_string)
        .collect()
}

/// Count whitespace-delimited words.
pub(crate) fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn collapses_space_runs() {
        assert_eq!(
            normalize_text("This  has   multiple    spaces"),
            "This has multiple spaces"
        );
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_whitespace("   \n\t  "), "");
    }

    #[test]
    fn composes_combining_sequences() {
        let decomposed = "cafe\u{0301}";
        assert_eq!(normalize_text(decomposed), "caf\u{00E9}");
    }

    #[test]
    fn folds_quotes_and_dashes() {
        let text = "\u{201C}Quoted\u{201D} it\u{2019}s 5\u{2032} \u{2013} range \u{2014} aside";
        assert_eq!(
            normalize_special_characters(text),
            "\"Quoted\" it's 5' - range -- aside"
        );
    }

    #[test]
    fn keeps_bullets() {
        assert_eq!(normalize_text("\u{2022} item"), "\u{2022} item");
    }

    #[test]
    fn preserves_paragraph_breaks_and_limits_blank_runs() {
        let text = "First line\r\n\r\n\r\n\r\nSecond\tline  \n  third";
        assert_eq!(normalize_text(text), "First line\n\nSecond line\nthird");
    }

    #[test]
    fn split_paragraphs_drops_blank_entries() {
        let paragraphs = split_paragraphs("one\n\n  \n\ntwo\nstill two\n\n");
        assert_eq!(paragraphs, vec!["one".to_string(), "two\nstill two".to_string()]);
        assert!(split_paragraphs("").is_empty());
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(
            text in "[a-zA-Z0-9 .,\t\r\n\u{2018}\u{2019}\u{201C}\u{201D}\u{2013}\u{2014}\u{2022}\u{00E9}\u{0301}]{0,80}"
        ) {
            let once = normalize_text(&text);
            let twice = normalize_text(&once);
            prop_assert_eq!(once, twice);
        }
    }
}
