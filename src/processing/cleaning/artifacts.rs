//! Repeated-artifact detection over positioned text blocks.

use std::collections::{BTreeSet, HashMap};

use crate::processing::PageResult;

/// Blocks of this many characters or fewer are never artifacts on their own.
const MIN_ARTIFACT_CHARS: usize = 2;

/// Artifacts recurring across pages.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct DetectedArtifacts {
    /// Recurring block texts plus any watermark words reassembled from glyphs, in detection order.
    pub artifacts: Vec<String>,
    /// Watermark words detected from single-letter glyph blocks.
    pub glyph_words: Vec<String>,
}

/// Whether `count` occurrences reach `fraction × page_count`.
fn meets_threshold(count: usize, page_count: usize, fraction: f64) -> bool {
    // The epsilon keeps products such as 0.7 × 10 from landing just above the exact value.
    count as f64 >= page_count as f64 * fraction - 1e-9
}

/// Count every occurrence of each block text across the document. Texts occurring at least
/// `threshold_fraction × pages` times are artifacts; single alphabetic glyphs recurring that often
/// are matched against `watermark_words`.
pub(crate) fn detect_repeated_artifacts(
    pages: &[PageResult],
    threshold_fraction: f64,
    watermark_words: &[String],
) -> DetectedArtifacts {
    if pages.len() < 2 {
        return DetectedArtifacts::default();
    }

    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for block in pages.iter().flat_map(|page| &page.text_blocks) {
        let text = block.text.trim();
        if text.is_empty() {
            continue;
        }
        let count = counts.entry(text).or_insert(0);
        if *count == 0 {
            order.push(text);
        }
        *count += 1;
    }

    let recurring = |text: &&str| {
        let count = counts.get(*text).copied().unwrap_or(0);
        meets_threshold(count, pages.len(), threshold_fraction)
    };

    let mut detected = DetectedArtifacts {
        artifacts: order
            .iter()
            .copied()
            .filter(recurring)
            .filter(|text| text.chars().count() > MIN_ARTIFACT_CHARS)
            .map(|text| text.to_string())
            .collect(),
        glyph_words: Vec::new(),
    };

    let letters: BTreeSet<char> = order
        .iter()
        .copied()
        .filter(recurring)
        .filter_map(single_letter)
        .collect();
    if letters.is_empty() {
        return detected;
    }

    for word in watermark_words {
        let word = word.trim();
        let spelled = word
            .chars()
            .filter(|c| !c.is_whitespace())
            .all(|c| letters.contains(&c.to_ascii_uppercase()));
        if spelled && !detected.artifacts.iter().any(|known| known == word) {
            tracing::debug!(word, "Watermark reassembled from recurring glyphs");
            detected.artifacts.push(word.to_string());
            detected.glyph_words.push(word.to_string());
        }
    }
    detected
}

/// Whether a trimmed line is one glyph of a detected watermark word.
pub(crate) fn is_watermark_glyph_line(line: &str, glyph_words: &[String]) -> bool {
    let Some(letter) = single_letter(line.trim()) else {
        return false;
    };
    glyph_words
        .iter()
        .any(|word| word.chars().any(|c| c.to_ascii_uppercase() == letter))
}

fn single_letter(text: &str) -> Option<char> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_alphabetic() => Some(c.to_ascii_uppercase()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::{ExtractionMethod, TextBlock};

    fn page_with_blocks(number: u32, texts: &[&str]) -> PageResult {
        let text_blocks: Vec<TextBlock> = texts
            .iter()
            .enumerate()
            .map(|(index, text)| TextBlock {
                text: text.to_string(),
                page_number: number,
                x0: 72.0,
                y0: 700.0 - index as f64 * 20.0,
                x1: 300.0,
                y1: 712.0 - index as f64 * 20.0,
                font_name: None,
                font_size: Some(12.0),
            })
            .collect();
        let text = texts.join("\n");
        PageResult {
            page_number: number,
            char_count: text.chars().count(),
            word_count: text.split_whitespace().count(),
            raw_text: text.clone(),
            text,
            text_blocks,
            extraction_method: ExtractionMethod::Lopdf,
            has_images: false,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn draft() -> Vec<String> {
        vec!["DRAFT".to_string()]
    }

    #[test]
    fn recurring_blocks_become_artifacts() {
        let pages: Vec<PageResult> = (1..=4)
            .map(|n| {
                let body = format!("Body paragraph {n}");
                page_with_blocks(n, &["CONFIDENTIAL", &body, "ok"])
            })
            .collect();
        let detected = detect_repeated_artifacts(&pages, 0.7, &draft());
        assert_eq!(detected.artifacts, vec!["CONFIDENTIAL"]);
        assert!(detected.glyph_words.is_empty());
    }

    #[test]
    fn every_occurrence_counts_toward_the_threshold() {
        let pages = vec![
            page_with_blocks(1, &["Stamp", "Stamp", "Stamp"]),
            page_with_blocks(2, &["Other text"]),
            page_with_blocks(3, &["More text"]),
        ];
        assert_eq!(
            detect_repeated_artifacts(&pages, 0.7, &draft()).artifacts,
            vec!["Stamp"]
        );
    }

    #[test]
    fn threshold_is_fraction_of_page_count() {
        // 10 pages at 0.7 need 7 occurrences.
        let pages: Vec<PageResult> = (1..=10)
            .map(|n| {
                let mut blocks = vec![format!("Unique body {n}")];
                if n <= 7 {
                    blocks.push("Seven times".to_string());
                }
                if n <= 6 {
                    blocks.push("Six times".to_string());
                }
                let blocks: Vec<&str> = blocks.iter().map(String::as_str).collect();
                page_with_blocks(n, &blocks)
            })
            .collect();
        let detected = detect_repeated_artifacts(&pages, 0.7, &draft());
        assert_eq!(detected.artifacts, vec!["Seven times"]);
    }

    #[test]
    fn low_fraction_needs_no_second_occurrence() {
        let pages = vec![
            page_with_blocks(1, &["Lone stamp"]),
            page_with_blocks(2, &["Another page"]),
        ];
        let detected = detect_repeated_artifacts(&pages, 0.5, &draft());
        assert_eq!(detected.artifacts, vec!["Lone stamp", "Another page"]);
        assert!(meets_threshold(1, 2, 0.5));
        assert!(!meets_threshold(1, 3, 0.5));
    }

    #[test]
    fn scattered_glyphs_spell_watermark() {
        let pages: Vec<PageResult> = (1..=5)
            .map(|n| page_with_blocks(n, &["D", "R", "A", "F", "T", "Lecture body"]))
            .collect();
        let detected = detect_repeated_artifacts(&pages, 0.7, &draft());
        assert!(detected.artifacts.contains(&"Lecture body".to_string()));
        assert!(detected.artifacts.contains(&"DRAFT".to_string()));
        assert_eq!(detected.glyph_words, draft());
    }

    #[test]
    fn partial_glyph_sets_do_not_spell_watermark() {
        let pages: Vec<PageResult> = (1..=3)
            .map(|n| page_with_blocks(n, &["D", "R", "A", "F"]))
            .collect();
        assert_eq!(
            detect_repeated_artifacts(&pages, 0.7, &draft()),
            DetectedArtifacts::default()
        );
    }

    #[test]
    fn glyph_lines_match_watermark_letters() {
        let words = draft();
        assert!(is_watermark_glyph_line(" D ", &words));
        assert!(is_watermark_glyph_line("t", &words));
        assert!(!is_watermark_glyph_line("Q", &words));
        assert!(!is_watermark_glyph_line("DR", &words));
    }

    #[test]
    fn single_page_has_no_artifacts() {
        let pages = vec![page_with_blocks(1, &["CONFIDENTIAL"])];
        assert_eq!(
            detect_repeated_artifacts(&pages, 0.7, &draft()),
            DetectedArtifacts::default()
        );
    }
}
