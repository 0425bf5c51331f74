//! Header and footer detection across pages.

use std::collections::HashMap;

use crate::processing::PageResult;

/// Candidates of this many characters or fewer are never treated as headers/footers.
const MIN_PATTERN_CHARS: usize = 3;

/// Recurring first/last lines detected across a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct HeaderFooterPatterns {
    pub headers: Vec<String>,
    pub footers: Vec<String>,
}

/// Minimum number of pages a candidate must appear on: `max(2, ceil(fraction × pages))`.
fn occurrence_threshold(page_count: usize, fraction: f64) -> usize {
    // The epsilon keeps products such as 0.7 × 10 from rounding up past the exact value.
    let scaled = (page_count as f64 * fraction - 1e-9).ceil().max(0.0) as usize;
    scaled.max(2)
}

/// Normalized edit similarity in `[0, 1]`.
pub(crate) fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Detect headers (first non-blank line) and footers (last non-blank line, when distinct from
/// the first) that recur on at least the threshold number of pages.
pub(crate) fn detect_headers_footers(
    pages: &[PageResult],
    threshold_fraction: f64,
    cluster_similarity: f64,
) -> HeaderFooterPatterns {
    if pages.len() < 2 {
        return HeaderFooterPatterns::default();
    }

    let mut first_lines = Vec::new();
    let mut last_lines = Vec::new();
    for page in pages {
        let lines: Vec<&str> = page
            .text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        if let Some(first) = lines.first() {
            first_lines.push(*first);
        }
        if lines.len() > 1 {
            last_lines.push(lines[lines.len() - 1]);
        }
    }

    let threshold = occurrence_threshold(pages.len(), threshold_fraction);
    HeaderFooterPatterns {
        headers: find_repeated_patterns(&first_lines, threshold, cluster_similarity),
        footers: find_repeated_patterns(&last_lines, threshold, cluster_similarity),
    }
}

/// Exact-frequency pass first; only when it finds nothing, cluster near-identical candidates
/// and report each sufficiently large cluster's most frequent member.
fn find_repeated_patterns(
    candidates: &[&str],
    threshold: usize,
    cluster_similarity: f64,
) -> Vec<String> {
    let eligible: Vec<&str> = candidates
        .iter()
        .copied()
        .filter(|text| text.chars().count() > MIN_PATTERN_CHARS)
        .collect();

    let exact: Vec<String> = frequencies(&eligible)
        .into_iter()
        .filter(|(_, count)| *count >= threshold)
        .map(|(text, _)| text.to_string())
        .collect();
    if !exact.is_empty() {
        return exact;
    }

    let mut clusters: Vec<Vec<&str>> = Vec::new();
    for text in eligible {
        match clusters
            .iter_mut()
            .find(|cluster| similarity(text, cluster[0]) >= cluster_similarity)
        {
            Some(cluster) => cluster.push(text),
            None => clusters.push(vec![text]),
        }
    }

    clusters
        .into_iter()
        .filter(|cluster| cluster.len() >= threshold)
        .filter_map(|cluster| most_frequent(&cluster))
        .collect()
}

/// Most frequent member of a cluster; the earliest wins ties.
fn most_frequent(cluster: &[&str]) -> Option<String> {
    let counts = frequencies(cluster);
    let best = counts.iter().map(|&(_, count)| count).max()?;
    counts
        .into_iter()
        .find(|&(_, count)| count == best)
        .map(|(text, _)| text.to_string())
}

/// Occurrence counts in order of first appearance.
fn frequencies<'a>(texts: &[&'a str]) -> Vec<(&'a str, usize)> {
    let mut order: Vec<(&'a str, usize)> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    for &text in texts {
        match index.get(text) {
            Some(&slot) => order[slot].1 += 1,
            None => {
                index.insert(text, order.len());
                order.push((text, 1));
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::ExtractionMethod;

    fn page(number: u32, text: &str) -> PageResult {
        PageResult {
            page_number: number,
            text: text.to_string(),
            raw_text: text.to_string(),
            text_blocks: Vec::new(),
            char_count: text.chars().count(),
            word_count: text.split_whitespace().count(),
            extraction_method: ExtractionMethod::Lopdf,
            has_images: false,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    #[test]
    fn threshold_rounds_up_with_floor_of_two() {
        assert_eq!(occurrence_threshold(5, 0.7), 4);
        assert_eq!(occurrence_threshold(10, 0.7), 7);
        assert_eq!(occurrence_threshold(2, 0.7), 2);
        assert_eq!(occurrence_threshold(3, 0.1), 2);
    }

    #[test]
    fn exact_headers_are_detected() {
        let pages: Vec<PageResult> = (1..=4)
            .map(|n| page(n, &format!("COURSE TITLE\nBody {n}\nfooter text")))
            .collect();
        let patterns = detect_headers_footers(&pages, 0.7, 0.85);
        assert_eq!(patterns.headers, vec!["COURSE TITLE"]);
        assert_eq!(patterns.footers, vec!["footer text"]);
    }

    #[test]
    fn varying_footers_cluster_to_most_frequent_member() {
        let pages: Vec<PageResult> = (1..=5)
            .map(|n| page(n, &format!("Unique heading {n}x{n}\nBody\nPage {n} of 5")))
            .collect();
        let patterns = detect_headers_footers(&pages, 0.7, 0.85);
        assert_eq!(patterns.footers, vec!["Page 1 of 5"]);
    }

    #[test]
    fn candidate_below_threshold_is_ignored_and_at_threshold_is_kept() {
        // Five pages => threshold 4.
        let below: Vec<PageResult> = (1..=5)
            .map(|n| {
                let header = if n <= 3 {
                    "Shared Header"
                } else {
                    "Different words entirely"
                };
                page(n, &format!("{header}\nbody {n}"))
            })
            .collect();
        assert!(detect_headers_footers(&below, 0.7, 0.85).headers.is_empty());

        let at: Vec<PageResult> = (1..=5)
            .map(|n| {
                let header = if n <= 4 {
                    "Shared Header"
                } else {
                    "Different words entirely"
                };
                page(n, &format!("{header}\nbody {n}"))
            })
            .collect();
        assert_eq!(
            detect_headers_footers(&at, 0.7, 0.85).headers,
            vec!["Shared Header"]
        );
    }

    #[test]
    fn single_page_documents_have_no_headers() {
        let pages = vec![page(1, "Title\nBody\nFooter")];
        assert_eq!(
            detect_headers_footers(&pages, 0.7, 0.85),
            HeaderFooterPatterns::default()
        );
    }

    #[test]
    fn single_line_pages_yield_no_footer_candidates() {
        let pages = vec![page(1, "Only line"), page(2, "Only line")];
        let patterns = detect_headers_footers(&pages, 0.7, 0.85);
        assert_eq!(patterns.headers, vec!["Only line"]);
        assert!(patterns.footers.is_empty());
    }
}
