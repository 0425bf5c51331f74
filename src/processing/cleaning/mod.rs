//! Noise removal for extracted text.
//!
//! [`Cleaner::clean`] runs, in order: header/footer removal, page-number removal, repeated-artifact
//! removal, formatting cleanup, and a final whitespace pass. Each stage can be toggled through
//! [`CleaningOptions`]. Detection uses the per-page results (first/last lines and positioned
//! blocks); removal operates on the aggregate text.

mod artifacts;
mod headers;
mod patterns;

use serde::{Deserialize, Serialize};

use crate::processing::PageResult;
use crate::processing::normalize::collapse_blank_lines;
use crate::processing::types::CleaningOptions;

use artifacts::{detect_repeated_artifacts, is_watermark_glyph_line};
use headers::{detect_headers_footers, similarity};
use patterns::{
    clean_formatting_remnants, contains_page_x_of_y, detect_page_numbers, remove_page_number_lines,
};

/// Record of what a cleaning pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningMetadata {
    /// Header patterns removed.
    pub headers_removed: Vec<String>,
    /// Footer patterns removed.
    pub footers_removed: Vec<String>,
    /// Page-number strings removed, in detection order (may repeat).
    pub page_numbers_removed: Vec<String>,
    /// Artifact strings detected and removed, including any that were also headers or footers.
    pub artifacts_removed: Vec<String>,
    /// Whether formatting cleanup ran.
    pub formatting_cleaned: bool,
    /// Sum of the four removal list lengths.
    pub total_removals: usize,
}

/// Stateless text cleaner.
#[derive(Debug, Default, Clone, Copy)]
pub struct Cleaner;

impl Cleaner {
    /// Create a cleaner.
    pub fn new() -> Self {
        Self
    }

    /// Clean `text` using patterns detected across `pages`.
    ///
    /// Deterministic: identical inputs yield identical text and metadata. Options are assumed
    /// valid; [`CleaningOptions::validate`] is the caller's responsibility.
    pub fn clean(
        &self,
        text: &str,
        pages: &[PageResult],
        options: &CleaningOptions,
    ) -> (String, CleaningMetadata) {
        let mut cleaned = text.to_string();
        let mut metadata = CleaningMetadata::default();

        if options.remove_headers_footers && !pages.is_empty() {
            let detected = detect_headers_footers(
                pages,
                options.header_footer_threshold,
                options.cluster_similarity,
            );
            metadata.headers_removed = detected.headers;
            metadata.footers_removed = if options.remove_page_numbers {
                detected.footers
            } else {
                detected
                    .footers
                    .into_iter()
                    .filter(|footer| !contains_page_x_of_y(footer))
                    .collect()
            };
            cleaned = self.drop_header_footer_lines(&cleaned, &metadata, options);
        }

        if options.remove_page_numbers {
            metadata.page_numbers_removed =
                detect_page_numbers(&cleaned, &metadata.footers_removed);
            for page_number in &metadata.page_numbers_removed {
                cleaned = remove_page_number_lines(&cleaned, page_number);
            }
        }

        if options.remove_repeated_artifacts && !pages.is_empty() {
            let detected = detect_repeated_artifacts(
                pages,
                options.artifact_threshold,
                &options.watermark_words,
            );
            for artifact in detected.artifacts {
                // Header and footer text is already gone; the artifact is still reported.
                let known = metadata.headers_removed.contains(&artifact)
                    || metadata.footers_removed.contains(&artifact);
                if !known {
                    cleaned = cleaned.replace(&artifact, "");
                }
                metadata.artifacts_removed.push(artifact);
            }
            if !detected.glyph_words.is_empty() {
                cleaned = cleaned
                    .split('\n')
                    .filter(|line| !is_watermark_glyph_line(line, &detected.glyph_words))
                    .collect::<Vec<_>>()
                    .join("\n");
            }
        }

        if options.clean_formatting {
            cleaned = clean_formatting_remnants(&cleaned);
            metadata.formatting_cleaned = true;
        }

        if options.remove_headers_footers {
            // Later stages can reshape lines into something resembling a removed pattern.
            cleaned = self.drop_header_footer_lines(&cleaned, &metadata, options);
        }

        cleaned = finalize(&cleaned);
        metadata.total_removals = metadata.headers_removed.len()
            + metadata.footers_removed.len()
            + metadata.page_numbers_removed.len()
            + metadata.artifacts_removed.len();

        tracing::debug!(
            headers = metadata.headers_removed.len(),
            footers = metadata.footers_removed.len(),
            page_numbers = metadata.page_numbers_removed.len(),
            artifacts = metadata.artifacts_removed.len(),
            total_removals = metadata.total_removals,
            "Text cleaned"
        );
        (cleaned, metadata)
    }

    fn drop_header_footer_lines(
        &self,
        text: &str,
        metadata: &CleaningMetadata,
        options: &CleaningOptions,
    ) -> String {
        // Substring matches are case-sensitive; only the similarity comparison ignores case.
        let patterns: Vec<(&str, String)> = metadata
            .headers_removed
            .iter()
            .chain(&metadata.footers_removed)
            .map(|pattern| (pattern.as_str(), pattern.to_lowercase()))
            .collect();
        if patterns.is_empty() {
            return text.to_string();
        }

        text.split('\n')
            .filter(|line| {
                let line = line.trim();
                if line.is_empty() {
                    return true;
                }
                let folded = line.to_lowercase();
                !patterns.iter().any(|(pattern, folded_pattern)| {
                    line.contains(pattern)
                        || similarity(&folded, folded_pattern) >= options.line_match_similarity
                })
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Collapse runs of blank lines, right-trim every line, and trim the whole text.
fn finalize(text: &str) -> String {
    let collapsed = collapse_blank_lines(text);
    collapsed
        .split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
