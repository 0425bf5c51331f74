//! Value objects produced by the extractor.

use serde::{Deserialize, Serialize};

use crate::processing::cleaning::CleaningMetadata;

/// Overall outcome of a document extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    /// Every page was extracted.
    Success,
    /// Some pages were extracted and some failed.
    Partial,
    /// No page could be extracted.
    Failed,
}

impl ExtractionStatus {
    /// Derive the status from page counters. Zero extracted pages is always a failure.
    pub fn from_counts(pages_extracted: usize, pages_failed: usize) -> Self {
        if pages_extracted == 0 {
            Self::Failed
        } else if pages_failed == 0 {
            Self::Success
        } else {
            Self::Partial
        }
    }
}

/// Strategy that produced a page or document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Positional content-stream extraction backed by `lopdf`.
    Lopdf,
    /// Plain per-page text backed by `pdf-extract`.
    PdfExtract,
    /// Both strategies failed.
    Fallback,
}

/// A positioned run of text, the smallest extraction unit.
///
/// Coordinates are in PDF user space (origin bottom-left): `y0` is the baseline and `y1` the top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    /// Text content of the span.
    pub text: String,
    /// 1-indexed page number.
    pub page_number: u32,
    /// Left edge.
    pub x0: f64,
    /// Bottom edge.
    pub y0: f64,
    /// Right edge.
    pub x1: f64,
    /// Top edge.
    pub y1: f64,
    /// Font name, when resolvable.
    pub font_name: Option<String>,
    /// Effective font size, when known.
    pub font_size: Option<f64>,
}

/// Extraction result for a single page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number.
    pub page_number: u32,
    /// Normalized page text.
    pub text: String,
    /// Text before normalization.
    pub raw_text: String,
    /// Blocks in reading order.
    pub text_blocks: Vec<TextBlock>,
    /// Characters in `text`.
    pub char_count: usize,
    /// Words in `text`.
    pub word_count: usize,
    /// Strategy that produced this page.
    pub extraction_method: ExtractionMethod,
    /// Whether the page draws at least one image.
    pub has_images: bool,
    /// Non-fatal issues observed on this page.
    pub warnings: Vec<String>,
    /// Errors recorded for this page.
    pub errors: Vec<String>,
}

/// Aggregate facts about an extraction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    /// Pages reported by the document.
    pub total_pages: usize,
    /// Pages that produced a [`PageResult`].
    pub pages_extracted: usize,
    /// Pages whose extraction failed.
    pub pages_failed: usize,
    /// Strategy whose output was kept.
    pub extraction_method: ExtractionMethod,
    /// Whether the secondary strategy was attempted.
    pub fallback_used: bool,
    /// Wall-clock time of the whole call.
    pub processing_time_ms: f64,
    /// Size of the input file.
    pub file_size_bytes: u64,
    /// Document-level warnings.
    pub warnings: Vec<String>,
    /// Document-level and page-level errors.
    pub errors: Vec<String>,
}

/// Complete extraction output for one document.
///
/// The page totals and success rate are derived from `pages` and `metadata` when the result is
/// assembled, and travel with the serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Overall status.
    pub status: ExtractionStatus,
    /// Normalized (and, when requested, cleaned) document text.
    pub text: String,
    /// Page raw texts joined by blank lines.
    pub raw_text: String,
    /// Per-page results in page order.
    pub pages: Vec<PageResult>,
    /// Run metadata.
    pub metadata: ExtractionMetadata,
    /// RFC 3339 UTC timestamp.
    pub extracted_at: String,
    /// Present when cleaning ran.
    pub cleaning_metadata: Option<CleaningMetadata>,
    /// Sum of `char_count` across pages.
    pub total_char_count: usize,
    /// Sum of `word_count` across pages.
    pub total_word_count: usize,
    /// `pages_extracted / total_pages * 100`, or `0.0` for an empty document.
    pub success_rate: f64,
}

impl ExtractionResult {
    pub(crate) fn assemble(
        text: String,
        raw_text: String,
        pages: Vec<PageResult>,
        metadata: ExtractionMetadata,
        extracted_at: String,
    ) -> Self {
        let status = ExtractionStatus::from_counts(metadata.pages_extracted, metadata.pages_failed);
        let total_char_count = pages.iter().map(|page| page.char_count).sum();
        let total_word_count = pages.iter().map(|page| page.word_count).sum();
        let success_rate = if metadata.total_pages == 0 {
            0.0
        } else {
            metadata.pages_extracted as f64 / metadata.total_pages as f64 * 100.0
        };
        Self {
            status,
            text,
            raw_text,
            pages,
            metadata,
            extracted_at,
            cleaning_metadata: None,
            total_char_count,
            total_word_count,
            success_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn metadata(total: usize, extracted: usize, failed: usize) -> ExtractionMetadata {
        ExtractionMetadata {
            total_pages: total,
            pages_extracted: extracted,
            pages_failed: failed,
            extraction_method: ExtractionMethod::Lopdf,
            fallback_used: false,
            processing_time_ms: 0.0,
            file_size_bytes: 0,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    #[test]
    fn status_follows_page_counters() {
        assert_eq!(ExtractionStatus::from_counts(3, 0), ExtractionStatus::Success);
        assert_eq!(ExtractionStatus::from_counts(2, 1), ExtractionStatus::Partial);
        assert_eq!(ExtractionStatus::from_counts(0, 2), ExtractionStatus::Failed);
        assert_eq!(ExtractionStatus::from_counts(0, 0), ExtractionStatus::Failed);
    }

    #[test]
    fn totals_sum_page_counts() {
        let pages = vec![page(1, "alpha beta"), page(2, "gamma")];
        let result = ExtractionResult::assemble(
            String::new(),
            String::new(),
            pages,
            metadata(4, 2, 2),
            "1970-01-01T00:00:00Z".into(),
        );
        assert_eq!(result.total_char_count, 15);
        assert_eq!(result.total_word_count, 3);
        assert_eq!(result.success_rate, 50.0);
        assert_eq!(result.status, ExtractionStatus::Partial);
    }

    #[test]
    fn serialized_form_exposes_derived_fields() {
        let result = ExtractionResult::assemble(
            String::new(),
            String::new(),
            Vec::new(),
            metadata(0, 0, 0),
            "1970-01-01T00:00:00Z".into(),
        );
        let value = serde_json::to_value(&result).expect("serialize");
        assert_eq!(value["status"], "failed");
        assert_eq!(value["metadata"]["extraction_method"], "lopdf");
        assert!(value.get("total_char_count").is_some());
        assert!(value.get("success_rate").is_some());
        assert!(value["cleaning_metadata"].is_null());
    }
}
