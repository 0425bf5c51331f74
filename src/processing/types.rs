//! Options, validation, and error definitions shared by the processing pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Similarity required for two header/footer candidates to share a cluster.
pub const DEFAULT_CLUSTER_SIMILARITY: f64 = 0.85;
/// Similarity at which a text line is considered a copy of a detected header/footer.
pub const DEFAULT_LINE_MATCH_SIMILARITY: f64 = 0.80;
/// Default page-frequency fraction for header/footer and artifact detection.
pub const DEFAULT_DETECTION_THRESHOLD: f64 = 0.7;
/// Sentence model used when callers do not request one.
pub const DEFAULT_SENTENCE_MODEL: &str = "uax29";

/// A configuration value failed validation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid value for `{field}`: {message}")]
pub struct ValidationError {
    /// Name of the offending option field.
    pub field: &'static str,
    /// Human-readable explanation of the constraint.
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Errors surfaced to callers of [`crate::processing::Extractor::extract`].
///
/// Document-level parse failures are not represented here: they are absorbed into a
/// `failed` [`crate::processing::ExtractionResult`] instead.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Input path does not exist.
    #[error("PDF file not found: {0}")]
    NotFound(PathBuf),
    /// Input path exists but cannot be processed as a file.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Reading the file from disk failed.
    #[error("failed to read PDF: {0}")]
    Io(#[from] std::io::Error),
    /// Cleaning options were rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Whole-document failure of a single extraction strategy.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// The document could not be opened or parsed.
    #[error("failed to open document: {0}")]
    Open(String),
    /// The document is encrypted and cannot be read without credentials.
    #[error("document is encrypted")]
    Encrypted,
    /// The backing library panicked while processing the document.
    #[error("extraction library panicked: {0}")]
    Panicked(String),
    /// The document opened but its structure was unusable.
    #[error("failed to parse document: {0}")]
    Parse(String),
    /// Pages show text but none of it could be mapped to Unicode.
    #[error("no text could be decoded from {pages} page(s) that show text")]
    Undecodable {
        /// Pages whose shown strings decoded to nothing.
        pages: usize,
    },
}

/// Errors emitted by [`crate::processing::Segmenter::segment`].
#[derive(Debug, Error)]
pub enum SegmentationError {
    /// Segmentation options were rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Errors emitted by the end-to-end [`crate::processing::DocumentPipeline`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Pipeline options were rejected at construction.
    #[error("Invalid pipeline options: {0}")]
    Validation(#[from] ValidationError),
    /// Extraction rejected the input.
    #[error("Failed to extract document: {0}")]
    Extraction(#[from] ExtractionError),
    /// Segmentation rejected its options.
    #[error("Failed to segment document: {0}")]
    Segmentation(#[from] SegmentationError),
}

/// Toggles and thresholds controlling [`crate::processing::Cleaner`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningOptions {
    /// Remove text recurring as the first/last line of most pages.
    pub remove_headers_footers: bool,
    /// Remove standalone page-number lines.
    pub remove_page_numbers: bool,
    /// Remove text blocks recurring across most pages (watermarks, stamps).
    pub remove_repeated_artifacts: bool,
    /// Remove orphaned bullets, table borders, and trailing punctuation runs.
    pub clean_formatting: bool,
    /// Page fraction a header/footer candidate must reach.
    pub header_footer_threshold: f64,
    /// Page fraction a text block must reach to count as an artifact.
    pub artifact_threshold: f64,
    /// Similarity used to cluster near-identical header/footer candidates.
    pub cluster_similarity: f64,
    /// Similarity at which a line is dropped as a header/footer copy.
    pub line_match_similarity: f64,
    /// Words that may be drawn as scattered single glyphs (e.g. a diagonal "DRAFT").
    pub watermark_words: Vec<String>,
}

impl Default for CleaningOptions {
    fn default() -> Self {
        Self {
            remove_headers_footers: true,
            remove_page_numbers: true,
            remove_repeated_artifacts: true,
            clean_formatting: true,
            header_footer_threshold: DEFAULT_DETECTION_THRESHOLD,
            artifact_threshold: DEFAULT_DETECTION_THRESHOLD,
            cluster_similarity: DEFAULT_CLUSTER_SIMILARITY,
            line_match_similarity: DEFAULT_LINE_MATCH_SIMILARITY,
            watermark_words: vec!["DRAFT".to_string()],
        }
    }
}

impl CleaningOptions {
    /// Reject out-of-range thresholds and malformed watermark words.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_unit_interval("header_footer_threshold", self.header_footer_threshold)?;
        check_unit_interval("artifact_threshold", self.artifact_threshold)?;
        check_unit_interval("cluster_similarity", self.cluster_similarity)?;
        check_unit_interval("line_match_similarity", self.line_match_similarity)?;
        for word in &self.watermark_words {
            if word.trim().is_empty() {
                return Err(ValidationError::new(
                    "watermark_words",
                    "watermark words must not be blank",
                ));
            }
        }
        Ok(())
    }
}

/// Budgets and preferences controlling [`crate::processing::Segmenter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationOptions {
    /// Soft target size of a chunk, in estimated tokens.
    pub chunk_size_tokens: usize,
    /// Fraction of the previous chunk repeated as overlap, in `[0, 0.5]`.
    pub overlap_percentage: f64,
    /// Chunks below this size are only emitted at the end of input or when forced.
    pub min_chunk_size: usize,
    /// Hard ceiling on chunk size, except for a single oversized sentence.
    pub max_chunk_size: usize,
    /// Record paragraph breaks as the reason for a split when one coincides.
    pub prefer_semantic_boundaries: bool,
    /// Identifier of the sentence model resolved through the model registry.
    pub sentence_segmentation_model: String,
}

impl Default for SegmentationOptions {
    fn default() -> Self {
        Self {
            chunk_size_tokens: 256,
            overlap_percentage: 0.2,
            min_chunk_size: 50,
            max_chunk_size: 512,
            prefer_semantic_boundaries: true,
            sentence_segmentation_model: DEFAULT_SENTENCE_MODEL.to_string(),
        }
    }
}

impl SegmentationOptions {
    /// Reject budgets outside the supported ranges or inconsistent with each other.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(50..=1024).contains(&self.chunk_size_tokens) {
            return Err(ValidationError::new(
                "chunk_size_tokens",
                format!("must be within 50..=1024, got {}", self.chunk_size_tokens),
            ));
        }
        if !self.overlap_percentage.is_finite() || !(0.0..=0.5).contains(&self.overlap_percentage)
        {
            return Err(ValidationError::new(
                "overlap_percentage",
                format!("must be within 0.0..=0.5, got {}", self.overlap_percentage),
            ));
        }
        if self.min_chunk_size < 10 {
            return Err(ValidationError::new(
                "min_chunk_size",
                format!("must be at least 10, got {}", self.min_chunk_size),
            ));
        }
        if self.max_chunk_size < 100 {
            return Err(ValidationError::new(
                "max_chunk_size",
                format!("must be at least 100, got {}", self.max_chunk_size),
            ));
        }
        if self.min_chunk_size > self.max_chunk_size {
            return Err(ValidationError::new(
                "min_chunk_size",
                format!(
                    "must not exceed max_chunk_size ({} > {})",
                    self.min_chunk_size, self.max_chunk_size
                ),
            ));
        }
        if self.sentence_segmentation_model.trim().is_empty() {
            return Err(ValidationError::new(
                "sentence_segmentation_model",
                "model identifier must not be blank",
            ));
        }
        Ok(())
    }
}

fn check_unit_interval(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new(
            field,
            format!("must be within 0.0..=1.0, got {value}"),
        ))
    }
}
