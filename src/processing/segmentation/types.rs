//! Segmentation result types.

use serde::{Deserialize, Serialize};

/// One chunk of source text.
///
/// Offsets count characters of the text passed to the segmenter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSegment {
    /// `seg_{index:04}_{first 8 hex chars of the SHA-256 of the text}`.
    pub segment_id: String,
    /// Sentences of the chunk joined by single spaces.
    pub text: String,
    /// Character offset of the first sentence.
    pub start_char: usize,
    /// `start_char` plus the character length of `text`.
    pub end_char: usize,
    /// Sum of the sentence token estimates.
    pub token_count: usize,
    /// Number of sentences in the chunk.
    pub sentence_count: usize,
    /// Whether a paragraph break was honored inside or at the end of the chunk.
    pub has_semantic_boundary: bool,
    /// Trailing sentences shared with the previous chunk.
    pub overlap_with_previous: Option<String>,
    /// Trailing sentences of this chunk shared with the next one.
    pub overlap_with_next: Option<String>,
}

/// Aggregate statistics for a segmentation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentationMetadata {
    /// Number of segments produced.
    pub total_segments: usize,
    /// Number of sentences detected.
    pub total_sentences: usize,
    /// Mean segment token count.
    pub avg_segment_size: f64,
    /// Smallest segment token count.
    pub min_segment_size: usize,
    /// Largest segment token count.
    pub max_segment_size: usize,
    /// Chunks credited with a paragraph boundary.
    pub semantic_boundaries_used: usize,
    /// Wall-clock duration of the run.
    pub segmentation_time_ms: f64,
}

/// Ordered segments plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationResult {
    /// Segments in source order.
    pub segments: Vec<TextSegment>,
    /// Run statistics.
    pub metadata: SegmentationMetadata,
    /// Character length of the source text (0 for blank input).
    pub source_text_length: usize,
    /// RFC 3339 UTC timestamp.
    pub segmented_at: String,
}

impl SegmentationResult {
    /// Result for blank input.
    pub(crate) fn empty(segmented_at: String) -> Self {
        Self {
            segments: Vec::new(),
            metadata: SegmentationMetadata::default(),
            source_text_length: 0,
            segmented_at,
        }
    }

    pub(crate) fn from_segments(
        segments: Vec<TextSegment>,
        total_sentences: usize,
        semantic_boundaries_used: usize,
        source_text_length: usize,
        segmentation_time_ms: f64,
        segmented_at: String,
    ) -> Self {
        let sizes = segments.iter().map(|segment| segment.token_count);
        let total: usize = sizes.clone().sum();
        let metadata = SegmentationMetadata {
            total_segments: segments.len(),
            total_sentences,
            avg_segment_size: if segments.is_empty() {
                0.0
            } else {
                total as f64 / segments.len() as f64
            },
            min_segment_size: sizes.clone().min().unwrap_or(0),
            max_segment_size: sizes.max().unwrap_or(0),
            semantic_boundaries_used,
            segmentation_time_ms,
        };
        Self {
            segments,
            metadata,
            source_text_length,
            segmented_at,
        }
    }
}
