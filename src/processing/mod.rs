//! Text-recovery pipeline: extraction, cleaning, and segmentation of PDF documents.
//!
//! The stages are usable on their own ([`Extractor`], [`Cleaner`], [`Segmenter`]) or composed by
//! [`DocumentPipeline`]. Everything here is synchronous; callers that need parallelism run one
//! pipeline call per worker.

pub mod cleaning;
pub mod extraction;
pub mod normalize;
pub mod segmentation;
mod service;
pub mod types;

use time::OffsetDateTime;

pub use cleaning::{Cleaner, CleaningMetadata};
pub use extraction::types::{
    ExtractionMetadata, ExtractionMethod, ExtractionResult, ExtractionStatus, PageResult,
    TextBlock,
};
pub use extraction::{
    ExtractionStrategy, Extractor, PlainTextStrategy, PositionalStrategy, StrategyOutput,
};
pub use segmentation::sentences::{SentenceModelRegistry, SentenceSplitter};
pub use segmentation::types::{SegmentationMetadata, SegmentationResult, TextSegment};
pub use segmentation::{Segmenter, estimate_token_count};
pub use service::{DocumentPipeline, PipelineOutcome};
pub use types::{
    CleaningOptions, ExtractionError, PipelineError, SegmentationError, SegmentationOptions,
    StrategyError, ValidationError,
};

/// Current UTC timestamp in RFC 3339 form.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
