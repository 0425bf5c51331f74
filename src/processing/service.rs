//! Pipeline service composing extraction, cleaning, and segmentation.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    config::PipelineConfig,
    metrics::{MetricsSnapshot, PipelineMetrics},
    processing::{
        Extractor, Segmenter, current_timestamp_rfc3339,
        extraction::types::{ExtractionResult, ExtractionStatus},
        segmentation::types::SegmentationResult,
        types::{CleaningOptions, PipelineError, SegmentationOptions},
    },
};

/// Extraction and segmentation results for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    /// Extracted (and possibly cleaned) text with page details.
    pub extraction: ExtractionResult,
    /// Chunks of the extraction text; empty when extraction failed.
    pub segmentation: SegmentationResult,
}

/// Runs extract → clean → segment for one document at a time.
///
/// The pipeline holds no per-document state, so a single instance can be shared across worker
/// threads behind an `Arc`. Counters accumulate in the attached [`PipelineMetrics`].
pub struct DocumentPipeline {
    extractor: Extractor,
    segmenter: Segmenter,
    cleaning: CleaningOptions,
    segmentation: SegmentationOptions,
    apply_cleaning: bool,
    metrics: Arc<PipelineMetrics>,
}

impl DocumentPipeline {
    /// Build a pipeline after validating both option sets.
    pub fn new(
        cleaning: CleaningOptions,
        segmentation: SegmentationOptions,
        apply_cleaning: bool,
    ) -> Result<Self, PipelineError> {
        cleaning.validate()?;
        segmentation.validate()?;
        Ok(Self {
            extractor: Extractor::new(),
            segmenter: Segmenter::new(),
            cleaning,
            segmentation,
            apply_cleaning,
            metrics: Arc::new(PipelineMetrics::new()),
        })
    }

    /// Build a pipeline from loaded configuration.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        Self::new(
            config.cleaning.clone(),
            config.segmentation.clone(),
            config.apply_cleaning,
        )
    }

    /// Replace the extractor, e.g. to inject alternative strategies.
    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Record counters into a shared metrics registry.
    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Process the PDF at `path`.
    ///
    /// A document whose extraction fails at the parsing level still yields an outcome (with a
    /// `failed` status and no segments); only contract violations such as a missing file are
    /// returned as errors.
    pub fn process(&self, path: impl AsRef<Path>) -> Result<PipelineOutcome, PipelineError> {
        let path = path.as_ref();
        let extraction = self
            .extractor
            .extract(path, Some(&self.cleaning), self.apply_cleaning)
            .inspect_err(|error| {
                self.metrics.record_failure();
                tracing::warn!(path = %path.display(), error = %error, "Document rejected");
            })?;

        if extraction.status == ExtractionStatus::Failed {
            self.metrics.record_failure();
            tracing::warn!(
                path = %path.display(),
                errors = ?extraction.metadata.errors,
                "No text extracted; skipping segmentation"
            );
            return Ok(PipelineOutcome {
                extraction,
                segmentation: SegmentationResult::empty(current_timestamp_rfc3339()),
            });
        }

        let segmentation = self
            .segmenter
            .segment(&extraction.text, Some(&self.segmentation))?;
        self.metrics.record_document(
            extraction.metadata.pages_extracted as u64,
            segmentation.segments.len() as u64,
        );
        tracing::info!(
            path = %path.display(),
            status = ?extraction.status,
            pages = extraction.metadata.pages_extracted,
            segments = segmentation.segments.len(),
            "Document processed"
        );
        Ok(PipelineOutcome {
            extraction,
            segmentation,
        })
    }

    /// Current counter values.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
