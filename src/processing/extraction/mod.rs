//! Multi-strategy PDF text extraction.
//!
//! [`Extractor::extract`] reads the file once, runs the primary [`ExtractionStrategy`], and falls
//! back to the secondary strategy exactly once when the primary fails at the document level.
//! Page-level failures never abort a document; they are counted and recorded in the metadata.
//! When both strategies fail the call still succeeds with a `failed`-status result so batch
//! callers can branch on status instead of handling errors.

mod plain;
mod positional;
pub mod types;

use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::time::Instant;

pub use plain::PlainTextStrategy;
pub use positional::PositionalStrategy;
use types::{ExtractionMetadata, ExtractionMethod, ExtractionResult, PageResult};

use crate::processing::cleaning::Cleaner;
use crate::processing::current_timestamp_rfc3339;
use crate::processing::normalize::normalize_text;
use crate::processing::types::{CleaningOptions, ExtractionError, StrategyError};

/// A whole-document extraction backend.
pub trait ExtractionStrategy: Send + Sync {
    /// Method tag recorded on pages and metadata produced by this strategy.
    fn method(&self) -> ExtractionMethod;

    /// Extract every page of the in-memory document.
    ///
    /// Returning `Err` signals a document-level failure; page-level failures belong in
    /// [`StrategyOutput::record_page_failure`].
    fn extract(&self, bytes: &[u8]) -> Result<StrategyOutput, StrategyError>;
}

/// Pages and counters produced by one strategy run.
#[derive(Debug, Clone, Default)]
pub struct StrategyOutput {
    /// Successfully extracted pages, in page order.
    pub pages: Vec<PageResult>,
    /// Pages reported by the document.
    pub total_pages: usize,
    /// Pages whose extraction failed.
    pub pages_failed: usize,
    /// Document-level warnings.
    pub warnings: Vec<String>,
    /// Page failures, formatted as `Page N: reason`.
    pub errors: Vec<String>,
}

impl StrategyOutput {
    /// Empty output for a document with `total_pages` pages.
    pub fn new(total_pages: usize) -> Self {
        Self {
            total_pages,
            ..Self::default()
        }
    }

    /// Record that a page could not be extracted.
    pub fn record_page_failure(&mut self, page_number: u32, reason: &str) {
        self.pages_failed += 1;
        self.errors.push(format!("Page {page_number}: {reason}"));
    }
}

/// Extracts positioned, normalized text from PDF files.
///
/// Construct one per worker; the extractor keeps no state between calls.
pub struct Extractor {
    primary: Box<dyn ExtractionStrategy>,
    secondary: Box<dyn ExtractionStrategy>,
    cleaner: Cleaner,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    /// Extractor using [`PositionalStrategy`] with [`PlainTextStrategy`] as fallback.
    pub fn new() -> Self {
        Self::with_strategies(Box::new(PositionalStrategy), Box::new(PlainTextStrategy))
    }

    /// Extractor with explicit primary and secondary strategies.
    pub fn with_strategies(
        primary: Box<dyn ExtractionStrategy>,
        secondary: Box<dyn ExtractionStrategy>,
    ) -> Self {
        Self {
            primary,
            secondary,
            cleaner: Cleaner::new(),
        }
    }

    /// Extract text without cleaning.
    pub fn extract_text(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<ExtractionResult, ExtractionError> {
        self.extract(path, None, false)
    }

    /// Extract text from the PDF at `path`, optionally cleaning it.
    ///
    /// Fails only when the path is missing, is not a regular file, cannot be read, or the
    /// cleaning options are invalid. `cleaning` defaults to [`CleaningOptions::default`].
    pub fn extract(
        &self,
        path: impl AsRef<Path>,
        cleaning: Option<&CleaningOptions>,
        apply_cleaning: bool,
    ) -> Result<ExtractionResult, ExtractionError> {
        let path = path.as_ref();
        let default_options;
        let options = match cleaning {
            Some(options) => options,
            None => {
                default_options = CleaningOptions::default();
                &default_options
            }
        };
        options.validate()?;

        if !path.exists() {
            return Err(ExtractionError::NotFound(path.to_path_buf()));
        }
        let file_metadata = fs::metadata(path)?;
        if !file_metadata.is_file() {
            return Err(ExtractionError::InvalidArgument(format!(
                "expected a PDF file, got a directory or special file: {}",
                path.display()
            )));
        }

        let started = Instant::now();
        let file_size_bytes = file_metadata.len();
        let bytes = fs::read(path)?;
        tracing::info!(path = %path.display(), bytes = file_size_bytes, "Extracting PDF");

        let (output, method, fallback_used) = match self.primary.extract(&bytes) {
            Ok(output) => (output, self.primary.method(), false),
            Err(primary_error) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %primary_error,
                    "Primary extraction failed; trying fallback strategy"
                );
                match self.secondary.extract(&bytes) {
                    Ok(mut output) => {
                        output.warnings.push(format!(
                            "Primary extraction failed, used fallback: {primary_error}"
                        ));
                        (output, self.secondary.method(), true)
                    }
                    Err(secondary_error) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %secondary_error,
                            "Fallback extraction failed"
                        );
                        return Ok(failed_result(
                            file_size_bytes,
                            started,
                            &secondary_error.to_string(),
                        ));
                    }
                }
            }
        };

        let StrategyOutput {
            pages,
            total_pages,
            pages_failed,
            warnings,
            errors,
        } = output;
        let raw_text = pages
            .iter()
            .map(|page| page.raw_text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let text = normalize_text(&raw_text);

        let metadata = ExtractionMetadata {
            total_pages,
            pages_extracted: pages.len(),
            pages_failed,
            extraction_method: method,
            fallback_used,
            processing_time_ms: elapsed_ms(started),
            file_size_bytes,
            warnings,
            errors,
        };
        let mut result = ExtractionResult::assemble(
            text,
            raw_text,
            pages,
            metadata,
            current_timestamp_rfc3339(),
        );

        if apply_cleaning && !result.pages.is_empty() {
            let (cleaned, cleaning_metadata) =
                self.cleaner.clean(&result.text, &result.pages, options);
            result.text = cleaned;
            result.cleaning_metadata = Some(cleaning_metadata);
        }

        tracing::info!(
            path = %path.display(),
            status = ?result.status,
            method = ?result.metadata.extraction_method,
            pages = result.metadata.pages_extracted,
            failed_pages = result.metadata.pages_failed,
            fallback = result.metadata.fallback_used,
            "PDF extracted"
        );
        Ok(result)
    }
}

fn failed_result(file_size_bytes: u64, started: Instant, message: &str) -> ExtractionResult {
    let metadata = ExtractionMetadata {
        total_pages: 0,
        pages_extracted: 0,
        pages_failed: 0,
        extraction_method: ExtractionMethod::Fallback,
        fallback_used: true,
        processing_time_ms: elapsed_ms(started),
        file_size_bytes,
        warnings: Vec::new(),
        errors: vec![format!("Extraction failed: {message}")],
    };
    ExtractionResult::assemble(
        String::new(),
        String::new(),
        Vec::new(),
        metadata,
        current_timestamp_rfc3339(),
    )
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

/// Run `work`, turning a panic inside a PDF library into the error built by `on_panic`.
///
/// Both backends panic on some malformed inputs instead of returning errors.
pub(crate) fn catch_panics<T, E>(
    work: impl FnOnce() -> Result<T, E>,
    on_panic: impl FnOnce(String) -> E,
) -> Result<T, E> {
    panic::catch_unwind(AssertUnwindSafe(work))
        .unwrap_or_else(|payload| Err(on_panic(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
