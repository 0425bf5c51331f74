//! Secondary extraction strategy: per-page plain text from `pdf-extract`.
//!
//! The library yields no positional information, so pages carry no text blocks. It is known to
//! panic on some malformed inputs; panics are caught and reported as document-level failures.

use super::{ExtractionStrategy, StrategyOutput, catch_panics};
use crate::processing::normalize::{normalize_text, word_count};
use crate::processing::types::StrategyError;
use crate::processing::{ExtractionMethod, PageResult};

/// Plain-text strategy backed by `pdf-extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextStrategy;

impl ExtractionStrategy for PlainTextStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::PdfExtract
    }

    fn extract(&self, bytes: &[u8]) -> Result<StrategyOutput, StrategyError> {
        let page_texts = catch_panics(
            || {
                pdf_extract::extract_text_from_mem_by_pages(bytes)
                    .map_err(|error| StrategyError::Parse(error.to_string()))
            },
            StrategyError::Panicked,
        )?;

        let mut output = StrategyOutput::new(page_texts.len());
        for (index, raw_text) in page_texts.into_iter().enumerate() {
            output.pages.push(build_page(index as u32 + 1, raw_text));
        }
        Ok(output)
    }
}

fn build_page(page_number: u32, raw_text: String) -> PageResult {
    let text = normalize_text(&raw_text);
    PageResult {
        page_number,
        char_count: text.chars().count(),
        word_count: word_count(&text),
        text,
        raw_text,
        text_blocks: Vec::new(),
        extraction_method: ExtractionMethod::PdfExtract,
        has_images: false,
        warnings: Vec::new(),
        errors: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_normalized_and_counted() {
        let page = build_page(2, "Lecture  one\r\n\r\n\r\nNotes\t here".into());
        assert_eq!(page.page_number, 2);
        assert_eq!(page.text, "Lecture one\n\nNotes here");
        assert_eq!(page.word_count, 4);
        assert_eq!(page.char_count, page.text.chars().count());
        assert!(page.text_blocks.is_empty());
    }

    #[test]
    fn garbage_input_fails_without_panicking() {
        assert!(PlainTextStrategy.extract(b"%PDF-1.4 truncated").is_err());
    }
}
