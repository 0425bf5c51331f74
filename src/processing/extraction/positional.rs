//! Primary extraction strategy: positioned spans from page content streams.
//!
//! `lopdf` parses the document and `pdf-extract` interprets each page's content stream, decoding
//! shown strings through the font's encoding, `Differences` array, or `ToUnicode` map and
//! reporting every glyph with its rendering matrix and advance width. [`SpanCollector`] groups
//! consecutive glyphs on one baseline into a [`TextBlock`].
//!
//! A page whose content stream shows strings that decode to nothing is a page failure. When no
//! page decodes at all the whole document fails so the secondary strategy gets a chance.

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use pdf_extract::{MediaBox, OutputDev, OutputError, Transform};
use thiserror::Error;

use super::{ExtractionStrategy, StrategyOutput, catch_panics};
use crate::processing::normalize::{normalize_text, word_count};
use crate::processing::types::StrategyError;
use crate::processing::{ExtractionMethod, PageResult, TextBlock};

/// Spans whose tops differ by less than this many units share a line.
const LINE_TOLERANCE: f64 = 5.0;
/// Horizontal gap, as a fraction of the font size, that still continues the current span.
const SPAN_GAP: f64 = 0.25;
/// Guard against cyclic `Parent` chains when resolving inherited resources.
const MAX_PARENT_DEPTH: usize = 32;

/// Content-stream strategy backed by `lopdf` and `pdf-extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PositionalStrategy;

impl ExtractionStrategy for PositionalStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Lopdf
    }

    fn extract(&self, bytes: &[u8]) -> Result<StrategyOutput, StrategyError> {
        catch_panics(|| extract_document(bytes), StrategyError::Panicked)
    }
}

#[derive(Debug, Error)]
enum PageError {
    #[error("failed to read page content: {0}")]
    Content(#[from] lopdf::Error),
    #[error("failed to lay out page text: {0}")]
    Layout(String),
    #[error("text operators present but no text could be decoded")]
    Undecodable,
}

/// What a page's content stream draws, independent of font decoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ContentSummary {
    shows_text: bool,
    has_images: bool,
}

fn extract_document(bytes: &[u8]) -> Result<StrategyOutput, StrategyError> {
    let mut document =
        Document::load_mem(bytes).map_err(|error| StrategyError::Open(error.to_string()))?;
    if document.is_encrypted() {
        return Err(StrategyError::Encrypted);
    }

    let pages: Vec<(u32, Result<ContentSummary, lopdf::Error>)> = document
        .get_pages()
        .into_iter()
        .map(|(page_number, page_id)| (page_number, summarize_content(&document, page_id)))
        .collect();
    blank_image_xobjects(&mut document);

    let mut output = StrategyOutput::new(pages.len());
    let mut undecodable = 0;
    for (page_number, summary) in pages {
        let page = summary
            .map_err(PageError::from)
            .and_then(|summary| extract_page(&document, page_number, summary));
        match page {
            Ok(page) => output.pages.push(page),
            Err(error) => {
                if matches!(error, PageError::Undecodable) {
                    undecodable += 1;
                }
                tracing::warn!(page = page_number, error = %error, "Page extraction failed");
                output.record_page_failure(page_number, &error.to_string());
            }
        }
    }

    if output.pages.is_empty() && undecodable > 0 {
        return Err(StrategyError::Undecodable { pages: undecodable });
    }
    Ok(output)
}

fn extract_page(
    document: &Document,
    page_number: u32,
    summary: ContentSummary,
) -> Result<PageResult, PageError> {
    let mut collector = SpanCollector::new(page_number);
    catch_panics(
        || {
            pdf_extract::output_doc_page(document, &mut collector, page_number)
                .map_err(|error| PageError::Layout(error.to_string()))
        },
        PageError::Layout,
    )?;

    let mut blocks = collector.finish();
    sort_reading_order(&mut blocks);
    let raw_text = join_lines(&blocks);
    let text = normalize_text(&raw_text);
    if text.is_empty() && summary.shows_text {
        return Err(PageError::Undecodable);
    }

    let mut warnings = Vec::new();
    if text.is_empty() && summary.has_images {
        warnings.push("page contains images but no extractable text".to_string());
    }

    Ok(PageResult {
        page_number,
        char_count: text.chars().count(),
        word_count: word_count(&text),
        text,
        raw_text,
        text_blocks: blocks,
        extraction_method: ExtractionMethod::Lopdf,
        has_images: summary.has_images,
        warnings,
        errors: Vec::new(),
    })
}

/// Scan a page's operators for non-empty shown strings and image draws.
fn summarize_content(
    document: &Document,
    page_id: ObjectId,
) -> Result<ContentSummary, lopdf::Error> {
    let content = Content::decode(&document.get_page_content(page_id)?)?;
    let resources = page_resources(document, page_id);

    let mut summary = ContentSummary::default();
    for operation in &content.operations {
        let operands = &operation.operands;
        match operation.operator.as_str() {
            "Tj" | "'" => summary.shows_text |= operands.first().is_some_and(has_string_bytes),
            "\"" => summary.shows_text |= operands.get(2).is_some_and(has_string_bytes),
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    summary.shows_text |= items.iter().any(has_string_bytes);
                }
            }
            "BI" | "EI" => summary.has_images = true,
            "Do" => {
                summary.has_images |= operands
                    .first()
                    .and_then(|name| name.as_name().ok())
                    .is_some_and(|name| is_image_xobject(document, resources, name));
            }
            _ => {}
        }
    }
    Ok(summary)
}

fn has_string_bytes(object: &Object) -> bool {
    matches!(object, Object::String(bytes, _) if !bytes.is_empty())
}

/// Swap image XObjects for empty forms so the content interpreter never parses sample data as
/// operators. Image presence is recorded by [`summarize_content`] beforehand.
fn blank_image_xobjects(document: &mut Document) {
    for object in document.objects.values_mut() {
        let Object::Stream(stream) = object else {
            continue;
        };
        let is_image = stream
            .dict
            .get(b"Subtype")
            .and_then(Object::as_name)
            .is_ok_and(|subtype| subtype == b"Image");
        if is_image {
            *stream = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "BBox" => vec![Object::Integer(0); 4],
                },
                Vec::new(),
            );
        }
    }
}

/// A span being accumulated from consecutive glyphs.
#[derive(Debug, Clone)]
struct OpenSpan {
    text: String,
    x0: f64,
    x1: f64,
    baseline: f64,
    size: f64,
}

impl OpenSpan {
    /// Whether a glyph drawn at `(x, y)` continues this span after a word break.
    fn continues_at(&self, x: f64, y: f64) -> bool {
        let tolerance = self.size.max(1.0);
        (y - self.baseline).abs() < tolerance * 0.2
            && x >= self.x1 - tolerance * 0.5
            && x - self.x1 <= tolerance * SPAN_GAP
    }

    fn into_block(self, page_number: u32) -> TextBlock {
        TextBlock {
            text: self.text,
            page_number,
            x0: self.x0,
            y0: self.baseline,
            x1: self.x1.max(self.x0),
            y1: self.baseline + self.size,
            font_name: None,
            font_size: (self.size > 0.0).then_some(self.size),
        }
    }
}

/// [`OutputDev`] that turns decoded glyphs into text blocks.
///
/// Every shown string opens a word; a word joins the previous span only when it sits on the same
/// baseline right where that span ended. Line moves always close the span.
#[derive(Debug)]
struct SpanCollector {
    page_number: u32,
    blocks: Vec<TextBlock>,
    current: Option<OpenSpan>,
    word_started: bool,
}

impl SpanCollector {
    fn new(page_number: u32) -> Self {
        Self {
            page_number,
            blocks: Vec::new(),
            current: None,
            word_started: false,
        }
    }

    fn flush(&mut self) {
        let span = self.current.take();
        if let Some(span) = span.filter(|span| !span.text.trim().is_empty()) {
            self.blocks.push(span.into_block(self.page_number));
        }
    }

    fn finish(mut self) -> Vec<TextBlock> {
        self.flush();
        self.blocks
    }
}

impl OutputDev for SpanCollector {
    fn begin_page(
        &mut self,
        _page_num: u32,
        _media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        self.flush();
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        self.flush();
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        spacing: f64,
        font_size: f64,
        glyph: &str,
    ) -> Result<(), OutputError> {
        let (x, y) = (trm.m31, trm.m32);
        let size = font_size * trm.m21.hypot(trm.m22);
        let size = if size.is_finite() { size.abs() } else { 0.0 };
        let advance = (width * font_size + spacing) * trm.m11.hypot(trm.m12);
        let advance = if advance.is_finite() { advance } else { 0.0 };

        let word_started = std::mem::take(&mut self.word_started);
        let continues = self
            .current
            .as_ref()
            .is_some_and(|span| !word_started || span.continues_at(x, y));
        if !continues {
            self.flush();
        }

        match self.current.as_mut() {
            Some(span) => {
                span.text.push_str(glyph);
                span.x1 = span.x1.max(x + advance);
            }
            None => {
                self.current = Some(OpenSpan {
                    text: glyph.to_string(),
                    x0: x,
                    x1: x + advance,
                    baseline: y,
                    size,
                });
            }
        }
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        self.word_started = true;
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        self.flush();
        Ok(())
    }
}

/// Sort blocks top-to-bottom (descending top edge), then left-to-right.
pub(crate) fn sort_reading_order(blocks: &mut [TextBlock]) {
    blocks.sort_by(|a, b| b.y1.total_cmp(&a.y1).then(a.x0.total_cmp(&b.x0)));
}

/// Join sorted blocks into lines: spans with nearby tops are space-separated, lines by `\n`.
pub(crate) fn join_lines(blocks: &[TextBlock]) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_top: Option<f64> = None;

    for block in blocks {
        let text = block.text.trim();
        if text.is_empty() {
            continue;
        }
        match current_top {
            Some(top) if (block.y1 - top).abs() < LINE_TOLERANCE => current.push(text),
            _ => {
                if !current.is_empty() {
                    lines.push(current.join(" "));
                }
                current = vec![text];
            }
        }
        current_top = Some(block.y1);
    }
    if !current.is_empty() {
        lines.push(current.join(" "));
    }
    lines.join("\n")
}

/// Resolve the page's resource dictionary, following inherited `Parent` entries.
fn page_resources(document: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut current = document.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_PARENT_DEPTH {
        if let Ok(resources) = current.get(b"Resources") {
            return resolve(document, resources).and_then(|object| object.as_dict().ok());
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = document.get_dictionary(parent).ok()?;
    }
    None
}

fn is_image_xobject(document: &Document, resources: Option<&Dictionary>, name: &[u8]) -> bool {
    resources
        .and_then(|resources| resources.get(b"XObject").ok())
        .and_then(|xobjects| resolve(document, xobjects))
        .and_then(|xobjects| xobjects.as_dict().ok())
        .and_then(|xobjects| xobjects.get(name).ok())
        .and_then(|xobject| resolve(document, xobject))
        .and_then(|xobject| xobject.as_stream().ok())
        .and_then(|stream| stream.dict.get(b"Subtype").ok())
        .and_then(|subtype| subtype.as_name().ok())
        .is_some_and(|subtype| subtype == b"Image")
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Operation;

    fn block(text: &str, x0: f64, y1: f64) -> TextBlock {
        TextBlock {
            text: text.to_string(),
            page_number: 1,
            x0,
            y0: y1 - 10.0,
            x1: x0 + 10.0,
            y1,
            font_name: None,
            font_size: Some(10.0),
        }
    }

    fn at(x: f64, y: f64) -> Transform {
        Transform::row_major(1.0, 0.0, 0.0, 1.0, x, y)
    }

    /// Feed one shown string, one glyph every `advance` units from `x`.
    fn show(collector: &mut SpanCollector, text: &str, x: f64, y: f64, advance: f64) {
        collector.begin_word().expect("begin word");
        for (index, ch) in text.chars().enumerate() {
            let origin = at(x + index as f64 * advance, y);
            collector
                .output_character(&origin, advance / 10.0, 0.0, 10.0, &ch.to_string())
                .expect("glyph");
        }
        collector.end_word().expect("end word");
    }

    /// One-page document with `operations` as its content and `resources` on the page.
    fn document_with(operations: Vec<Operation>, resources: Dictionary) -> (Document, ObjectId) {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        let content = Content { operations }.encode().expect("encode");
        let content_id = document.add_object(Stream::new(dictionary! {}, content));
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources,
        });
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => Object::Integer(1),
            }),
        );
        (document, page_id)
    }

    fn image_stream() -> Stream {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => Object::Integer(1),
                "Height" => Object::Integer(1),
            },
            vec![0xFF, 0x00, 0x7F],
        )
    }

    #[test]
    fn reading_order_is_top_down_then_left_right() {
        let mut blocks = vec![
            block("bottom", 10.0, 100.0),
            block("right", 300.0, 700.0),
            block("left", 10.0, 700.0),
        ];
        sort_reading_order(&mut blocks);
        let order: Vec<&str> = blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(order, vec!["left", "right", "bottom"]);
    }

    #[test]
    fn nearby_spans_share_a_line() {
        let mut blocks = vec![
            block("Hello", 10.0, 700.0),
            block("world", 60.0, 698.0),
            block("Next line", 10.0, 680.0),
        ];
        sort_reading_order(&mut blocks);
        assert_eq!(join_lines(&blocks), "Hello world\nNext line");
    }

    #[test]
    fn glyphs_of_one_string_form_one_block() {
        let mut collector = SpanCollector::new(3);
        show(&mut collector, "Hi there", 72.0, 700.0, 5.0);
        let blocks = collector.finish();

        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(block.text, "Hi there");
        assert_eq!(block.page_number, 3);
        assert_eq!((block.x0, block.y0), (72.0, 700.0));
        assert_eq!(block.x1, 72.0 + 8.0 * 5.0);
        assert_eq!(block.y1, 710.0);
        assert_eq!(block.font_size, Some(10.0));
    }

    #[test]
    fn kerned_pieces_join_but_distant_strings_split() {
        let mut collector = SpanCollector::new(1);
        show(&mut collector, "Lec", 72.0, 700.0, 5.0);
        show(&mut collector, "ture", 87.5, 700.0, 5.0);
        show(&mut collector, "Aside", 300.0, 700.0, 5.0);
        let texts: Vec<String> = collector.finish().into_iter().map(|b| b.text).collect();
        assert_eq!(texts, vec!["Lecture", "Aside"]);
    }

    #[test]
    fn line_moves_close_the_span() {
        let mut collector = SpanCollector::new(1);
        show(&mut collector, "first", 72.0, 700.0, 5.0);
        collector.end_line().expect("end line");
        show(&mut collector, "second", 97.0, 700.0, 5.0);
        collector.end_line().expect("end line");
        show(&mut collector, "  ", 72.0, 650.0, 5.0);
        let texts: Vec<String> = collector.finish().into_iter().map(|b| b.text).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn summary_detects_shown_strings_and_images() {
        let resources = dictionary! {
            "XObject" => dictionary! {
                "Im1" => Object::Stream(image_stream()),
            },
        };
        let operations = vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "TJ",
                vec![Object::Array(vec![
                    Object::Integer(-120),
                    Object::string_literal("kerned"),
                ])],
            ),
            Operation::new("ET", vec![]),
            Operation::new("Do", vec![Object::Name(b"Im1".to_vec())]),
        ];
        let (document, page_id) = document_with(operations, resources);
        let summary = summarize_content(&document, page_id).expect("summary");
        assert_eq!(
            summary,
            ContentSummary {
                shows_text: true,
                has_images: true,
            }
        );

        let (document, page_id) = document_with(
            vec![Operation::new("Tj", vec![Object::string_literal("")])],
            Dictionary::new(),
        );
        let summary = summarize_content(&document, page_id).expect("summary");
        assert_eq!(summary, ContentSummary::default());
    }

    #[test]
    fn image_xobjects_become_empty_forms() {
        let mut document = Document::with_version("1.5");
        let image_id = document.add_object(image_stream());
        let text_id = document.add_object(Stream::new(dictionary! {}, b"BT ET".to_vec()));
        blank_image_xobjects(&mut document);

        let image = document
            .get_object(image_id)
            .and_then(Object::as_stream)
            .expect("stream");
        assert_eq!(
            image.dict.get(b"Subtype").and_then(Object::as_name).ok(),
            Some(&b"Form"[..])
        );
        assert!(image.content.is_empty());
        let text = document
            .get_object(text_id)
            .and_then(Object::as_stream)
            .expect("stream");
        assert_eq!(text.content, b"BT ET");
    }

    #[test]
    fn invalid_bytes_are_a_document_level_failure() {
        let error = PositionalStrategy
            .extract(b"definitely not a pdf")
            .unwrap_err();
        assert!(matches!(error, StrategyError::Open(_)));
    }
}
