//! Sentence-aware chunking with overlap.
//!
//! [`Segmenter::segment`] makes a single forward pass over the sentences of the input:
//!
//! - a chunk is closed *before* a sentence that would push it past `max_chunk_size`;
//! - otherwise it is closed once it reaches `chunk_size_tokens`, unless it is still below
//!   `min_chunk_size` (the final chunk is always emitted);
//! - paragraph breaks right after a sentence are tracked as semantic boundaries and credited
//!   once per chunk that contains one.
//!
//! Chunks are staged first and frozen into [`TextSegment`]s after overlaps are resolved, so the
//! overlap strings shared by neighbouring segments are always identical.

pub mod sentences;
pub mod types;

use std::collections::BTreeSet;
use std::ops::Range;
use std::time::Instant;

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::processing::current_timestamp_rfc3339;
use crate::processing::types::{SegmentationError, SegmentationOptions};
use sentences::SentenceModelRegistry;
use types::{SegmentationResult, TextSegment};

/// Characters after a sentence end searched for a paragraph break.
const BOUNDARY_LOOKAHEAD_CHARS: usize = 10;
/// Approximate characters per token.
const CHARS_PER_TOKEN: usize = 4;

static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid paragraph break regex"));

/// Cheap token estimate: one token per four characters of trimmed text, at least one for
/// non-blank text.
pub fn estimate_token_count(text: &str) -> usize {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0;
    }
    (trimmed.chars().count() / CHARS_PER_TOKEN).max(1)
}

/// Splits text into overlapping, sentence-aligned chunks.
///
/// Sentence models come from [`SentenceModelRegistry::global`], the only state shared between
/// segmenters.
#[derive(Debug, Default, Clone, Copy)]
pub struct Segmenter;

#[derive(Debug)]
struct Sentence<'a> {
    text: &'a str,
    start_char: usize,
    tokens: usize,
}

#[derive(Debug)]
struct StagedSegment {
    sentences: Range<usize>,
    token_count: usize,
    has_semantic_boundary: bool,
}

impl Segmenter {
    /// Create a segmenter.
    pub fn new() -> Self {
        Self
    }

    /// Segment `text`. `options` defaults to [`SegmentationOptions::default`].
    pub fn segment(
        &self,
        text: &str,
        options: Option<&SegmentationOptions>,
    ) -> Result<SegmentationResult, SegmentationError> {
        let default_options;
        let options = match options {
            Some(options) => options,
            None => {
                default_options = SegmentationOptions::default();
                &default_options
            }
        };
        options.validate()?;

        let started = Instant::now();
        if text.trim().is_empty() {
            return Ok(SegmentationResult::empty(current_timestamp_rfc3339()));
        }

        let splitter = SentenceModelRegistry::global().get(&options.sentence_segmentation_model);
        let spans: Vec<Range<usize>> = splitter
            .sentence_spans(text)
            .into_iter()
            .filter(|span| text.get(span.clone()).is_some())
            .collect();
        let source_text_length = text.chars().count();

        if spans.is_empty() {
            let token_count = estimate_token_count(text);
            let segment = TextSegment {
                segment_id: segment_id(0, text),
                text: text.to_string(),
                start_char: 0,
                end_char: source_text_length,
                token_count,
                sentence_count: 1,
                has_semantic_boundary: false,
                overlap_with_previous: None,
                overlap_with_next: None,
            };
            return Ok(SegmentationResult::from_segments(
                vec![segment],
                1,
                0,
                source_text_length,
                elapsed_ms(started),
                current_timestamp_rfc3339(),
            ));
        }

        let sentences = locate_sentences(text, &spans);
        let boundaries = semantic_boundaries(text, &spans);
        let (staged, boundaries_used) = stage_segments(&sentences, &boundaries, options);
        let segments = freeze(&sentences, staged, options.overlap_percentage);

        tracing::debug!(
            model = splitter.name(),
            sentences = sentences.len(),
            segments = segments.len(),
            boundaries_used,
            "Text segmented"
        );
        Ok(SegmentationResult::from_segments(
            segments,
            sentences.len(),
            boundaries_used,
            source_text_length,
            elapsed_ms(started),
            current_timestamp_rfc3339(),
        ))
    }
}

fn locate_sentences<'a>(text: &'a str, spans: &[Range<usize>]) -> Vec<Sentence<'a>> {
    let mut sentences = Vec::with_capacity(spans.len());
    let mut byte_cursor = 0;
    let mut char_cursor = 0;
    for span in spans {
        // Splitters report ordered spans; anything else is located from the start again.
        if span.start < byte_cursor {
            byte_cursor = 0;
            char_cursor = 0;
        }
        char_cursor += text[byte_cursor..span.start].chars().count();
        byte_cursor = span.start;
        let sentence = &text[span.clone()];
        sentences.push(Sentence {
            text: sentence,
            start_char: char_cursor,
            tokens: estimate_token_count(sentence),
        });
    }
    sentences
}

/// Indices of sentences followed by a paragraph break within the lookahead window.
fn semantic_boundaries(text: &str, spans: &[Range<usize>]) -> BTreeSet<usize> {
    let break_positions: BTreeSet<usize> = PARAGRAPH_BREAK
        .find_iter(text)
        .flat_map(|found| [found.start(), found.end()])
        .collect();

    spans
        .iter()
        .enumerate()
        .filter(|(_, span)| {
            let window_end = text[span.end..]
                .char_indices()
                .nth(BOUNDARY_LOOKAHEAD_CHARS)
                .map_or(text.len(), |(offset, _)| span.end + offset);
            break_positions.range(span.end..window_end).next().is_some()
        })
        .map(|(index, _)| index)
        .collect()
}

fn stage_segments(
    sentences: &[Sentence<'_>],
    boundaries: &BTreeSet<usize>,
    options: &SegmentationOptions,
) -> (Vec<StagedSegment>, usize) {
    let mut staged = Vec::new();
    let mut boundaries_used = 0;
    let mut chunk_start = 0;
    let mut chunk_tokens = 0;
    let last = sentences.len() - 1;

    let mut close = |range: Range<usize>, tokens: usize, boundary_hit: bool| {
        let has_semantic_boundary = boundary_hit
            || (options.prefer_semantic_boundaries
                && boundaries.range(range.clone()).next().is_some());
        if has_semantic_boundary {
            boundaries_used += 1;
        }
        staged.push(StagedSegment {
            sentences: range,
            token_count: tokens,
            has_semantic_boundary,
        });
    };

    for (index, sentence) in sentences.iter().enumerate() {
        if index > chunk_start && chunk_tokens + sentence.tokens > options.max_chunk_size {
            close(chunk_start..index, chunk_tokens, false);
            chunk_start = index;
            chunk_tokens = 0;
        }

        chunk_tokens += sentence.tokens;
        let reached = chunk_tokens >= options.chunk_size_tokens;
        let is_last = index == last;
        if (reached && chunk_tokens >= options.min_chunk_size) || is_last {
            let boundary_hit =
                reached && options.prefer_semantic_boundaries && boundaries.contains(&index);
            close(chunk_start..index + 1, chunk_tokens, boundary_hit);
            chunk_start = index + 1;
            chunk_tokens = 0;
        }
    }

    (staged, boundaries_used)
}

fn freeze(
    sentences: &[Sentence<'_>],
    staged: Vec<StagedSegment>,
    overlap_percentage: f64,
) -> Vec<TextSegment> {
    let overlaps: Vec<Option<String>> = staged
        .iter()
        .map(|segment| {
            trailing_overlap(
                &sentences[segment.sentences.clone()],
                segment.token_count,
                overlap_percentage,
            )
        })
        .collect();

    staged
        .into_iter()
        .enumerate()
        .map(|(index, segment)| {
            let members = &sentences[segment.sentences.clone()];
            let text = members
                .iter()
                .map(|sentence| sentence.text)
                .collect::<Vec<_>>()
                .join(" ");
            let start_char = members.first().map_or(0, |sentence| sentence.start_char);
            let is_last = index + 1 == overlaps.len();
            TextSegment {
                segment_id: segment_id(index, &text),
                start_char,
                end_char: start_char + text.chars().count(),
                token_count: segment.token_count,
                sentence_count: members.len(),
                has_semantic_boundary: segment.has_semantic_boundary,
                overlap_with_previous: if index == 0 {
                    None
                } else {
                    overlaps[index - 1].clone()
                },
                overlap_with_next: if is_last {
                    None
                } else {
                    overlaps[index].clone()
                },
                text,
            }
        })
        .collect()
}

/// Trailing sentences of a chunk whose tokens fit within `floor(token_count × percentage)`.
fn trailing_overlap(
    members: &[Sentence<'_>],
    token_count: usize,
    overlap_percentage: f64,
) -> Option<String> {
    let budget = (token_count as f64 * overlap_percentage).floor() as usize;
    if budget == 0 {
        return None;
    }

    let mut used = 0;
    let mut taken = 0;
    for sentence in members.iter().rev() {
        if used + sentence.tokens > budget {
            break;
        }
        used += sentence.tokens;
        taken += 1;
    }
    if taken == 0 {
        return None;
    }
    Some(
        members[members.len() - taken..]
            .iter()
            .map(|sentence| sentence.text)
            .collect::<Vec<_>>()
            .join(" "),
    )
}

fn segment_id(index: usize, text: &str) -> String {
    let digest = hex::encode(Sha256::digest(text.as_bytes()));
    format!("seg_{index:04}_{}", &digest[..8])
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
