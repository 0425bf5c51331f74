//! Sentence splitting models and the process-wide model registry.
//!
//! Splitters report byte ranges into the text they were given, so callers can locate sentences
//! without re-searching the source. The registry is the only shared mutable state in the
//! pipeline: models are built on first request and handed out as `Arc`s afterwards.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use unicode_segmentation::UnicodeSegmentation;

/// Identifier of the Unicode (UAX #29) sentence model.
pub const UAX29_MODEL: &str = "uax29";
/// Identifier of the punctuation-driven fallback model.
pub const RULE_BASED_MODEL: &str = "rule_based";

/// Splits text into sentences.
pub trait SentenceSplitter: Send + Sync {
    /// Model identifier.
    fn name(&self) -> &str;

    /// Byte ranges of the trimmed, non-empty sentences of `text`, in order and non-overlapping.
    fn sentence_spans(&self, text: &str) -> Vec<Range<usize>>;
}

/// Unicode sentence boundaries. Single line breaks inside a paragraph are treated as spaces so
/// wrapped lines do not become sentences of their own.
#[derive(Debug, Default, Clone, Copy)]
pub struct Uax29Splitter;

impl SentenceSplitter for Uax29Splitter {
    fn name(&self) -> &str {
        UAX29_MODEL
    }

    fn sentence_spans(&self, text: &str) -> Vec<Range<usize>> {
        let unwrapped = join_wrapped_lines(text);
        let mut spans = Vec::new();
        for (offset, sentence) in unwrapped.split_sentence_bound_indices() {
            push_trimmed(text, offset..offset + sentence.len(), &mut spans);
        }
        spans
    }
}

/// Splits after runs of `.`, `!` or `?` (plus closing quotes and brackets) that are followed by
/// whitespace, and at paragraph breaks.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBasedSplitter;

impl SentenceSplitter for RuleBasedSplitter {
    fn name(&self) -> &str {
        RULE_BASED_MODEL
    }

    fn sentence_spans(&self, text: &str) -> Vec<Range<usize>> {
        let mut spans = Vec::new();
        let mut start = 0;
        let mut chars = text.char_indices().peekable();
        while let Some((index, ch)) = chars.next() {
            match ch {
                '.' | '!' | '?' => {
                    let mut end = index + ch.len_utf8();
                    while let Some(&(next_index, next)) = chars.peek() {
                        if !matches!(next, '.' | '!' | '?' | '"' | '\'' | ')' | ']') {
                            break;
                        }
                        end = next_index + next.len_utf8();
                        chars.next();
                    }
                    if chars.peek().is_none_or(|(_, next)| next.is_whitespace()) {
                        push_trimmed(text, start..end, &mut spans);
                        start = end;
                    }
                }
                '\n' if is_paragraph_newline(text.as_bytes(), index) => {
                    push_trimmed(text, start..index, &mut spans);
                    start = index;
                }
                _ => {}
            }
        }
        push_trimmed(text, start..text.len(), &mut spans);
        spans
    }
}

/// Replace line breaks that are not part of a blank-line paragraph break with spaces. Both are
/// single bytes, so byte offsets into the result are valid for the input.
fn join_wrapped_lines(text: &str) -> String {
    let bytes = text.as_bytes();
    text.char_indices()
        .map(|(index, ch)| {
            if ch == '\n' && !is_paragraph_newline(bytes, index) {
                ' '
            } else {
                ch
            }
        })
        .collect()
}

fn is_paragraph_newline(bytes: &[u8], index: usize) -> bool {
    let blank = |byte: &&u8| matches!(**byte, b' ' | b'\t' | b'\r');
    let before = bytes[..index].iter().rev().find(|byte| !blank(byte));
    let after = bytes[index + 1..].iter().find(|byte| !blank(byte));
    before == Some(&b'\n') || after == Some(&b'\n')
}

fn push_trimmed(text: &str, range: Range<usize>, spans: &mut Vec<Range<usize>>) {
    let slice = &text[range.clone()];
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        return;
    }
    let leading = slice.len() - slice.trim_start().len();
    let start = range.start + leading;
    spans.push(start..start + trimmed.len());
}

/// Lazily populated cache of sentence models keyed by identifier.
///
/// Lookups of loaded models take the read lock only. A miss upgrades to the write lock and
/// re-checks before building, so concurrent first use builds each model exactly once.
pub struct SentenceModelRegistry {
    models: RwLock<HashMap<String, Arc<dyn SentenceSplitter>>>,
    loads: AtomicUsize,
}

impl Default for SentenceModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SentenceModelRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            models: RwLock::new(HashMap::new()),
            loads: AtomicUsize::new(0),
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static SentenceModelRegistry {
        static REGISTRY: OnceLock<SentenceModelRegistry> = OnceLock::new();
        REGISTRY.get_or_init(SentenceModelRegistry::new)
    }

    /// Model registered under `model`, building it on first use.
    ///
    /// Unknown identifiers resolve to the rule-based splitter, cached under the requested key.
    pub fn get(&self, model: &str) -> Arc<dyn SentenceSplitter> {
        if let Some(splitter) = self
            .models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(model)
        {
            return Arc::clone(splitter);
        }

        let mut models = self.models.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(splitter) = models.get(model) {
            return Arc::clone(splitter);
        }
        let splitter = build_model(model);
        self.loads.fetch_add(1, Ordering::Relaxed);
        models.insert(model.to_string(), Arc::clone(&splitter));
        splitter
    }

    /// Install (or replace) the splitter used for `model`.
    pub fn register(&self, model: impl Into<String>, splitter: Arc<dyn SentenceSplitter>) {
        self.models
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(model.into(), splitter);
    }

    /// Number of models built on demand so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

fn build_model(model: &str) -> Arc<dyn SentenceSplitter> {
    match model {
        UAX29_MODEL => Arc::new(Uax29Splitter),
        RULE_BASED_MODEL => Arc::new(RuleBasedSplitter),
        unknown => {
            tracing::warn!(
                model = unknown,
                fallback = RULE_BASED_MODEL,
                "Unknown sentence model; using rule-based splitter"
            );
            Arc::new(RuleBasedSplitter)
        }
    }
}
