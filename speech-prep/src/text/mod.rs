//! Text processing for TTS: cleaning, sentence splitting and chunking.

pub mod chunker;
pub mod cleaner;
pub mod rules;
pub mod sentences;
pub mod stats;

use serde::Serialize;

pub use chunker::{ChunkLimits, ChunkPlan, Chunker, pack, verify_coverage};
pub use cleaner::{CleanOutcome, Cleaner, CleaningRule, Edited, RuleName, RuleReport};
pub use sentences::SentenceSplitter;
pub use stats::TextStats;

/// A sentence of cleaned text.
///
/// `start_offset..end_offset` is a byte range into the cleaned text. Ranges of
/// consecutive sentences are contiguous: whitespace after a sentence boundary
/// belongs to the sentence before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sentence {
    pub start_offset: usize,
    pub end_offset: usize,
    /// The span with surrounding whitespace trimmed
    pub text: String,
    /// Length of `text` in characters
    pub char_length: usize,
}

impl Sentence {
    /// Build a sentence from a span of `source`.
    pub fn from_span(source: &str, start_offset: usize, end_offset: usize) -> Self {
        let text = source[start_offset..end_offset].trim().to_string();
        let char_length = text.chars().count();
        Self {
            start_offset,
            end_offset,
            text,
            char_length,
        }
    }
}

/// A chunk of text ready for TTS processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// 0-based position in document order
    pub index: usize,
    /// The text content (trimmed slice of the cleaned text)
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    /// Number of whole sentences in the chunk
    pub sentence_count: usize,
    /// Length of `text` in characters
    pub char_length: usize,
    /// A single sentence longer than the configured maximum
    pub over_length: bool,
}
