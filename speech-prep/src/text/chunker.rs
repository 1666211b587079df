//! Text chunking for TTS processing.
//!
//! Chunks are whole runs of sentences. A chunk's span runs from the start of
//! its first sentence to the end of its last, so the spans of all chunks
//! partition the cleaned text and its `text` is that span trimmed.

use std::collections::HashSet;
use std::ops::Range;

use super::sentences::SentenceSplitter;
use super::{Chunk, Sentence};
use crate::config::ChunkerConfig;
use crate::error::ChunkingError;

/// Default maximum chunk size in characters.
pub const DEFAULT_MAX_CHARS: usize = 2000;

/// Default minimum size of the final chunk in characters.
pub const DEFAULT_MIN_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLimits {
    pub max_chars: usize,
    pub min_chars: usize,
}

impl Default for ChunkLimits {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            min_chars: DEFAULT_MIN_CHARS,
        }
    }
}

/// Sentences and the chunks packed from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    pub sentences: Vec<Sentence>,
    pub chunks: Vec<Chunk>,
}

impl ChunkPlan {
    /// Chunks holding a single sentence longer than the maximum.
    pub fn over_length_count(&self) -> usize {
        self.chunks.iter().filter(|c| c.over_length).count()
    }
}

/// Sentence splitting plus packing, configured once.
#[derive(Debug, Clone)]
pub struct Chunker {
    splitter: SentenceSplitter,
    limits: ChunkLimits,
}

impl Chunker {
    pub fn new(config: &ChunkerConfig) -> Self {
        Self {
            splitter: SentenceSplitter::new(&config.abbreviations),
            limits: ChunkLimits {
                max_chars: config.max_chars,
                min_chars: config.min_chars,
            },
        }
    }

    pub fn limits(&self) -> ChunkLimits {
        self.limits
    }

    /// Split cleaned text into sentences and pack them into verified chunks.
    pub fn chunk(&self, text: &str) -> Result<ChunkPlan, ChunkingError> {
        let sentences = self.splitter.split(text);
        let chunks = pack(text, &sentences, self.limits);
        verify_coverage(text, &sentences, &chunks)?;
        Ok(ChunkPlan { sentences, chunks })
    }
}

/// Greedily pack sentences into chunks of at most `max_chars` characters.
///
/// A sentence longer than `max_chars` becomes a chunk of its own and is
/// flagged `over_length`; it is never split. A final chunk shorter than
/// `min_chars` is merged into the previous one when the result still fits,
/// or else takes trailing sentences from it while both stay within limits.
pub fn pack(text: &str, sentences: &[Sentence], limits: ChunkLimits) -> Vec<Chunk> {
    let mut groups: Vec<Range<usize>> = Vec::new();
    let mut current: Option<Range<usize>> = None;

    for i in 0..sentences.len() {
        current = match current.take() {
            None => Some(i..i + 1),
            Some(group) => {
                let extended = group.start..i + 1;
                if span_chars(text, sentences, &extended) <= limits.max_chars {
                    Some(extended)
                } else {
                    groups.push(group);
                    Some(i..i + 1)
                }
            }
        };
    }
    if let Some(group) = current {
        groups.push(group);
    }

    merge_short_tail(text, sentences, &mut groups, limits);

    groups
        .into_iter()
        .enumerate()
        .map(|(index, group)| build_chunk(text, sentences, index, group, limits.max_chars))
        .collect()
}

fn merge_short_tail(
    text: &str,
    sentences: &[Sentence],
    groups: &mut Vec<Range<usize>>,
    limits: ChunkLimits,
) {
    if groups.len() < 2 {
        return;
    }
    let last = groups.len() - 1;
    if span_chars(text, sentences, &groups[last]) >= limits.min_chars {
        return;
    }

    let merged = groups[last - 1].start..groups[last].end;
    if span_chars(text, sentences, &merged) <= limits.max_chars {
        groups.truncate(last - 1);
        groups.push(merged);
        return;
    }

    // Borrow trailing sentences from the previous chunk.
    while span_chars(text, sentences, &groups[last]) < limits.min_chars
        && groups[last - 1].len() > 1
    {
        let prev = groups[last - 1].start..groups[last - 1].end - 1;
        let tail = prev.end..groups[last].end;
        if span_chars(text, sentences, &tail) > limits.max_chars
            || span_chars(text, sentences, &prev) < limits.min_chars
        {
            break;
        }
        groups[last - 1] = prev;
        groups[last] = tail;
    }
}

/// Byte span covered by a run of sentences.
fn byte_span(sentences: &[Sentence], group: &Range<usize>) -> Range<usize> {
    sentences[group.start].start_offset..sentences[group.end - 1].end_offset
}

/// Characters in the trimmed text of a run of sentences.
fn span_chars(text: &str, sentences: &[Sentence], group: &Range<usize>) -> usize {
    text[byte_span(sentences, group)].trim().chars().count()
}

fn build_chunk(
    text: &str,
    sentences: &[Sentence],
    index: usize,
    group: Range<usize>,
    max_chars: usize,
) -> Chunk {
    let span = byte_span(sentences, &group);
    let chunk_text = text[span.clone()].trim().to_string();
    let char_length = chunk_text.chars().count();
    let sentence_count = group.len();

    Chunk {
        index,
        text: chunk_text,
        start_offset: span.start,
        end_offset: span.end,
        sentence_count,
        char_length,
        over_length: sentence_count == 1 && char_length > max_chars,
    }
}

/// Check that `chunks` cover `text` exactly and only break between sentences.
///
/// Spans must be contiguous from the start to the end of the text, each chunk
/// text must be its trimmed span, and every chunk must end where a sentence
/// ends. Any failure means content was lost or duplicated.
pub fn verify_coverage(
    text: &str,
    sentences: &[Sentence],
    chunks: &[Chunk],
) -> Result<(), ChunkingError> {
    let violation = |message: String| Err(ChunkingError::InvariantViolation(message));

    if chunks.is_empty() {
        if text.trim().is_empty() {
            return Ok(());
        }
        return violation("no chunks for non-empty text".to_string());
    }

    let sentence_ends: HashSet<usize> = sentences.iter().map(|s| s.end_offset).collect();
    let mut expected_start = 0;
    let mut sentence_total = 0;

    for (i, chunk) in chunks.iter().enumerate() {
        if chunk.index != i {
            return violation(format!("chunk at position {i} has index {}", chunk.index));
        }
        if chunk.start_offset != expected_start {
            return violation(format!(
                "chunk {i} starts at byte {} but the previous chunk ended at {expected_start}",
                chunk.start_offset
            ));
        }
        let Some(span) = text.get(chunk.start_offset..chunk.end_offset) else {
            return violation(format!(
                "chunk {i} span {}..{} is not a valid range of the text",
                chunk.start_offset, chunk.end_offset
            ));
        };
        if chunk.text.is_empty() || span.trim() != chunk.text {
            return violation(format!("chunk {i} text does not match its span"));
        }
        if !sentence_ends.contains(&chunk.end_offset) {
            return violation(format!("chunk {i} ends inside a sentence"));
        }
        expected_start = chunk.end_offset;
        sentence_total += chunk.sentence_count;
    }

    if expected_start != text.len() {
        return violation(format!(
            "chunks end at byte {expected_start} of {}",
            text.len()
        ));
    }
    if sentence_total != sentences.len() {
        return violation(format!(
            "chunks hold {sentence_total} sentences but the text has {}",
            sentences.len()
        ));
    }

    Ok(())
}
