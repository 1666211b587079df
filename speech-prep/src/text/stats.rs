//! Size and duration estimates for cleaned text.

use serde::Serialize;

/// Average silent reading speed.
pub const READING_WORDS_PER_MINUTE: f64 = 200.0;

/// Average speaking rate of a TTS voice.
pub const SPEAKING_WORDS_PER_MINUTE: f64 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TextStats {
    pub characters: usize,
    pub words: usize,
    pub paragraphs: usize,
    pub reading_minutes: f64,
    pub audio_minutes: f64,
}

impl TextStats {
    pub fn from_text(text: &str) -> Self {
        let words = text.split_whitespace().count();
        let paragraphs = text.split("\n\n").filter(|p| !p.trim().is_empty()).count();

        Self {
            characters: text.chars().count(),
            words,
            paragraphs,
            reading_minutes: words as f64 / READING_WORDS_PER_MINUTE,
            audio_minutes: words as f64 / SPEAKING_WORDS_PER_MINUTE,
        }
    }
}
