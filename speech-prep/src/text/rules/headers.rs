//! Running header, footer and page-number removal.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use super::{STRUCTURAL_HEADING, line_pieces};
use crate::text::cleaner::{CleaningRule, Edited, RuleName};

static DIGIT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+").expect("digit run regex pattern is valid"));

static ROMAN_NUMERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^m{0,3}(?:cm|cd|d?c{0,3})(?:xc|xl|l?x{0,3})(?:ix|iv|v?i{0,3})$")
        .expect("roman numeral regex pattern is valid")
});

/// `The Image as Guide / 17` or `20 / The Hero`.
static SLASH_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d{1,4}[ \t]+/[ \t]+\S.*|.*\S[ \t]+/[ \t]+\d{1,4})$")
        .expect("slash heading regex pattern is valid")
});

/// Removes short lines that repeat nearby in the document.
///
/// Lines are compared by a normalized key: lowercase, whitespace collapsed,
/// and digit runs replaced by `#`. A line made of a roman numeral alone is
/// also keyed `#`. "The Hero 12" and "The Hero 13" share a key, and every
/// bare page number shares the key `#`. A line is removed when its key occurs
/// at least `repetition_threshold` times within `window_lines` lines on
/// either side of it.
///
/// Chapter, part and book headings are never removed, and neither are lines
/// that end like a sentence. Slash headings that pair a title with a page
/// number are removed wherever they appear.
pub struct StripHeaders {
    repetition_threshold: usize,
    max_chars: usize,
    window_lines: usize,
}

impl StripHeaders {
    pub fn new(repetition_threshold: usize, max_chars: usize, window_lines: usize) -> Self {
        Self {
            repetition_threshold,
            max_chars,
            window_lines,
        }
    }

    /// The normalized key of a line, or `None` if it cannot be a header.
    fn header_key(&self, line: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.chars().count() > self.max_chars {
            return None;
        }
        // Sentence-like lines are content even when they repeat
        if trimmed.ends_with(|c: char| matches!(c, '.' | '!' | '?' | ':' | ';')) {
            return None;
        }
        if STRUCTURAL_HEADING.is_match(trimmed) {
            return None;
        }

        let lower = trimmed.to_lowercase();
        if ROMAN_NUMERAL.is_match(&lower) {
            return Some("#".to_string());
        }
        let words: Vec<&str> = lower.split_whitespace().collect();
        Some(DIGIT_RUN.replace_all(&words.join(" "), "#").into_owned())
    }

    fn is_slash_heading(&self, line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.chars().count() <= self.max_chars
            && trimmed.chars().any(char::is_alphabetic)
            && SLASH_HEADING.is_match(trimmed)
    }

    /// How many of the sorted `lines` fall within the window around `line`.
    fn occurrences_near(&self, lines: &[usize], line: usize) -> usize {
        let first = line.saturating_sub(self.window_lines);
        let last = line.saturating_add(self.window_lines);
        lines.partition_point(|&l| l <= last) - lines.partition_point(|&l| l < first)
    }
}

impl CleaningRule for StripHeaders {
    fn name(&self) -> RuleName {
        RuleName::StripHeaders
    }

    fn apply(&self, text: &str) -> Edited {
        let pieces: Vec<(Option<String>, &str, &str)> = line_pieces(text)
            .map(|(content, piece)| (self.header_key(content), content, piece))
            .collect();

        // Line numbers of each key, ascending
        let mut positions: HashMap<&str, Vec<usize>> = HashMap::new();
        for (line, (key, _, _)) in pieces.iter().enumerate() {
            if let Some(key) = key {
                positions.entry(key.as_str()).or_default().push(line);
            }
        }

        let mut result = String::with_capacity(text.len());
        let mut removed = 0;
        for (line, (key, content, piece)) in pieces.iter().enumerate() {
            let repeated = key
                .as_deref()
                .and_then(|k| positions.get(k))
                .is_some_and(|lines| self.occurrences_near(lines, line) >= self.repetition_threshold);
            if repeated || self.is_slash_heading(content) {
                removed += 1;
            } else {
                result.push_str(piece);
            }
        }

        Edited::new(result, removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(text: &str) -> Edited {
        StripHeaders::new(3, 80, 300).apply(text)
    }

    #[test]
    fn test_removes_running_header_with_page_numbers() {
        let text = "THE HERO 12\nFirst page text.\nTHE HERO 13\nSecond page text.\nTHE HERO 14\nThird page text.\n";
        let edited = strip(text);
        assert_eq!(
            edited.text,
            "First page text.\nSecond page text.\nThird page text.\n"
        );
        assert_eq!(edited.edits, 3);
    }

    #[test]
    fn test_removes_bare_page_numbers() {
        let text = "Body one.\n17\nBody two.\n18\u{000C}Body three.\nxix\nBody four.\n";
        let edited = strip(text);
        assert_eq!(
            edited.text,
            "Body one.\nBody two.\nBody three.\nBody four.\n"
        );
        assert_eq!(edited.edits, 3);
    }

    #[test]
    fn test_keeps_lines_below_threshold() {
        let text = "Interlude\nSome text.\nInterlude\nMore text.\n";
        assert_eq!(strip(text).text, text);
    }

    #[test]
    fn test_keeps_repeated_sentences() {
        let text = "Yes.\nYes.\nYes.\nNo!\nNo!\nNo!\n";
        assert_eq!(strip(text).text, text);
    }

    #[test]
    fn test_keeps_long_repeated_lines() {
        let line = "a".repeat(81);
        let text = format!("{line}\n{line}\n{line}\n");
        assert_eq!(StripHeaders::new(3, 80, 300).apply(&text).text, text);
    }

    #[test]
    fn test_header_key_normalization() {
        let rule = StripHeaders::new(3, 80, 300);
        assert_eq!(rule.header_key("  The   Hero 12 "), Some("the hero #".to_string()));
        assert_eq!(rule.header_key("Page 12 of 300"), Some("page # of #".to_string()));
        assert_eq!(rule.header_key("xix"), Some("#".to_string()));
        assert_eq!(rule.header_key("The mix"), Some("the mix".to_string()));
        assert_eq!(rule.header_key("The civ"), Some("the civ".to_string()));
        assert_eq!(rule.header_key("Chapter IV"), None);
        assert_eq!(rule.header_key("A sentence."), None);
        assert_eq!(rule.header_key("   "), None);
    }

    #[test]
    fn test_chapter_headings_are_kept() {
        let text = "Chapter 1\nText one.\nChapter 2\nText two.\nChapter 3\nText three.\n";
        let edited = strip(text);
        assert_eq!(edited.text, text);
        assert_eq!(edited.edits, 0);
    }

    #[test]
    fn test_words_that_read_as_numerals_keep_their_key() {
        let text = "The mix\nOne.\nThe civ\nTwo.\nThe mi\nThree.\n";
        assert_eq!(strip(text).text, text);
    }

    #[test]
    fn test_repetition_is_counted_within_window() {
        let rule = StripHeaders::new(3, 80, 4);

        let spread = "Running Head\na.\nb.\nc.\nd.\nRunning Head\ne.\nf.\ng.\nh.\nRunning Head\n";
        assert_eq!(rule.apply(spread).text, spread);

        let close = "Running Head\na.\nRunning Head\nb.\nRunning Head\nc.\n";
        let edited = rule.apply(close);
        assert_eq!(edited.text, "a.\nb.\nc.\n");
        assert_eq!(edited.edits, 3);
    }

    #[test]
    fn test_removes_slash_headings() {
        let text = "The Image as Guide / 17\nBody text.\n20 / The Hero\nMore body.\nWe split it 1 / 2 ways.\n";
        let edited = strip(text);
        assert_eq!(edited.text, "Body text.\nMore body.\nWe split it 1 / 2 ways.\n");
        assert_eq!(edited.edits, 2);
        assert_eq!(strip("Ratio 3/4\n").text, "Ratio 3/4\n");
    }

    #[test]
    fn test_idempotent() {
        let text = "Title\n1\nText here.\nTitle\n2\nMore text\nTitle\n3\n";
        let once = strip(text).text;
        assert_eq!(strip(&once).text, once);
    }
}
