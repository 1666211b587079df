//! Footnote markers, footnote text and reference-list removal.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::{STRUCTURAL_HEADING, line_pieces};
use crate::text::cleaner::{CleaningRule, Edited, RuleName};

/// `word[12]`, `word [1, 2]`, `end.[4-6]`. Repeated markers are taken together.
static BRACKET_MARKERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"([\p{L}\p{N}.,;:!?)'\u{2019}\u{201d}])(?:[ \t]?\[\d{1,3}(?:\s*[,\u{2013}-]\s*\d{1,3})*\])+",
    )
    .expect("bracket marker regex pattern is valid")
});

/// A note number jammed after sentence punctuation: `the end.12 Next`.
/// Only removed when the next word is capitalized, checked by the caller.
static JAMMED_NOTE_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\p{L}[.!?,;:]["'\u{2019}\u{201d}]?)\d{1,3}(\s+)"#)
        .expect("jammed note number regex pattern is valid")
});

static REFERENCE_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:references|notes|endnotes|footnotes|bibliography|works\s+cited|sources)\s*:?\s*$",
    )
    .expect("reference heading regex pattern is valid")
});

/// A line that opens a footnote: `1. Smith, op. cit.`, `12) See`, `\u{2020} Died`.
static NOTE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[ \t]*(?:\d{1,3}[.)]|[*\u{2020}\u{2021}])[ \t]+\S")
        .expect("note line regex pattern is valid")
});

const PAGE_BREAK: char = '\u{000C}';

/// Footnotes start within this many lines of the bottom of a page.
const NOTE_ZONE_LINES: usize = 14;

/// Longest standalone note line, in words, outside paged text.
const MAX_NOTE_LINE_WORDS: usize = 14;

fn is_superscript_marker(c: char) -> bool {
    matches!(
        c,
        '\u{00b9}' | '\u{00b2}' | '\u{00b3}' | '\u{2070}' | '\u{2074}'..='\u{2079}' | '\u{2020}' | '\u{2021}'
    )
}

/// Strips footnote markers attached to words, the footnote text itself and
/// reference lists.
///
/// Paged text (with form feeds) loses the note block at the bottom of each
/// page. Unpaged text loses short note lines that follow a blank line.
pub struct StripFootnotes;

impl CleaningRule for StripFootnotes {
    fn name(&self) -> RuleName {
        RuleName::StripFootnotes
    }

    fn apply(&self, text: &str) -> Edited {
        let (text, mut edits) = remove_reference_blocks(text);

        let mut markers = 0;
        let text = BRACKET_MARKERS.replace_all(&text, |caps: &Captures| {
            markers += 1;
            caps[1].to_string()
        });

        let (text, superscripts) = remove_superscript_markers(&text);

        let mut jammed = 0;
        let text = JAMMED_NOTE_NUMBER
            .replace_all(&text, |caps: &Captures| {
                let end = caps.get(0).map_or(text.len(), |m| m.end());
                let capitalized_next = text[end..].chars().next().is_some_and(char::is_uppercase);
                if capitalized_next {
                    jammed += 1;
                    format!("{}{}", &caps[1], &caps[2])
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned();

        let (text, notes) = if text.contains(PAGE_BREAK) {
            remove_page_notes(&text)
        } else {
            remove_note_lines(&text)
        };

        edits += markers + superscripts + jammed + notes;
        Edited::new(text, edits)
    }
}

/// Drop superscript digits and daggers that hang off a word or punctuation.
fn remove_superscript_markers(text: &str) -> (String, usize) {
    let mut result = String::with_capacity(text.len());
    let mut removed = 0;
    let mut attached = false;

    for c in text.chars() {
        if is_superscript_marker(c) && attached {
            removed += 1;
            continue;
        }
        attached = !(c.is_whitespace() || c.is_ascii_digit() || is_superscript_marker(c));
        result.push(c);
    }

    (result, removed)
}

/// Remove reference lists: from a heading line such as "References" or "Notes"
/// up to the next chapter/part heading or the end of the text.
fn remove_reference_blocks(text: &str) -> (String, usize) {
    let mut result = String::with_capacity(text.len());
    let mut removed = 0;
    let mut in_block = false;

    for (content, piece) in line_pieces(text) {
        if in_block && STRUCTURAL_HEADING.is_match(content) {
            in_block = false;
        }
        if !in_block && REFERENCE_HEADING.is_match(content) {
            in_block = true;
        }
        if in_block {
            removed += 1;
        } else {
            result.push_str(piece);
        }
    }

    (result, removed)
}

/// Cut each page from the first note line in its last lines to the page end.
/// The first line of a page is never cut.
fn remove_page_notes(text: &str) -> (String, usize) {
    let mut result = String::with_capacity(text.len());
    let mut removed = 0;

    for page in text.split_inclusive(PAGE_BREAK) {
        let (body, page_break) = match page.strip_suffix(PAGE_BREAK) {
            Some(body) => (body, &page[body.len()..]),
            None => (page, ""),
        };
        let lines: Vec<&str> = body.split_inclusive('\n').collect();
        let zone_start = lines.len().saturating_sub(NOTE_ZONE_LINES).max(1);
        let cut = (zone_start..lines.len())
            .find(|&i| NOTE_LINE.is_match(lines[i]))
            .unwrap_or(lines.len());

        removed += lines.len() - cut;
        for line in &lines[..cut] {
            result.push_str(line);
        }
        result.push_str(page_break);
    }

    (result, removed)
}

/// Drop short, finished note lines that start after a blank line, along with
/// the note lines directly below them.
fn remove_note_lines(text: &str) -> (String, usize) {
    let mut result = String::with_capacity(text.len());
    let mut removed = 0;
    let mut after_blank = true;

    for (content, piece) in line_pieces(text) {
        let trimmed = content.trim();
        if after_blank && is_note_line(trimmed) {
            removed += 1;
            continue;
        }
        after_blank = trimmed.is_empty();
        result.push_str(piece);
    }

    (result, removed)
}

fn is_note_line(line: &str) -> bool {
    NOTE_LINE.is_match(line)
        && line.split_whitespace().count() <= MAX_NOTE_LINE_WORDS
        && line.ends_with(|c: char| matches!(c, '.' | '!' | '?' | ')'))
}
