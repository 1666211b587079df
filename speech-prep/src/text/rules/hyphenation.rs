//! Rejoin words broken across lines by hyphenation.

use crate::text::cleaner::{CleaningRule, Edited, RuleName};

/// Hyphen-like characters that typesetting puts at a line break.
const BREAK_HYPHENS: &[char] = &['-', '\u{00ad}', '\u{2010}', '\u{2011}'];

/// Joins `frag-\nment` into `fragment`.
///
/// Only joins when a letter precedes the hyphen and the next line continues
/// in lowercase; `self-\nEsteem` and `pages 10-\n12` are left alone.
pub struct Dehyphenate;

impl CleaningRule for Dehyphenate {
    fn name(&self) -> RuleName {
        RuleName::Dehyphenate
    }

    fn apply(&self, text: &str) -> Edited {
        let chars: Vec<char> = text.chars().collect();
        let mut result = String::with_capacity(text.len());
        let mut edits = 0;
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            if BREAK_HYPHENS.contains(&c) && i > 0 && chars[i - 1].is_alphabetic() {
                if let Some(next) = lowercase_continuation(&chars, i + 1) {
                    edits += 1;
                    i = next;
                    continue;
                }
            }
            result.push(c);
            i += 1;
        }

        Edited::new(result, edits)
    }
}

/// Index of the first letter on the next line, if the hyphen at `start - 1`
/// ends its line and that letter is lowercase.
fn lowercase_continuation(chars: &[char], start: usize) -> Option<usize> {
    let mut j = skip_blanks(chars, start);
    if chars.get(j) != Some(&'\n') {
        return None;
    }
    j = skip_blanks(chars, j + 1);
    chars
        .get(j)
        .is_some_and(|c| c.is_lowercase())
        .then_some(j)
}

fn skip_blanks(chars: &[char], mut j: usize) -> usize {
    while j < chars.len() && matches!(chars[j], ' ' | '\t' | '\r') {
        j += 1;
    }
    j
}
