//! Spacing repair for text that went through PDF extraction.
//!
//! Extractors that position glyphs individually tend to produce two kinds of
//! damage: common short words split apart ("w as", "t he") and neighbouring
//! words run together ("endThe", "over.Then"). Both are repaired here with
//! fixed patterns; nothing is guessed from a dictionary beyond the table.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::text::cleaner::{CleaningRule, Edited, RuleName};

/// Broken forms of frequent words, as (leading fragment, rest).
///
/// Neither fragment pair may read as two real words, so "a re" is included
/// but "a n" is not.
const BROKEN_WORDS: &[(&str, &str)] = &[
    ("t", "he"),
    ("w", "as"),
    ("i", "s"),
    ("a", "re"),
    ("h", "as"),
    ("h", "ad"),
    ("w", "ith"),
    ("f", "rom"),
    ("t", "hat"),
    ("t", "his"),
    ("w", "ere"),
    ("h", "ave"),
    ("b", "een"),
    ("w", "hat"),
    ("a", "nd"),
    ("f", "or"),
    ("n", "ot"),
    ("b", "ut"),
    ("o", "f"),
    ("i", "n"),
    ("t", "o"),
    ("a", "t"),
    ("o", "n"),
    ("i", "t"),
    ("a", "s"),
    ("b", "y"),
    ("m", "y"),
    ("w", "e"),
    ("h", "e"),
    ("m", "e"),
    ("n", "o"),
    ("d", "o"),
    ("i", "f"),
];

static BROKEN_WORD: Lazy<Regex> = Lazy::new(|| {
    let alternatives: Vec<String> = BROKEN_WORDS
        .iter()
        .map(|(head, rest)| format!("{head}[ \\t]+{rest}"))
        .collect();
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|")))
        .expect("broken word regex pattern is valid")
});

static SPLIT_AT_BLANKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+").expect("blank run regex pattern is valid"));

pub struct RepairSpacing;

impl CleaningRule for RepairSpacing {
    fn name(&self) -> RuleName {
        RuleName::RepairSpacing
    }

    fn apply(&self, text: &str) -> Edited {
        let (mut text, mut edits) = split_run_together(text);

        // A merge can complete another pair: `t h e` -> `t he` -> `the`
        loop {
            let found = BROKEN_WORD.find_iter(&text).count();
            if found == 0 {
                break;
            }
            edits += found;
            text = BROKEN_WORD
                .replace_all(&text, |caps: &regex::Captures| {
                    SPLIT_AT_BLANKS.replace_all(&caps[0], "").into_owned()
                })
                .into_owned();
        }

        Edited::new(text, edits)
    }
}

/// Insert the space that is missing between run-together words, sentences
/// and clauses. Returns the new text and the number of spaces inserted.
fn split_run_together(text: &str) -> (String, usize) {
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len() + 16);
    let mut inserted = 0;

    for (at, &c) in chars.iter().enumerate() {
        if at >= 2 && needs_space(&chars, at) {
            result.push(' ');
            inserted += 1;
        }
        result.push(c);
    }

    (result, inserted)
}

/// Whether a space is missing between `chars[at - 1]` and `chars[at]`.
fn needs_space(chars: &[char], at: usize) -> bool {
    let (before, last, next) = (chars[at - 2], chars[at - 1], chars[at]);
    match last {
        // `over.Then` but not `U.S.A`, `Ph.D.` or `e.g.Smith`
        '.' => before.is_lowercase() && next.is_uppercase() && !in_dotted_abbreviation(chars, at),
        '!' | '?' => before.is_lowercase() && next.is_uppercase(),
        // `red,green` but not `1,000`
        ',' | ';' => before.is_alphabetic() && next.is_alphabetic(),
        // `endThe` but not `iPhone` or `McDonald`
        _ => before.is_lowercase() && last.is_lowercase() && next.is_uppercase(),
    }
}

/// The period before `chars[at]` sits in a dotted form: another period one
/// letter earlier (`e.g.`) or right after the next letter (`Ph.D.`).
fn in_dotted_abbreviation(chars: &[char], at: usize) -> bool {
    let dot_before = at >= 3 && chars[at - 3] == '.';
    let dot_after = chars.get(at + 1) == Some(&'.');
    dot_before || dot_after
}
