//! Abbreviation-aware sentence splitting.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use super::Sentence;

/// `U.S.`, `e.g.`, `A.D.`
static DOTTED_ACRONYM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\p{L}\.){2,}$").expect("dotted acronym regex pattern is valid")
});

/// Default abbreviations that never end a sentence.
pub const DEFAULT_ABBREVIATIONS: &[&str] = &[
    "Mr.", "Mrs.", "Ms.", "Dr.", "Prof.", "Sr.", "Jr.", "St.", "Mt.", "vs.", "e.g.", "i.e.",
    "cf.", "Fig.", "No.", "Vol.", "pp.", "p.", "Ch.", "Jan.", "Feb.", "Mar.", "Apr.", "Jun.",
    "Jul.", "Aug.", "Sep.", "Sept.", "Oct.", "Nov.", "Dec.", "Ph.D.", "Inc.", "Ltd.", "Co.",
];

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '\u{201d}' | '\u{2019}')
}

fn is_opener(c: char) -> bool {
    matches!(c, '(' | '[' | '"' | '\'' | '\u{201c}' | '\u{2018}')
}

/// Splits text into sentences whose spans partition the input.
#[derive(Debug, Clone)]
pub struct SentenceSplitter {
    abbreviations: HashSet<String>,
}

impl Default for SentenceSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_ABBREVIATIONS.iter().copied())
    }
}

impl SentenceSplitter {
    /// Entries are matched case-sensitively; a missing trailing `.` is added.
    pub fn new<I, S>(abbreviations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let abbreviations = abbreviations
            .into_iter()
            .map(|a| {
                let a = a.as_ref().trim();
                if a.ends_with('.') {
                    a.to_string()
                } else {
                    format!("{a}.")
                }
            })
            .collect();
        Self { abbreviations }
    }

    /// Split `text` into sentences.
    ///
    /// Whitespace following a boundary belongs to the sentence before it, and
    /// leading whitespace belongs to the first sentence, so the spans cover the
    /// input exactly. Whitespace-only text has no sentences.
    pub fn split(&self, text: &str) -> Vec<Sentence> {
        let mut sentences = Vec::new();
        if text.trim().is_empty() {
            return sentences;
        }

        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut start = 0;
        let mut i = 0;

        while i < chars.len() {
            if !is_terminal(chars[i].1) {
                i += 1;
                continue;
            }

            let mut cluster_end = i + 1;
            while cluster_end < chars.len()
                && (is_terminal(chars[cluster_end].1) || is_closer(chars[cluster_end].1))
            {
                cluster_end += 1;
            }
            let mut next = cluster_end;
            while next < chars.len() && chars[next].1.is_whitespace() {
                next += 1;
            }

            let at_break = cluster_end == chars.len() || next > cluster_end;
            if at_break && !self.suppressed(text, &chars, i, next) {
                let end = chars.get(next).map_or(text.len(), |&(pos, _)| pos);
                sentences.push(Sentence::from_span(text, start, end));
                start = end;
            }
            i = cluster_end;
        }

        if start < text.len() {
            sentences.push(Sentence::from_span(text, start, text.len()));
        }
        sentences
    }

    /// Whether the terminal cluster at `cluster_start` does not end a sentence.
    /// `next` indexes the first non-whitespace char after the cluster.
    fn suppressed(
        &self,
        text: &str,
        chars: &[(usize, char)],
        cluster_start: usize,
        next: usize,
    ) -> bool {
        if chars.get(next).is_some_and(|&(_, c)| c.is_lowercase()) {
            return true;
        }
        if chars[cluster_start].1 != '.' {
            return false;
        }

        let mut token_start = cluster_start;
        while token_start > 0 && !chars[token_start - 1].1.is_whitespace() {
            token_start -= 1;
        }
        let dot = chars[cluster_start].0;
        let token = text[chars[token_start].0..=dot].trim_start_matches(is_opener);

        self.is_abbreviation(token)
    }

    /// `token` includes its trailing `.`.
    fn is_abbreviation(&self, token: &str) -> bool {
        if self.abbreviations.contains(token) {
            return true;
        }
        let mut letters = token.chars();
        let initial = matches!(
            (letters.next(), letters.next(), letters.next()),
            (Some(c), Some('.'), None) if c.is_uppercase()
        );
        initial || DOTTED_ACRONYM.is_match(token)
    }
}
