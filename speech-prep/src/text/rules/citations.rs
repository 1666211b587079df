//! URL, e-mail and citation removal.

use once_cell::sync::Lazy;
use regex::Regex;

use super::line_pieces;
use crate::text::cleaner::{CleaningRule, Edited, RuleName};

// Trailing sentence punctuation is left in place so the sentence still ends.
static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[ \t]*(?:https?://|\bwww\.)[^\s]*[^\s.,;:!?)"']"#)
        .expect("URL regex pattern is valid")
});

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[ \t]*[\w.+-]+@[\w-]+(?:\.[\w-]+)*\.[A-Za-z]{2,}")
        .expect("e-mail regex pattern is valid")
});

/// `(Smith, 2019)`, `(Smith et al. 2019)`, `(Smith and Jones, 2019, p. 4)`
static AUTHOR_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[ \t]*\(\s*\p{Lu}[\p{L}'\u{2019}-]+(?:\s+et\s+al\.?|\s+(?:and|&)\s+\p{Lu}[\p{L}'\u{2019}-]+)?,?\s+\d{4}[a-z]?(?:,\s*(?:pp?\.\s*)?\d+(?:[-\u{2013}]\d+)?)?\s*\)",
    )
    .expect("author-year citation regex pattern is valid")
});

/// `(p. 12)`, `(pp. 12-14)`, `(p. iv)`
static PAGE_CITATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)[ \t]*\(\s*pp?\.\s*(?:\d+|[ivxlcdm]+)(?:\s*[-\u{2013}\u{2014}]\s*(?:\d+|[ivxlcdm]+))?\s*\)",
    )
    .expect("page citation regex pattern is valid")
});

static CITATION_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:ibid\.?|op\.\s*cit\.?|loc\.\s*cit\.?)(?:[\s,]|$)")
        .expect("citation line regex pattern is valid")
});

/// Strips things a listener cannot use: links, addresses and citations.
pub struct StripCitations;

impl CleaningRule for StripCitations {
    fn name(&self) -> RuleName {
        RuleName::StripCitations
    }

    fn apply(&self, text: &str) -> Edited {
        let mut edits = 0;
        let mut kept = String::with_capacity(text.len());
        for (content, piece) in line_pieces(text) {
            if CITATION_LINE.is_match(content) {
                edits += 1;
            } else {
                kept.push_str(piece);
            }
        }

        let mut text = kept;
        for pattern in [&*URL, &*EMAIL, &*AUTHOR_YEAR, &*PAGE_CITATION] {
            let found = pattern.find_iter(&text).count();
            if found > 0 {
                edits += found;
                text = pattern.replace_all(&text, "").into_owned();
            }
        }

        Edited::new(text, edits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(text: &str) -> String {
        StripCitations.apply(text).text
    }

    #[test]
    fn test_removes_urls_keeping_sentence_end() {
        assert_eq!(strip("See https://example.com/a?b=c."), "See.");
        assert_eq!(strip("Visit www.example.org for more"), "Visit for more");
    }

    #[test]
    fn test_removes_emails() {
        assert_eq!(strip("Write to jane.doe@example.co.uk today"), "Write to today");
    }

    #[test]
    fn test_removes_author_year_citations() {
        assert_eq!(strip("as argued (Smith, 2019)."), "as argued.");
        assert_eq!(strip("as argued (Smith et al. 2019b) here"), "as argued here");
        assert_eq!(
            strip("shown (Smith and Jones, 2001, pp. 4-9)."),
            "shown."
        );
    }

    #[test]
    fn test_removes_page_citations() {
        assert_eq!(strip("quoted (p. 12)."), "quoted.");
        assert_eq!(strip("quoted (pp. 12 - 14) here"), "quoted here");
        assert_eq!(strip("intro (p. iv)."), "intro.");
    }

    #[test]
    fn test_keeps_ordinary_parentheses() {
        let text = "He was born (in 1920) and left (Paris, France).";
        assert_eq!(strip(text), text);
    }

    #[test]
    fn test_drops_citation_shorthand_lines() {
        let text = "Body text.\nIbid., p. 4\nOp. cit. 12\nMore text.\n";
        assert_eq!(strip(text), "Body text.\nMore text.\n");
    }

    #[test]
    fn test_idempotent() {
        let text = "A (Smith, 2019) claim, see www.x.org. Mail a@b.com.\nIbid.\n";
        let once = strip(text);
        assert_eq!(strip(&once), once);
    }
}
