//! The individual cleaning rules, in registration order.

use once_cell::sync::Lazy;
use regex::Regex;

mod characters;
mod citations;
mod footnotes;
mod headers;
mod hyphenation;
mod spacing;
mod whitespace;

pub use characters::NormalizeCharacters;
pub use citations::StripCitations;
pub use footnotes::StripFootnotes;
pub use headers::StripHeaders;
pub use hyphenation::Dehyphenate;
pub use spacing::RepairSpacing;
pub use whitespace::{CanonicalizeWhitespace, JoinWrappedLines};

/// A chapter, part or book heading. Never a running header, and the end of
/// any notes section before it.
pub(crate) static STRUCTURAL_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:chapter|part|book)\s+(?:\d+|[ivxlcdm]+|one|two|three|four|five|six|seven|eight|nine|ten)\b",
    )
    .expect("structural heading regex pattern is valid")
});

/// Split text into lines that keep their terminator (`\n` or a form feed).
///
/// Concatenating the pieces gives back the input, so line-dropping rules can
/// remove a piece without disturbing its neighbours.
pub(crate) fn line_pieces(text: &str) -> impl Iterator<Item = (&str, &str)> {
    text.split_inclusive(is_line_break).map(|piece| {
        let content = piece.strip_suffix(is_line_break).unwrap_or(piece);
        (content, piece)
    })
}

fn is_line_break(c: char) -> bool {
    c == '\n' || c == '\u{000C}'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_pieces_round_trip() {
        let text = "one\ntwo\u{000C}three\n";
        let pieces: Vec<_> = line_pieces(text).collect();
        assert_eq!(
            pieces,
            vec![
                ("one", "one\n"),
                ("two", "two\u{000C}"),
                ("three", "three\n")
            ]
        );
        let rebuilt: String = pieces.iter().map(|(_, piece)| *piece).collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_structural_headings() {
        assert!(STRUCTURAL_HEADING.is_match("Chapter 12"));
        assert!(STRUCTURAL_HEADING.is_match("  PART IV: The Return"));
        assert!(STRUCTURAL_HEADING.is_match("Book One"));
        assert!(!STRUCTURAL_HEADING.is_match("Chapters of history"));
        assert!(!STRUCTURAL_HEADING.is_match("Part of the road"));
    }

    #[test]
    fn test_line_pieces_without_trailing_break() {
        let pieces: Vec<_> = line_pieces("a\nb").collect();
        assert_eq!(pieces, vec![("a", "a\n"), ("b", "b")]);
    }
}
