//! Whitespace canonicalization and paragraph reflow.

use crate::text::cleaner::{CleaningRule, Edited, RuleName};

/// Collapses runs of spaces and tabs, trims every line, and keeps at most one
/// blank line between paragraphs. Form feeds become line breaks. Leading and
/// trailing blank lines are dropped.
///
/// Edits are counted in lines changed or dropped.
pub struct CanonicalizeWhitespace;

impl CleaningRule for CanonicalizeWhitespace {
    fn name(&self) -> RuleName {
        RuleName::CanonicalizeWhitespace
    }

    fn apply(&self, text: &str) -> Edited {
        let mut result = String::with_capacity(text.len());
        let mut edits = 0;
        let mut pending_blanks: Vec<&str> = Vec::new();

        for line in text.split(['\n', '\u{000C}']) {
            let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
            if collapsed.is_empty() {
                pending_blanks.push(line);
                continue;
            }

            if result.is_empty() {
                edits += pending_blanks.len();
            } else {
                result.push('\n');
                if let Some((separator, dropped)) = pending_blanks.split_first() {
                    result.push('\n');
                    edits += dropped.len() + usize::from(!separator.is_empty());
                }
            }
            pending_blanks.clear();

            if collapsed != line {
                edits += 1;
            }
            result.push_str(&collapsed);
        }
        edits += pending_blanks.len();

        Edited::new(result, edits)
    }
}

/// Joins the lines of each paragraph into one line.
///
/// Paragraphs are separated by blank lines and come out separated by exactly
/// one. A line ending in a hyphen attached to a word or number joins the next
/// line without a space. Edits are counted in line breaks removed.
pub struct JoinWrappedLines;

impl CleaningRule for JoinWrappedLines {
    fn name(&self) -> RuleName {
        RuleName::JoinWrappedLines
    }

    fn apply(&self, text: &str) -> Edited {
        let mut paragraphs: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut edits = 0;

        for line in text.split('\n') {
            let line = line.trim();
            if line.is_empty() {
                if !current.is_empty() {
                    paragraphs.push(std::mem::take(&mut current));
                }
                continue;
            }

            if !current.is_empty() {
                edits += 1;
                if !ends_with_attached_hyphen(&current) {
                    current.push(' ');
                }
            }
            current.push_str(line);
        }
        if !current.is_empty() {
            paragraphs.push(current);
        }

        Edited::new(paragraphs.join("\n\n"), edits)
    }
}

fn ends_with_attached_hyphen(text: &str) -> bool {
    let mut tail = text.chars().rev();
    tail.next() == Some('-') && tail.next().is_some_and(char::is_alphanumeric)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_collapses_and_trims() {
        let edited = CanonicalizeWhitespace.apply("  Hello    world \t\nNext\tline  ");
        assert_eq!(edited.text, "Hello world\nNext line");
        assert_eq!(edited.edits, 2);
    }

    #[test]
    fn test_canonicalize_limits_blank_lines() {
        let text = "\n\n  \nFirst.\n\n\n \nSecond.\n\n";
        assert_eq!(CanonicalizeWhitespace.apply(text).text, "First.\n\nSecond.");
    }

    #[test]
    fn test_canonicalize_form_feed_is_a_line_break() {
        let text = "end of page\u{000C}start of next";
        assert_eq!(
            CanonicalizeWhitespace.apply(text).text,
            "end of page\nstart of next"
        );
    }

    #[test]
    fn test_canonicalize_blank_input() {
        assert_eq!(CanonicalizeWhitespace.apply("").text, "");
        assert_eq!(CanonicalizeWhitespace.apply(" \n\t\n ").text, "");
    }

    #[test]
    fn test_canonicalize_clean_text_has_no_edits() {
        let text = "One line.\n\nAnother paragraph.";
        let edited = CanonicalizeWhitespace.apply(text);
        assert_eq!(edited.text, text);
        assert_eq!(edited.edits, 0);
    }

    #[test]
    fn test_join_wrapped_lines() {
        let text = "The wagons rolled\nwest across the\nplains.\n\nA new paragraph\nbegins.";
        let edited = JoinWrappedLines.apply(text);
        assert_eq!(
            edited.text,
            "The wagons rolled west across the plains.\n\nA new paragraph begins."
        );
        assert_eq!(edited.edits, 3);
    }

    #[test]
    fn test_join_keeps_hyphenated_compounds() {
        assert_eq!(JoinWrappedLines.apply("self-\nEsteem").text, "self-Esteem");
        assert_eq!(JoinWrappedLines.apply("pages 10-\n12").text, "pages 10-12");
        assert_eq!(JoinWrappedLines.apply("an aside -\nlike this").text, "an aside - like this");
    }

    #[test]
    fn test_join_idempotent() {
        let text = "a\nb\n\n\nc\nd\n";
        let once = JoinWrappedLines.apply(text).text;
        assert_eq!(once, "a b\n\nc d");
        assert_eq!(JoinWrappedLines.apply(&once).text, once);
    }
}
