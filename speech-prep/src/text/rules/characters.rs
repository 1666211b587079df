//! Unicode normalization for TTS input.

use crate::text::cleaner::{CleaningRule, Edited, RuleName};

/// Characters that can cause TTS issues and their replacements.
const PROBLEMATIC_CHARS: &[(char, &str)] = &[
    ('\u{2018}', "'"),   // Left single quote
    ('\u{2019}', "'"),   // Right single quote
    ('\u{201a}', "'"),   // Single low-9 quote
    ('\u{201b}', "'"),   // Single high-reversed-9 quote
    ('\u{2032}', "'"),   // Prime
    ('\u{2035}', "'"),   // Reversed prime
    ('\u{2039}', "'"),   // Single left-pointing angle quote
    ('\u{203a}', "'"),   // Single right-pointing angle quote
    ('\u{201c}', "\""),  // Left double quote
    ('\u{201d}', "\""),  // Right double quote
    ('\u{201e}', "\""),  // Double low-9 quote
    ('\u{201f}', "\""),  // Double high-reversed-9 quote
    ('\u{2033}', "\""),  // Double prime
    ('\u{00ab}', "\""),  // Left-pointing double angle quote
    ('\u{00bb}', "\""),  // Right-pointing double angle quote
    ('\u{2010}', "-"),   // Hyphen
    ('\u{2011}', "-"),   // Non-breaking hyphen
    ('\u{2012}', "-"),   // Figure dash
    ('\u{2013}', "-"),   // En dash
    ('\u{2212}', "-"),   // Minus sign
    ('\u{2014}', " - "), // Em dash
    ('\u{2015}', " - "), // Horizontal bar
    ('\u{2026}', "..."), // Ellipsis
    ('\u{fb00}', "ff"),  // Ligatures
    ('\u{fb01}', "fi"),
    ('\u{fb02}', "fl"),
    ('\u{fb03}', "ffi"),
    ('\u{fb04}', "ffl"),
    ('\u{fb06}', "st"),
    ('\u{00a0}', " "), // Non-breaking space
    ('\u{2007}', " "), // Figure space
    ('\u{202f}', " "), // Narrow no-break space
    ('\u{3000}', " "), // Ideographic space
    ('\u{00ad}', ""),  // Soft hyphen
    ('\u{200b}', ""),  // Zero-width space
    ('\u{200c}', ""),  // Zero-width non-joiner
    ('\u{200d}', ""),  // Zero-width joiner
    ('\u{2060}', ""),  // Word joiner
    ('\u{feff}', ""),  // BOM
    ('\u{fffd}', ""),  // Replacement character
];

/// Maps typographic characters to plain equivalents and drops invisible ones.
///
/// Line endings are normalized to `\n`; other control characters except tab
/// and form feed are removed.
pub struct NormalizeCharacters;

impl CleaningRule for NormalizeCharacters {
    fn name(&self) -> RuleName {
        RuleName::NormalizeCharacters
    }

    fn apply(&self, text: &str) -> Edited {
        let mut result = String::with_capacity(text.len());
        let mut edits = 0;
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '\r' {
                // \r\n and a lone \r both become \n
                chars.next_if_eq(&'\n');
                result.push('\n');
                edits += 1;
                continue;
            }

            let replacement = PROBLEMATIC_CHARS
                .iter()
                .find(|(ch, _)| *ch == c)
                .map(|(_, r)| *r)
                .or_else(|| is_wide_space(c).then_some(" "));

            if let Some(r) = replacement {
                result.push_str(r);
                edits += 1;
            } else if is_allowed_char(c) {
                result.push(c);
            } else {
                edits += 1;
            }
        }

        Edited::new(result, edits)
    }
}

/// En quad through hair space.
fn is_wide_space(c: char) -> bool {
    ('\u{2000}'..='\u{200a}').contains(&c)
}

fn is_allowed_char(c: char) -> bool {
    matches!(c, '\n' | '\t' | '\u{000C}') || !c.is_control()
}
