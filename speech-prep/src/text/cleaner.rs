//! Text cleaning and sanitization for TTS processing.
//!
//! Cleaning is an ordered list of independent rules. Each rule is a pure,
//! total function from text to text that only touches its own concern. The
//! order is fixed by registration: dehyphenation must see line breaks before
//! header stripping looks at whole lines, and whitespace is canonicalized
//! after every rule that can leave gaps behind.

use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};

use super::rules::{
    CanonicalizeWhitespace, Dehyphenate, JoinWrappedLines, NormalizeCharacters, RepairSpacing,
    StripCitations, StripFootnotes, StripHeaders,
};
use crate::config::CleanerConfig;
use crate::error::CleaningError;

/// Upper bound on re-applying a rule until its output is stable.
const MAX_PASSES: usize = 8;

/// Names of the registered cleaning rules, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleName {
    Dehyphenate,
    StripHeaders,
    StripFootnotes,
    StripCitations,
    NormalizeCharacters,
    RepairSpacing,
    CanonicalizeWhitespace,
    JoinWrappedLines,
}

impl RuleName {
    pub const ALL: [RuleName; 8] = [
        RuleName::Dehyphenate,
        RuleName::StripHeaders,
        RuleName::StripFootnotes,
        RuleName::StripCitations,
        RuleName::NormalizeCharacters,
        RuleName::RepairSpacing,
        RuleName::CanonicalizeWhitespace,
        RuleName::JoinWrappedLines,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleName::Dehyphenate => "dehyphenate",
            RuleName::StripHeaders => "strip_headers",
            RuleName::StripFootnotes => "strip_footnotes",
            RuleName::StripCitations => "strip_citations",
            RuleName::NormalizeCharacters => "normalize_characters",
            RuleName::RepairSpacing => "repair_spacing",
            RuleName::CanonicalizeWhitespace => "canonicalize_whitespace",
            RuleName::JoinWrappedLines => "join_wrapped_lines",
        }
    }

    /// Position of the rule in the cleaning order.
    pub fn position(&self) -> usize {
        Self::ALL.iter().position(|r| r == self).unwrap_or(usize::MAX)
    }

    /// Instantiate the rule with its configuration.
    pub fn build(&self, config: &CleanerConfig) -> Box<dyn CleaningRule> {
        match self {
            RuleName::Dehyphenate => Box::new(Dehyphenate),
            RuleName::StripHeaders => Box::new(StripHeaders::new(
                config.header_repetition_threshold,
                config.header_max_chars,
                config.header_window_lines,
            )),
            RuleName::StripFootnotes => Box::new(StripFootnotes),
            RuleName::StripCitations => Box::new(StripCitations),
            RuleName::NormalizeCharacters => Box::new(NormalizeCharacters),
            RuleName::RepairSpacing => Box::new(RepairSpacing),
            RuleName::CanonicalizeWhitespace => Box::new(CanonicalizeWhitespace),
            RuleName::JoinWrappedLines => Box::new(JoinWrappedLines),
        }
    }
}

impl std::fmt::Display for RuleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one rule pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edited {
    pub text: String,
    /// Number of edits made; the unit is rule specific (lines, markers, chars)
    pub edits: usize,
}

impl Edited {
    pub fn new(text: String, edits: usize) -> Self {
        Self { text, edits }
    }
}

/// A single normalization pass.
pub trait CleaningRule: Send + Sync {
    fn name(&self) -> RuleName;

    /// Apply one pass of the rule. Must never panic.
    ///
    /// A single pass need not be idempotent: line-dropping rules can expose
    /// new candidates. [`apply_rule`] repeats passes until the text is stable.
    fn apply(&self, text: &str) -> Edited;
}

/// Edits made by one rule during a `clean` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuleReport {
    pub rule: RuleName,
    pub edits: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanOutcome {
    pub text: String,
    pub reports: Vec<RuleReport>,
    /// Set when cleaning removed too much and the input was kept instead
    pub fell_back: bool,
    /// Fraction of non-whitespace input characters left after cleaning
    pub retained_ratio: f64,
}

/// Ordered set of enabled cleaning rules.
pub struct Cleaner {
    rules: Vec<Box<dyn CleaningRule>>,
    min_retained_ratio: f64,
}

impl Cleaner {
    pub fn new(config: &CleanerConfig) -> Self {
        let rules = RuleName::ALL
            .iter()
            .filter(|name| config.enabled_rules.contains(name))
            .map(|name| name.build(config))
            .collect();

        Self {
            rules,
            min_retained_ratio: config.min_retained_ratio,
        }
    }

    /// Names of the enabled rules in the order they run.
    pub fn rule_names(&self) -> Vec<RuleName> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Clean text for TTS processing by running every enabled rule in order.
    pub fn clean(&self, text: &str) -> Result<CleanOutcome, CleaningError> {
        let mut current = text.to_string();
        let mut reports = Vec::with_capacity(self.rules.len());

        for rule in &self.rules {
            let edited = apply_rule(rule.as_ref(), &current)?;
            log::debug!("{}: {} edits", rule.name(), edited.edits);
            reports.push(RuleReport {
                rule: rule.name(),
                edits: edited.edits,
            });
            current = edited.text;
        }

        let input_chars = count_visible(text);
        let retained_ratio = if input_chars == 0 {
            1.0
        } else {
            count_visible(&current) as f64 / input_chars as f64
        };

        if retained_ratio < self.min_retained_ratio {
            log::warn!(
                "cleaning kept {:.1}% of the text, falling back to whitespace cleanup only",
                retained_ratio * 100.0
            );
            let fallback = apply_rule(&CanonicalizeWhitespace, text)?;
            return Ok(CleanOutcome {
                text: fallback.text,
                reports,
                fell_back: true,
                retained_ratio,
            });
        }

        Ok(CleanOutcome {
            text: current,
            reports,
            fell_back: false,
            retained_ratio,
        })
    }
}

/// Apply a rule until its output stops changing.
///
/// A panicking rule is reported as `CleaningError::RuleFailed` naming the rule.
pub fn apply_rule(rule: &dyn CleaningRule, text: &str) -> Result<Edited, CleaningError> {
    let mut current = text.to_string();
    let mut edits = 0;

    for _ in 0..MAX_PASSES {
        let pass = panic::catch_unwind(AssertUnwindSafe(|| rule.apply(&current))).map_err(
            |payload| CleaningError::RuleFailed {
                rule: rule.name(),
                message: panic_message(payload.as_ref()),
            },
        )?;

        if pass.text == current {
            break;
        }
        edits += pass.edits;
        current = pass.text;
    }

    Ok(Edited::new(current, edits))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "rule panicked".to_string()
    }
}

fn count_visible(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::SentenceSplitter;
    use proptest::prelude::*;

    fn all_rules() -> Cleaner {
        Cleaner::new(&CleanerConfig::default())
    }

    struct Exploding;

    impl CleaningRule for Exploding {
        fn name(&self) -> RuleName {
            RuleName::RepairSpacing
        }

        fn apply(&self, _text: &str) -> Edited {
            panic!("index out of range")
        }
    }

    #[test]
    fn test_rules_run_in_registration_order() {
        let config = CleanerConfig {
            enabled_rules: vec![
                RuleName::JoinWrappedLines,
                RuleName::StripHeaders,
                RuleName::Dehyphenate,
            ],
            ..CleanerConfig::default()
        };
        let cleaner = Cleaner::new(&config);
        assert_eq!(
            cleaner.rule_names(),
            vec![
                RuleName::Dehyphenate,
                RuleName::StripHeaders,
                RuleName::JoinWrappedLines
            ]
        );
    }

    #[test]
    fn test_positions_follow_registration() {
        assert_eq!(RuleName::Dehyphenate.position(), 0);
        assert!(RuleName::Dehyphenate.position() < RuleName::StripHeaders.position());
        assert_eq!(RuleName::JoinWrappedLines.position(), 7);
    }

    #[test]
    fn test_clean_full_document() {
        let text = "The Emigra-\ntion Story\n\nIt w as a \u{201c}long\u{201d} road[1].\n\nThe Emigration Story\n\nThey left in 1848.\n\nThe Emigration Story\n";
        let outcome = all_rules().clean(text).unwrap();
        assert_eq!(
            outcome.text,
            "It was a \"long\" road.\n\nThey left in 1848."
        );
        assert!(!outcome.fell_back);

        let headers = outcome
            .reports
            .iter()
            .find(|r| r.rule == RuleName::StripHeaders)
            .unwrap();
        assert_eq!(headers.edits, 3);
    }

    #[test]
    fn test_clean_keeps_chapters_after_notes_section() {
        let text = "Chapter 1\nThe wagons left Missouri in May.\nNotes\n1. A note on wagons.\nChapter 2\nThe river crossing was dangerous and cold.\nChapter 3\nThey finally reached Oregon in the fall.\n";
        let outcome = all_rules().clean(text).unwrap();
        assert!(!outcome.fell_back);
        assert!(outcome.text.contains("Chapter 2"));
        assert!(outcome.text.contains("The river crossing was dangerous and cold."));
        assert!(outcome.text.contains("Chapter 3"));
        assert!(outcome.text.contains("They finally reached Oregon in the fall."));
        assert!(!outcome.text.contains("A note on wagons"));
    }

    #[test]
    fn test_dotted_abbreviations_survive_cleaning_and_splitting() {
        let splitter = SentenceSplitter::default();
        for text in [
            "She earned a Ph.D. in history. Then she left.",
            "Bring tools, e.g. a hammer. Then go.",
        ] {
            let outcome = all_rules().clean(text).unwrap();
            assert_eq!(outcome.text, text);
            let sentences: Vec<String> = splitter
                .split(&outcome.text)
                .into_iter()
                .map(|s| s.text)
                .collect();
            assert_eq!(sentences.len(), 2, "{sentences:?}");
        }
    }

    #[test]
    fn test_clean_empty_text() {
        let outcome = all_rules().clean("").unwrap();
        assert_eq!(outcome.text, "");
        assert!(!outcome.fell_back);
    }

    #[test]
    fn test_clean_falls_back_when_everything_is_removed() {
        let text = "Running Head\nRunning Head\nRunning Head\n";
        let config = CleanerConfig {
            enabled_rules: vec![RuleName::StripHeaders],
            ..CleanerConfig::default()
        };
        let outcome = Cleaner::new(&config).clean(text).unwrap();
        assert!(outcome.fell_back);
        assert_eq!(outcome.retained_ratio, 0.0);
        assert_eq!(outcome.text, "Running Head\nRunning Head\nRunning Head");
    }

    #[test]
    fn test_panicking_rule_is_reported_by_name() {
        let err = apply_rule(&Exploding, "text").unwrap_err();
        assert_eq!(
            err,
            CleaningError::RuleFailed {
                rule: RuleName::RepairSpacing,
                message: "index out of range".to_string(),
            }
        );
    }

    #[test]
    fn test_apply_rule_reaches_fixed_point() {
        // Removing the marker turns the line into a notes heading on the second pass.
        let once = apply_rule(&StripFootnotes, "Body text.\nNotes[2]\nfirst note\n").unwrap();
        assert_eq!(once.text, "Body text.\n");
        let twice = apply_rule(&StripFootnotes, &once.text).unwrap();
        assert_eq!(once.text, twice.text);
        assert_eq!(twice.edits, 0);
    }

    proptest! {
        #[test]
        fn prop_every_rule_is_idempotent(text in r"[A-Za-z0-9 .,;\n\[\]-]{0,80}") {
            let config = CleanerConfig::default();
            for name in RuleName::ALL {
                let rule = name.build(&config);
                let once = apply_rule(rule.as_ref(), &text).unwrap();
                let twice = apply_rule(rule.as_ref(), &once.text).unwrap();
                prop_assert_eq!(&once.text, &twice.text, "{} is not idempotent", name);
                prop_assert_eq!(twice.edits, 0);
            }
        }

        #[test]
        fn prop_clean_never_grows_visible_text(text in r"[A-Za-z .,\n-]{0,120}") {
            let outcome = all_rules().clean(&text).unwrap();
            prop_assert!(count_visible(&outcome.text) <= count_visible(&text));
        }
    }
}
