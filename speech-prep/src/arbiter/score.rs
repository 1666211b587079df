//! Extraction quality scoring.
//!
//! A score is a weighted sum of four signals measured on the raw text:
//!
//! - mean word length, 1.0 inside the ideal range and decaying proportionally
//!   outside it (garbled text has short "words", merged text long ones)
//! - alphabetic characters over non-whitespace characters
//! - spacing regularity, the fraction of gaps between words that contain no
//!   doubled horizontal whitespace and at most two line breaks
//! - control and replacement character density, as a penalty
//!
//! ```text
//! value = clamp(w_len*len + w_alpha*alpha + w_space*space - w_ctrl*min(1, density*10), 0, 1)
//! ```

use serde::Serialize;

use crate::config::ScoringConfig;

/// Control density at which the penalty saturates is `1 / CONTROL_AMPLIFICATION`.
const CONTROL_AMPLIFICATION: f64 = 10.0;

/// Raw measurements a score is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TextSignals {
    pub word_count: usize,
    pub mean_word_length: f64,
    pub alpha_ratio: f64,
    pub spacing_regularity: f64,
    pub control_density: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityScore {
    /// Combined score in `[0, 1]`
    pub value: f64,
    pub signals: TextSignals,
}

fn is_penalized(c: char) -> bool {
    c == '\u{fffd}' || (c.is_control() && !matches!(c, '\n' | '\t' | '\r' | '\u{000C}'))
}

fn is_horizontal_space(c: char) -> bool {
    c.is_whitespace() && !matches!(c, '\n' | '\r' | '\u{000C}')
}

/// Measure the signals of `text` in a single pass.
pub fn measure(text: &str) -> TextSignals {
    let mut total = 0usize;
    let mut visible = 0usize;
    let mut alphabetic = 0usize;
    let mut penalized = 0usize;

    let mut word_count = 0usize;
    let mut in_word = false;

    let mut gaps = 0usize;
    let mut regular_gaps = 0usize;
    let mut gap_newlines = 0usize;
    let mut gap_doubled = false;
    let mut prev_horizontal = false;

    for c in text.chars() {
        total += 1;
        if is_penalized(c) {
            penalized += 1;
        }

        if c.is_whitespace() {
            if in_word {
                in_word = false;
                gap_newlines = 0;
                gap_doubled = false;
                prev_horizontal = false;
            }
            if c == '\n' {
                gap_newlines += 1;
            }
            let horizontal = is_horizontal_space(c);
            if horizontal && prev_horizontal {
                gap_doubled = true;
            }
            prev_horizontal = horizontal;
            continue;
        }

        visible += 1;
        if c.is_alphabetic() {
            alphabetic += 1;
        }
        if !in_word {
            if word_count > 0 {
                gaps += 1;
                if !gap_doubled && gap_newlines <= 2 {
                    regular_gaps += 1;
                }
            }
            word_count += 1;
            in_word = true;
        }
    }

    let ratio = |part: usize, whole: usize| {
        if whole == 0 {
            0.0
        } else {
            part as f64 / whole as f64
        }
    };

    TextSignals {
        word_count,
        mean_word_length: ratio(visible, word_count),
        alpha_ratio: ratio(alphabetic, visible),
        spacing_regularity: if gaps == 0 {
            1.0
        } else {
            ratio(regular_gaps, gaps)
        },
        control_density: ratio(penalized, total),
    }
}

/// 1.0 inside `[min, max]`, proportionally less outside.
fn word_length_component(mean: f64, min: f64, max: f64) -> f64 {
    if mean <= 0.0 {
        0.0
    } else if mean < min {
        mean / min
    } else if mean > max {
        max / mean
    } else {
        1.0
    }
}

/// Score `text` with the given weights. Blank text scores 0.
pub fn score_text(text: &str, config: &ScoringConfig) -> QualityScore {
    let signals = measure(text);
    if signals.word_count == 0 {
        return QualityScore {
            value: 0.0,
            signals,
        };
    }

    let length = word_length_component(
        signals.mean_word_length,
        config.ideal_word_length_min,
        config.ideal_word_length_max,
    );
    let control = (signals.control_density * CONTROL_AMPLIFICATION).min(1.0);

    let value = config.word_length_weight * length
        + config.alpha_ratio_weight * signals.alpha_ratio
        + config.spacing_weight * signals.spacing_regularity
        - config.control_penalty_weight * control;

    QualityScore {
        value: value.clamp(0.0, 1.0),
        signals,
    }
}
