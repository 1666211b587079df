//! Choosing the best text among competing extractions.

pub mod score;

use serde::Serialize;

pub use score::{QualityScore, TextSignals, measure, score_text};

use crate::config::ScoringConfig;
use crate::error::ArbitrationError;

/// Raw text from one extraction method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub source_label: String,
    pub raw_text: String,
    pub page_count: Option<usize>,
}

impl Candidate {
    pub fn new(source_label: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            source_label: source_label.into(),
            raw_text: raw_text.into(),
            page_count: None,
        }
    }

    pub fn with_page_count(mut self, page_count: usize) -> Self {
        self.page_count = Some(page_count);
        self
    }

    /// Whitespace-only candidates are never selected.
    pub fn is_blank(&self) -> bool {
        self.raw_text.trim().is_empty()
    }
}

/// A candidate together with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: QualityScore,
    pub from_ocr: bool,
}

/// The winning extraction, passed by value downstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    #[serde(skip)]
    pub chosen_text: String,
    pub chosen_source_label: String,
    pub used_ocr: bool,
    pub score: QualityScore,
    pub page_count: Option<usize>,
}

/// Scores candidates and picks the best one.
///
/// Selection is deterministic: candidates are considered natives first in
/// the order given, then OCR, and a tie goes to the earlier candidate.
#[derive(Debug, Clone)]
pub struct Arbiter {
    config: ScoringConfig,
}

impl Arbiter {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn threshold(&self) -> f64 {
        self.config.quality_threshold
    }

    pub fn score(&self, candidate: &Candidate) -> QualityScore {
        score_text(&candidate.raw_text, &self.config)
    }

    pub fn assess(&self, candidate: Candidate, from_ocr: bool) -> ScoredCandidate {
        let score = self.score(&candidate);
        ScoredCandidate {
            candidate,
            score,
            from_ocr,
        }
    }

    /// True when no native candidate has text or the best one scores below
    /// the quality threshold.
    pub fn needs_ocr(&self, natives: &[ScoredCandidate]) -> bool {
        natives
            .iter()
            .filter(|s| !s.candidate.is_blank())
            .map(|s| s.score.value)
            .fold(None, |best: Option<f64>, v| Some(best.map_or(v, |b| b.max(v))))
            .is_none_or(|best| best < self.threshold())
    }

    /// Score every candidate and select the best.
    pub fn arbitrate(
        &self,
        candidates: Vec<Candidate>,
        ocr_candidate: Option<Candidate>,
    ) -> Result<ExtractionResult, ArbitrationError> {
        let natives: Vec<ScoredCandidate> = candidates
            .into_iter()
            .map(|c| self.assess(c, false))
            .collect();
        let ocr = ocr_candidate.map(|c| self.assess(c, true));
        self.select(natives, ocr)
    }

    /// Pick the best of already scored candidates.
    pub fn select(
        &self,
        natives: Vec<ScoredCandidate>,
        ocr: Option<ScoredCandidate>,
    ) -> Result<ExtractionResult, ArbitrationError> {
        let best = natives
            .into_iter()
            .chain(ocr)
            .filter(|s| !s.candidate.is_blank())
            .fold(None, |best: Option<ScoredCandidate>, next| match best {
                Some(current) if current.score.value >= next.score.value => Some(current),
                _ => Some(next),
            })
            .ok_or(ArbitrationError::EmptyExtraction { ocr_error: None })?;

        Ok(ExtractionResult {
            chosen_text: best.candidate.raw_text,
            chosen_source_label: best.candidate.source_label,
            used_ocr: best.from_ocr,
            score: best.score,
            page_count: best.candidate.page_count,
        })
    }
}

impl Default for Arbiter {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}
