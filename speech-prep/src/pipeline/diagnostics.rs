//! Structured, non-fatal events recorded during a document run.

use serde::Serialize;
use std::fmt;

use crate::error::Stage;
use crate::text::RuleName;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DiagnosticKind {
    ExtractorFailed { extractor: String, error: String },
    CandidateScored { source: String, score: f64 },
    OcrInvoked { best_native_score: Option<f64> },
    OcrUnavailable,
    OcrFailed { error: String },
    OcrTimedOut { timeout_secs: f64 },
    CandidateSelected { source: String, score: f64, used_ocr: bool },
    RuleApplied { rule: RuleName, edits: usize },
    CleaningFallback { retained_ratio: f64 },
    OverLengthChunks { count: usize },
    ChunksProduced { chunks: usize, sentences: usize },
}

impl DiagnosticKind {
    fn is_warning(&self) -> bool {
        matches!(
            self,
            DiagnosticKind::ExtractorFailed { .. }
                | DiagnosticKind::OcrUnavailable
                | DiagnosticKind::OcrFailed { .. }
                | DiagnosticKind::OcrTimedOut { .. }
                | DiagnosticKind::CleaningFallback { .. }
                | DiagnosticKind::OverLengthChunks { .. }
        )
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::ExtractorFailed { extractor, error } => {
                write!(f, "extractor {extractor} failed: {error}")
            }
            DiagnosticKind::CandidateScored { source, score } => {
                write!(f, "{source} scored {score:.3}")
            }
            DiagnosticKind::OcrInvoked { best_native_score } => match best_native_score {
                Some(score) => write!(f, "best native score {score:.3} is below threshold, running OCR"),
                None => write!(f, "no native text, running OCR"),
            },
            DiagnosticKind::OcrUnavailable => {
                write!(f, "OCR needed but no OCR provider is configured")
            }
            DiagnosticKind::OcrFailed { error } => write!(f, "OCR failed: {error}"),
            DiagnosticKind::OcrTimedOut { timeout_secs } => {
                write!(f, "OCR timed out after {timeout_secs}s")
            }
            DiagnosticKind::CandidateSelected {
                source,
                score,
                used_ocr,
            } => {
                let via = if *used_ocr { " (OCR)" } else { "" };
                write!(f, "selected {source}{via} with score {score:.3}")
            }
            DiagnosticKind::RuleApplied { rule, edits } => {
                write!(f, "{rule} made {edits} edits")
            }
            DiagnosticKind::CleaningFallback { retained_ratio } => write!(
                f,
                "cleaning kept only {:.1}% of the text, used whitespace cleanup only",
                retained_ratio * 100.0
            ),
            DiagnosticKind::OverLengthChunks { count } => {
                write!(f, "{count} sentence(s) exceed the chunk limit and were kept whole")
            }
            DiagnosticKind::ChunksProduced { chunks, sentences } => {
                write!(f, "{sentences} sentences packed into {chunks} chunks")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub stage: Stage,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.kind)
    }
}

/// Diagnostics of one document run, in the order they were recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and log it.
    pub fn record(&mut self, stage: Stage, kind: DiagnosticKind) {
        let diagnostic = Diagnostic { stage, kind };
        if diagnostic.kind.is_warning() {
            log::warn!("{diagnostic}");
        } else {
            log::info!("{diagnostic}");
        }
        self.entries.push(diagnostic);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Diagnostics recorded by `stage`.
    pub fn for_stage(&self, stage: Stage) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.stage == stage)
    }

    /// Whether any diagnostic matches `predicate`.
    pub fn any(&self, predicate: impl Fn(&DiagnosticKind) -> bool) -> bool {
        self.entries.iter().any(|d| predicate(&d.kind))
    }
}
