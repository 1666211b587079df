//! Document pipeline: extraction, arbitration, optional OCR, cleaning and
//! chunking.
//!
//! A run is sequential per document. Extractors run concurrently, candidates
//! are scored on blocking tasks, and OCR is called under a timeout only when
//! the native text is missing or poor. Recoverable problems become
//! diagnostics; anything that would lose content aborts the run.

pub mod diagnostics;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};

use futures_util::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::arbiter::{Arbiter, Candidate, ExtractionResult, ScoredCandidate};
use crate::config::PrepConfig;
use crate::error::{ArbitrationError, CleaningError, OcrError, Result, Stage};
use crate::extract::{self, Document, DocumentKind, Extractor, OcrProvider};
use crate::text::{Chunk, Chunker, Cleaner, TextStats};

/// Everything a document run produces.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub extraction: ExtractionResult,
    #[serde(skip)]
    pub cleaned_text: String,
    pub chunks: Vec<Chunk>,
    pub stats: TextStats,
    pub diagnostics: Diagnostics,
}

/// Configured pipeline. Cheap to clone; collaborators are shared.
#[derive(Clone)]
pub struct Pipeline {
    arbiter: Arbiter,
    cleaner: Arc<Cleaner>,
    chunker: Arc<Chunker>,
    extractors: Vec<Arc<dyn Extractor>>,
    ocr: Option<Arc<dyn OcrProvider>>,
    ocr_timeout: Duration,
}

impl Pipeline {
    /// Create a pipeline without extractors, using the configured OCR command.
    pub fn new(config: &PrepConfig) -> Self {
        Self {
            arbiter: Arbiter::new(config.scoring.clone()),
            cleaner: Arc::new(Cleaner::new(&config.cleaner)),
            chunker: Arc::new(Chunker::new(&config.chunker)),
            extractors: Vec::new(),
            ocr: extract::create_ocr(&config.ocr),
            ocr_timeout: config.ocr.timeout(),
        }
    }

    /// Create a pipeline with the extractors configured for `kind`.
    pub fn from_config(config: &PrepConfig, kind: DocumentKind) -> Self {
        let mut pipeline = Self::new(config);
        pipeline.extractors = extract::create_extractors(config, kind);
        pipeline
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    pub fn with_ocr(mut self, ocr: Arc<dyn OcrProvider>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    pub fn with_ocr_timeout(mut self, timeout: Duration) -> Self {
        self.ocr_timeout = timeout;
        self
    }

    /// Labels of the registered extractors, in order.
    pub fn extractor_labels(&self) -> Vec<&str> {
        self.extractors.iter().map(|e| e.label()).collect()
    }

    /// Run every extractor on the document, then process the candidates.
    pub async fn run(&self, document: &Document) -> Result<PipelineOutput> {
        let mut diagnostics = Diagnostics::new();

        let results = join_all(self.extractors.iter().map(|e| e.extract(document))).await;
        let mut candidates = Vec::with_capacity(results.len());
        for (extractor, result) in self.extractors.iter().zip(results) {
            match result {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => diagnostics.record(
                    Stage::Extraction,
                    DiagnosticKind::ExtractorFailed {
                        extractor: extractor.label().to_string(),
                        error: e.to_string(),
                    },
                ),
            }
        }

        self.process_with(candidates, document, diagnostics).await
    }

    /// Process candidates that were already extracted.
    ///
    /// `document` is only read if OCR is needed.
    pub async fn process(
        &self,
        candidates: Vec<Candidate>,
        document: &Document,
    ) -> Result<PipelineOutput> {
        self.process_with(candidates, document, Diagnostics::new())
            .await
    }

    /// Run one pipeline per document concurrently. Results are in input order.
    pub async fn run_batch(&self, documents: &[Document]) -> Vec<Result<PipelineOutput>> {
        join_all(documents.iter().map(|document| self.run(document))).await
    }

    async fn process_with(
        &self,
        candidates: Vec<Candidate>,
        document: &Document,
        mut diagnostics: Diagnostics,
    ) -> Result<PipelineOutput> {
        let extraction = self
            .arbitrate(candidates, document, &mut diagnostics)
            .await?;

        let outcome = self.cleaner.clean(&extraction.chosen_text)?;
        for report in outcome.reports.iter().filter(|r| r.edits > 0) {
            diagnostics.record(
                Stage::Cleaning,
                DiagnosticKind::RuleApplied {
                    rule: report.rule,
                    edits: report.edits,
                },
            );
        }
        if outcome.fell_back {
            diagnostics.record(
                Stage::Cleaning,
                DiagnosticKind::CleaningFallback {
                    retained_ratio: outcome.retained_ratio,
                },
            );
        }
        if outcome.text.trim().is_empty() {
            return Err(CleaningError::NothingLeft.into());
        }

        let plan = self.chunker.chunk(&outcome.text)?;
        let over_length = plan.over_length_count();
        if over_length > 0 {
            diagnostics.record(
                Stage::Chunking,
                DiagnosticKind::OverLengthChunks { count: over_length },
            );
        }
        diagnostics.record(
            Stage::Chunking,
            DiagnosticKind::ChunksProduced {
                chunks: plan.chunks.len(),
                sentences: plan.sentences.len(),
            },
        );

        let stats = TextStats::from_text(&outcome.text);
        Ok(PipelineOutput {
            extraction,
            cleaned_text: outcome.text,
            chunks: plan.chunks,
            stats,
            diagnostics,
        })
    }

    /// Score native candidates, run OCR if they are not good enough, and
    /// select the winner.
    async fn arbitrate(
        &self,
        candidates: Vec<Candidate>,
        document: &Document,
        diagnostics: &mut Diagnostics,
    ) -> std::result::Result<ExtractionResult, ArbitrationError> {
        let natives = self.score_all(candidates, false).await?;
        for scored in &natives {
            record_scored(diagnostics, scored);
        }

        let mut ocr_scored = None;
        let mut ocr_error = None;
        if self.arbiter.needs_ocr(&natives) {
            let best_native_score = natives
                .iter()
                .filter(|s| !s.candidate.is_blank())
                .map(|s| s.score.value)
                .reduce(f64::max);

            match self.try_ocr(document, best_native_score, diagnostics).await {
                Ok(candidate) => {
                    if candidate.is_blank() {
                        ocr_error = Some("OCR returned no text".to_string());
                    }
                    ocr_scored = self.score_all(vec![candidate], true).await?.pop();
                    if let Some(scored) = &ocr_scored {
                        record_scored(diagnostics, scored);
                    }
                }
                Err(cause) => ocr_error = Some(cause),
            }
        }

        let extraction = self
            .arbiter
            .select(natives, ocr_scored)
            .map_err(|e| match e {
                ArbitrationError::EmptyExtraction { .. } => {
                    ArbitrationError::EmptyExtraction { ocr_error }
                }
                other => other,
            })?;
        diagnostics.record(
            Stage::Arbitration,
            DiagnosticKind::CandidateSelected {
                source: extraction.chosen_source_label.clone(),
                score: extraction.score.value,
                used_ocr: extraction.used_ocr,
            },
        );
        Ok(extraction)
    }

    /// Score candidates concurrently on blocking tasks, keeping their order.
    async fn score_all(
        &self,
        candidates: Vec<Candidate>,
        from_ocr: bool,
    ) -> std::result::Result<Vec<ScoredCandidate>, ArbitrationError> {
        let tasks = candidates.into_iter().map(|candidate| {
            let arbiter = self.arbiter.clone();
            tokio::task::spawn_blocking(move || arbiter.assess(candidate, from_ocr))
        });

        join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.map_err(|e| ArbitrationError::ScoringFailed(e.to_string())))
            .collect()
    }

    /// Call the OCR provider under the configured timeout. Failures are
    /// recorded and returned as a description of the cause.
    async fn try_ocr(
        &self,
        document: &Document,
        best_native_score: Option<f64>,
        diagnostics: &mut Diagnostics,
    ) -> std::result::Result<Candidate, String> {
        let Some(ocr) = &self.ocr else {
            diagnostics.record(Stage::Ocr, DiagnosticKind::OcrUnavailable);
            return Err("no OCR provider configured".to_string());
        };

        diagnostics.record(Stage::Ocr, DiagnosticKind::OcrInvoked { best_native_score });
        let timeout = self.ocr_timeout;

        let timed_out = match tokio::time::timeout(timeout, ocr.run_ocr(document, timeout)).await {
            Ok(Ok(candidate)) => return Ok(candidate),
            Ok(Err(OcrError::Timeout(after))) => after,
            Ok(Err(e)) => {
                let error = e.to_string();
                diagnostics.record(Stage::Ocr, DiagnosticKind::OcrFailed { error: error.clone() });
                return Err(error);
            }
            Err(_) => timeout,
        };

        diagnostics.record(
            Stage::Ocr,
            DiagnosticKind::OcrTimedOut {
                timeout_secs: timed_out.as_secs_f64(),
            },
        );
        Err(OcrError::Timeout(timed_out).to_string())
    }
}

fn record_scored(diagnostics: &mut Diagnostics, scored: &ScoredCandidate) {
    diagnostics.record(
        Stage::Arbitration,
        DiagnosticKind::CandidateScored {
            source: scored.candidate.source_label.clone(),
            score: scored.score.value,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::mock::{MockOcr, StaticExtractor};

    const GOOD: &str = "The wagons rolled west across the plains. Families carried what little they owned.";
    const POOR: &str = "T h e w a g o n s \u{fffd}\u{fffd} 1 2 3 # # %";

    fn document() -> Document {
        Document::new("doc.pdf", Vec::new())
    }

    #[tokio::test]
    async fn test_good_native_skips_ocr() {
        let ocr = Arc::new(MockOcr::returns("OCR text."));
        let pipeline = Pipeline::new(&PrepConfig::default())
            .with_extractor(Arc::new(StaticExtractor::new("layout", GOOD)))
            .with_ocr(ocr.clone());

        let output = pipeline.run(&document()).await.unwrap();
        assert_eq!(ocr.call_count(), 0);
        assert_eq!(output.extraction.chosen_source_label, "layout");
        assert!(!output.extraction.used_ocr);
        assert_eq!(output.chunks.len(), 1);
        assert_eq!(output.chunks[0].text, GOOD);
    }

    #[tokio::test]
    async fn test_failed_extractor_becomes_diagnostic() {
        let pipeline = Pipeline::new(&PrepConfig::default())
            .with_extractor(Arc::new(StaticExtractor::failing("raw", "not installed")))
            .with_extractor(Arc::new(StaticExtractor::new("layout", GOOD)));

        let output = pipeline.run(&document()).await.unwrap();
        assert_eq!(output.extraction.chosen_source_label, "layout");
        assert!(output.diagnostics.any(|k| matches!(
            k,
            DiagnosticKind::ExtractorFailed { extractor, .. } if extractor == "raw"
        )));
    }

    #[tokio::test]
    async fn test_poor_native_uses_ocr() {
        let ocr = Arc::new(MockOcr::returns(GOOD));
        let pipeline = Pipeline::new(&PrepConfig::default()).with_ocr(ocr.clone());

        let output = pipeline
            .process(vec![Candidate::new("raw", POOR)], &document())
            .await
            .unwrap();
        assert_eq!(ocr.call_count(), 1);
        assert!(output.extraction.used_ocr);
        assert_eq!(output.extraction.chosen_source_label, "mock-ocr");
    }

    #[tokio::test]
    async fn test_ocr_failure_falls_back_to_native() {
        let pipeline = Pipeline::new(&PrepConfig::default())
            .with_ocr(Arc::new(MockOcr::fails("engine crashed")));

        let output = pipeline
            .process(vec![Candidate::new("raw", POOR)], &document())
            .await
            .unwrap();
        assert!(!output.extraction.used_ocr);
        assert_eq!(output.extraction.chosen_source_label, "raw");
        assert!(output
            .diagnostics
            .any(|k| matches!(k, DiagnosticKind::OcrFailed { .. })));
    }

    #[tokio::test]
    async fn test_stalled_ocr_times_out() {
        let pipeline = Pipeline::new(&PrepConfig::default())
            .with_ocr(Arc::new(MockOcr::stalls()))
            .with_ocr_timeout(Duration::from_millis(50));

        let output = pipeline
            .process(vec![Candidate::new("raw", POOR)], &document())
            .await
            .unwrap();
        assert_eq!(output.extraction.chosen_source_label, "raw");
        assert!(output
            .diagnostics
            .any(|k| matches!(k, DiagnosticKind::OcrTimedOut { .. })));
    }

    #[tokio::test]
    async fn test_missing_ocr_is_recorded() {
        let pipeline = Pipeline::new(&PrepConfig::default());
        let output = pipeline
            .process(vec![Candidate::new("raw", POOR)], &document())
            .await
            .unwrap();
        assert!(output
            .diagnostics
            .any(|k| matches!(k, DiagnosticKind::OcrUnavailable)));
    }

    #[tokio::test]
    async fn test_no_text_anywhere_is_fatal() {
        let pipeline = Pipeline::new(&PrepConfig::default())
            .with_ocr(Arc::new(MockOcr::fails("engine crashed")));

        let err = pipeline
            .process(vec![Candidate::new("raw", "  \n")], &document())
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Arbitration);
        assert_eq!(
            err,
            crate::error::PipelineError::Arbitration(ArbitrationError::EmptyExtraction {
                ocr_error: Some("OCR failed: engine crashed".to_string()),
            })
        );
        assert!(err.to_string().contains("engine crashed"));
    }

    #[tokio::test]
    async fn test_empty_extraction_names_ocr_timeout() {
        let pipeline = Pipeline::new(&PrepConfig::default())
            .with_ocr(Arc::new(MockOcr::stalls()))
            .with_ocr_timeout(Duration::from_millis(50));

        let err = pipeline
            .process(vec![Candidate::new("raw", "")], &document())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("OCR timed out after 50ms"));
    }

    #[tokio::test]
    async fn test_empty_extraction_without_ocr_provider() {
        let pipeline = Pipeline::new(&PrepConfig::default());
        let err = pipeline
            .process(vec![Candidate::new("raw", " ")], &document())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no OCR provider configured"));
    }

    #[tokio::test]
    async fn test_run_batch_keeps_order() {
        let pipeline = Pipeline::new(&PrepConfig::default())
            .with_extractor(Arc::new(StaticExtractor::new("layout", GOOD)));
        let documents = vec![Document::new("a.pdf", Vec::new()), Document::new("b.pdf", Vec::new())];

        let results = pipeline.run_batch(&documents).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_ok()));
    }
}
