//! Mock collaborators for testing
//!
//! Extractors and OCR providers with fixed behavior, so pipelines can be
//! exercised without external programs.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{Document, Extractor, OcrProvider};
use crate::arbiter::Candidate;
use crate::error::{ExtractionError, OcrError};

/// An extractor that returns the same text, or the same failure, every time
pub struct StaticExtractor {
    label: String,
    outcome: Result<String, String>,
    page_count: Option<usize>,
}

impl StaticExtractor {
    /// Create an extractor that always returns `text`
    pub fn new(label: &str, text: &str) -> Self {
        Self {
            label: label.to_string(),
            outcome: Ok(text.to_string()),
            page_count: None,
        }
    }

    /// Create an extractor that always fails with `message`
    pub fn failing(label: &str, message: &str) -> Self {
        Self {
            label: label.to_string(),
            outcome: Err(message.to_string()),
            page_count: None,
        }
    }

    pub fn with_page_count(mut self, page_count: usize) -> Self {
        self.page_count = Some(page_count);
        self
    }
}

#[async_trait]
impl Extractor for StaticExtractor {
    fn label(&self) -> &str {
        &self.label
    }

    async fn extract(&self, _document: &Document) -> Result<Candidate, ExtractionError> {
        match &self.outcome {
            Ok(text) => {
                let mut candidate = Candidate::new(&self.label, text.as_str());
                candidate.page_count = self.page_count;
                Ok(candidate)
            }
            Err(message) => Err(ExtractionError::Failed {
                label: self.label.clone(),
                message: message.clone(),
            }),
        }
    }
}

enum OcrBehavior {
    Returns(String),
    Fails(String),
    Stalls,
}

/// A mock OCR provider that counts its calls
pub struct MockOcr {
    behavior: OcrBehavior,
    call_count: AtomicUsize,
}

impl MockOcr {
    /// Create a provider that always recognizes `text`
    pub fn returns(text: &str) -> Self {
        Self::with_behavior(OcrBehavior::Returns(text.to_string()))
    }

    /// Create a provider that always fails with `message`
    pub fn fails(message: &str) -> Self {
        Self::with_behavior(OcrBehavior::Fails(message.to_string()))
    }

    /// Create a provider that never finishes on its own, ignoring its timeout
    pub fn stalls() -> Self {
        Self::with_behavior(OcrBehavior::Stalls)
    }

    fn with_behavior(behavior: OcrBehavior) -> Self {
        Self {
            behavior,
            call_count: AtomicUsize::new(0),
        }
    }

    /// Get the number of times run_ocr() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrProvider for MockOcr {
    fn label(&self) -> &str {
        "mock-ocr"
    }

    async fn run_ocr(&self, _document: &Document, _timeout: Duration) -> Result<Candidate, OcrError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        match &self.behavior {
            OcrBehavior::Returns(text) => Ok(Candidate::new(self.label(), text.as_str())),
            OcrBehavior::Fails(message) => Err(OcrError::Failed(message.clone())),
            OcrBehavior::Stalls => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(OcrError::Failed("stalled provider woke up".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> Document {
        Document::new("doc.pdf", Vec::new())
    }

    #[tokio::test]
    async fn test_static_extractor() {
        let extractor = StaticExtractor::new("layout", "Some text.").with_page_count(4);
        let candidate = extractor.extract(&document()).await.unwrap();
        assert_eq!(candidate.source_label, "layout");
        assert_eq!(candidate.raw_text, "Some text.");
        assert_eq!(candidate.page_count, Some(4));

        let failing = StaticExtractor::failing("raw", "tool missing");
        let err = failing.extract(&document()).await.unwrap_err();
        assert_eq!(err.to_string(), "raw: tool missing");
    }

    #[tokio::test]
    async fn test_mock_ocr_counts_calls() {
        let ocr = MockOcr::returns("Recognized.");
        assert_eq!(ocr.call_count(), 0);
        let candidate = ocr.run_ocr(&document(), Duration::from_secs(1)).await.unwrap();
        assert_eq!(candidate.raw_text, "Recognized.");
        ocr.run_ocr(&document(), Duration::from_secs(1)).await.unwrap();
        assert_eq!(ocr.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_ocr_fails() {
        let ocr = MockOcr::fails("engine crashed");
        let err = ocr.run_ocr(&document(), Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err.to_string(), "OCR failed: engine crashed");
    }
}
