//! Extraction collaborators: anything that turns document bytes into
//! candidate text.

mod command;
pub mod mock;
mod plain;

pub use command::{CommandExtractor, CommandOcr};
pub use plain::PlainTextExtractor;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::arbiter::Candidate;
use crate::config::{OcrConfig, PrepConfig};
use crate::error::{ExtractionError, OcrError};

/// A source document as raw bytes.
#[derive(Debug, Clone)]
pub struct Document {
    /// Display name, usually the file name
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a document from disk, naming it after the file.
    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }
}

/// How a document's bytes should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Text,
    Pdf,
}

impl DocumentKind {
    /// `.pdf` files are PDFs, everything else is treated as text.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("pdf") => Self::Pdf,
            _ => Self::Text,
        }
    }
}

/// Trait for native text extractors
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Label used in diagnostics and as the candidate's source label
    fn label(&self) -> &str;

    async fn extract(&self, document: &Document) -> Result<Candidate, ExtractionError>;
}

/// Trait for the OCR fallback
#[async_trait]
pub trait OcrProvider: Send + Sync {
    fn label(&self) -> &str;

    /// Run OCR on the document, giving up after `timeout`.
    async fn run_ocr(&self, document: &Document, timeout: Duration) -> Result<Candidate, OcrError>;
}

/// Page count implied by form feeds, which text extractors emit between pages.
pub fn page_count_from_form_feeds(text: &str) -> Option<usize> {
    let breaks = text.matches('\u{000C}').count();
    if breaks == 0 {
        return None;
    }
    let trailing = text
        .rsplit('\u{000C}')
        .next()
        .is_some_and(|tail| !tail.trim().is_empty());
    Some(breaks + usize::from(trailing))
}

/// Create the native extractors for a document kind.
pub fn create_extractors(config: &PrepConfig, kind: DocumentKind) -> Vec<Arc<dyn Extractor>> {
    match kind {
        DocumentKind::Text => vec![Arc::new(PlainTextExtractor)],
        DocumentKind::Pdf => config
            .extractors
            .iter()
            .map(|e| Arc::new(CommandExtractor::from_config(e)) as Arc<dyn Extractor>)
            .collect(),
    }
}

/// Create the OCR provider, if one is configured.
pub fn create_ocr(config: &OcrConfig) -> Option<Arc<dyn OcrProvider>> {
    config
        .program
        .as_ref()
        .map(|program| Arc::new(CommandOcr::new(program, &config.args)) as Arc<dyn OcrProvider>)
}
