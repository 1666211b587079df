//! Text preparation for speech synthesis
//!
//! Turns document text of unknown quality into clean, sentence-aligned chunks:
//! - Arbitration between competing extractions, with an OCR fallback
//! - Rule-based cleaning of extraction artifacts
//! - Abbreviation-aware sentence splitting and bounded chunk packing

pub mod arbiter;
pub mod config;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod text;

pub use arbiter::{Arbiter, Candidate, ExtractionResult, QualityScore};
pub use config::PrepConfig;
pub use error::{PipelineError, Result, Stage};
pub use extract::{Document, DocumentKind, Extractor, OcrProvider};
pub use pipeline::{Diagnostic, DiagnosticKind, Diagnostics, Pipeline, PipelineOutput};
pub use text::{Chunk, Sentence};
