use std::time::Duration;

use thiserror::Error;

use crate::text::RuleName;

/// Failure of a single extraction collaborator. Recovered by the pipeline.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("{label}: timed out after {timeout:?}")]
    Timeout { label: String, timeout: Duration },

    #[error("{label}: {message}")]
    Failed { label: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of the OCR collaborator. Recovered unless no native text exists.
#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR timed out after {0:?}")]
    Timeout(Duration),

    #[error("OCR failed: {0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArbitrationError {
    /// No candidate had text. `ocr_error` says why OCR did not supply any.
    #[error("no usable text in any extraction candidate{}", ocr_cause(.ocr_error))]
    EmptyExtraction { ocr_error: Option<String> },

    #[error("scoring task failed: {0}")]
    ScoringFailed(String),
}

fn ocr_cause(ocr_error: &Option<String>) -> String {
    match ocr_error {
        Some(cause) => format!(" ({cause})"),
        None => String::new(),
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CleaningError {
    #[error("cleaning rule `{rule}` failed: {message}")]
    RuleFailed { rule: RuleName, message: String },

    #[error("cleaning left no text")]
    NothingLeft,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkingError {
    #[error("chunking invariant violated: {0}")]
    InvariantViolation(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("HOME not set")]
    MissingHome,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Pipeline stage a failure or diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extraction,
    Arbitration,
    Ocr,
    Cleaning,
    Chunking,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extraction => "extraction",
            Stage::Arbitration => "arbitration",
            Stage::Ocr => "ocr",
            Stage::Cleaning => "cleaning",
            Stage::Chunking => "chunking",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error of a document run. Always names the failing stage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("[arbitration] {0}")]
    Arbitration(#[from] ArbitrationError),

    #[error("[cleaning] {0}")]
    Cleaning(#[from] CleaningError),

    #[error("[chunking] {0}")]
    Chunking(#[from] ChunkingError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Arbitration(_) => Stage::Arbitration,
            PipelineError::Cleaning(_) => Stage::Cleaning,
            PipelineError::Chunking(_) => Stage::Chunking,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
