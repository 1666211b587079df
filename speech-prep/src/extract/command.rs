//! External programs as extractors: document bytes on stdin, text on stdout.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{Document, Extractor, OcrProvider, page_count_from_form_feeds};
use crate::arbiter::Candidate;
use crate::config::ExtractorConfig;
use crate::error::{ExtractionError, OcrError};

/// Why piping a document through a program failed.
#[derive(Debug)]
enum PipeFailure {
    Spawn(std::io::Error),
    Wait(std::io::Error),
    TimedOut,
    Exited(String),
}

/// Run `program` with `input` on stdin and return its stdout.
///
/// The child is killed if the timeout expires.
async fn pipe_through(
    program: &str,
    args: &[String],
    input: &[u8],
    timeout: Duration,
) -> Result<Vec<u8>, PipeFailure> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(PipeFailure::Spawn)?;

    // Feed stdin from its own task while stdout is drained.
    if let Some(mut stdin) = child.stdin.take() {
        let input = input.to_vec();
        let program = program.to_string();
        tokio::spawn(async move {
            if let Err(e) = stdin.write_all(&input).await {
                log::debug!("{program}: stdin closed early: {e}");
            }
        });
    }

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| PipeFailure::TimedOut)?
        .map_err(PipeFailure::Wait)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PipeFailure::Exited(format!(
            "{} ({})",
            stderr.trim(),
            output.status
        )));
    }

    Ok(output.stdout)
}

fn candidate_from_stdout(label: &str, stdout: &[u8]) -> Candidate {
    let text = String::from_utf8_lossy(stdout).into_owned();
    let page_count = page_count_from_form_feeds(&text);
    let mut candidate = Candidate::new(label, text);
    candidate.page_count = page_count;
    candidate
}

/// Native extractor backed by a command such as `pdftotext -layout - -`.
pub struct CommandExtractor {
    label: String,
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandExtractor {
    pub fn new(label: &str, program: &str, args: &[String], timeout: Duration) -> Self {
        Self {
            label: label.to_string(),
            program: program.to_string(),
            args: args.to_vec(),
            timeout,
        }
    }

    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self::new(&config.label, &config.program, &config.args, config.timeout())
    }
}

#[async_trait]
impl Extractor for CommandExtractor {
    fn label(&self) -> &str {
        &self.label
    }

    async fn extract(&self, document: &Document) -> Result<Candidate, ExtractionError> {
        let stdout = pipe_through(&self.program, &self.args, &document.bytes, self.timeout)
            .await
            .map_err(|failure| match failure {
                PipeFailure::TimedOut => ExtractionError::Timeout {
                    label: self.label.clone(),
                    timeout: self.timeout,
                },
                PipeFailure::Spawn(e) => ExtractionError::Failed {
                    label: self.label.clone(),
                    message: format!("failed to run {}: {}", self.program, e),
                },
                PipeFailure::Exited(message) => ExtractionError::Failed {
                    label: self.label.clone(),
                    message,
                },
                PipeFailure::Wait(e) => ExtractionError::Io(e),
            })?;

        Ok(candidate_from_stdout(&self.label, &stdout))
    }
}

/// OCR backed by a command that reads the document on stdin and writes
/// recognized text to stdout.
pub struct CommandOcr {
    label: String,
    program: String,
    args: Vec<String>,
}

impl CommandOcr {
    pub fn new(program: &str, args: &[String]) -> Self {
        Self {
            label: format!("ocr:{program}"),
            program: program.to_string(),
            args: args.to_vec(),
        }
    }
}

#[async_trait]
impl OcrProvider for CommandOcr {
    fn label(&self) -> &str {
        &self.label
    }

    async fn run_ocr(&self, document: &Document, timeout: Duration) -> Result<Candidate, OcrError> {
        let stdout = pipe_through(&self.program, &self.args, &document.bytes, timeout)
            .await
            .map_err(|failure| match failure {
                PipeFailure::TimedOut => OcrError::Timeout(timeout),
                PipeFailure::Spawn(e) => {
                    OcrError::Failed(format!("failed to run {}: {}", self.program, e))
                }
                PipeFailure::Exited(message) => OcrError::Failed(message),
                PipeFailure::Wait(e) => OcrError::Io(e),
            })?;

        Ok(candidate_from_stdout(&self.label, &stdout))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_command_extractor_reads_stdout() {
        let extractor = CommandExtractor::new("cat", "cat", &[], Duration::from_secs(10));
        let document = Document::new("doc.pdf", "Page one.\u{000C}Page two.\u{000C}");
        let candidate = extractor.extract(&document).await.unwrap();
        assert_eq!(candidate.source_label, "cat");
        assert_eq!(candidate.raw_text, "Page one.\u{000C}Page two.\u{000C}");
        assert_eq!(candidate.page_count, Some(2));
    }

    #[tokio::test]
    async fn test_command_extractor_reports_exit_failure() {
        let extractor = CommandExtractor::new(
            "failing",
            "sh",
            &args(&["-c", "echo broken >&2; exit 3"]),
            Duration::from_secs(10),
        );
        let err = extractor
            .extract(&Document::new("doc.pdf", "x"))
            .await
            .unwrap_err();
        match err {
            ExtractionError::Failed { label, message } => {
                assert_eq!(label, "failing");
                assert!(message.contains("broken"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_a_failure() {
        let extractor = CommandExtractor::new(
            "missing",
            "speech-prep-no-such-program",
            &[],
            Duration::from_secs(10),
        );
        let err = extractor
            .extract(&Document::new("doc.pdf", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Failed { .. }));
    }

    #[tokio::test]
    async fn test_command_ocr_times_out() {
        let ocr = CommandOcr::new("sleep", &args(&["5"]));
        let err = ocr
            .run_ocr(&Document::new("scan.pdf", ""), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, OcrError::Timeout(_)));
    }
}
