//! Plain text documents.

use async_trait::async_trait;

use super::{Document, Extractor, page_count_from_form_feeds};
use crate::arbiter::Candidate;
use crate::error::ExtractionError;

/// Reads the document bytes as text: UTF-8, falling back to Latin-1.
pub struct PlainTextExtractor;

/// Decode bytes as UTF-8, or as Latin-1 when they are not valid UTF-8.
///
/// Latin-1 maps every byte to a character, so decoding never fails.
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            log::debug!("input is not valid UTF-8, decoding as Latin-1");
            bytes.iter().map(|&b| char::from(b)).collect()
        }
    }
}

#[async_trait]
impl Extractor for PlainTextExtractor {
    fn label(&self) -> &str {
        "plain"
    }

    async fn extract(&self, document: &Document) -> Result<Candidate, ExtractionError> {
        let text = decode_text(&document.bytes);
        let page_count = page_count_from_form_feeds(&text);
        let mut candidate = Candidate::new(self.label(), text);
        candidate.page_count = page_count;
        Ok(candidate)
    }
}
