//! Text-layer extraction for digital posters and case exports.

use std::panic;

use super::confidence::{assess_text, thresholds, UsabilityThresholds};
use super::types::{PageExtraction, PageSource, PdfExtractor};
use super::ExtractionError;

/// Reads embedded text with `pdf-extract`. Scanned posters come back with
/// empty or near-empty pages, which the OCR fallback picks up.
pub struct PdfTextExtractor;

/// A page's text layer confidence: high when it is substantial and dense,
/// otherwise below [`thresholds::LOW`], scaled by density and length.
fn page_confidence(text: &str) -> f32 {
    let quality = assess_text(text);
    if quality.char_count == 0 {
        0.0
    } else if quality.char_count > thresholds::PAGE_DIRECT_MIN_CHARS
        && quality.alnum_ratio >= UsabilityThresholds::default().min_alnum_ratio
    {
        thresholds::VERY_HIGH
    } else {
        let length = (quality.char_count as f32 / thresholds::PAGE_DIRECT_MIN_CHARS as f32).min(1.0);
        thresholds::LOW * quality.alnum_ratio * length
    }
}

impl PdfExtractor for PdfTextExtractor {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError> {
        // The parser panics on some damaged cross-reference tables.
        let parsed = panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(pdf_bytes))
            .map_err(|_| ExtractionError::PdfParsing("parser aborted on malformed document".into()))?;
        let page_texts = parsed.map_err(|e| ExtractionError::PdfParsing(e.to_string()))?;

        Ok(page_texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| PageExtraction {
                page_number: i + 1,
                confidence: page_confidence(&text),
                text,
                source: PageSource::TextLayer,
            })
            .collect())
    }
}
