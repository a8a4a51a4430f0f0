use serde::{Deserialize, Serialize};

use super::types::{ExtractionMethod, PageExtraction};

/// Confidence thresholds used across the pipeline
pub mod thresholds {
    /// Below this: OCR output is mostly noise.
    pub const LOW: f32 = 0.50;

    /// Direct text layer of a digital PDF.
    pub const VERY_HIGH: f32 = 0.95;

    /// Minimum non-whitespace characters for a page's direct text to skip OCR.
    pub const PAGE_DIRECT_MIN_CHARS: usize = 20;
}

/// When is extracted text good enough to continue the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsabilityThresholds {
    /// Non-whitespace characters
    pub min_chars: usize,
    /// Share of non-whitespace characters that are alphanumeric
    pub min_alnum_ratio: f32,
}

impl Default for UsabilityThresholds {
    fn default() -> Self {
        Self {
            min_chars: 40,
            min_alnum_ratio: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextQuality {
    pub char_count: usize,
    pub alnum_ratio: f32,
}

impl TextQuality {
    pub fn is_usable(&self, limits: &UsabilityThresholds) -> bool {
        self.char_count >= limits.min_chars && self.alnum_ratio >= limits.min_alnum_ratio
    }
}

pub fn assess_text(text: &str) -> TextQuality {
    let mut char_count = 0usize;
    let mut alnum = 0usize;
    for c in text.chars().filter(|c| !c.is_whitespace()) {
        char_count += 1;
        if c.is_alphanumeric() {
            alnum += 1;
        }
    }
    let alnum_ratio = if char_count == 0 {
        0.0
    } else {
        alnum as f32 / char_count as f32
    };
    TextQuality {
        char_count,
        alnum_ratio,
    }
}

/// Compute overall document confidence from per-page results
pub fn compute_overall_confidence(pages: &[PageExtraction], method: ExtractionMethod) -> f32 {
    if pages.is_empty() {
        return 0.0;
    }

    match method {
        // Digital PDFs: base 0.95, scaled by ratio of pages with text
        ExtractionMethod::PdfDirect => {
            let pages_with_text = pages.iter().filter(|p| !p.text.trim().is_empty()).count();
            thresholds::VERY_HIGH * pages_with_text as f32 / pages.len() as f32
        }
        ExtractionMethod::PlainText => 0.99,
        // OCR and mixed: weighted average by text length
        ExtractionMethod::Ocr | ExtractionMethod::Mixed => {
            let total_chars: usize = pages.iter().map(|p| p.text.len()).sum();
            if total_chars == 0 {
                return 0.0;
            }
            let weighted_sum: f32 = pages
                .iter()
                .map(|p| p.confidence * p.text.len() as f32)
                .sum();
            weighted_sum / total_chars as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::types::PageSource;

    fn page(text: &str, confidence: f32, source: PageSource) -> PageExtraction {
        PageExtraction {
            page_number: 1,
            text: text.to_string(),
            confidence,
            source,
        }
    }

    #[test]
    fn empty_text_is_unusable() {
        let q = assess_text("   \n\t ");
        assert_eq!(q.char_count, 0);
        assert!(!q.is_usable(&UsabilityThresholds::default()));
    }

    #[test]
    fn short_text_is_unusable() {
        let q = assess_text("Page 1");
        assert!(!q.is_usable(&UsabilityThresholds::default()));
    }

    #[test]
    fn symbol_noise_is_unusable() {
        let noise = "~~~~ |||| //// ;;;; ---- ==== ____ **** #### @@@@ ~~~~ |||| ab";
        let q = assess_text(noise);
        assert!(q.char_count >= 40);
        assert!(q.alnum_ratio < 0.5, "Expected low density, got {}", q.alnum_ratio);
        assert!(!q.is_usable(&UsabilityThresholds::default()));
    }

    #[test]
    fn case_text_is_usable() {
        let q = assess_text("NamUs Case Created: 2023-01-15\nDate of Last Contact: January 10, 2023");
        assert!(q.is_usable(&UsabilityThresholds::default()));
    }

    #[test]
    fn direct_confidence_scales_with_text_pages() {
        let pages = vec![page("some text here", 0.95, PageSource::TextLayer), page("", 0.0, PageSource::TextLayer)];
        let c = compute_overall_confidence(&pages, ExtractionMethod::PdfDirect);
        assert!((c - 0.475).abs() < 0.001, "Expected 0.475, got {c}");
    }

    #[test]
    fn ocr_confidence_is_length_weighted() {
        let pages = vec![page("aaaaaaaaaa", 0.9, PageSource::Ocr), page("bbbbbbbbbbbbbbbbbbbb", 0.6, PageSource::Ocr)];
        let c = compute_overall_confidence(&pages, ExtractionMethod::Ocr);
        assert!((c - 0.7).abs() < 0.001, "Expected 0.7, got {c}");
    }

    #[test]
    fn no_pages_zero_confidence() {
        assert_eq!(compute_overall_confidence(&[], ExtractionMethod::Ocr), 0.0);
    }
}
