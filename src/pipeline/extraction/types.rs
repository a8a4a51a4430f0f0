use serde::{Deserialize, Serialize};

use super::ExtractionError;
use crate::models::Document;

/// Text recovered from one document, with its confidence signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text: String,
    pub method: ExtractionMethod,
    pub pages: Vec<PageExtraction>,
    pub page_count: usize,
    /// Non-whitespace characters in `text`.
    pub char_count: usize,
    pub ocr_used: bool,
    pub confidence: f32,
}

/// How text was extracted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    PdfDirect,
    Ocr,
    /// Some PDF pages direct, others recognized.
    Mixed,
    PlainText,
}

/// Where a page's text came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PageSource {
    /// Embedded PDF text layer.
    TextLayer,
    /// Rendered page or image input, recognized by OCR.
    Ocr,
    PlainText,
    /// The page needed OCR and got none (render or OCR failure, page cap).
    Unrecovered,
}

/// Per-page extraction result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageExtraction {
    pub page_number: usize,
    pub text: String,
    pub confidence: f32,
    pub source: PageSource,
}

impl PageExtraction {
    pub fn unrecovered(page_number: usize) -> Self {
        Self {
            page_number,
            text: String::new(),
            confidence: 0.0,
            source: PageSource::Unrecovered,
        }
    }

    pub fn is_ocr(&self) -> bool {
        self.source == PageSource::Ocr
    }
}

/// Raw OCR result from the engine
#[derive(Debug)]
pub struct OcrPageResult {
    pub text: String,
    pub confidence: f32,
}

/// Input format, sniffed from leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Image,
    PlainText,
}

impl DocumentFormat {
    pub fn detect(bytes: &[u8]) -> Self {
        const PNG: &[u8] = &[0x89, b'P', b'N', b'G'];
        const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];
        const TIFF_LE: &[u8] = b"II*\0";
        const TIFF_BE: &[u8] = b"MM\0*";

        let head = &bytes[..bytes.len().min(1024)];
        if head.windows(5).any(|w| w == b"%PDF-") {
            Self::Pdf
        } else if [PNG, JPEG, TIFF_LE, TIFF_BE].iter().any(|m| bytes.starts_with(m)) {
            Self::Image
        } else {
            Self::PlainText
        }
    }
}

/// OCR engine abstraction (allows mocking for tests)
pub trait OcrEngine {
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError>;
}

/// PDF text extraction abstraction
pub trait PdfExtractor {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError>;
}

/// Renders PDF pages to images for the OCR fallback.
pub trait PdfPageRenderer {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError>;

    /// Render zero-based `pages` to PNG, opening the document once. The outer
    /// error means the document could not be opened; inner ones are per page,
    /// in the order requested.
    fn render_pages(
        &self,
        pdf_bytes: &[u8],
        pages: &[usize],
        dpi: u32,
    ) -> Result<Vec<Result<Vec<u8>, ExtractionError>>, ExtractionError>;
}

/// Main extraction orchestrator trait
pub trait TextExtractor {
    fn extract(&self, document: &Document) -> Result<ExtractedText, ExtractionError>;
}
