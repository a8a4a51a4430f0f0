pub mod types;
pub mod confidence;
pub mod sanitize;
pub mod pdf;
pub mod pdfium;
pub mod ocr;
pub mod orchestrator;

pub use types::*;
pub use confidence::*;
pub use sanitize::*;
pub use pdf::*;
pub use ocr::*;
pub use orchestrator::*;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tesseract OCR initialization failed: {0}")]
    OcrInit(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("No OCR engine configured for image input")]
    OcrUnavailable,

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("PDF rendering failed on page {page}: {reason}")]
    PdfRendering { page: usize, reason: String },

    #[error("PDFium library unavailable: {0}")]
    RendererUnavailable(String),

    #[error("PDF is encrypted or password protected")]
    PdfEncrypted,

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Tessdata not found at: {0}")]
    TessdataNotFound(PathBuf),

    #[error("No usable text recovered from {filename} ({char_count} chars, ocr attempted: {ocr_attempted})")]
    NoUsableText {
        filename: String,
        char_count: usize,
        ocr_attempted: bool,
    },
}
