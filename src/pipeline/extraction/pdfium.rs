//! Scanned-poster page rendering through PDFium, feeding the OCR fallback.
//!
//! The upstream `Pdfium` handle is `!Send`, so the renderer only remembers
//! where the library lives and binds it once per document.

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::ImageOutputFormat;
use pdfium_render::prelude::*;

use super::types::PdfPageRenderer;
use super::ExtractionError;

/// Tesseract does best on 300 DPI page images.
pub const DEFAULT_RENDER_DPI: u32 = 300;

/// Longest rendered edge in pixels.
pub const MAX_EDGE_PX: u32 = 4096;

const POINTS_PER_INCH: f32 = 72.0;

/// Where the PDFium shared library is bound from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfiumBinding {
    /// Platform library search path.
    System,
    /// A directory holding the platform library, or the library file.
    Path(PathBuf),
}

impl PdfiumBinding {
    pub fn from_setting(path: Option<PathBuf>) -> Self {
        path.map(Self::Path).unwrap_or(Self::System)
    }

    fn bind(&self) -> Result<Pdfium, ExtractionError> {
        let bindings = match self {
            Self::System => Pdfium::bind_to_system_library(),
            Self::Path(dir) if dir.is_dir() => Pdfium::bind_to_library(
                Pdfium::pdfium_platform_library_name_at_path(dir.to_string_lossy().as_ref()),
            ),
            Self::Path(file) => Pdfium::bind_to_library(file.to_string_lossy().as_ref()),
        }
        .map_err(|e| ExtractionError::RendererUnavailable(format!("{self:?}: {e}")))?;
        Ok(Pdfium::new(bindings))
    }
}

pub struct PdfiumRenderer {
    binding: PdfiumBinding,
}

impl PdfiumRenderer {
    /// Fails when the library cannot be bound, so a missing PDFium is
    /// reported once at startup rather than on every scanned poster.
    pub fn new(binding: PdfiumBinding) -> Result<Self, ExtractionError> {
        binding.bind()?;
        tracing::info!(binding = ?binding, "PDFium bound for page rendering");
        Ok(Self { binding })
    }
}

fn open_error(e: PdfiumError) -> ExtractionError {
    match e {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => ExtractionError::PdfEncrypted,
        other => ExtractionError::PdfRendering {
            page: 0,
            reason: format!("cannot open document: {other}"),
        },
    }
}

/// Render width for a page of `width_pt` x `height_pt` points: the DPI scale,
/// reduced so neither edge passes [`MAX_EDGE_PX`].
fn render_width(width_pt: f32, height_pt: f32, dpi: u32) -> u32 {
    let longest_pt = width_pt.max(height_pt).max(1.0);
    let scale = (dpi as f32 / POINTS_PER_INCH).min(MAX_EDGE_PX as f32 / longest_pt);
    ((width_pt * scale).round() as u32).clamp(1, MAX_EDGE_PX)
}

fn render_one(page: &PdfPage, index: usize, dpi: u32) -> Result<Vec<u8>, ExtractionError> {
    let width = render_width(page.width().value, page.height().value, dpi);
    let config = PdfRenderConfig::new()
        .set_target_width(width as i32)
        .set_maximum_height(MAX_EDGE_PX as i32);
    let bitmap = page.render_with_config(&config).map_err(|e| ExtractionError::PdfRendering {
        page: index,
        reason: e.to_string(),
    })?;

    // Posters are recognized as grayscale; dropping color shrinks the PNG.
    let mut png = Cursor::new(Vec::new());
    bitmap
        .as_image()
        .grayscale()
        .write_to(&mut png, ImageOutputFormat::Png)
        .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encoding failed: {e}")))?;
    Ok(png.into_inner())
}

impl PdfPageRenderer for PdfiumRenderer {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
        let pdfium = self.binding.bind()?;
        let document = pdfium.load_pdf_from_byte_slice(pdf_bytes, None).map_err(open_error)?;
        Ok(document.pages().len() as usize)
    }

    fn render_pages(
        &self,
        pdf_bytes: &[u8],
        pages: &[usize],
        dpi: u32,
    ) -> Result<Vec<Result<Vec<u8>, ExtractionError>>, ExtractionError> {
        let pdfium = self.binding.bind()?;
        let document = pdfium.load_pdf_from_byte_slice(pdf_bytes, None).map_err(open_error)?;
        let all = document.pages();
        let total = all.len() as usize;

        let rendered = pages
            .iter()
            .map(|&index| -> Result<Vec<u8>, ExtractionError> {
                let page = u16::try_from(index)
                    .ok()
                    .filter(|_| index < total)
                    .and_then(|i| all.get(i).ok())
                    .ok_or_else(|| ExtractionError::PdfRendering {
                        page: index,
                        reason: format!("document has {total} pages"),
                    })?;
                let png = render_one(&page, index, dpi)?;
                tracing::debug!(page = index + 1, png_bytes = png.len(), "Rendered page for OCR");
                Ok(png)
            })
            .collect();
        Ok(rendered)
    }
}

/// Renderer stand-in for tests. Every page renders to the PNG signature;
/// the counter records how many pages were rendered.
pub struct MockPdfPageRenderer {
    page_count: usize,
    rendered: Arc<AtomicUsize>,
}

impl MockPdfPageRenderer {
    pub fn new(page_count: usize) -> Self {
        Self {
            page_count,
            rendered: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn render_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.rendered)
    }
}

impl PdfPageRenderer for MockPdfPageRenderer {
    fn page_count(&self, _pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
        Ok(self.page_count)
    }

    fn render_pages(
        &self,
        _pdf_bytes: &[u8],
        pages: &[usize],
        _dpi: u32,
    ) -> Result<Vec<Result<Vec<u8>, ExtractionError>>, ExtractionError> {
        Ok(pages
            .iter()
            .map(|&index| {
                if index >= self.page_count {
                    return Err(ExtractionError::PdfRendering {
                        page: index,
                        reason: format!("document has {} pages", self.page_count),
                    });
                }
                self.rendered.fetch_add(1, Ordering::SeqCst);
                Ok(vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])
            })
            .collect())
    }
}
