use super::confidence::{assess_text, compute_overall_confidence, thresholds, UsabilityThresholds};
use super::pdfium::DEFAULT_RENDER_DPI;
use super::sanitize::sanitize_extracted_text;
use super::types::{
    DocumentFormat, ExtractedText, ExtractionMethod, OcrEngine, PageExtraction, PageSource, PdfExtractor,
    PdfPageRenderer, TextExtractor,
};
use super::ExtractionError;
use crate::models::Document;

/// Pages sent through render and OCR per document. Later pages keep
/// whatever text layer they have.
pub const DEFAULT_MAX_OCR_PAGES: usize = 10;

/// Concrete implementation of the text extractor.
/// Direct extraction first; page rendering plus OCR when the text layer is
/// missing or too thin. OCR and rendering are optional collaborators.
pub struct DocumentExtractor {
    pdf_extractor: Box<dyn PdfExtractor + Send + Sync>,
    pdf_renderer: Option<Box<dyn PdfPageRenderer + Send + Sync>>,
    ocr_engine: Option<Box<dyn OcrEngine + Send + Sync>>,
    limits: UsabilityThresholds,
    render_dpi: u32,
    max_ocr_pages: usize,
}

impl DocumentExtractor {
    pub fn new(pdf_extractor: Box<dyn PdfExtractor + Send + Sync>) -> Self {
        Self {
            pdf_extractor,
            pdf_renderer: None,
            ocr_engine: None,
            limits: UsabilityThresholds::default(),
            render_dpi: DEFAULT_RENDER_DPI,
            max_ocr_pages: DEFAULT_MAX_OCR_PAGES,
        }
    }

    pub fn with_pdf_renderer(mut self, renderer: Box<dyn PdfPageRenderer + Send + Sync>) -> Self {
        self.pdf_renderer = Some(renderer);
        self
    }

    pub fn with_ocr_engine(mut self, engine: Box<dyn OcrEngine + Send + Sync>) -> Self {
        self.ocr_engine = Some(engine);
        self
    }

    pub fn with_limits(mut self, limits: UsabilityThresholds) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_render_dpi(mut self, dpi: u32) -> Self {
        self.render_dpi = dpi;
        self
    }

    pub fn with_max_ocr_pages(mut self, pages: usize) -> Self {
        self.max_ocr_pages = pages;
        self
    }

    fn extract_pdf(&self, bytes: &[u8]) -> Result<(ExtractionMethod, Vec<PageExtraction>), ExtractionError> {
        let direct = self.pdf_extractor.extract_text(bytes);

        let (renderer, ocr) = match (&self.pdf_renderer, &self.ocr_engine) {
            (Some(r), Some(o)) => (r.as_ref(), o.as_ref()),
            // No fallback available: direct text is all there is.
            _ => return direct.map(|pages| (ExtractionMethod::PdfDirect, pages)),
        };

        let direct_pages = match direct {
            Ok(pages) => {
                let joined = join_pages(&pages);
                if assess_text(&sanitize_extracted_text(&joined)).is_usable(&self.limits) {
                    return Ok((ExtractionMethod::PdfDirect, pages));
                }
                pages
            }
            Err(e) => {
                tracing::warn!(error = %e, "Direct PDF extraction failed, trying OCR on rendered pages");
                Vec::new()
            }
        };

        self.ocr_scanned_pdf(bytes, direct_pages, renderer, ocr)
    }

    /// A page's direct text is kept when it is substantial and dense enough
    /// to pass the document-level noise check on its own.
    fn has_text_layer(&self, page: &PageExtraction) -> bool {
        let quality = assess_text(&page.text);
        quality.char_count > thresholds::PAGE_DIRECT_MIN_CHARS && quality.alnum_ratio >= self.limits.min_alnum_ratio
    }

    /// Per page: keep a substantial text layer, otherwise render and OCR, up
    /// to `max_ocr_pages`. A page that fails to render or recognize keeps
    /// whatever direct text it had.
    fn ocr_scanned_pdf(
        &self,
        bytes: &[u8],
        direct_pages: Vec<PageExtraction>,
        renderer: &(dyn PdfPageRenderer + Send + Sync),
        ocr: &(dyn OcrEngine + Send + Sync),
    ) -> Result<(ExtractionMethod, Vec<PageExtraction>), ExtractionError> {
        let page_count = renderer.page_count(bytes)?.max(direct_pages.len());
        let mut direct: Vec<Option<PageExtraction>> = direct_pages.into_iter().map(Some).collect();
        direct.resize(page_count, None);

        let mut pages: Vec<Option<PageExtraction>> = vec![None; page_count];
        let mut needs_ocr = Vec::new();
        for (index, page) in direct.iter_mut().enumerate() {
            match page.take() {
                Some(p) if self.has_text_layer(&p) => pages[index] = Some(p),
                other => {
                    *page = other;
                    needs_ocr.push(index);
                }
            }
        }
        let direct_kept = pages.iter().flatten().count();

        if needs_ocr.len() > self.max_ocr_pages {
            tracing::warn!(
                pages = needs_ocr.len(),
                limit = self.max_ocr_pages,
                "Scanned PDF exceeds OCR page limit, later pages keep their text layer only"
            );
            for index in needs_ocr.split_off(self.max_ocr_pages) {
                pages[index] = Some(unrecovered_page(direct[index].take(), index));
            }
        }

        let rendered = renderer.render_pages(bytes, &needs_ocr, self.render_dpi)?;
        for (&index, png) in needs_ocr.iter().zip(rendered) {
            let page = match png.and_then(|png| ocr.ocr_image(&png)) {
                Ok(result) => {
                    if result.confidence < thresholds::LOW {
                        tracing::debug!(page = index + 1, confidence = result.confidence, "Low OCR confidence");
                    }
                    PageExtraction {
                        page_number: index + 1,
                        text: result.text,
                        confidence: result.confidence,
                        source: PageSource::Ocr,
                    }
                }
                Err(e) => {
                    tracing::warn!(page = index + 1, error = %e, "Page OCR failed");
                    unrecovered_page(direct[index].take(), index)
                }
            };
            pages[index] = Some(page);
        }

        let pages: Vec<PageExtraction> = pages
            .into_iter()
            .enumerate()
            .map(|(index, page)| page.unwrap_or_else(|| PageExtraction::unrecovered(index + 1)))
            .collect();

        let method = if direct_kept == 0 {
            ExtractionMethod::Ocr
        } else {
            ExtractionMethod::Mixed
        };
        Ok((method, pages))
    }
}

impl TextExtractor for DocumentExtractor {
    fn extract(&self, document: &Document) -> Result<ExtractedText, ExtractionError> {
        let format = DocumentFormat::detect(&document.bytes);
        tracing::info!(
            filename = %document.filename,
            bytes = document.bytes.len(),
            format = ?format,
            "Starting text extraction"
        );

        let (method, pages) = match format {
            DocumentFormat::Pdf => self.extract_pdf(&document.bytes)?,
            DocumentFormat::Image => {
                let engine = self.ocr_engine.as_ref().ok_or(ExtractionError::OcrUnavailable)?;
                let result = engine.ocr_image(&document.bytes)?;
                (
                    ExtractionMethod::Ocr,
                    vec![PageExtraction {
                        page_number: 1,
                        text: result.text,
                        confidence: result.confidence,
                        source: PageSource::Ocr,
                    }],
                )
            }
            DocumentFormat::PlainText => (
                ExtractionMethod::PlainText,
                vec![PageExtraction {
                    page_number: 1,
                    text: String::from_utf8_lossy(&document.bytes).into_owned(),
                    confidence: 0.99,
                    source: PageSource::PlainText,
                }],
            ),
        };

        let text = sanitize_extracted_text(&join_pages(&pages));
        let quality = assess_text(&text);
        let ocr_used = pages.iter().any(PageExtraction::is_ocr);
        let ocr_attempted = ocr_used || pages.iter().any(|p| p.source == PageSource::Unrecovered);

        if !quality.is_usable(&self.limits) {
            tracing::warn!(
                filename = %document.filename,
                chars = quality.char_count,
                alnum_ratio = quality.alnum_ratio,
                ocr_attempted,
                "Extraction yielded no usable text"
            );
            return Err(ExtractionError::NoUsableText {
                filename: document.filename.clone(),
                char_count: quality.char_count,
                ocr_attempted,
            });
        }

        let confidence = compute_overall_confidence(&pages, method);
        tracing::info!(
            filename = %document.filename,
            method = ?method,
            pages = pages.len(),
            chars = quality.char_count,
            confidence,
            "Text extraction complete"
        );

        Ok(ExtractedText {
            text,
            method,
            page_count: pages.len(),
            pages,
            char_count: quality.char_count,
            ocr_used,
            confidence,
        })
    }
}

/// A page that needed OCR and did not get it keeps its direct text, if any.
fn unrecovered_page(direct: Option<PageExtraction>, index: usize) -> PageExtraction {
    match direct {
        Some(page) => PageExtraction {
            source: PageSource::Unrecovered,
            ..page
        },
        None => PageExtraction::unrecovered(index + 1),
    }
}

fn join_pages(pages: &[PageExtraction]) -> String {
    pages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use crate::pipeline::extraction::ocr::MockOcrEngine;
    use crate::pipeline::extraction::pdf::tests::make_test_pdf;
    use crate::pipeline::extraction::pdf::PdfTextExtractor;
    use crate::pipeline::extraction::pdfium::MockPdfPageRenderer;
    use crate::pipeline::extraction::types::OcrPageResult;

    const POSTER_TEXT: &str = "Have you seen this child? JANE DOE Missing Since: May 1, 2020 Richmond, VA";

    struct FixedPdf(Vec<&'static str>);

    impl PdfExtractor for FixedPdf {
        fn extract_text(&self, _pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError> {
            Ok(self
                .0
                .iter()
                .enumerate()
                .map(|(i, t)| PageExtraction {
                    page_number: i + 1,
                    text: t.to_string(),
                    confidence: 0.95,
                    source: PageSource::TextLayer,
                })
                .collect())
        }
    }

    struct BrokenPdf;

    impl PdfExtractor for BrokenPdf {
        fn extract_text(&self, _pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError> {
            Err(ExtractionError::PdfParsing("xref table damaged".into()))
        }
    }

    struct FailingOcr;

    impl OcrEngine for FailingOcr {
        fn ocr_image(&self, _image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError> {
            Err(ExtractionError::OcrProcessing("engine crashed".into()))
        }
    }

    fn pdf_doc() -> Document {
        Document::new(b"%PDF-1.4 fake".to_vec(), "poster.pdf", None)
    }

    #[test]
    fn direct_text_used_when_usable() {
        let extractor = DocumentExtractor::new(Box::new(FixedPdf(vec![POSTER_TEXT])))
            .with_pdf_renderer(Box::new(MockPdfPageRenderer::new(1)))
            .with_ocr_engine(Box::new(MockOcrEngine::new("should not be used", 0.9)));

        let result = extractor.extract(&pdf_doc()).unwrap();
        assert_eq!(result.method, ExtractionMethod::PdfDirect);
        assert!(!result.ocr_used);
        assert!(result.text.contains("JANE DOE"));
        assert!(result.char_count >= 40);
    }

    #[test]
    fn falls_back_to_ocr_for_thin_text_layer() {
        let extractor = DocumentExtractor::new(Box::new(FixedPdf(vec!["  ", "p2"])))
            .with_pdf_renderer(Box::new(MockPdfPageRenderer::new(2)))
            .with_ocr_engine(Box::new(MockOcrEngine::new(POSTER_TEXT, 0.8)));

        let result = extractor.extract(&pdf_doc()).unwrap();
        assert_eq!(result.method, ExtractionMethod::Ocr);
        assert!(result.ocr_used);
        assert_eq!(result.page_count, 2);
        assert!(result.text.contains("Missing Since"));
    }

    #[test]
    fn keeps_substantial_direct_pages_in_mixed_mode() {
        let first = "Details of Disappearance she left home on foot.";
        let extractor = DocumentExtractor::new(Box::new(FixedPdf(vec![first, ""])))
            .with_limits(UsabilityThresholds {
                min_chars: 80,
                min_alnum_ratio: 0.5,
            })
            .with_pdf_renderer(Box::new(MockPdfPageRenderer::new(2)))
            .with_ocr_engine(Box::new(MockOcrEngine::new(POSTER_TEXT, 0.8)));

        let result = extractor.extract(&pdf_doc()).unwrap();
        assert_eq!(result.method, ExtractionMethod::Mixed);
        assert_eq!(result.pages[0].source, PageSource::TextLayer);
        assert_eq!(result.pages[1].source, PageSource::Ocr);
    }

    #[test]
    fn parse_failure_recovers_through_ocr() {
        let extractor = DocumentExtractor::new(Box::new(BrokenPdf))
            .with_pdf_renderer(Box::new(MockPdfPageRenderer::new(1)))
            .with_ocr_engine(Box::new(MockOcrEngine::new(POSTER_TEXT, 0.7)));

        let result = extractor.extract(&pdf_doc()).unwrap();
        assert_eq!(result.method, ExtractionMethod::Ocr);
    }

    #[test]
    fn both_methods_unusable_is_extraction_failure() {
        let extractor = DocumentExtractor::new(Box::new(FixedPdf(vec![""])))
            .with_pdf_renderer(Box::new(MockPdfPageRenderer::new(1)))
            .with_ocr_engine(Box::new(MockOcrEngine::new("~~ ||", 0.2)));

        let err = extractor.extract(&pdf_doc()).unwrap_err();
        match err {
            ExtractionError::NoUsableText {
                filename,
                ocr_attempted,
                ..
            } => {
                assert_eq!(filename, "poster.pdf");
                assert!(ocr_attempted);
            }
            other => panic!("Expected NoUsableText, got {other:?}"),
        }
    }

    #[test]
    fn ocr_errors_on_every_page_leave_no_text() {
        let extractor = DocumentExtractor::new(Box::new(FixedPdf(vec![""])))
            .with_pdf_renderer(Box::new(MockPdfPageRenderer::new(1)))
            .with_ocr_engine(Box::new(FailingOcr));

        let err = extractor.extract(&pdf_doc()).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::NoUsableText {
                ocr_attempted: true,
                ..
            }
        ));
    }

    #[test]
    fn ocr_stops_at_page_limit() {
        let renderer = MockPdfPageRenderer::new(15);
        let rendered = renderer.render_counter();
        let extractor = DocumentExtractor::new(Box::new(FixedPdf(vec![""; 15])))
            .with_pdf_renderer(Box::new(renderer))
            .with_ocr_engine(Box::new(MockOcrEngine::new(POSTER_TEXT, 0.8)))
            .with_max_ocr_pages(3);

        let result = extractor.extract(&pdf_doc()).unwrap();
        assert_eq!(rendered.load(Ordering::SeqCst), 3);
        assert_eq!(result.page_count, 15);
        assert!(result.pages[..3].iter().all(PageExtraction::is_ocr));
        assert!(result.pages[3..].iter().all(|p| p.source == PageSource::Unrecovered));
    }

    #[test]
    fn symbol_noise_text_layer_is_recognized_again() {
        let noise = "~~~~ |||| //// ;;;; ---- ==== ____ **** #### @@@@";
        let renderer = MockPdfPageRenderer::new(1);
        let rendered = renderer.render_counter();
        let extractor = DocumentExtractor::new(Box::new(FixedPdf(vec![noise])))
            .with_pdf_renderer(Box::new(renderer))
            .with_ocr_engine(Box::new(MockOcrEngine::new(POSTER_TEXT, 0.8)));

        let result = extractor.extract(&pdf_doc()).unwrap();
        assert_eq!(rendered.load(Ordering::SeqCst), 1);
        assert_eq!(result.method, ExtractionMethod::Ocr);
        assert!(result.text.contains("JANE DOE"));
    }

    #[test]
    fn without_ocr_thin_pdf_fails() {
        let extractor = DocumentExtractor::new(Box::new(FixedPdf(vec!["Page 1"])));
        let err = extractor.extract(&pdf_doc()).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::NoUsableText {
                ocr_attempted: false,
                ..
            }
        ));
    }

    #[test]
    fn image_input_goes_straight_to_ocr() {
        let extractor = DocumentExtractor::new(Box::new(PdfTextExtractor))
            .with_ocr_engine(Box::new(MockOcrEngine::new(POSTER_TEXT, 0.9)));
        let doc = Document::new(vec![0x89, b'P', b'N', b'G', 0, 0], "scan.png", None);

        let result = extractor.extract(&doc).unwrap();
        assert_eq!(result.method, ExtractionMethod::Ocr);
        assert!((result.confidence - 0.9).abs() < 0.001);
    }

    #[test]
    fn image_without_ocr_engine_errors() {
        let extractor = DocumentExtractor::new(Box::new(PdfTextExtractor));
        let doc = Document::new(vec![0xFF, 0xD8, 0xFF, 0xE0], "scan.jpg", None);
        assert!(matches!(
            extractor.extract(&doc),
            Err(ExtractionError::OcrUnavailable)
        ));
    }

    #[test]
    fn plain_text_export_is_read_directly() {
        let extractor = DocumentExtractor::new(Box::new(PdfTextExtractor));
        let doc = Document::new(POSTER_TEXT.as_bytes().to_vec(), "case.txt", None);
        let result = extractor.extract(&doc).unwrap();
        assert_eq!(result.method, ExtractionMethod::PlainText);
        assert_eq!(result.text, POSTER_TEXT);
    }

    #[test]
    fn real_pdf_text_layer_extracts_directly() {
        let bytes = make_test_pdf("Federal Bureau of Investigation Richmond Field Office case poster");
        let extractor = DocumentExtractor::new(Box::new(PdfTextExtractor));
        let result = extractor.extract(&Document::new(bytes, "fbi.pdf", None)).unwrap();
        assert_eq!(result.method, ExtractionMethod::PdfDirect);
        assert!(result.text.contains("Field Office"), "got {}", result.text);
    }
}
