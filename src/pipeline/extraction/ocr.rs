use super::types::{OcrEngine, OcrPageResult};
use super::ExtractionError;

/// Bundled Tesseract OCR engine.
/// Only available when compiled with the `ocr` feature flag.
#[cfg(feature = "ocr")]
pub struct BundledTesseract {
    tessdata_dir: std::path::PathBuf,
    languages: String,
}

#[cfg(feature = "ocr")]
impl BundledTesseract {
    /// Initialize with a tessdata directory; `eng.traineddata` must exist.
    pub fn new(tessdata_dir: &std::path::Path) -> Result<Self, ExtractionError> {
        if !tessdata_dir.join("eng.traineddata").exists() {
            return Err(ExtractionError::TessdataNotFound(tessdata_dir.to_path_buf()));
        }
        Ok(Self {
            tessdata_dir: tessdata_dir.to_path_buf(),
            languages: "eng".to_string(),
        })
    }

    /// Set language(s) for OCR (e.g., "eng", "eng+spa")
    pub fn with_languages(mut self, langs: &str) -> Self {
        self.languages = langs.to_string();
        self
    }
}

#[cfg(feature = "ocr")]
impl OcrEngine for BundledTesseract {
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError> {
        let tessdata_str = self
            .tessdata_dir
            .to_str()
            .ok_or_else(|| ExtractionError::OcrInit("Invalid tessdata path".into()))?;

        let tess = tesseract::Tesseract::new(Some(tessdata_str), Some(self.languages.as_str()))
            .map_err(|e| ExtractionError::OcrInit(format!("{e:?}")))?;

        let mut tess = tess
            .set_image_from_mem(image_bytes)
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        let text = tess
            .get_text()
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        let confidence = tess.mean_text_conf().max(0) as f32 / 100.0;

        tracing::debug!(
            chars = text.len(),
            confidence,
            languages = %self.languages,
            "Tesseract page recognized"
        );

        Ok(OcrPageResult { text, confidence })
    }
}

/// Mock OCR engine for unit testing without Tesseract.
pub struct MockOcrEngine {
    pub text: String,
    pub confidence: f32,
}

impl MockOcrEngine {
    pub fn new(text: &str, confidence: f32) -> Self {
        Self {
            text: text.to_string(),
            confidence,
        }
    }
}

impl OcrEngine for MockOcrEngine {
    fn ocr_image(&self, _image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError> {
        Ok(OcrPageResult {
            text: self.text.clone(),
            confidence: self.confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_ocr_returns_configured_text() {
        let engine = MockOcrEngine::new("Missing Since: May 1, 2020", 0.88);
        let result = engine.ocr_image(b"fake_image_bytes").unwrap();
        assert_eq!(result.text, "Missing Since: May 1, 2020");
        assert!((result.confidence - 0.88).abs() < f32::EPSILON);
    }

    #[cfg(feature = "ocr")]
    #[test]
    fn tesseract_requires_tessdata() {
        let dir = tempfile::tempdir().unwrap();
        let result = BundledTesseract::new(dir.path());
        assert!(matches!(result, Err(ExtractionError::TessdataNotFound(_))));
    }
}
