//! Batch orchestration: discover, run each document through the pipeline,
//! route the result, keep outputs and the geocode cache on disk current.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::discovery::{discover, load_document, DiscoveredDocument};
use super::output::{OutputSet, RejectEntry};
use super::BatchError;
use crate::config::{ExtractionSettings, IngestConfig};
use crate::models::{CaseRecord, Document, RecordKey};
use crate::pipeline::classify::classify_source;
use crate::pipeline::extraction::pdfium::{PdfiumBinding, PdfiumRenderer};
use crate::pipeline::extraction::{DocumentExtractor, ExtractionError, PdfTextExtractor, TextExtractor};
use crate::pipeline::fields::extract_fields;
use crate::pipeline::geocode::{GeocodeCache, GeocodeMode, Geocoder, NominatimClient};
use crate::pipeline::normalize::normalize;
use crate::pipeline::validate::{validate_record, Violation};

/// Result of one document's pass through the pipeline.
#[derive(Debug)]
pub enum DocumentOutcome {
    Accepted(CaseRecord),
    Flagged {
        record: CaseRecord,
        violations: Vec<Violation>,
    },
    ExtractionFailed(ExtractionError),
}

/// Counts returned and logged at the end of every run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub documents_seen: u32,
    pub succeeded: u32,
    pub validation_flagged: u32,
    pub extraction_failed: u32,
    pub duration_ms: u64,
    pub errors: Vec<String>,
}

/// Progress events for an optional observer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BatchStatusEvent {
    Started {
        document_count: u32,
    },
    Progress {
        completed: u32,
        total: u32,
        current_file: String,
    },
    Completed {
        succeeded: u32,
        validation_flagged: u32,
        extraction_failed: u32,
        duration_ms: u64,
    },
}

pub struct BatchRunner {
    extractor: Box<dyn TextExtractor + Send + Sync>,
    geocoder: Geocoder,
}

impl BatchRunner {
    pub fn new(extractor: Box<dyn TextExtractor + Send + Sync>, geocoder: Geocoder) -> Self {
        Self { extractor, geocoder }
    }

    pub fn geocoder(&self) -> &Geocoder {
        &self.geocoder
    }

    /// Extract, classify, extract fields, normalize, geocode, validate.
    pub fn process_document(&mut self, document: &Document) -> DocumentOutcome {
        let extracted = match self.extractor.extract(document) {
            Ok(e) => e,
            Err(e) => return DocumentOutcome::ExtractionFailed(e),
        };

        let classification = classify_source(&extracted.text, document.source_hint);
        let key = RecordKey::new(classification.source, document.filename.clone());
        let fields = extract_fields(classification.source, &extracted.text);
        let mut record = normalize(&fields, &extracted.text, &key);

        if let Some(resolution) = self.geocoder.apply(&mut record) {
            tracing::debug!(filename = %document.filename, resolution = ?resolution, "Coordinates assigned");
        }

        let violations = validate_record(&record);
        tracing::info!(
            filename = %document.filename,
            source = %classification.source,
            basis = ?classification.basis,
            method = ?extracted.method,
            fields = fields.len(),
            violations = violations.len(),
            "Document processed"
        );

        if violations.is_empty() {
            DocumentOutcome::Accepted(record)
        } else {
            DocumentOutcome::Flagged { record, violations }
        }
    }

    /// Run every document, writing outputs after each one. Per-document
    /// failures are counted; only output or cache persistence errors abort.
    pub fn run(
        &mut self,
        documents: &[DiscoveredDocument],
        outputs: &mut OutputSet,
        progress_fn: Option<&dyn Fn(BatchStatusEvent)>,
    ) -> Result<BatchSummary, BatchError> {
        let start = Instant::now();
        let total = documents.len() as u32;
        let mut summary = BatchSummary::default();

        tracing::info!(documents = total, "Starting batch");
        if let Some(progress) = progress_fn {
            progress(BatchStatusEvent::Started { document_count: total });
        }

        for (index, discovered) in documents.iter().enumerate() {
            if let Some(progress) = progress_fn {
                progress(BatchStatusEvent::Progress {
                    completed: index as u32,
                    total,
                    current_file: discovered.filename.clone(),
                });
            }
            summary.documents_seen += 1;

            // Extraction failures are filed under the directory hint; the
            // real source is only known once text is recovered. Whatever id
            // the file lands under, the output set drops its previous entry.
            let hint_key = RecordKey::new(discovered.source_hint, discovered.filename.clone());
            let origin = discovered.origin.as_str();

            let outcome = match load_document(discovered) {
                Ok(document) => self.process_document(&document),
                Err(e) => DocumentOutcome::ExtractionFailed(ExtractionError::Io(e)),
            };

            match outcome {
                DocumentOutcome::Accepted(record) => {
                    outputs.accept(origin, record);
                    summary.succeeded += 1;
                }
                DocumentOutcome::Flagged { record, violations } => {
                    tracing::warn!(
                        filename = %discovered.filename,
                        violations = violations.len(),
                        first = %violations[0].path,
                        "Record failed schema validation, routing to side channel"
                    );
                    outputs.reject(origin, RejectEntry::schema_violation(record, violations));
                    summary.validation_flagged += 1;
                }
                DocumentOutcome::ExtractionFailed(e) => {
                    tracing::error!(
                        filename = %discovered.filename,
                        path = %discovered.path.display(),
                        error = %e,
                        "Extraction failed, document needs manual follow-up"
                    );
                    summary.errors.push(format!("{}: {e}", discovered.filename));
                    outputs.reject(
                        origin,
                        RejectEntry::extraction_failure(
                            hint_key.case_id(),
                            hint_key.source,
                            &discovered.filename,
                            e.to_string(),
                        ),
                    );
                    summary.extraction_failed += 1;
                }
            }

            outputs.flush()?;
        }

        self.geocoder.persist()?;

        summary.duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            documents_seen = summary.documents_seen,
            succeeded = summary.succeeded,
            validation_flagged = summary.validation_flagged,
            extraction_failed = summary.extraction_failed,
            duration_ms = summary.duration_ms,
            "Batch complete"
        );
        if let Some(progress) = progress_fn {
            progress(BatchStatusEvent::Completed {
                succeeded: summary.succeeded,
                validation_flagged: summary.validation_flagged,
                extraction_failed: summary.extraction_failed,
                duration_ms: summary.duration_ms,
            });
        }
        Ok(summary)
    }
}

// ═══════════════════════════════════════════
// Wiring from configuration
// ═══════════════════════════════════════════

pub fn build_extractor(settings: &ExtractionSettings) -> Result<DocumentExtractor, BatchError> {
    let mut extractor = DocumentExtractor::new(Box::new(PdfTextExtractor))
        .with_limits(settings.limits)
        .with_render_dpi(settings.render_dpi)
        .with_max_ocr_pages(settings.max_ocr_pages);

    if settings.enable_pdfium {
        match PdfiumRenderer::new(PdfiumBinding::from_setting(settings.pdfium_library.clone())) {
            Ok(renderer) => extractor = extractor.with_pdf_renderer(Box::new(renderer)),
            Err(e) => tracing::warn!(error = %e, "PDFium unavailable, scanned PDFs will not be OCR'd"),
        }
    }

    #[cfg(feature = "ocr")]
    if let Some(dir) = &settings.tessdata_dir {
        let engine = crate::pipeline::extraction::BundledTesseract::new(dir)?.with_languages(&settings.ocr_languages);
        extractor = extractor.with_ocr_engine(Box::new(engine));
    }

    #[cfg(not(feature = "ocr"))]
    if settings.tessdata_dir.is_some() {
        tracing::warn!("tessdata_dir set but built without the `ocr` feature; OCR disabled");
    }

    Ok(extractor)
}

pub fn build_geocoder(config: &IngestConfig) -> Result<Geocoder, BatchError> {
    let settings = &config.geocode;
    let cache = match settings.mode {
        GeocodeMode::Disabled => GeocodeCache::in_memory(),
        _ => GeocodeCache::load(config.geocode_cache_path())?,
    };

    let mut geocoder = Geocoder::new(settings.mode, settings.jurisdiction.clone(), cache);
    if settings.mode == GeocodeMode::Online {
        let client = NominatimClient::new(&settings.service_url, settings.timeout_secs, &settings.user_agent)?
            .with_min_interval(Duration::from_millis(settings.min_interval_ms));
        geocoder = geocoder.with_service(Box::new(client));
    }
    Ok(geocoder)
}

/// Discover documents under the configured input root and run them all.
pub fn run_full_batch(
    config: &IngestConfig,
    progress_fn: Option<&dyn Fn(BatchStatusEvent)>,
) -> Result<BatchSummary, BatchError> {
    let documents = discover(&config.input_root, &config.sources)?;
    let extractor = build_extractor(&config.extraction)?;
    let geocoder = build_geocoder(config)?;
    let mut outputs = OutputSet::open(&config.output_dir, &config.outputs)?;

    let mut runner = BatchRunner::new(Box::new(extractor), geocoder);
    runner.run(&documents, &mut outputs, progress_fn)
}
