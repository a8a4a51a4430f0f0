//! Batch-fatal error types. Per-document failures never surface here;
//! they are isolated and counted in the summary.

use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::extraction::ExtractionError;
use crate::pipeline::geocode::GeocodeError;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Geocoder error: {0}")]
    Geocode(#[from] GeocodeError),

    #[error("Extractor setup failed: {0}")]
    ExtractorSetup(#[from] ExtractionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot write output {path}: {reason}")]
    Output { path: PathBuf, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Input root not found: {0}")]
    InputRootMissing(PathBuf),
}
