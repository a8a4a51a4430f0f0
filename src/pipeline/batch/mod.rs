//! Batch ingestion over the configured source directories.

pub mod discovery;
pub mod error;
pub mod output;
pub mod runner;

pub use discovery::{discover, load_document, DiscoveredDocument, SourceDirectory};
pub use error::BatchError;
pub use output::{Failure, JsonlStore, OutputSet, RejectEntry};
pub use runner::{run_full_batch, BatchRunner, BatchStatusEvent, BatchSummary, DocumentOutcome};
