pub mod config;
pub mod models;
pub mod pipeline;

use std::path::Path;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use config::{ConfigError, IngestConfig};
use pipeline::batch::{run_full_batch, BatchError, BatchSummary};

/// Conditions that abort a run before or during the batch.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Batch(#[from] BatchError),
}

/// Install the fmt subscriber; `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    // A subscriber may already be installed (tests, embedding callers).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}

pub fn run(config_path: Option<&Path>) -> Result<BatchSummary, RunError> {
    init_tracing();
    tracing::info!("Guardian ingest starting v{}", config::APP_VERSION);

    let config = IngestConfig::load(config_path)?;
    tracing::info!(
        input = %config.input_root.display(),
        output = %config.output_dir.display(),
        geocode = ?config.geocode.mode,
        "Configuration loaded"
    );

    Ok(run_full_batch(&config, None)?)
}
