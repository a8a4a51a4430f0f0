use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::SourceTag;
use crate::pipeline::batch::discovery::SourceDirectory;
use crate::pipeline::extraction::pdfium::DEFAULT_RENDER_DPI;
use crate::pipeline::extraction::{UsabilityThresholds, DEFAULT_MAX_OCR_PAGES};
use crate::pipeline::geocode::{GeocodeMode, JurisdictionConfig};

/// Application-level constants
pub const APP_NAME: &str = "GuardianIngest";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "GUARDIAN_CONFIG";

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// ~/GuardianIngest/ (falls back to the working directory without a home).
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "guardian_lib=info,guardian_ingest=info"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Invalid config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    #[serde(flatten)]
    pub limits: UsabilityThresholds,
    pub render_dpi: u32,
    /// Scanned pages rendered and recognized per document.
    pub max_ocr_pages: usize,
    /// Bind PDFium for page rendering; without it scanned PDFs cannot be OCR'd.
    pub enable_pdfium: bool,
    /// Library file or the directory holding it. Unset binds from the system path.
    pub pdfium_library: Option<PathBuf>,
    /// Required for OCR (`ocr` feature).
    pub tessdata_dir: Option<PathBuf>,
    pub ocr_languages: String,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            limits: UsabilityThresholds::default(),
            render_dpi: DEFAULT_RENDER_DPI,
            max_ocr_pages: DEFAULT_MAX_OCR_PAGES,
            enable_pdfium: true,
            pdfium_library: None,
            tessdata_dir: None,
            ocr_languages: "eng".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodeSettings {
    pub mode: GeocodeMode,
    /// Defaults to `geocode_cache.json` in the output directory.
    pub cache_file: Option<PathBuf>,
    pub service_url: String,
    pub timeout_secs: u64,
    /// Minimum spacing between live requests.
    pub min_interval_ms: u64,
    pub user_agent: String,
    pub jurisdiction: JurisdictionConfig,
}

impl Default for GeocodeSettings {
    fn default() -> Self {
        Self {
            mode: GeocodeMode::Online,
            cache_file: None,
            service_url: "https://nominatim.openstreetmap.org".into(),
            timeout_secs: 10,
            min_interval_ms: 1000,
            user_agent: format!("guardian-ingest/{APP_VERSION}"),
            jurisdiction: JurisdictionConfig::default(),
        }
    }
}

/// File names inside the output directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputNames {
    pub primary: String,
    pub tabular: String,
    pub rejects: String,
    /// Input file to case id map used to drop superseded entries on rerun.
    pub manifest: String,
}

impl Default for OutputNames {
    fn default() -> Self {
        Self {
            primary: "guardian_output.jsonl".into(),
            tabular: "guardian_output.csv".into(),
            rejects: "guardian_rejects.jsonl".into(),
            manifest: "guardian_manifest.json".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub input_root: PathBuf,
    pub output_dir: PathBuf,
    /// Scanned in order; each directory's name hints at its source.
    pub sources: Vec<SourceDirectory>,
    pub extraction: ExtractionSettings,
    pub geocode: GeocodeSettings,
    pub outputs: OutputNames,
}

impl Default for IngestConfig {
    fn default() -> Self {
        let base = app_data_dir();
        Self {
            input_root: base.join("input"),
            output_dir: base.join("output"),
            sources: vec![
                SourceDirectory::new("namus", SourceTag::NamUs),
                SourceDirectory::new("ncmec", SourceTag::Ncmec),
                SourceDirectory::new("fbi", SourceTag::Fbi),
                SourceDirectory::new("charley", SourceTag::Charley),
            ],
            extraction: ExtractionSettings::default(),
            geocode: GeocodeSettings::default(),
            outputs: OutputNames::default(),
        }
    }
}

impl IngestConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: IngestConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit path, then `GUARDIAN_CONFIG`, then `~/GuardianIngest/config.toml`
    /// if present. Otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }
        let default_path = app_data_dir().join(CONFIG_FILE_NAME);
        if default_path.exists() {
            return Self::from_file(&default_path);
        }
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.geocode.jurisdiction.validate().map_err(ConfigError::Invalid)?;

        let ratio = self.extraction.limits.min_alnum_ratio;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(ConfigError::Invalid(format!(
                "extraction.min_alnum_ratio must be within 0..=1, got {ratio}"
            )));
        }
        if !(72..=1200).contains(&self.extraction.render_dpi) {
            return Err(ConfigError::Invalid(format!(
                "extraction.render_dpi must be within 72..=1200, got {}",
                self.extraction.render_dpi
            )));
        }
        if self.extraction.max_ocr_pages == 0 {
            return Err(ConfigError::Invalid("extraction.max_ocr_pages must be positive".into()));
        }
        if self.geocode.timeout_secs == 0 {
            return Err(ConfigError::Invalid("geocode.timeout_secs must be positive".into()));
        }
        if self.sources.is_empty() {
            return Err(ConfigError::Invalid("at least one source directory is required".into()));
        }
        let names = [
            &self.outputs.primary,
            &self.outputs.tabular,
            &self.outputs.rejects,
            &self.outputs.manifest,
        ];
        if names.iter().any(|n| n.trim().is_empty()) {
            return Err(ConfigError::Invalid("output file names must not be empty".into()));
        }
        for (i, name) in names.iter().enumerate() {
            if names[i + 1..].contains(name) {
                return Err(ConfigError::Invalid(format!("output file name {name} is used twice")));
            }
        }
        Ok(())
    }

    pub fn geocode_cache_path(&self) -> PathBuf {
        self.geocode
            .cache_file
            .clone()
            .unwrap_or_else(|| self.output_dir.join("geocode_cache.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_is_named_after_app() {
        assert!(app_data_dir().ends_with(APP_NAME));
    }

    #[test]
    fn defaults_are_valid() {
        let config = IngestConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sources.len(), 4);
        assert_eq!(config.outputs.primary, "guardian_output.jsonl");
        assert!(config.geocode_cache_path().ends_with("geocode_cache.json"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
input_root = "/data/cases"
output_dir = "/data/out"

[extraction]
min_chars = 80
max_ocr_pages = 4
pdfium_library = "/opt/pdfium/lib"

[geocode]
mode = "cache_only"
min_interval_ms = 250

[geocode.jurisdiction]
default_city = "Norfolk"
default_latitude = 36.8508
default_longitude = -76.2859

[[sources]]
directory = "missingkids"
hint = "ncmec"
"#,
        )
        .unwrap();

        let config = IngestConfig::from_file(&path).unwrap();
        assert_eq!(config.input_root, PathBuf::from("/data/cases"));
        assert_eq!(config.extraction.limits.min_chars, 80);
        assert_eq!(config.extraction.limits.min_alnum_ratio, 0.5);
        assert_eq!(config.extraction.max_ocr_pages, 4);
        assert_eq!(config.extraction.pdfium_library, Some(PathBuf::from("/opt/pdfium/lib")));
        assert_eq!(config.geocode.mode, GeocodeMode::CacheOnly);
        assert_eq!(config.geocode.min_interval_ms, 250);
        assert_eq!(config.geocode.timeout_secs, 10);
        assert_eq!(config.geocode.jurisdiction.default_city, "Norfolk");
        assert_eq!(config.geocode.jurisdiction.state_code, "VA");
        assert_eq!(config.sources, vec![SourceDirectory::new("missingkids", SourceTag::Ncmec)]);
        assert_eq!(config.geocode_cache_path(), PathBuf::from("/data/out/geocode_cache.json"));
    }

    #[test]
    fn inverted_jurisdiction_box_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[geocode.jurisdiction]\nmin_latitude = 45.0\n").unwrap();
        let err = IngestConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "input_root = [").unwrap();
        assert!(matches!(IngestConfig::from_file(&path), Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = IngestConfig::from_file(Path::new("/nonexistent/guardian.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead(_)));
    }

    #[test]
    fn duplicate_output_names_are_rejected() {
        let mut config = IngestConfig::default();
        config.outputs.rejects = config.outputs.primary.clone();
        assert!(config.validate().is_err());

        let mut config = IngestConfig::default();
        config.outputs.manifest = config.outputs.tabular.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_ocr_page_limit_is_rejected() {
        let mut config = IngestConfig::default();
        config.extraction.max_ocr_pages = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }
}
