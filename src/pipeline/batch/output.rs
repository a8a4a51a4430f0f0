//! Output streams: primary JSONL, its tabular projection, and the rejects
//! side channel. Every store is keyed by case id and rewritten atomically,
//! so rerunning a batch replaces entries instead of appending duplicates.
//! A manifest records which case id each input file was last filed under;
//! when a file's id changes, the entry under its old id is dropped.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::BatchError;
use crate::config::OutputNames;
use crate::models::{CaseRecord, SourceTag};
use crate::pipeline::atomic::write_atomic;
use crate::pipeline::validate::{leaf_fields, lookup, Violation};

/// Separator for list values in a single tabular cell.
pub const LIST_SEPARATOR: &str = "; ";

/// Entries that can live in a [`JsonlStore`].
pub trait Keyed {
    fn case_id(&self) -> Uuid;
}

impl Keyed for CaseRecord {
    fn case_id(&self) -> Uuid {
        self.case_id
    }
}

/// Why a document is in the side channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Failure {
    SchemaViolation { violations: Vec<Violation> },
    ExtractionFailure { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectEntry {
    pub case_id: Uuid,
    pub source: SourceTag,
    pub source_file: String,
    pub failure: Failure,
    /// The normalized record, when one was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<CaseRecord>,
}

impl RejectEntry {
    pub fn schema_violation(record: CaseRecord, violations: Vec<Violation>) -> Self {
        Self {
            case_id: record.case_id,
            source: record.source,
            source_file: record.source_file.clone(),
            failure: Failure::SchemaViolation { violations },
            record: Some(record),
        }
    }

    pub fn extraction_failure(case_id: Uuid, source: SourceTag, source_file: &str, error: String) -> Self {
        Self {
            case_id,
            source,
            source_file: source_file.to_string(),
            failure: Failure::ExtractionFailure { error },
            record: None,
        }
    }
}

impl Keyed for RejectEntry {
    fn case_id(&self) -> Uuid {
        self.case_id
    }
}

// ═══════════════════════════════════════════
// JSONL store
// ═══════════════════════════════════════════

/// One JSON object per line, keyed by case id, ordered by case id on disk.
#[derive(Debug)]
pub struct JsonlStore<T> {
    path: PathBuf,
    entries: BTreeMap<Uuid, T>,
}

impl<T: Keyed + Serialize + DeserializeOwned> JsonlStore<T> {
    /// Load an existing file. Lines that do not parse are dropped with a
    /// warning; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, BatchError> {
        let path = path.into();
        let mut entries = BTreeMap::new();

        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<T>(line) {
                Ok(entry) => {
                    entries.insert(entry.case_id(), entry);
                }
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    line = index + 1,
                    error = %e,
                    "Skipping malformed output line"
                ),
            }
        }

        tracing::debug!(path = %path.display(), entries = entries.len(), "Output store opened");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, case_id: &Uuid) -> Option<&T> {
        self.entries.get(case_id)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    /// Returns the entry it replaced.
    pub fn upsert(&mut self, entry: T) -> Option<T> {
        self.entries.insert(entry.case_id(), entry)
    }

    pub fn remove(&mut self, case_id: &Uuid) -> Option<T> {
        self.entries.remove(case_id)
    }

    pub fn save(&self) -> Result<(), BatchError> {
        let mut out = String::new();
        for entry in self.entries.values() {
            let line = serde_json::to_string(entry).map_err(|e| BatchError::Serialization(e.to_string()))?;
            out.push_str(&line);
            out.push('\n');
        }
        write_atomic(&self.path, out.as_bytes()).map_err(|e| BatchError::Output {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }
}

// ═══════════════════════════════════════════
// Tabular projection
// ═══════════════════════════════════════════

fn escape_cell(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(LIST_SEPARATOR),
        Some(other) => other.to_string(),
    }
}

/// Header row of schema leaf paths, then one row per record.
pub fn render_csv<'a>(records: impl IntoIterator<Item = &'a CaseRecord>) -> Result<String, BatchError> {
    let columns: Vec<&str> = leaf_fields().map(|f| f.path).collect();
    let mut out = columns.join(",");
    out.push('\n');

    for record in records {
        let value = serde_json::to_value(record).map_err(|e| BatchError::Serialization(e.to_string()))?;
        let row: Vec<String> = columns
            .iter()
            .map(|path| escape_cell(&cell_text(lookup(&value, path))))
            .collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    Ok(out)
}

// ═══════════════════════════════════════════
// Origin manifest
// ═══════════════════════════════════════════

/// Input file origin (`<source directory>/<filename>`) to the case id its
/// current output entry lives under.
#[derive(Debug)]
struct OriginManifest {
    path: PathBuf,
    entries: BTreeMap<String, Uuid>,
}

impl OriginManifest {
    fn open(path: PathBuf) -> Result<Self, BatchError> {
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Manifest unreadable, starting empty");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, entries })
    }

    /// Point `origin` at `case_id`. Returns the id it used to point at when
    /// that id changed and no other origin still holds it.
    fn claim(&mut self, origin: &str, case_id: Uuid) -> Option<Uuid> {
        let previous = self.entries.insert(origin.to_string(), case_id)?;
        if previous == case_id || self.entries.values().any(|id| *id == previous) {
            return None;
        }
        Some(previous)
    }

    fn save(&self) -> Result<(), BatchError> {
        let json = serde_json::to_string_pretty(&self.entries).map_err(|e| BatchError::Serialization(e.to_string()))?;
        write_atomic(&self.path, json.as_bytes()).map_err(|e| BatchError::Output {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }
}

// ═══════════════════════════════════════════
// Output set
// ═══════════════════════════════════════════

/// The outputs of a batch. A case id lives in at most one of the primary
/// stream and the side channel, and an input file has at most one entry
/// across both.
pub struct OutputSet {
    primary: JsonlStore<CaseRecord>,
    rejects: JsonlStore<RejectEntry>,
    manifest: OriginManifest,
    csv_path: PathBuf,
}

impl OutputSet {
    pub fn open(dir: &Path, names: &OutputNames) -> Result<Self, BatchError> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            primary: JsonlStore::open(dir.join(&names.primary))?,
            rejects: JsonlStore::open(dir.join(&names.rejects))?,
            manifest: OriginManifest::open(dir.join(&names.manifest))?,
            csv_path: dir.join(&names.tabular),
        })
    }

    pub fn primary(&self) -> &JsonlStore<CaseRecord> {
        &self.primary
    }

    pub fn rejects(&self) -> &JsonlStore<RejectEntry> {
        &self.rejects
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    /// Case id the file at `origin` was last filed under.
    pub fn filed_under(&self, origin: &str) -> Option<Uuid> {
        self.manifest.entries.get(origin).copied()
    }

    pub fn accept(&mut self, origin: &str, record: CaseRecord) {
        self.claim(origin, record.case_id);
        self.rejects.remove(&record.case_id);
        self.primary.upsert(record);
    }

    pub fn reject(&mut self, origin: &str, entry: RejectEntry) {
        self.claim(origin, entry.case_id);
        self.primary.remove(&entry.case_id);
        self.rejects.upsert(entry);
    }

    fn claim(&mut self, origin: &str, case_id: Uuid) {
        if let Some(stale) = self.manifest.claim(origin, case_id) {
            let dropped_primary = self.primary.remove(&stale).is_some();
            let dropped_reject = self.rejects.remove(&stale).is_some();
            tracing::info!(
                origin,
                stale = %stale,
                case_id = %case_id,
                dropped_primary,
                dropped_reject,
                "Input file now maps to a different case id, dropped its old entry"
            );
        }
    }

    /// Rewrite every file.
    pub fn flush(&self) -> Result<(), BatchError> {
        self.primary.save()?;
        self.rejects.save()?;
        self.manifest.save()?;
        let csv = render_csv(self.primary.values())?;
        write_atomic(&self.csv_path, csv.as_bytes()).map_err(|e| BatchError::Output {
            path: self.csv_path.clone(),
            reason: e.to_string(),
        })
    }
}
