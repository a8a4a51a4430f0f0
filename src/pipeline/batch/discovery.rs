use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::BatchError;
use crate::models::{Document, SourceTag};

/// Extensions accepted as documents, compared case-insensitively.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg", "tif", "tiff", "txt"];

/// A directory under the input root whose files share a source hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDirectory {
    pub directory: String,
    pub hint: SourceTag,
}

impl SourceDirectory {
    pub fn new(directory: impl Into<String>, hint: SourceTag) -> Self {
        Self {
            directory: directory.into(),
            hint,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDocument {
    pub path: PathBuf,
    pub filename: String,
    pub source_hint: SourceTag,
    /// `<source directory>/<filename>`, stable across reruns whatever the
    /// document is later classified as.
    pub origin: String,
}

fn has_document_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| DOCUMENT_EXTENSIONS.iter().any(|d| e.eq_ignore_ascii_case(d)))
        .unwrap_or(false)
}

/// Files in each source directory, directories in configured order, files
/// sorted by name. Missing directories are skipped.
pub fn discover(root: &Path, sources: &[SourceDirectory]) -> Result<Vec<DiscoveredDocument>, BatchError> {
    if !root.is_dir() {
        return Err(BatchError::InputRootMissing(root.to_path_buf()));
    }

    let mut documents = Vec::new();
    for source in sources {
        let dir = root.join(&source.directory);
        if !dir.is_dir() {
            tracing::warn!(directory = %dir.display(), source = %source.hint, "Source directory missing, skipping");
            continue;
        }

        let mut found: Vec<DiscoveredDocument> = std::fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && has_document_extension(path))
            .filter_map(|path| {
                let filename = path.file_name()?.to_str()?.to_string();
                Some(DiscoveredDocument {
                    origin: format!("{}/{}", source.directory, filename),
                    path,
                    filename,
                    source_hint: source.hint,
                })
            })
            .collect();
        found.sort_by(|a, b| a.filename.cmp(&b.filename));

        tracing::info!(directory = %dir.display(), source = %source.hint, count = found.len(), "Discovered documents");
        documents.extend(found);
    }
    Ok(documents)
}

pub fn load_document(discovered: &DiscoveredDocument) -> std::io::Result<Document> {
    let bytes = std::fs::read(&discovered.path)?;
    Ok(Document::new(bytes, discovered.filename.clone(), Some(discovered.source_hint)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let namus = dir.path().join("namus");
        std::fs::create_dir(&namus).unwrap();
        std::fs::write(namus.join("b_case.PDF"), b"%PDF-1.4").unwrap();
        std::fs::write(namus.join("a_case.txt"), b"text").unwrap();
        std::fs::write(namus.join("notes.docx"), b"skip").unwrap();
        std::fs::create_dir(namus.join("nested.pdf")).unwrap();
        let fbi = dir.path().join("fbi");
        std::fs::create_dir(&fbi).unwrap();
        std::fs::write(fbi.join("poster.jpeg"), [0xFF, 0xD8, 0xFF]).unwrap();
        dir
    }

    #[test]
    fn lists_documents_sorted_with_hints() {
        let dir = layout();
        let sources = [
            SourceDirectory::new("namus", SourceTag::NamUs),
            SourceDirectory::new("fbi", SourceTag::Fbi),
        ];
        let docs = discover(dir.path(), &sources).unwrap();
        let names: Vec<_> = docs.iter().map(|d| d.filename.as_str()).collect();
        assert_eq!(names, ["a_case.txt", "b_case.PDF", "poster.jpeg"]);
        assert_eq!(docs[2].source_hint, SourceTag::Fbi);
        assert_eq!(docs[0].origin, "namus/a_case.txt");
        assert_eq!(docs[2].origin, "fbi/poster.jpeg");
    }

    #[test]
    fn missing_source_directory_is_skipped() {
        let dir = layout();
        let sources = [
            SourceDirectory::new("charley", SourceTag::Charley),
            SourceDirectory::new("fbi", SourceTag::Fbi),
        ];
        let docs = discover(dir.path(), &sources).unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn missing_root_is_an_error() {
        let err = discover(Path::new("/nonexistent/guardian"), &[]).unwrap_err();
        assert!(matches!(err, BatchError::InputRootMissing(_)));
    }

    #[test]
    fn load_carries_filename_and_hint() {
        let dir = layout();
        let docs = discover(dir.path(), &[SourceDirectory::new("fbi", SourceTag::Fbi)]).unwrap();
        let doc = load_document(&docs[0]).unwrap();
        assert_eq!(doc.filename, "poster.jpeg");
        assert_eq!(doc.source_hint, Some(SourceTag::Fbi));
        assert_eq!(doc.bytes, vec![0xFF, 0xD8, 0xFF]);
    }
}
