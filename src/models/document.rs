use super::enums::SourceTag;

/// One input file, read once per run.
#[derive(Debug, Clone)]
pub struct Document {
    pub bytes: Vec<u8>,
    pub filename: String,
    /// Source implied by the directory the file was found in.
    pub source_hint: Option<SourceTag>,
}

impl Document {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>, source_hint: Option<SourceTag>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            source_hint,
        }
    }
}
