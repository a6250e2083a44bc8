use std::fs;
use std::path::Path;

use crate::error::EditorError;

/// A document as handed to the editor: its original file name and content.
#[derive(Debug, Clone)]
pub struct DocumentSource {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl DocumentSource {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Reads a PDF from disk. Only `.pdf` files are accepted; whether the
    /// content actually parses is up to the renderer.
    pub fn from_path(path: &Path) -> Result<Self, EditorError> {
        if !has_pdf_extension(path) {
            return Err(EditorError::NotPdf(path.to_path_buf()));
        }
        let bytes = fs::read(path).map_err(|source| EditorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        Ok(Self { name, bytes })
    }
}

pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}
