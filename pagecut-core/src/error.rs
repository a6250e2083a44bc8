use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by a renderer backend.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to parse document: {0}")]
    Parse(String),
    #[error("page {index} out of range (document has {page_count} pages)")]
    PageOutOfRange { index: usize, page_count: usize },
    #[error("failed to rasterize page {index}: {message}")]
    Rasterize { index: usize, message: String },
}

/// Failures reported by a page mutator backend.
#[derive(Debug, Error)]
pub enum MutationError {
    #[error("failed to parse document: {0}")]
    Parse(String),
    #[error("page index {index} out of range (document has {page_count} pages)")]
    PageOutOfRange { index: usize, page_count: usize },
    #[error("failed to serialize document: {0}")]
    Save(String),
}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("failed to load document")]
    Load(#[source] RenderError),
    #[error("{0:?} is not a PDF file")]
    NotPdf(PathBuf),
    #[error("failed to read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot delete the only page of the document")]
    SingletonPage,
    #[error("page {index} out of range (document has {page_count} pages)")]
    InvalidPage { index: usize, page_count: usize },
    #[error("failed to delete page")]
    Edit(#[source] MutationError),
    #[error("edited document could not be reopened")]
    Reopen(#[source] RenderError),
    #[error("no document loaded")]
    NoDocument,
    #[error("no document loaded to export")]
    NothingToExport,
    #[error("another edit is still in progress")]
    EditInProgress,
}

impl EditorError {
    /// Text shown to the user in place of a crash or a silent failure.
    pub fn user_message(&self) -> String {
        match self {
            EditorError::Load(_) | EditorError::Io { .. } => {
                "Failed to load PDF. Please try again with a different file.".to_string()
            }
            EditorError::NotPdf(_) => "Please open a PDF file.".to_string(),
            EditorError::SingletonPage => "Cannot delete the last page of the PDF.".to_string(),
            EditorError::InvalidPage { index, page_count } => {
                format!("Page {index} does not exist (document has {page_count} pages).")
            }
            EditorError::Edit(_) | EditorError::Reopen(_) => {
                "An error occurred while deleting the page. Please try again.".to_string()
            }
            EditorError::NoDocument => "Please open a PDF first.".to_string(),
            EditorError::NothingToExport => "No PDF loaded to download.".to_string(),
            EditorError::EditInProgress => "Please wait for the current edit to finish.".to_string(),
        }
    }
}
