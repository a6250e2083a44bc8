//! Page editing model: snapshots of the document bytes, a bounded undo
//! history, and the view derived from the current snapshot.

mod backend;
mod config;
mod error;
mod export;
mod history;
mod projection;
mod session;
mod snapshot;
mod source;
mod view;

pub use backend::{DocumentRenderer, PageMutator, PageSize, RenderImage, RenderedDocument};
pub use config::{ConfigError, EditorConfig, RenderConfig, ZoomConfig, CONFIG_FILE_NAME};
pub use error::{EditorError, MutationError, RenderError};
pub use export::{edited_file_name, Export};
pub use history::{UndoEntry, UndoHistory, DEFAULT_UNDO_DEPTH};
pub use projection::{prefetch_window, PageRaster, Projection, Projections};
pub use session::{DeleteOutcome, EditPhase, EditSession, UndoOutcome};
pub use snapshot::{DocumentId, Snapshot, SnapshotStore};
pub use source::{has_pdf_extension, DocumentSource};
pub use view::{clamp_page, page_label, ViewState};

/// View commands that never touch the document bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    NextPage { count: usize },
    PrevPage { count: usize },
    GotoPage { page: usize },
    ZoomIn,
    ZoomOut,
    ResetZoom,
    ToggleThumbnails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    DocumentLoaded(DocumentId),
    /// Pages from `from` (1-based) onward moved or changed.
    PagesChanged { from: usize },
    ActivePageChanged(usize),
    ZoomChanged(f32),
    Notice(Notice),
}
