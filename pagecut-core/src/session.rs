use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::backend::{DocumentRenderer, PageMutator, RenderedDocument};
use crate::config::EditorConfig;
use crate::error::EditorError;
use crate::export::{edited_file_name, Export};
use crate::history::{UndoEntry, UndoHistory};
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::source::DocumentSource;
use crate::view::{clamp_page, ViewState};
use crate::{Command, Notice, SessionEvent};

/// Where an edit currently stands. Anything other than `Idle` means an
/// edit is in flight and further edits are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPhase {
    Idle,
    Validating,
    Mutating,
    Projecting,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub page_count: usize,
    pub active_page: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoOutcome {
    pub page_count: usize,
    pub active_page: usize,
}

struct SessionState {
    store: SnapshotStore,
    history: UndoHistory,
    view: ViewState,
    document: Option<Arc<dyn RenderedDocument>>,
    source_name: Option<String>,
}

struct EditPermit<'a> {
    phase: &'a Mutex<EditPhase>,
}

impl EditPermit<'_> {
    fn advance(&self, next: EditPhase) {
        debug!(?next, "edit phase");
        *self.phase.lock() = next;
    }
}

impl Drop for EditPermit<'_> {
    fn drop(&mut self) {
        *self.phase.lock() = EditPhase::Idle;
    }
}

/// One document editing session: the current snapshot, its undo history and
/// the view over it. Loads, deletes and undos run one at a time.
pub struct EditSession {
    renderer: Arc<dyn DocumentRenderer>,
    mutator: Arc<dyn PageMutator>,
    state: Mutex<SessionState>,
    phase: Mutex<EditPhase>,
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl EditSession {
    pub fn new(
        renderer: Arc<dyn DocumentRenderer>,
        mutator: Arc<dyn PageMutator>,
        config: &EditorConfig,
    ) -> Self {
        Self {
            renderer,
            mutator,
            state: Mutex::new(SessionState {
                store: SnapshotStore::new(),
                history: UndoHistory::new(config.undo_depth),
                view: ViewState::new(config.zoom),
                document: None,
                source_name: None,
            }),
            phase: Mutex::new(EditPhase::Idle),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn events(&self) -> Arc<Mutex<Vec<SessionEvent>>> {
        Arc::clone(&self.events)
    }

    pub fn drain_events(&self) -> Vec<SessionEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn snapshot(&self) -> Option<Snapshot> {
        self.state.lock().store.current().cloned()
    }

    pub fn view(&self) -> ViewState {
        self.state.lock().view
    }

    pub fn document(&self) -> Option<Arc<dyn RenderedDocument>> {
        self.state.lock().document.clone()
    }

    pub fn source_name(&self) -> Option<String> {
        self.state.lock().source_name.clone()
    }

    pub fn undo_depth_used(&self) -> usize {
        self.state.lock().history.len()
    }

    pub fn phase(&self) -> EditPhase {
        *self.phase.lock()
    }

    fn begin_edit(&self) -> Result<EditPermit<'_>, EditorError> {
        let mut phase = self.phase.lock();
        if *phase != EditPhase::Idle {
            return Err(EditorError::EditInProgress);
        }
        *phase = EditPhase::Validating;
        Ok(EditPermit { phase: &self.phase })
    }

    /// Edits call this while still holding `state`, so a reader that sees the
    /// new snapshot also sees its events. Lock order is `state` then `events`.
    fn emit(&self, events: impl IntoIterator<Item = SessionEvent>) {
        self.events.lock().extend(events);
    }

    fn report(&self, err: &EditorError) {
        warn!(error = %err, source = ?std::error::Error::source(err), "edit failed");
        self.emit([SessionEvent::Notice(Notice::warning(err.user_message()))]);
    }

    /// Replaces the session's document. A rejected file leaves the previous
    /// document (or the empty state) in place.
    #[instrument(skip(self, source), fields(name = %source.name, bytes = source.bytes.len()))]
    pub async fn load(&self, source: DocumentSource) -> Result<Snapshot, EditorError> {
        let result = self.load_inner(source).await;
        if let Err(err) = &result {
            self.report(err);
        }
        result
    }

    async fn load_inner(&self, source: DocumentSource) -> Result<Snapshot, EditorError> {
        let permit = self.begin_edit()?;
        let bytes: Arc<[u8]> = Arc::from(source.bytes);

        permit.advance(EditPhase::Mutating);
        let document = self.renderer.open(Arc::clone(&bytes)).await.map_err(|err| {
            permit.advance(EditPhase::Failed);
            EditorError::Load(err)
        })?;

        permit.advance(EditPhase::Projecting);
        let snapshot = Snapshot::new(Uuid::new_v4(), bytes, document.page_count());
        {
            let mut state = self.state.lock();
            state.store.load(snapshot.clone());
            state.history.clear();
            state.document = Some(document);
            state.source_name = Some(source.name);
            state.view.active_page = clamp_page(1, snapshot.page_count);
            state.view.thumbnails_visible = true;
            self.emit([
                SessionEvent::DocumentLoaded(snapshot.id),
                SessionEvent::PagesChanged { from: 1 },
                SessionEvent::ActivePageChanged(state.view.active_page),
            ]);
        }

        info!(id = %snapshot.id, pages = snapshot.page_count, "document loaded");
        Ok(snapshot)
    }

    pub async fn delete_active_page(&self) -> Result<DeleteOutcome, EditorError> {
        let active = self.view().active_page;
        self.delete_page(active).await
    }

    /// Removes page `index` (1-based). The pre-edit snapshot is pushed onto
    /// the undo history first and taken back off if the edit fails.
    #[instrument(skip(self))]
    pub async fn delete_page(&self, index: usize) -> Result<DeleteOutcome, EditorError> {
        let result = self.delete_page_inner(index).await;
        if let Err(err) = &result {
            self.report(err);
        }
        result
    }

    async fn delete_page_inner(&self, index: usize) -> Result<DeleteOutcome, EditorError> {
        let permit = self.begin_edit()?;

        let (base, evicted) = {
            let mut state = self.state.lock();
            let snapshot = state
                .store
                .current()
                .cloned()
                .ok_or(EditorError::NoDocument)?;
            if snapshot.page_count == 1 {
                return Err(EditorError::SingletonPage);
            }
            if index == 0 || index > snapshot.page_count {
                return Err(EditorError::InvalidPage {
                    index,
                    page_count: snapshot.page_count,
                });
            }
            let evicted = state.history.push(UndoEntry {
                snapshot: snapshot.clone(),
                page_index: index,
            });
            (snapshot, evicted)
        };

        permit.advance(EditPhase::Mutating);
        let edited = match self
            .mutator
            .remove_page(Arc::clone(&base.bytes), index - 1)
            .await
        {
            Ok(bytes) => Arc::<[u8]>::from(bytes),
            Err(err) => {
                permit.advance(EditPhase::Failed);
                self.state.lock().history.retract(evicted);
                return Err(EditorError::Edit(err));
            }
        };
        let document = match self.renderer.open(Arc::clone(&edited)).await {
            Ok(document) => document,
            Err(err) => {
                permit.advance(EditPhase::Failed);
                self.state.lock().history.retract(evicted);
                return Err(EditorError::Reopen(err));
            }
        };

        permit.advance(EditPhase::Projecting);
        let page_count = document.page_count();
        let outcome = {
            let mut state = self.state.lock();
            state
                .store
                .replace(Snapshot::new(base.id, edited, page_count));
            state.document = Some(document);
            let moved = state.view.focus(index.min(page_count), page_count);
            let active_page = state.view.active_page;
            let mut events = vec![SessionEvent::PagesChanged { from: index }];
            if moved {
                events.push(SessionEvent::ActivePageChanged(active_page));
            }
            self.emit(events);
            DeleteOutcome {
                page_count,
                active_page,
            }
        };

        info!(page = index, remaining = page_count, "page deleted");
        Ok(outcome)
    }

    /// Restores the snapshot taken before the most recent delete. An empty
    /// history is not an error.
    #[instrument(skip(self))]
    pub async fn undo(&self) -> Result<Option<UndoOutcome>, EditorError> {
        let result = self.undo_inner().await;
        if let Err(err) = &result {
            self.report(err);
        }
        result
    }

    async fn undo_inner(&self) -> Result<Option<UndoOutcome>, EditorError> {
        let permit = self.begin_edit()?;

        let popped = self.state.lock().history.pop();
        let Some(entry) = popped else {
            debug!("nothing to undo");
            return Ok(None);
        };

        permit.advance(EditPhase::Mutating);
        let document = match self.renderer.open(Arc::clone(&entry.snapshot.bytes)).await {
            Ok(document) => document,
            Err(err) => {
                permit.advance(EditPhase::Failed);
                self.state.lock().history.push(entry);
                return Err(EditorError::Reopen(err));
            }
        };

        permit.advance(EditPhase::Projecting);
        let outcome = {
            let mut state = self.state.lock();
            let page_count = entry.snapshot.page_count;
            state.store.replace(entry.snapshot);
            state.document = Some(document);
            state.view.focus(entry.page_index, page_count);
            self.emit([
                SessionEvent::PagesChanged { from: 1 },
                SessionEvent::ActivePageChanged(state.view.active_page),
            ]);
            UndoOutcome {
                page_count,
                active_page: state.view.active_page,
            }
        };

        info!(
            page = outcome.active_page,
            pages = outcome.page_count,
            "delete undone"
        );
        Ok(Some(outcome))
    }

    /// Applies a view command. Returns whether anything visible changed.
    pub fn apply(&self, command: Command) -> bool {
        let mut state = self.state.lock();
        let page_count = state.store.page_count();
        let view = &mut state.view;
        let event = match command {
            Command::NextPage { count } => view
                .focus(view.active_page.saturating_add(count), page_count)
                .then(|| SessionEvent::ActivePageChanged(view.active_page)),
            Command::PrevPage { count } => view
                .focus(view.active_page.saturating_sub(count), page_count)
                .then(|| SessionEvent::ActivePageChanged(view.active_page)),
            Command::GotoPage { page } => view
                .focus(page, page_count)
                .then(|| SessionEvent::ActivePageChanged(view.active_page)),
            Command::ZoomIn => view
                .zoom_in()
                .then(|| SessionEvent::ZoomChanged(view.zoom)),
            Command::ZoomOut => view
                .zoom_out()
                .then(|| SessionEvent::ZoomChanged(view.zoom)),
            Command::ResetZoom => view
                .reset_zoom()
                .then(|| SessionEvent::ZoomChanged(view.zoom)),
            Command::ToggleThumbnails => {
                if page_count > 0 {
                    view.thumbnails_visible = !view.thumbnails_visible;
                    return true;
                }
                None
            }
        };
        let changed = event.is_some();
        self.emit(event);
        changed
    }

    /// The current bytes and the name to save them under.
    pub fn export(&self, now: DateTime<Utc>) -> Result<Export, EditorError> {
        let current = {
            let state = self.state.lock();
            state
                .store
                .current()
                .map(|snapshot| (Arc::clone(&snapshot.bytes), state.source_name.clone()))
        };
        let Some((bytes, source_name)) = current else {
            let err = EditorError::NothingToExport;
            self.report(&err);
            return Err(err);
        };
        let original = source_name.as_deref().unwrap_or("document.pdf");
        info!(bytes = bytes.len(), "document exported");
        Ok(Export {
            file_name: edited_file_name(original, now),
            bytes,
        })
    }
}
