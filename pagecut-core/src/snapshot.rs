use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

pub type DocumentId = Uuid;

/// One immutable state of the edited file.
#[derive(Clone)]
pub struct Snapshot {
    pub id: DocumentId,
    pub bytes: Arc<[u8]>,
    pub page_count: usize,
}

impl Snapshot {
    pub fn new(id: DocumentId, bytes: Arc<[u8]>, page_count: usize) -> Self {
        Self {
            id,
            bytes,
            page_count,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("id", &self.id)
            .field("bytes", &self.bytes.len())
            .field("page_count", &self.page_count)
            .finish()
    }
}

/// Holds the current snapshot of the session's document.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: Option<Snapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a freshly loaded document. Clearing the undo history is the
    /// caller's job since the store does not own it.
    pub fn load(&mut self, snapshot: Snapshot) -> Snapshot {
        self.current = Some(snapshot.clone());
        snapshot
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.current.as_ref()
    }

    pub fn replace(&mut self, snapshot: Snapshot) -> Snapshot {
        self.current = Some(snapshot.clone());
        snapshot
    }

    pub fn page_count(&self) -> usize {
        self.current.as_ref().map_or(0, |s| s.page_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(bytes: &[u8], pages: usize) -> Snapshot {
        Snapshot::new(Uuid::new_v4(), Arc::from(bytes), pages)
    }

    #[test]
    fn empty_store_reports_no_document() {
        let store = SnapshotStore::new();
        assert!(store.current().is_none());
        assert_eq!(store.page_count(), 0);
    }

    #[test]
    fn replace_swaps_bytes_without_aliasing_previous() {
        let mut store = SnapshotStore::new();
        let first = store.load(snapshot(b"abc", 3));
        store.replace(snapshot(b"ab", 2));

        assert_eq!(&*first.bytes, b"abc");
        assert_eq!(&*store.current().unwrap().bytes, b"ab");
        assert_eq!(store.page_count(), 2);
    }
}
