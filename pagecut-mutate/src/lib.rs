use std::sync::Arc;

use async_trait::async_trait;
use lopdf::Document;
use pagecut_core::{MutationError, PageMutator};
use tracing::{debug, instrument};

/// A parsed PDF that can have pages removed and be written back out.
pub struct EditableDocument {
    document: Document,
}

impl EditableDocument {
    pub fn load(bytes: &[u8]) -> Result<Self, MutationError> {
        let document =
            Document::load_mem(bytes).map_err(|err| MutationError::Parse(err.to_string()))?;
        Ok(Self { document })
    }

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Removes the page at `zero_based_index` and drops objects only it used.
    pub fn remove_page(&mut self, zero_based_index: usize) -> Result<(), MutationError> {
        let page_count = self.page_count();
        if zero_based_index >= page_count {
            return Err(MutationError::PageOutOfRange {
                index: zero_based_index,
                page_count,
            });
        }
        let page_number = u32::try_from(zero_based_index + 1).map_err(|_| {
            MutationError::PageOutOfRange {
                index: zero_based_index,
                page_count,
            }
        })?;

        self.document.delete_pages(&[page_number]);
        let pruned = self.document.prune_objects();
        debug!(page_number, pruned = pruned.len(), "removed page");

        if self.page_count() + 1 != page_count {
            return Err(MutationError::Save(format!(
                "page tree still lists {} pages after removing page {}",
                self.page_count(),
                page_number
            )));
        }
        Ok(())
    }

    pub fn save(&mut self) -> Result<Vec<u8>, MutationError> {
        let mut buffer = Vec::new();
        self.document
            .save_to(&mut buffer)
            .map_err(|err| MutationError::Save(err.to_string()))?;
        Ok(buffer)
    }
}

/// [`PageMutator`] backed by `lopdf`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfMutator;

impl LopdfMutator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PageMutator for LopdfMutator {
    #[instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    async fn remove_page(
        &self,
        bytes: Arc<[u8]>,
        zero_based_index: usize,
    ) -> Result<Vec<u8>, MutationError> {
        let mut document = EditableDocument::load(&bytes)?;
        document.remove_page(zero_based_index)?;
        document.save()
    }
}
