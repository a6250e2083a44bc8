use std::collections::VecDeque;

use crate::snapshot::Snapshot;

pub const DEFAULT_UNDO_DEPTH: usize = 10;

/// A snapshot taken right before page `page_index` (1-based) was deleted.
#[derive(Debug, Clone)]
pub struct UndoEntry {
    pub snapshot: Snapshot,
    pub page_index: usize,
}

/// Bounded stack of undo entries; the oldest entry is evicted first.
#[derive(Debug)]
pub struct UndoHistory {
    entries: VecDeque<UndoEntry>,
    depth: usize,
}

impl UndoHistory {
    pub fn new(depth: usize) -> Self {
        let depth = depth.max(1);
        Self {
            entries: VecDeque::with_capacity(depth),
            depth,
        }
    }

    /// Appends `entry`, returning the oldest entry if it had to be evicted.
    pub fn push(&mut self, entry: UndoEntry) -> Option<UndoEntry> {
        let evicted = if self.entries.len() == self.depth {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    /// Takes back the newest entry and reinstates whatever its push evicted,
    /// leaving the history exactly as it was before that push.
    pub fn retract(&mut self, evicted: Option<UndoEntry>) -> Option<UndoEntry> {
        let newest = self.entries.pop_back();
        if let Some(oldest) = evicted {
            self.entries.push_front(oldest);
        }
        newest
    }

    pub fn pop(&mut self) -> Option<UndoEntry> {
        self.entries.pop_back()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::*;

    fn entry(page_index: usize) -> UndoEntry {
        UndoEntry {
            snapshot: Snapshot::new(Uuid::nil(), Arc::from(vec![page_index as u8]), 1),
            page_index,
        }
    }

    #[test]
    fn pop_returns_most_recent_first() {
        let mut history = UndoHistory::default();
        history.push(entry(1));
        history.push(entry(2));

        assert_eq!(history.pop().unwrap().page_index, 2);
        assert_eq!(history.pop().unwrap().page_index, 1);
        assert!(history.pop().is_none());
    }

    #[test]
    fn eleventh_push_evicts_exactly_the_oldest() {
        let mut history = UndoHistory::default();
        for page in 1..=11 {
            history.push(entry(page));
        }

        assert_eq!(history.len(), DEFAULT_UNDO_DEPTH);
        let mut popped = Vec::new();
        while let Some(entry) = history.pop() {
            popped.push(entry.page_index);
        }
        assert_eq!(popped, (2..=11).rev().collect::<Vec<_>>());
    }

    #[test]
    fn retract_restores_evicted_entry() {
        let mut history = UndoHistory::new(2);
        history.push(entry(1));
        history.push(entry(2));
        let evicted = history.push(entry(3));
        assert_eq!(evicted.as_ref().map(|e| e.page_index), Some(1));

        let retracted = history.retract(evicted);
        assert_eq!(retracted.unwrap().page_index, 3);
        assert_eq!(history.len(), 2);
        assert_eq!(history.pop().unwrap().page_index, 2);
        assert_eq!(history.pop().unwrap().page_index, 1);
    }

    #[test]
    fn zero_depth_is_raised_to_one() {
        let mut history = UndoHistory::new(0);
        history.push(entry(1));
        history.push(entry(2));
        assert_eq!(history.depth(), 1);
        assert_eq!(history.len(), 1);
        assert_eq!(history.pop().unwrap().page_index, 2);
    }
}
