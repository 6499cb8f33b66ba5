//! Array skip-list node
//!
//! A bounded sorted array of entries plus one forward link per level.

use super::{IndexEntry, MAX_ARRAY_LEN, MAX_LEVEL};

/// Arena index meaning "no next node"
pub(super) const NIL: usize = usize::MAX;

/// Arena index of the sentinel header
pub(super) const HEAD: usize = 0;

#[derive(Debug)]
pub(super) struct Node {
    /// Sorted by key, never longer than MAX_ARRAY_LEN.
    /// Empty only for the header and for freed slots.
    pub(super) entries: Vec<IndexEntry>,
    /// `forward[i]` is the next node at level i
    pub(super) forward: Vec<usize>,
}

impl Node {
    /// Sentinel header: no entries, links at every level
    pub(super) fn head() -> Self {
        Self {
            entries: Vec::new(),
            forward: vec![NIL; MAX_LEVEL],
        }
    }

    pub(super) fn new(entry: IndexEntry, level: usize) -> Self {
        let mut node = Self {
            entries: Vec::with_capacity(MAX_ARRAY_LEN),
            forward: Vec::with_capacity(level + 1),
        };
        node.reset(entry, level);
        node
    }

    /// Reinitialize a recycled slot
    pub(super) fn reset(&mut self, entry: IndexEntry, level: usize) {
        self.entries.clear();
        self.entries.push(entry);
        self.forward.clear();
        self.forward.resize(level + 1, NIL);
    }

    /// Drop contents of a freed slot
    pub(super) fn release(&mut self) {
        self.entries.clear();
        self.forward.clear();
    }

    /// Smallest key; only valid on non-header nodes
    pub(super) fn first_key(&self) -> &[u8] {
        &self.entries[0].key
    }

    /// Largest key; only valid on non-header nodes
    pub(super) fn last_key(&self) -> &[u8] {
        &self.entries[self.entries.len() - 1].key
    }

    pub(super) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(super) fn is_full(&self) -> bool {
        self.entries.len() >= MAX_ARRAY_LEN
    }

    pub(super) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of `key`, or where it would be inserted
    pub(super) fn find(&self, key: &[u8]) -> Result<usize, usize> {
        self.entries.binary_search_by(|e| e.key.as_slice().cmp(key))
    }

    /// Index of the first entry with key >= `key`
    pub(super) fn lower_bound(&self, key: &[u8]) -> usize {
        self.entries.partition_point(|e| e.key.as_slice() < key)
    }

    /// Insert at the sorted position, replacing an entry with the same key
    pub(super) fn insert_sorted(&mut self, entry: IndexEntry) -> Option<IndexEntry> {
        match self.find(&entry.key) {
            Ok(pos) => Some(std::mem::replace(&mut self.entries[pos], entry)),
            Err(pos) => {
                self.entries.insert(pos, entry);
                None
            }
        }
    }

    pub(super) fn pop_last(&mut self) -> Option<IndexEntry> {
        self.entries.pop()
    }

    pub(super) fn remove(&mut self, key: &[u8]) -> Option<IndexEntry> {
        let pos = self.find(key).ok()?;
        Some(self.entries.remove(pos))
    }
}
