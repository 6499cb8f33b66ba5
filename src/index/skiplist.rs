//! Array skip-list
//!
//! Arena-backed skip list whose nodes hold sorted arrays of entries.
//!
//! ## Insert overflow
//! When the node an entry belongs to is full, the node's largest entry (or
//! the new entry itself, if it is larger) is carried forward one node
//! instead of splitting the node. The carried entry goes into the next node
//! if it has room, otherwise into a fresh node spliced in right after.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::iter::RangeIter;
use super::node::{Node, HEAD, NIL};
use super::{IndexEntry, Upsert, MAX_LEVEL, PROMOTION_PROBABILITY};

/// Ordered map from key to `IndexEntry`
///
/// Entries are unique by key and totally ordered by key across all nodes.
/// `level` is the highest level at which the header has a forward link.
#[derive(Debug)]
pub struct ArraySkipList {
    /// Node arena; slot `HEAD` is the sentinel header
    nodes: Vec<Node>,
    /// Freed arena slots available for reuse
    free: Vec<usize>,
    level: usize,
    len: usize,
    rng: StdRng,
}

impl ArraySkipList {
    /// Create an empty index with an entropy-seeded level generator
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Create an empty index with a deterministic level generator
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            nodes: vec![Node::head()],
            free: Vec::new(),
            level: 0,
            len: 0,
            rng,
        }
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn get(&self, key: &[u8]) -> Option<&IndexEntry> {
        let node = self.find_node(key);
        if node == HEAD {
            return None;
        }
        let node = &self.nodes[node];
        node.find(key).ok().map(|pos| &node.entries[pos])
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut IndexEntry> {
        let node = self.find_node(key);
        if node == HEAD {
            return None;
        }
        let node = &mut self.nodes[node];
        match node.find(key) {
            Ok(pos) => Some(&mut node.entries[pos]),
            Err(_) => None,
        }
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Insert `entry`, returning the entry it replaced if the key existed
    pub fn insert(&mut self, entry: IndexEntry) -> Option<IndexEntry> {
        let mut update = [HEAD; MAX_LEVEL];
        let current = self.descend(&mut update, |node| node.first_key() <= entry.key.as_slice());

        let mut carry = entry;
        if current != HEAD {
            let node = &mut self.nodes[current];

            if let Ok(pos) = node.find(&carry.key) {
                return Some(std::mem::replace(&mut node.entries[pos], carry));
            }

            if !node.is_full() {
                node.insert_sorted(carry);
                self.len += 1;
                return None;
            }

            // Full: keep the smaller entries here, carry the largest forward
            if carry.key.as_slice() < node.last_key() {
                if let Some(largest) = node.pop_last() {
                    node.insert_sorted(carry);
                    carry = largest;
                }
            }
        }

        self.len += 1;

        let next = self.nodes[current].forward[0];
        if next != NIL && !self.nodes[next].is_full() {
            self.nodes[next].insert_sorted(carry);
            return None;
        }

        // update[] above the current level still points at HEAD
        let level = self.random_level();
        if level > self.level {
            self.level = level;
        }

        let new_node = self.alloc(carry, level);
        for (i, &pred) in update.iter().enumerate().take(level + 1) {
            self.nodes[new_node].forward[i] = self.nodes[pred].forward[i];
            self.nodes[pred].forward[i] = new_node;
        }

        None
    }

    /// Remove `key`, returning its entry if it was present
    pub fn remove(&mut self, key: &[u8]) -> Option<IndexEntry> {
        let mut update = [HEAD; MAX_LEVEL];
        let current = self.descend(&mut update, |node| node.first_key() < key);

        // The key leads the following node: that node may empty out
        let candidate = self.nodes[current].forward[0];
        if candidate != NIL && self.nodes[candidate].first_key() == key {
            let removed = self.nodes[candidate].remove(key)?;
            self.len -= 1;
            if self.nodes[candidate].is_empty() {
                self.unlink(candidate, &update);
            }
            return Some(removed);
        }

        // Otherwise it can only sit behind `current`'s first entry,
        // so `current` never empties here
        if current == HEAD {
            return None;
        }
        let removed = self.nodes[current].remove(key)?;
        self.len -= 1;
        Some(removed)
    }

    /// Remove `key`, reporting whether it was present
    pub fn delete(&mut self, key: &[u8]) -> bool {
        self.remove(key).is_some()
    }

    /// Apply the latest write for `entry.key`
    ///
    /// An existing entry gets its location overwritten in place and is
    /// removed if the new location is a tombstone. An absent key is inserted
    /// unless the write is a tombstone.
    pub fn upsert(&mut self, entry: IndexEntry) -> Upsert {
        let tombstoned = match self.get_mut(&entry.key) {
            Some(existing) => {
                existing.relocate(&entry);
                existing.is_tombstone()
            }
            None => {
                if entry.is_tombstone() {
                    return Upsert::Skipped;
                }
                self.insert(entry);
                return Upsert::Inserted;
            }
        };

        if tombstoned {
            self.remove(&entry.key);
            Upsert::Removed
        } else {
            Upsert::Updated
        }
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[HEAD] = Node::head();
        self.free.clear();
        self.level = 0;
        self.len = 0;
    }

    // =========================================================================
    // Iteration
    // =========================================================================

    /// Entries with `start <= key <= end`, ascending
    pub fn range<'a>(&'a self, start: &[u8], end: &'a [u8]) -> RangeIter<'a> {
        let (node, pos) = self.seek(start);
        RangeIter::new(self, node, pos, Some(end))
    }

    /// Entries with `key >= start`, ascending
    pub fn range_from(&self, start: &[u8]) -> RangeIter<'_> {
        let (node, pos) = self.seek(start);
        RangeIter::new(self, node, pos, None)
    }

    /// All entries, ascending
    pub fn iter(&self) -> RangeIter<'_> {
        RangeIter::new(self, self.nodes[HEAD].forward[0], 0, None)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Highest level currently linked from the header
    pub fn level(&self) -> usize {
        self.level
    }

    /// Number of live (non-header) nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1 - self.free.len()
    }

    pub(super) fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Walk from the top level down, advancing while `advance` holds for the
    /// next node. Records the last node visited per level in `update` and
    /// returns the level-0 landing node (possibly `HEAD`).
    fn descend<F>(&self, update: &mut [usize; MAX_LEVEL], advance: F) -> usize
    where
        F: Fn(&Node) -> bool,
    {
        let mut current = HEAD;
        for i in (0..=self.level).rev() {
            loop {
                let next = self.nodes[current].forward[i];
                if next != NIL && advance(&self.nodes[next]) {
                    current = next;
                } else {
                    break;
                }
            }
            update[i] = current;
        }
        current
    }

    /// Node and array position of the first entry with key >= `start`
    fn seek(&self, start: &[u8]) -> (usize, usize) {
        let mut update = [HEAD; MAX_LEVEL];
        let current = self.descend(&mut update, |node| node.last_key() < start);

        let node = self.nodes[current].forward[0];
        if node == NIL {
            (NIL, 0)
        } else {
            (node, self.nodes[node].lower_bound(start))
        }
    }

    /// Landing node for a point lookup of `key`
    fn find_node(&self, key: &[u8]) -> usize {
        let mut update = [HEAD; MAX_LEVEL];
        self.descend(&mut update, |node| node.first_key() <= key)
    }

    fn random_level(&mut self) -> usize {
        let mut level = 0;
        while level < MAX_LEVEL - 1 && self.rng.gen_bool(PROMOTION_PROBABILITY) {
            level += 1;
        }
        level
    }

    fn alloc(&mut self, entry: IndexEntry, level: usize) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot].reset(entry, level);
                slot
            }
            None => {
                self.nodes.push(Node::new(entry, level));
                self.nodes.len() - 1
            }
        }
    }

    /// Unlink an emptied node from every level and recycle its slot
    fn unlink(&mut self, target: usize, update: &[usize; MAX_LEVEL]) {
        for (i, &pred) in update.iter().enumerate().take(self.level + 1) {
            if self.nodes[pred].forward[i] != target {
                break;
            }
            self.nodes[pred].forward[i] = self.nodes[target].forward[i];
        }

        while self.level > 0 && self.nodes[HEAD].forward[self.level] == NIL {
            self.level -= 1;
        }

        self.nodes[target].release();
        self.free.push(target);
    }
}

impl Default for ArraySkipList {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IntoIterator for &'a ArraySkipList {
    type Item = &'a IndexEntry;
    type IntoIter = RangeIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
