//! Ordered Index Module
//!
//! In-memory map from key to the location of its latest value.
//!
//! ## Responsibilities
//! - Point lookup, insert, delete by key
//! - Ordered range iteration
//! - In-place relocation when a key is rewritten
//!
//! ## Data Structure Choice
//! An array skip-list: a probabilistic skip list whose nodes each hold a
//! sorted array of up to `MAX_ARRAY_LEN` entries instead of a single key.
//! Lookups descend the express lanes comparing against each node's first
//! key, then binary-search inside the landing node.
//!
//! ```text
//!  level 2  HEAD ─────────────────────────────▶ [m n o p] ──▶ NIL
//!  level 1  HEAD ──────────────▶ [g h i] ─────▶ [m n o p] ──▶ NIL
//!  level 0  HEAD ──▶ [a b c d] ─▶ [g h i] ─────▶ [m n o p] ──▶ NIL
//! ```
//!
//! Nodes live in an arena (`Vec<Node>`) and link to each other by index, so
//! there are no raw pointers and no reference cycles.

mod iter;
mod node;
mod skiplist;

pub use iter::RangeIter;
pub use skiplist::ArraySkipList;

/// Probability that a new node is promoted one more level
pub const PROMOTION_PROBABILITY: f64 = 0.5;

/// Number of skip levels (levels 0..MAX_LEVEL)
pub const MAX_LEVEL: usize = 16;

/// Maximum number of entries held by one node
pub const MAX_ARRAY_LEN: usize = 128;

/// Location of the latest value of one key
///
/// The index orders and matches entries by `key` only; the remaining fields
/// are payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub key: Vec<u8>,
    pub segment_id: u32,
    /// Unix seconds of the write
    pub timestamp: u32,
    pub value_size: u32,
    pub value_position: u32,
}

impl IndexEntry {
    pub fn new(
        key: Vec<u8>,
        segment_id: u32,
        timestamp: u32,
        value_size: u32,
        value_position: u32,
    ) -> Self {
        Self {
            key,
            segment_id,
            timestamp,
            value_size,
            value_position,
        }
    }

    /// A zero-length value marks a logical delete
    pub fn is_tombstone(&self) -> bool {
        self.value_size == 0
    }

    /// Copy the location fields of `other` into `self`
    pub fn relocate(&mut self, other: &IndexEntry) {
        self.segment_id = other.segment_id;
        self.timestamp = other.timestamp;
        self.value_size = other.value_size;
        self.value_position = other.value_position;
    }
}

/// Outcome of `ArraySkipList::upsert`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// Key was absent and has been inserted
    Inserted,
    /// Key existed and its location was overwritten
    Updated,
    /// Key existed and the tombstone removed it
    Removed,
    /// Tombstone for an absent key; nothing to do
    Skipped,
}
