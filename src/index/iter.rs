//! Range iterator over the array skip-list

use std::iter::FusedIterator;

use super::node::NIL;
use super::skiplist::ArraySkipList;
use super::IndexEntry;

/// Lazy, forward-only walk over level 0 in ascending key order
///
/// Stops for good at the first entry whose key sorts after `end`.
pub struct RangeIter<'a> {
    list: &'a ArraySkipList,
    /// Arena index of the current node, `NIL` once exhausted
    node: usize,
    /// Position inside the current node's array
    pos: usize,
    /// Inclusive upper bound; `None` walks to the end
    end: Option<&'a [u8]>,
}

impl<'a> RangeIter<'a> {
    pub(super) fn new(list: &'a ArraySkipList, node: usize, pos: usize, end: Option<&'a [u8]>) -> Self {
        Self {
            list,
            node,
            pos,
            end,
        }
    }
}

impl<'a> Iterator for RangeIter<'a> {
    type Item = &'a IndexEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let list = self.list;

        while self.node != NIL {
            let node = list.node(self.node);
            if self.pos >= node.len() {
                self.node = node.forward[0];
                self.pos = 0;
                continue;
            }

            let entry = &node.entries[self.pos];
            self.pos += 1;

            if let Some(end) = self.end {
                if entry.key.as_slice() > end {
                    self.node = NIL;
                    return None;
                }
            }

            return Some(entry);
        }

        None
    }
}

impl FusedIterator for RangeIter<'_> {}
