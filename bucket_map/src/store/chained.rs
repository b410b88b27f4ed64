//! Separate chaining with one doubly linked list per bucket.
//!
//! Nodes live in a shared [`Arena`] and link to each other through arena
//! indices, so removing a node from the middle of a chain is a pair of index
//! updates with no unsafe code.

use crate::arena::{Arena, NIL};
use crate::store::{Entry, StoreError};

struct ChainNode {
    prev: u32,
    next: u32,
    entry: Entry,
}

/// Collision store keeping one doubly linked list per bucket.
///
/// New keys are appended at the tail of their chain, so iteration within one
/// bucket reflects insertion order.
pub struct ChainedList {
    heads: Vec<u32>,
    nodes: Arena<ChainNode>,
}

impl ChainedList {
    /// Creates a store with `buckets` empty chains.
    pub fn new(buckets: usize) -> Self {
        Self { heads: vec![NIL; buckets], nodes: Arena::default() }
    }

    /// Returns the number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.heads.len()
    }

    /// Looks up `key` in its bucket's chain.
    pub fn get(&self, home: usize, key: i64) -> Option<i64> {
        let mut node = *self.heads.get(home)?;
        while node != NIL {
            let current = &self.nodes[node];
            if current.entry.key == key {
                return Some(current.entry.value);
            }
            node = current.next;
        }
        None
    }

    /// Appends `entry` to its bucket's chain, or overwrites in place.
    pub fn set(&mut self, home: usize, entry: Entry) -> Result<Option<i64>, StoreError> {
        if home >= self.heads.len() {
            return Err(StoreError::IndexOutOfRange);
        }
        let mut node = self.heads[home];
        let mut tail = NIL;
        while node != NIL {
            let current = &mut self.nodes[node];
            if current.entry.key == entry.key {
                let previous = current.entry.value;
                current.entry.value = entry.value;
                return Ok(Some(previous));
            }
            tail = node;
            node = current.next;
        }
        let new = self.nodes.alloc(ChainNode { prev: tail, next: NIL, entry });
        if tail == NIL {
            self.heads[home] = new;
        } else {
            self.nodes[tail].next = new;
        }
        Ok(None)
    }

    /// Unlinks `key` from its bucket's chain.
    pub fn del(&mut self, home: usize, key: i64) -> Result<Option<i64>, StoreError> {
        let Some(&head) = self.heads.get(home) else { return Ok(None) };
        let mut node = head;
        while node != NIL {
            let current = &self.nodes[node];
            if current.entry.key != key {
                node = current.next;
                continue;
            }
            let (prev, next, removed) = (current.prev, current.next, current.entry.value);
            if prev == NIL {
                self.heads[home] = next;
            } else {
                self.nodes[prev].next = next;
            }
            if next != NIL {
                self.nodes[next].prev = prev;
            }
            self.nodes.dealloc(node);
            return Ok(Some(removed));
        }
        Ok(None)
    }

    /// Returns an iterator visiting buckets in index order and each chain
    /// front to back.
    pub fn iter(&self) -> Iter<'_> {
        Iter { store: self, bucket: 0, node: NIL }
    }
}

/// Iterator over the entries of a [`ChainedList`].
pub struct Iter<'a> {
    store: &'a ChainedList,
    bucket: usize,
    node: u32,
}

impl Iterator for Iter<'_> {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        while self.node == NIL {
            let head = self.store.heads.get(self.bucket)?;
            self.bucket += 1;
            self.node = *head;
        }
        let current = &self.store.nodes[self.node];
        self.node = current.next;
        Some(current.entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(store: &ChainedList) -> Vec<i64> {
        store.iter().map(|entry| entry.key).collect()
    }

    #[test]
    fn appends_preserve_insertion_order() {
        let mut store = ChainedList::new(4);
        for key in [5, 1, 9] {
            assert_eq!(store.set(2, Entry { key, value: key * 10 }), Ok(None));
        }
        assert_eq!(keys(&store), vec![5, 1, 9]);
        for key in [5, 1, 9] {
            assert_eq!(store.get(2, key), Some(key * 10));
        }
    }

    #[test]
    fn overwrite_keeps_position() {
        let mut store = ChainedList::new(2);
        store.set(0, Entry { key: 1, value: 1 }).unwrap();
        store.set(0, Entry { key: 2, value: 2 }).unwrap();
        assert_eq!(store.set(0, Entry { key: 1, value: 100 }), Ok(Some(1)));
        assert_eq!(keys(&store), vec![1, 2]);
        assert_eq!(store.get(0, 1), Some(100));
    }

    #[test]
    fn removes_head_interior_and_tail() {
        let mut store = ChainedList::new(1);
        for key in [1, 2, 3, 4] {
            store.set(0, Entry { key, value: key }).unwrap();
        }
        assert_eq!(store.del(0, 1), Ok(Some(1)));
        assert_eq!(keys(&store), vec![2, 3, 4]);
        assert_eq!(store.del(0, 3), Ok(Some(3)));
        assert_eq!(keys(&store), vec![2, 4]);
        assert_eq!(store.del(0, 4), Ok(Some(4)));
        assert_eq!(keys(&store), vec![2]);
        assert_eq!(store.del(0, 2), Ok(Some(2)));
        assert_eq!(keys(&store), Vec::<i64>::new());
        // Back links stay intact after the removals above.
        for key in [7, 8] {
            store.set(0, Entry { key, value: key }).unwrap();
        }
        assert_eq!(store.del(0, 8), Ok(Some(8)));
        assert_eq!(keys(&store), vec![7]);
    }

    #[test]
    fn missing_key_and_bucket() {
        let mut store = ChainedList::new(2);
        store.set(1, Entry { key: 3, value: 3 }).unwrap();
        assert_eq!(store.get(1, 4), None);
        assert_eq!(store.del(1, 4), Ok(None));
        assert_eq!(store.get(9, 3), None);
        assert_eq!(store.del(9, 3), Ok(None));
    }

    #[test]
    fn chains_stay_per_bucket() {
        let mut store = ChainedList::new(3);
        store.set(0, Entry { key: 1, value: 1 }).unwrap();
        store.set(2, Entry { key: 2, value: 2 }).unwrap();
        assert_eq!(store.get(0, 2), None);
        assert_eq!(store.get(2, 1), None);
        assert_eq!(keys(&store), vec![1, 2]);
    }
}
