//! One unbalanced binary search tree per bucket.
//!
//! Nodes live in a shared [`Arena`] and are addressed by index, so deletion
//! rewires child indices instead of juggling ownership. No balancing is
//! performed; see [`avl`](crate::store::avl) for the balanced variant.

use crate::arena::{Arena, NIL};
use crate::store::{Entry, StoreError};

struct BstNode {
    left: u32,
    right: u32,
    entry: Entry,
}

/// Collision store keeping one binary search tree per bucket, ordered by key.
pub struct BinaryTree {
    roots: Vec<u32>,
    nodes: Arena<BstNode>,
}

impl BinaryTree {
    /// Creates a store with `buckets` empty trees.
    pub fn new(buckets: usize) -> Self {
        Self { roots: vec![NIL; buckets], nodes: Arena::default() }
    }

    /// Returns the number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.roots.len()
    }

    /// Looks up `key` in its bucket's tree.
    pub fn get(&self, home: usize, key: i64) -> Option<i64> {
        let mut node = *self.roots.get(home)?;
        while node != NIL {
            let current = &self.nodes[node];
            node = match key.cmp(&current.entry.key) {
                std::cmp::Ordering::Less => current.left,
                std::cmp::Ordering::Greater => current.right,
                std::cmp::Ordering::Equal => return Some(current.entry.value),
            };
        }
        None
    }

    /// Inserts `entry` as a new leaf, or overwrites the node with the same
    /// key.
    pub fn set(&mut self, home: usize, entry: Entry) -> Result<Option<i64>, StoreError> {
        if home >= self.roots.len() {
            return Err(StoreError::IndexOutOfRange);
        }
        let mut node = self.roots[home];
        if node == NIL {
            self.roots[home] = self.nodes.alloc(BstNode { left: NIL, right: NIL, entry });
            return Ok(None);
        }
        loop {
            let current = &mut self.nodes[node];
            match entry.key.cmp(&current.entry.key) {
                std::cmp::Ordering::Equal => {
                    let previous = current.entry.value;
                    current.entry.value = entry.value;
                    return Ok(Some(previous));
                }
                std::cmp::Ordering::Less => {
                    if current.left == NIL {
                        let new = self.nodes.alloc(BstNode { left: NIL, right: NIL, entry });
                        self.nodes[node].left = new;
                        return Ok(None);
                    }
                    node = current.left;
                }
                std::cmp::Ordering::Greater => {
                    if current.right == NIL {
                        let new = self.nodes.alloc(BstNode { left: NIL, right: NIL, entry });
                        self.nodes[node].right = new;
                        return Ok(None);
                    }
                    node = current.right;
                }
            }
        }
    }

    /// Removes `key`, promoting its in-order successor when the node has two
    /// children.
    pub fn del(&mut self, home: usize, key: i64) -> Result<Option<i64>, StoreError> {
        let Some(&root) = self.roots.get(home) else { return Ok(None) };
        let mut parent = NIL;
        let mut node = root;
        while node != NIL {
            let current = &self.nodes[node];
            match key.cmp(&current.entry.key) {
                std::cmp::Ordering::Less => {
                    parent = node;
                    node = current.left;
                }
                std::cmp::Ordering::Greater => {
                    parent = node;
                    node = current.right;
                }
                std::cmp::Ordering::Equal => {
                    let removed = current.entry.value;
                    let replacement = self.detach(node);
                    if parent == NIL {
                        self.roots[home] = replacement;
                    } else if self.nodes[parent].left == node {
                        self.nodes[parent].left = replacement;
                    } else if self.nodes[parent].right == node {
                        self.nodes[parent].right = replacement;
                    } else {
                        debug_assert!(false, "parent lost track of its child");
                        return Err(StoreError::Corrupted("tree parent link mismatch"));
                    }
                    self.nodes.dealloc(node);
                    return Ok(Some(removed));
                }
            }
        }
        Ok(None)
    }

    /// Computes the subtree that replaces `node` once it is removed, rewiring
    /// descendants as needed. Does not touch `node`'s parent.
    fn detach(&mut self, node: u32) -> u32 {
        let (left, right) = {
            let current = &self.nodes[node];
            (current.left, current.right)
        };
        if right == NIL {
            return left;
        }
        // Promote the in-order successor, the leftmost node of the right
        // subtree. It has no left child by construction.
        let mut succ_parent = NIL;
        let mut succ = right;
        while self.nodes[succ].left != NIL {
            succ_parent = succ;
            succ = self.nodes[succ].left;
        }
        if succ_parent != NIL {
            self.nodes[succ_parent].left = self.nodes[succ].right;
            self.nodes[succ].right = right;
        }
        self.nodes[succ].left = left;
        succ
    }

    /// Returns an iterator visiting buckets in index order and each tree in
    /// ascending key order.
    pub fn iter(&self) -> Iter<'_> {
        Iter { store: self, bucket: 0, stack: Vec::new() }
    }
}

/// In-order iterator over the entries of a [`BinaryTree`].
pub struct Iter<'a> {
    store: &'a BinaryTree,
    bucket: usize,
    stack: Vec<u32>,
}

impl<'a> Iter<'a> {
    fn push_left_spine(&mut self, mut node: u32) {
        while node != NIL {
            self.stack.push(node);
            node = self.store.nodes[node].left;
        }
    }
}

impl Iterator for Iter<'_> {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        loop {
            if let Some(node) = self.stack.pop() {
                let current = &self.store.nodes[node];
                self.push_left_spine(current.right);
                return Some(current.entry);
            }
            let root = *self.store.roots.get(self.bucket)?;
            self.bucket += 1;
            self.push_left_spine(root);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(store: &mut BinaryTree, home: usize, keys: &[i64]) {
        for &key in keys {
            assert_eq!(store.set(home, Entry { key, value: key * 10 }), Ok(None));
        }
    }

    fn keys(store: &BinaryTree) -> Vec<i64> {
        store.iter().map(|entry| entry.key).collect()
    }

    #[test]
    fn iterates_in_key_order() {
        let mut store = BinaryTree::new(2);
        fill(&mut store, 0, &[5, 3, 8, 1, 4, 7, 9]);
        fill(&mut store, 1, &[2, 6]);
        assert_eq!(keys(&store), vec![1, 3, 4, 5, 7, 8, 9, 2, 6]);
    }

    #[test]
    fn overwrite_returns_previous() {
        let mut store = BinaryTree::new(1);
        fill(&mut store, 0, &[5, 3]);
        assert_eq!(store.set(0, Entry { key: 3, value: 99 }), Ok(Some(30)));
        assert_eq!(store.get(0, 3), Some(99));
        assert_eq!(keys(&store), vec![3, 5]);
    }

    #[test]
    fn removes_leaf() {
        let mut store = BinaryTree::new(1);
        fill(&mut store, 0, &[5, 3, 8]);
        assert_eq!(store.del(0, 3), Ok(Some(30)));
        assert_eq!(keys(&store), vec![5, 8]);
    }

    #[test]
    fn removes_node_with_one_child() {
        let mut store = BinaryTree::new(1);
        fill(&mut store, 0, &[5, 3, 2]);
        assert_eq!(store.del(0, 3), Ok(Some(30)));
        assert_eq!(keys(&store), vec![2, 5]);
        assert_eq!(store.get(0, 2), Some(20));
    }

    #[test]
    fn removes_node_whose_successor_is_its_right_child() {
        let mut store = BinaryTree::new(1);
        fill(&mut store, 0, &[5, 3, 8, 9]);
        // Successor of 5 is 8, its direct right child.
        assert_eq!(store.del(0, 5), Ok(Some(50)));
        assert_eq!(keys(&store), vec![3, 8, 9]);
    }

    #[test]
    fn removes_node_with_deep_successor() {
        let mut store = BinaryTree::new(1);
        fill(&mut store, 0, &[5, 3, 9, 7, 8, 6]);
        // Successor of 5 is 6, deep inside the right subtree.
        assert_eq!(store.del(0, 5), Ok(Some(50)));
        assert_eq!(keys(&store), vec![3, 6, 7, 8, 9]);
        for key in [3, 6, 7, 8, 9] {
            assert_eq!(store.get(0, key), Some(key * 10));
        }
    }

    #[test]
    fn removes_root_repeatedly() {
        let mut store = BinaryTree::new(1);
        fill(&mut store, 0, &[4, 2, 6, 1, 3, 5, 7]);
        let mut expected: Vec<i64> = (1..=7).collect();
        for key in [4, 5, 2, 6, 1, 7, 3] {
            assert_eq!(store.del(0, key), Ok(Some(key * 10)));
            expected.retain(|&k| k != key);
            assert_eq!(keys(&store), expected);
        }
    }

    #[test]
    fn missing_key_and_bucket() {
        let mut store = BinaryTree::new(1);
        fill(&mut store, 0, &[1]);
        assert_eq!(store.get(0, 2), None);
        assert_eq!(store.del(0, 2), Ok(None));
        assert_eq!(store.get(5, 1), None);
        assert_eq!(store.del(5, 1), Ok(None));
    }
}
