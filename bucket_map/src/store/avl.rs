//! One height-balanced AVL tree per bucket.
//!
//! Nodes live in a shared [`Arena`] and carry parent back-references as arena
//! indices, so rotations are index reassignment. Each node caches the exact
//! heights of both subtrees; the balance factor is their difference and every
//! completed operation leaves it within `[-1, 1]` for every node.

use crate::arena::{Arena, NIL};
use crate::store::{Entry, StoreError};

struct AvlNode {
    parent: u32,
    left: u32,
    right: u32,
    left_height: i32,
    right_height: i32,
    entry: Entry,
}

/// Collision store keeping one AVL tree per bucket, ordered by key.
pub struct AvlTree {
    roots: Vec<u32>,
    nodes: Arena<AvlNode>,
}

impl AvlTree {
    /// Creates a store with `buckets` empty trees.
    pub fn new(buckets: usize) -> Self {
        Self { roots: vec![NIL; buckets], nodes: Arena::default() }
    }

    /// Returns the number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.roots.len()
    }

    fn height(&self, node: u32) -> i32 {
        if node == NIL {
            0
        } else {
            let current = &self.nodes[node];
            1 + current.left_height.max(current.right_height)
        }
    }

    fn factor(&self, node: u32) -> i32 {
        let current = &self.nodes[node];
        current.left_height - current.right_height
    }

    /// Attaches `child` as the left child of `parent`, refreshing the cached
    /// height and the child's parent back-reference.
    fn set_left(&mut self, parent: u32, child: u32) {
        let height = self.height(child);
        let node = &mut self.nodes[parent];
        node.left = child;
        node.left_height = height;
        if child != NIL {
            self.nodes[child].parent = parent;
        }
    }

    fn set_right(&mut self, parent: u32, child: u32) {
        let height = self.height(child);
        let node = &mut self.nodes[parent];
        node.right = child;
        node.right_height = height;
        if child != NIL {
            self.nodes[child].parent = parent;
        }
    }

    /// Rotates `pivot` down to the left and returns the subtree's new root,
    /// detached from the pivot's former parent.
    fn rotate_left(&mut self, pivot: u32) -> u32 {
        let new_root = self.nodes[pivot].right;
        self.set_right(pivot, self.nodes[new_root].left);
        self.set_left(new_root, pivot);
        new_root
    }

    fn rotate_right(&mut self, pivot: u32) -> u32 {
        let new_root = self.nodes[pivot].left;
        self.set_left(pivot, self.nodes[new_root].right);
        self.set_right(new_root, pivot);
        new_root
    }

    /// Restores the balance invariant at `node` if its factor left the
    /// `[-1, 1]` range, reattaching the rotated subtree to the node's former
    /// parent (or as the bucket root). Returns the subtree's root, rotated or
    /// not.
    fn rebalance(&mut self, home: usize, node: u32) -> Result<u32, StoreError> {
        let factor = self.factor(node);
        if (-1..=1).contains(&factor) {
            return Ok(node);
        }
        let old_parent = self.nodes[node].parent;
        let from_left = old_parent != NIL && self.nodes[old_parent].left == node;
        let new_root = if factor > 1 {
            let left = self.nodes[node].left;
            if left == NIL {
                debug_assert!(false, "positive balance factor without a left child");
                return Err(StoreError::Corrupted("height cache claims a missing subtree"));
            }
            if self.factor(left) >= 0 {
                self.rotate_right(node)
            } else {
                let rotated = self.rotate_left(left);
                self.set_left(node, rotated);
                self.rotate_right(node)
            }
        } else {
            let right = self.nodes[node].right;
            if right == NIL {
                debug_assert!(false, "negative balance factor without a right child");
                return Err(StoreError::Corrupted("height cache claims a missing subtree"));
            }
            if self.factor(right) <= 0 {
                self.rotate_left(node)
            } else {
                let rotated = self.rotate_right(right);
                self.set_right(node, rotated);
                self.rotate_left(node)
            }
        };
        if old_parent == NIL {
            self.roots[home] = new_root;
            self.nodes[new_root].parent = NIL;
        } else if from_left {
            self.set_left(old_parent, new_root);
        } else {
            self.set_right(old_parent, new_root);
        }
        Ok(new_root)
    }

    /// Refreshes the cached height `parent` holds for `child`.
    fn refresh_child_height(&mut self, parent: u32, child: u32) -> Result<(), StoreError> {
        let height = self.height(child);
        let node = &mut self.nodes[parent];
        if node.left == child {
            node.left_height = height;
        } else if node.right == child {
            node.right_height = height;
        } else {
            debug_assert!(false, "parent lost track of its child");
            return Err(StoreError::Corrupted("tree parent link mismatch"));
        }
        Ok(())
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

    /// Inserts `entry` as a new leaf and rebalances, or overwrites the node
    /// with the same key without touching the structure.
    pub fn set(&mut self, home: usize, entry: Entry) -> Result<Option<i64>, StoreError> {
        if home >= self.roots.len() {
            return Err(StoreError::IndexOutOfRange);
        }
        let mut node = self.roots[home];
        if node == NIL {
            self.roots[home] = self.alloc_leaf(NIL, entry);
            return Ok(None);
        }
        let new = loop {
            let current = &mut self.nodes[node];
            match entry.key.cmp(&current.entry.key) {
                std::cmp::Ordering::Equal => {
                    let previous = current.entry.value;
                    current.entry.value = entry.value;
                    return Ok(Some(previous));
                }
                std::cmp::Ordering::Less => {
                    if current.left == NIL {
                        let new = self.alloc_leaf(node, entry);
                        self.nodes[node].left = new;
                        break new;
                    }
                    node = current.left;
                }
                std::cmp::Ordering::Greater => {
                    if current.right == NIL {
                        let new = self.alloc_leaf(node, entry);
                        self.nodes[node].right = new;
                        break new;
                    }
                    node = current.right;
                }
            }
        };
        // Walk upward refreshing the height each ancestor caches for the
        // changed child. The first out-of-balance ancestor is the pivot; one
        // rotation there restores the subtree to its pre-insert height, so
        // nothing above it changes.
        let mut child = new;
        let mut node = self.nodes[child].parent;
        while node != NIL {
            self.refresh_child_height(node, child)?;
            if !(-1..=1).contains(&self.factor(node)) {
                self.rebalance(home, node)?;
                break;
            }
            child = node;
            node = self.nodes[child].parent;
        }
        Ok(None)
    }

    fn alloc_leaf(&mut self, parent: u32, entry: Entry) -> u32 {
        self.nodes.alloc(AvlNode {
            parent,
            left: NIL,
            right: NIL,
            left_height: 0,
            right_height: 0,
            entry,
        })
    }

    /// Removes `key`, splicing the node out as in a plain BST and then
    /// repairing heights and balance.
    pub fn del(&mut self, home: usize, key: i64) -> Result<Option<i64>, StoreError> {
        if home >= self.roots.len() {
            return Ok(None);
        }
        let mut node = self.roots[home];
        while node != NIL {
            let current = &self.nodes[node];
            node = match key.cmp(&current.entry.key) {
                std::cmp::Ordering::Less => current.left,
                std::cmp::Ordering::Greater => current.right,
                std::cmp::Ordering::Equal => break,
            };
        }
        if node == NIL {
            return Ok(None);
        }
        let removed = self.nodes[node].entry.value;
        let check = self.splice(home, node)?;
        self.nodes.dealloc(node);
        if check != NIL {
            // Splicing leaves the height caches along the successor path
            // stale; recompute them before trusting any balance factor.
            self.recompute_heights(check);
            let deepest = self.deepest_unbalanced(check)?;
            // Unlike insertion, a deletion can shrink the rotated subtree and
            // expose further imbalances at ancestors, so after the first
            // rotation repair heights and balance all the way up.
            let mut child = if deepest != NIL { self.rebalance(home, deepest)? } else { check };
            loop {
                let parent = self.nodes[child].parent;
                if parent == NIL {
                    break;
                }
                self.refresh_child_height(parent, child)?;
                child = self.rebalance(home, parent)?;
            }
        }
        Ok(Some(removed))
    }

    /// Unlinks `node` from its tree, promoting the in-order successor when a
    /// right subtree exists. Returns the node to repair heights from, or
    /// `NIL` when the bucket became empty.
    fn splice(&mut self, home: usize, node: u32) -> Result<u32, StoreError> {
        let (parent, left, right) = {
            let current = &self.nodes[node];
            (current.parent, current.left, current.right)
        };
        let (replacement, check);
        if right == NIL {
            replacement = left;
            check = if parent != NIL { parent } else { left };
        } else {
            let mut succ_parent = NIL;
            let mut succ = right;
            while self.nodes[succ].left != NIL {
                succ_parent = succ;
                succ = self.nodes[succ].left;
            }
            if succ_parent != NIL {
                let succ_right = self.nodes[succ].right;
                self.set_left(succ_parent, succ_right);
                self.set_right(succ, right);
            }
            self.set_left(succ, left);
            replacement = succ;
            check = succ;
        }
        if parent == NIL {
            self.roots[home] = replacement;
            if replacement != NIL {
                self.nodes[replacement].parent = NIL;
            }
        } else if self.nodes[parent].left == node {
            self.set_left(parent, replacement);
        } else if self.nodes[parent].right == node {
            self.set_right(parent, replacement);
        } else {
            debug_assert!(false, "parent lost track of its child");
            return Err(StoreError::Corrupted("tree parent link mismatch"));
        }
        Ok(check)
    }

    fn recompute_heights(&mut self, node: u32) -> i32 {
        if node == NIL {
            return 0;
        }
        let (left, right) = (self.nodes[node].left, self.nodes[node].right);
        let left_height = self.recompute_heights(left);
        let right_height = self.recompute_heights(right);
        let current = &mut self.nodes[node];
        current.left_height = left_height;
        current.right_height = right_height;
        1 + left_height.max(right_height)
    }

    /// Finds the deepest node under `node` whose balance factor left the
    /// `[-1, 1]` range, or `NIL`. Two unbalanced nodes in disjoint subtrees
    /// can only happen if the height bookkeeping is wrong.
    fn deepest_unbalanced(&self, node: u32) -> Result<u32, StoreError> {
        if node == NIL {
            return Ok(NIL);
        }
        let left_hit = self.deepest_unbalanced(self.nodes[node].left)?;
        let right_hit = self.deepest_unbalanced(self.nodes[node].right)?;
        if left_hit != NIL && right_hit != NIL {
            debug_assert!(false, "two unbalanced subtrees under one node");
            return Err(StoreError::Corrupted("two unbalanced subtrees under one node"));
        }
        if left_hit != NIL {
            Ok(left_hit)
        } else if right_hit != NIL {
            Ok(right_hit)
        } else if !(-1..=1).contains(&self.factor(node)) {
            Ok(node)
        } else {
            Ok(NIL)
        }
    }

    /// Returns an iterator visiting buckets in index order and each tree in
    /// ascending key order.
    pub fn iter(&self) -> Iter<'_> {
        Iter { store: self, bucket: 0, stack: Vec::new() }
    }

    /// Verifies ordering, cached heights, balance factors and parent links of
    /// every tree.
    #[cfg(test)]
    fn check_invariants(&self) {
        for &root in &self.roots {
            if root != NIL {
                assert_eq!(self.nodes[root].parent, NIL);
                self.check_subtree(root, None, None);
            }
        }
    }

    #[cfg(test)]
    fn check_subtree(&self, node: u32, lower: Option<i64>, upper: Option<i64>) -> i32 {
        let current = &self.nodes[node];
        let key = current.entry.key;
        if let Some(lower) = lower {
            assert!(key > lower, "key {key} violates ordering");
        }
        if let Some(upper) = upper {
            assert!(key < upper, "key {key} violates ordering");
        }
        let mut left_height = 0;
        if current.left != NIL {
            assert_eq!(self.nodes[current.left].parent, node);
            left_height = self.check_subtree(current.left, lower, Some(key));
        }
        let mut right_height = 0;
        if current.right != NIL {
            assert_eq!(self.nodes[current.right].parent, node);
            right_height = self.check_subtree(current.right, Some(key), upper);
        }
        assert_eq!(current.left_height, left_height, "stale left height at key {key}");
        assert_eq!(current.right_height, right_height, "stale right height at key {key}");
        assert!((left_height - right_height).abs() <= 1, "unbalanced at key {key}");
        1 + left_height.max(right_height)
    }
}

/// In-order iterator over the entries of an [`AvlTree`].
pub struct Iter<'a> {
    store: &'a AvlTree,
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
