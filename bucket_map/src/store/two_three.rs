//! One 2-3 tree per bucket.
//!
//! Every node holds one or two ordered values; a node with one value uses its
//! `left` and `middle` children, a node with two values additionally uses
//! `right`. All leaves sit at the same depth. Inserts grow the tree by
//! splitting overfull nodes upward; deletes shrink it by borrowing from or
//! merging with siblings, so the equal-depth invariant holds after every
//! operation.

use crate::arena::{Arena, NIL};
use crate::store::{Entry, StoreError};

#[derive(Clone, Copy)]
struct Node23 {
    parent: u32,
    left_value: Entry,
    right_value: Option<Entry>,
    left: u32,
    middle: u32,
    right: u32,
}

/// Collision store keeping one 2-3 tree per bucket, ordered by key.
pub struct TwoThreeTree {
    roots: Vec<u32>,
    nodes: Arena<Node23>,
}

impl TwoThreeTree {
    /// Creates a store with `buckets` empty trees.
    pub fn new(buckets: usize) -> Self {
        Self { roots: vec![NIL; buckets], nodes: Arena::default() }
    }

    /// Returns the number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.roots.len()
    }

    fn adopt(&mut self, parent: u32, child: u32) {
        if child != NIL {
            self.nodes[child].parent = parent;
        }
    }

    fn leaf(&mut self, parent: u32, entry: Entry) -> u32 {
        self.nodes.alloc(Node23 {
            parent,
            left_value: entry,
            right_value: None,
            left: NIL,
            middle: NIL,
            right: NIL,
        })
    }

    /// Looks up `key` in its bucket's tree.
    pub fn get(&self, home: usize, key: i64) -> Option<i64> {
        let mut node = *self.roots.get(home)?;
        while node != NIL {
            let current = &self.nodes[node];
            if key == current.left_value.key {
                return Some(current.left_value.value);
            }
            node = if key < current.left_value.key {
                current.left
            } else if let Some(right_value) = current.right_value {
                if key == right_value.key {
                    return Some(right_value.value);
                } else if key < right_value.key {
                    current.middle
                } else {
                    current.right
                }
            } else {
                current.middle
            };
        }
        None
    }

    /// Inserts `entry` into the leaf its key descends to, splitting overfull
    /// nodes upward, or overwrites the value on an exact key match.
    pub fn set(&mut self, home: usize, entry: Entry) -> Result<Option<i64>, StoreError> {
        if home >= self.roots.len() {
            return Err(StoreError::IndexOutOfRange);
        }
        let mut node = self.roots[home];
        if node == NIL {
            self.roots[home] = self.leaf(NIL, entry);
            return Ok(None);
        }
        // Descend to the leaf the key belongs in, overwriting on the way if
        // the key already exists.
        loop {
            let current = &mut self.nodes[node];
            if entry.key == current.left_value.key {
                let previous = current.left_value.value;
                current.left_value.value = entry.value;
                return Ok(Some(previous));
            }
            let next = if entry.key < current.left_value.key {
                current.left
            } else if let Some(right_value) = &mut current.right_value {
                if entry.key == right_value.key {
                    let previous = right_value.value;
                    right_value.value = entry.value;
                    return Ok(Some(previous));
                } else if entry.key < right_value.key {
                    current.middle
                } else {
                    current.right
                }
            } else {
                current.middle
            };
            if next == NIL {
                break;
            }
            node = next;
        }
        self.insert_up(home, node, entry, NIL, NIL);
        Ok(None)
    }

    /// Inserts `entry` into `target`, carrying the two halves of a split
    /// child. Splits propagate upward until a node absorbs the promoted value
    /// or a new root grows the tree by one level.
    fn insert_up(
        &mut self,
        home: usize,
        mut target: u32,
        mut entry: Entry,
        mut carry_left: u32,
        mut carry_right: u32,
    ) {
        loop {
            if target == NIL {
                let root = self.nodes.alloc(Node23 {
                    parent: NIL,
                    left_value: entry,
                    right_value: None,
                    left: carry_left,
                    middle: carry_right,
                    right: NIL,
                });
                self.adopt(root, carry_left);
                self.adopt(root, carry_right);
                self.roots[home] = root;
                return;
            }
            let node = self.nodes[target];
            if node.right_value.is_none() {
                // Room to absorb: the carried halves replace the child the
                // promoted value came from.
                let updated = if entry.key < node.left_value.key {
                    Node23 {
                        left_value: entry,
                        right_value: Some(node.left_value),
                        left: carry_left,
                        middle: carry_right,
                        right: node.middle,
                        ..node
                    }
                } else {
                    Node23 {
                        right_value: Some(entry),
                        middle: carry_left,
                        right: carry_right,
                        ..node
                    }
                };
                self.nodes[target] = updated;
                self.adopt(target, carry_left);
                self.adopt(target, carry_right);
                return;
            }
            // Overfull: order the three values and four children, keep the
            // smallest value in this node, move the largest into a fresh
            // sibling and promote the middle value to the parent.
            let right_value = node.right_value.unwrap_or(node.left_value);
            let (values, children) = if entry.key < node.left_value.key {
                (
                    [entry, node.left_value, right_value],
                    [carry_left, carry_right, node.middle, node.right],
                )
            } else if entry.key < right_value.key {
                (
                    [node.left_value, entry, right_value],
                    [node.left, carry_left, carry_right, node.right],
                )
            } else {
                (
                    [node.left_value, right_value, entry],
                    [node.left, node.middle, carry_left, carry_right],
                )
            };
            self.nodes[target] = Node23 {
                parent: node.parent,
                left_value: values[0],
                right_value: None,
                left: children[0],
                middle: children[1],
                right: NIL,
            };
            let split = self.nodes.alloc(Node23 {
                parent: node.parent,
                left_value: values[2],
                right_value: None,
                left: children[2],
                middle: children[3],
                right: NIL,
            });
            self.adopt(target, children[0]);
            self.adopt(target, children[1]);
            self.adopt(split, children[2]);
            self.adopt(split, children[3]);
            entry = values[1];
            carry_left = target;
            carry_right = split;
            target = node.parent;
        }
    }

    /// Removes `key`. Interior values are first swapped with their in-order
    /// successor in a leaf; removing the leaf value then repairs any
    /// underflow by borrowing from or merging with siblings.
    pub fn del(&mut self, home: usize, key: i64) -> Result<Option<i64>, StoreError> {
        if home >= self.roots.len() {
            return Ok(None);
        }
        let mut node = self.roots[home];
        // `in_left` records which of the node's value slots holds the key.
        let mut in_left = true;
        let mut found = false;
        while node != NIL {
            let current = &self.nodes[node];
            if key == current.left_value.key {
                in_left = true;
                found = true;
                break;
            }
            node = if key < current.left_value.key {
                current.left
            } else if let Some(right_value) = current.right_value {
                if key == right_value.key {
                    in_left = false;
                    found = true;
                    break;
                } else if key < right_value.key {
                    current.middle
                } else {
                    current.right
                }
            } else {
                current.middle
            };
        }
        if !found {
            return Ok(None);
        }
        let removed = if in_left {
            self.nodes[node].left_value.value
        } else {
            // Unwrap is fine, `in_left = false` implies the slot is occupied.
            self.nodes[node].right_value.map(|value| value.value).unwrap_or_default()
        };
        // Swap an interior value with its in-order successor so the actual
        // removal always happens at a leaf.
        let (mut leaf, mut leaf_in_left) = (node, in_left);
        let subtree = if in_left { self.nodes[node].middle } else { self.nodes[node].right };
        if subtree != NIL {
            let mut succ = subtree;
            while self.nodes[succ].left != NIL {
                succ = self.nodes[succ].left;
            }
            let successor = self.nodes[succ].left_value;
            if in_left {
                self.nodes[node].left_value = successor;
            } else {
                self.nodes[node].right_value = Some(successor);
            }
            leaf = succ;
            leaf_in_left = true;
        }
        // Drop the value from the leaf.
        let leaf_node = self.nodes[leaf];
        match (leaf_in_left, leaf_node.right_value) {
            (true, Some(right_value)) => {
                self.nodes[leaf].left_value = right_value;
                self.nodes[leaf].right_value = None;
            }
            (false, Some(_)) => {
                self.nodes[leaf].right_value = None;
            }
            (true, None) => {
                // The leaf lost its only value and underflows.
                self.fix_underflow(home, leaf, NIL)?;
            }
            (false, None) => {
                debug_assert!(false, "removal targeted an absent value slot");
                return Err(StoreError::Corrupted("value slot vanished during removal"));
            }
        }
        Ok(Some(removed))
    }

    /// Repairs `node`, which holds zero values and the single subtree
    /// `lone_child`. Borrows a value from a 2-value sibling through the
    /// parent when possible, otherwise merges with a sibling, consuming one
    /// parent value and possibly propagating the underflow upward.
    fn fix_underflow(
        &mut self,
        home: usize,
        mut node: u32,
        mut lone_child: u32,
    ) -> Result<(), StoreError> {
        loop {
            let parent = self.nodes[node].parent;
            if parent == NIL {
                // Root underflow: the lone child becomes the new root and the
                // tree shrinks by one level.
                self.roots[home] = lone_child;
                self.adopt(NIL, lone_child);
                self.nodes.dealloc(node);
                return Ok(());
            }
            let parent_node = self.nodes[parent];
            if node == parent_node.left {
                let sibling = parent_node.middle;
                let sibling_node = self.nodes[sibling];
                if let Some(sibling_right) = sibling_node.right_value {
                    // Borrow through the parent: separator comes down, the
                    // sibling's smallest value goes up.
                    self.nodes[node].left_value = parent_node.left_value;
                    self.nodes[node].left = lone_child;
                    self.nodes[node].middle = sibling_node.left;
                    self.adopt(node, lone_child);
                    self.adopt(node, sibling_node.left);
                    self.nodes[parent].left_value = sibling_node.left_value;
                    self.nodes[sibling] = Node23 {
                        left_value: sibling_right,
                        right_value: None,
                        left: sibling_node.middle,
                        middle: sibling_node.right,
                        right: NIL,
                        ..sibling_node
                    };
                    return Ok(());
                }
                // Merge into the sibling, absorbing the separator.
                self.nodes[sibling] = Node23 {
                    left_value: parent_node.left_value,
                    right_value: Some(sibling_node.left_value),
                    left: lone_child,
                    middle: sibling_node.left,
                    right: sibling_node.middle,
                    ..sibling_node
                };
                self.adopt(sibling, lone_child);
                self.nodes.dealloc(node);
                if let Some(parent_right) = parent_node.right_value {
                    // 2-value parent absorbs the loss locally.
                    self.nodes[parent].left_value = parent_right;
                    self.nodes[parent].right_value = None;
                    self.nodes[parent].left = sibling;
                    self.nodes[parent].middle = parent_node.right;
                    self.nodes[parent].right = NIL;
                    return Ok(());
                }
                // 1-value parent underflows in turn.
                node = parent;
                lone_child = sibling;
            } else if node == parent_node.middle {
                let left_sibling = parent_node.left;
                let left_node = self.nodes[left_sibling];
                if let Some(left_right) = left_node.right_value {
                    // Borrow from the left sibling.
                    self.nodes[node].left_value = parent_node.left_value;
                    self.nodes[node].left = left_node.right;
                    self.nodes[node].middle = lone_child;
                    self.adopt(node, left_node.right);
                    self.adopt(node, lone_child);
                    self.nodes[parent].left_value = left_right;
                    self.nodes[left_sibling].right_value = None;
                    self.nodes[left_sibling].right = NIL;
                    return Ok(());
                }
                if parent_node.right_value.is_some() {
                    let right_sibling = parent_node.right;
                    let right_node = self.nodes[right_sibling];
                    if let Some(right_right) = right_node.right_value {
                        // Borrow from the right sibling instead.
                        // Unwrap is fine, the branch condition checked it.
                        self.nodes[node].left_value =
                            parent_node.right_value.unwrap_or(parent_node.left_value);
                        self.nodes[node].left = lone_child;
                        self.nodes[node].middle = right_node.left;
                        self.adopt(node, lone_child);
                        self.adopt(node, right_node.left);
                        self.nodes[parent].right_value = Some(right_node.left_value);
                        self.nodes[right_sibling] = Node23 {
                            left_value: right_right,
                            right_value: None,
                            left: right_node.middle,
                            middle: right_node.right,
                            right: NIL,
                            ..right_node
                        };
                        return Ok(());
                    }
                }
                // Merge with the left sibling, absorbing the left separator.
                self.nodes[left_sibling] = Node23 {
                    right_value: Some(parent_node.left_value),
                    right: lone_child,
                    ..left_node
                };
                self.adopt(left_sibling, lone_child);
                self.nodes.dealloc(node);
                if let Some(parent_right) = parent_node.right_value {
                    self.nodes[parent].left_value = parent_right;
                    self.nodes[parent].right_value = None;
                    self.nodes[parent].middle = parent_node.right;
                    self.nodes[parent].right = NIL;
                    return Ok(());
                }
                node = parent;
                lone_child = left_sibling;
            } else if node == parent_node.right {
                let Some(parent_right) = parent_node.right_value else {
                    debug_assert!(false, "right child without a right value");
                    return Err(StoreError::Corrupted("node shape and child links disagree"));
                };
                let sibling = parent_node.middle;
                let sibling_node = self.nodes[sibling];
                if let Some(sibling_right) = sibling_node.right_value {
                    // Borrow from the middle sibling.
                    self.nodes[node].left_value = parent_right;
                    self.nodes[node].left = sibling_node.right;
                    self.nodes[node].middle = lone_child;
                    self.adopt(node, sibling_node.right);
                    self.adopt(node, lone_child);
                    self.nodes[parent].right_value = Some(sibling_right);
                    self.nodes[sibling].right_value = None;
                    self.nodes[sibling].right = NIL;
                    return Ok(());
                }
                // Merge with the middle sibling; the parent keeps one value.
                self.nodes[sibling] = Node23 {
                    right_value: Some(parent_right),
                    right: lone_child,
                    ..sibling_node
                };
                self.adopt(sibling, lone_child);
                self.nodes.dealloc(node);
                self.nodes[parent].right_value = None;
                self.nodes[parent].right = NIL;
                return Ok(());
            } else {
                debug_assert!(false, "parent lost track of its child");
                return Err(StoreError::Corrupted("tree parent link mismatch"));
            }
        }
    }

    /// Returns an iterator visiting buckets in index order and each tree in
    /// ascending key order.
    pub fn iter(&self) -> Iter<'_> {
        Iter { store: self, bucket: 0, stack: Vec::new() }
    }

    /// Verifies ordering, value counts, parent links and the equal leaf depth
    /// of every tree.
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
    fn check_subtree(&self, node: u32, lower: Option<i64>, upper: Option<i64>) -> usize {
        let current = &self.nodes[node];
        let left_key = current.left_value.key;
        if let Some(lower) = lower {
            assert!(left_key > lower, "key {left_key} violates ordering");
        }
        let max_key = match current.right_value {
            Some(right_value) => {
                assert!(right_value.key > left_key, "values out of order at {left_key}");
                right_value.key
            }
            None => {
                assert_eq!(current.right, NIL, "1-value node with a right child");
                left_key
            }
        };
        if let Some(upper) = upper {
            assert!(max_key < upper, "key {max_key} violates ordering");
        }
        assert_eq!(
            current.left == NIL,
            current.middle == NIL,
            "half-leaf node at key {left_key}"
        );
        if current.left == NIL {
            return 1;
        }
        for child in [current.left, current.middle, current.right] {
            if child != NIL {
                assert_eq!(self.nodes[child].parent, node);
            }
        }
        let left_depth = self.check_subtree(current.left, lower, Some(left_key));
        let middle_upper = current.right_value.map(|value| value.key).or(upper);
        let middle_depth = self.check_subtree(current.middle, Some(left_key), middle_upper);
        assert_eq!(left_depth, middle_depth, "unequal leaf depth at key {left_key}");
        if let Some(right_value) = current.right_value {
            assert_ne!(current.right, NIL, "2-value interior node missing its right child");
            let right_depth = self.check_subtree(current.right, Some(right_value.key), upper);
            assert_eq!(left_depth, right_depth, "unequal leaf depth at key {left_key}");
        }
        left_depth + 1
    }
}

struct Frame {
    node: u32,
    stage: u8,
}

/// In-order iterator over the entries of a [`TwoThreeTree`].
pub struct Iter<'a> {
    store: &'a TwoThreeTree,
    bucket: usize,
    stack: Vec<Frame>,
}

impl Iterator for Iter<'_> {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        loop {
            let Some(frame) = self.stack.last_mut() else {
                let root = *self.store.roots.get(self.bucket)?;
                self.bucket += 1;
                if root != NIL {
                    self.stack.push(Frame { node: root, stage: 0 });
                }
                continue;
            };
            let current = &self.store.nodes[frame.node];
            match frame.stage {
                0 => {
                    frame.stage = 1;
                    if current.left != NIL {
                        let left = current.left;
                        self.stack.push(Frame { node: left, stage: 0 });
                    }
                }
                1 => {
                    frame.stage = 2;
                    return Some(current.left_value);
                }
                2 => {
                    frame.stage = 3;
                    if current.middle != NIL {
                        let middle = current.middle;
                        self.stack.push(Frame { node: middle, stage: 0 });
                    }
                }
                3 => match current.right_value {
                    Some(right_value) => {
                        frame.stage = 4;
                        return Some(right_value);
                    }
                    None => {
                        self.stack.pop();
                    }
                },
                _ => {
                    let right = current.right;
                    self.stack.pop();
                    if right != NIL {
                        self.stack.push(Frame { node: right, stage: 0 });
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn fill(store: &mut TwoThreeTree, home: usize, keys: &[i64]) {
        for &key in keys {
            assert_eq!(store.set(home, Entry { key, value: key * 10 }), Ok(None));
            store.check_invariants();
        }
    }

    fn keys(store: &TwoThreeTree) -> Vec<i64> {
        store.iter().map(|entry| entry.key).collect()
    }

    fn node_keys(store: &TwoThreeTree, node: u32) -> Vec<i64> {
        let current = &store.nodes[node];
        let mut keys = vec![current.left_value.key];
        keys.extend(current.right_value.map(|value| value.key));
        keys
    }

    #[test]
    fn three_keys_split_the_root() {
        let mut store = TwoThreeTree::new(1);
        fill(&mut store, 0, &[1, 2, 3]);
        let root = store.roots[0];
        assert_eq!(node_keys(&store, root), vec![2]);
        assert_eq!(node_keys(&store, store.nodes[root].left), vec![1]);
        assert_eq!(node_keys(&store, store.nodes[root].middle), vec![3]);
    }

    #[test]
    fn splits_absorb_into_one_value_parent() {
        let mut store = TwoThreeTree::new(2);
        // Left child of the root {4} overflows: 1, 2, 3 split around 2.
        fill(&mut store, 0, &[2, 4, 6, 1, 3]);
        let root = store.roots[0];
        assert_eq!(node_keys(&store, root), vec![2, 4]);
        assert_eq!(node_keys(&store, store.nodes[root].left), vec![1]);
        assert_eq!(node_keys(&store, store.nodes[root].middle), vec![3]);
        assert_eq!(node_keys(&store, store.nodes[root].right), vec![6]);
        // Middle child overflow takes the other absorb path.
        fill(&mut store, 1, &[2, 4, 6, 5, 7]);
        let root = store.roots[1];
        assert_eq!(node_keys(&store, root), vec![4, 6]);
        assert_eq!(node_keys(&store, store.nodes[root].middle), vec![5]);
        assert_eq!(node_keys(&store, store.nodes[root].right), vec![7]);
    }

    #[test]
    fn splits_cascade_to_a_new_root() {
        let mut store = TwoThreeTree::new(1);
        fill(&mut store, 0, &(1..=8).collect::<Vec<_>>());
        // Ascending inserts grow to height 3 at key 8.
        let root = store.roots[0];
        assert_eq!(node_keys(&store, root), vec![4]);
        assert_eq!(node_keys(&store, store.nodes[root].left), vec![2]);
        assert_eq!(node_keys(&store, store.nodes[root].middle), vec![6]);
        assert_eq!(keys(&store), (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn splits_under_two_value_parent() {
        // A 2-value root {4, 8} with leaf children {2}, {6}, {10}; each of
        // the three children overflowing exercises one of the three split
        // topologies, the left one additionally cascading into a root split.
        for overflow in [[1, 3], [5, 7], [9, 11]] {
            let mut store = TwoThreeTree::new(1);
            fill(&mut store, 0, &[4, 8, 2, 6, 10]);
            assert_eq!(node_keys(&store, store.roots[0]), vec![4, 8]);
            fill(&mut store, 0, &overflow);
            let mut expected = vec![2, 4, 6, 8, 10];
            expected.extend(overflow);
            expected.sort_unstable();
            assert_eq!(keys(&store), expected);
        }
    }

    #[test]
    fn overwrite_in_either_slot() {
        let mut store = TwoThreeTree::new(1);
        fill(&mut store, 0, &[4, 8]);
        assert_eq!(store.set(0, Entry { key: 4, value: 1 }), Ok(Some(40)));
        assert_eq!(store.set(0, Entry { key: 8, value: 2 }), Ok(Some(80)));
        assert_eq!(store.get(0, 4), Some(1));
        assert_eq!(store.get(0, 8), Some(2));
        assert_eq!(store.iter().count(), 2);
    }

    #[test]
    fn delete_from_two_value_leaf() {
        let mut store = TwoThreeTree::new(1);
        fill(&mut store, 0, &[1, 2, 3, 4]);
        // Leaf {3, 4} loses one value, no rebalancing needed.
        assert_eq!(store.del(0, 4), Ok(Some(40)));
        store.check_invariants();
        assert_eq!(keys(&store), vec![1, 2, 3]);
    }

    #[test]
    fn delete_borrows_from_sibling() {
        let mut store = TwoThreeTree::new(1);
        fill(&mut store, 0, &[1, 2, 3, 4]);
        // Leaf {1} underflows and borrows through the root from {3, 4}.
        assert_eq!(store.del(0, 1), Ok(Some(10)));
        store.check_invariants();
        assert_eq!(keys(&store), vec![2, 3, 4]);
    }

    #[test]
    fn delete_merges_and_shrinks_the_root() {
        let mut store = TwoThreeTree::new(1);
        fill(&mut store, 0, &[1, 2, 3]);
        assert_eq!(store.del(0, 1), Ok(Some(10)));
        store.check_invariants();
        // Both remaining keys collapse into a single root node.
        assert_eq!(node_keys(&store, store.roots[0]), vec![2, 3]);
        assert_eq!(store.del(0, 3), Ok(Some(30)));
        assert_eq!(store.del(0, 2), Ok(Some(20)));
        assert_eq!(store.roots[0], NIL);
        assert_eq!(store.del(0, 2), Ok(None));
    }

    #[test]
    fn delete_interior_value_swaps_with_successor() {
        let mut store = TwoThreeTree::new(1);
        fill(&mut store, 0, &(1..=8).collect::<Vec<_>>());
        // The root value is interior; deletion promotes its successor leaf
        // value and repairs the resulting leaf underflow.
        assert_eq!(store.del(0, 4), Ok(Some(40)));
        store.check_invariants();
        assert_eq!(keys(&store), vec![1, 2, 3, 5, 6, 7, 8]);
        assert_eq!(store.get(0, 4), None);
        assert_eq!(store.get(0, 5), Some(50));
    }

    #[test]
    fn drain_in_every_order() {
        let orders: [&[i64]; 3] = [&[1, 2, 3, 4, 5, 6, 7], &[7, 6, 5, 4, 3, 2, 1], &[4, 1, 7, 2, 6, 3, 5]];
        for order in orders {
            let mut store = TwoThreeTree::new(1);
            fill(&mut store, 0, &(1..=7).collect::<Vec<_>>());
            let mut expected: Vec<i64> = (1..=7).collect();
            for &key in order {
                assert_eq!(store.del(0, key), Ok(Some(key * 10)), "deleting {key}");
                store.check_invariants();
                expected.retain(|&k| k != key);
                assert_eq!(keys(&store), expected);
            }
            assert_eq!(store.roots[0], NIL);
        }
    }

    #[test]
    fn randomized_against_reference() {
        let mut rng = SmallRng::seed_from_u64(0x2323);
        let mut store = TwoThreeTree::new(4);
        let mut reference = std::collections::BTreeMap::<i64, i64>::new();
        for step in 0..2000 {
            let key = rng.gen_range(0..200);
            let home = (key & 3) as usize;
            if rng.gen_bool(0.6) {
                let value = step;
                let previous = store.set(home, Entry { key, value }).unwrap();
                assert_eq!(previous, reference.insert(key, value));
            } else {
                let removed = store.del(home, key).unwrap();
                assert_eq!(removed, reference.remove(&key));
            }
            store.check_invariants();
            assert_eq!(store.get(home, key), reference.get(&key).copied());
        }
        let mut collected: Vec<_> = store.iter().map(|entry| (entry.key, entry.value)).collect();
        collected.sort_unstable();
        let expected: Vec<_> = reference.into_iter().collect();
        assert_eq!(collected, expected);
    }
}
