//! Index-addressed node storage shared by the linked and tree backends.
use std::ops::{Index, IndexMut};

/// Sentinel index encoding an absent node link.
pub(crate) const NIL: u32 = u32::MAX;

/// Flat node storage addressed by stable `u32` indices.
///
/// Nodes are recycled through a free list; a freed slot keeps its last contents
/// until it is handed out again, so indices must not be used after
/// [`dealloc`][Arena::dealloc].
pub(crate) struct Arena<N> {
    nodes: Vec<N>,
    free: Vec<u32>,
}

impl<N> Default for Arena<N> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<N> Arena<N> {
    /// Stores a node and returns its stable index.
    pub fn alloc(&mut self, node: N) -> u32 {
        if let Some(id) = self.free.pop() {
            self.nodes[id as usize] = node;
            id
        } else {
            let id = self.nodes.len();
            assert!(id < NIL as usize);
            self.nodes.push(node);
            id as u32
        }
    }

    /// Returns a node's slot to the free list.
    pub fn dealloc(&mut self, id: u32) {
        debug_assert!((id as usize) < self.nodes.len());
        self.free.push(id);
    }
}

impl<N> Index<u32> for Arena<N> {
    type Output = N;

    fn index(&self, id: u32) -> &N {
        &self.nodes[id as usize]
    }
}

impl<N> IndexMut<u32> for Arena<N> {
    fn index_mut(&mut self, id: u32) -> &mut N {
        &mut self.nodes[id as usize]
    }
}
