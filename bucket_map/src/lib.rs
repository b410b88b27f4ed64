//! Integer key-value table with interchangeable per-bucket collision stores.
//!
//! A [`BucketMap`] hashes each key to a home bucket and delegates all collision
//! handling to a [`BucketStore`], a closed set of six interchangeable backends:
//! linear and quadratic open addressing, a doubly linked chain per bucket, and
//! three per-bucket ordered trees (plain binary search tree, height-balanced
//! AVL tree, and a 2-3 tree).
//!
//! All tree backends store their nodes in flat index-addressed arenas, so
//! parent and child links are plain `u32` indices rather than references, and
//! rotations and node splits are index reassignments.
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::undocumented_unsafe_blocks)]

mod arena;
mod map;
pub mod store;

pub use map::{BucketMap, HashFn, Iter, DEFAULT_BUCKET_COUNT, DEFAULT_LOAD_FACTOR};
pub use store::{BucketStore, Entry, StoreError, StoreIter, StoreKind};
