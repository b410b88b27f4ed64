//! The bucket-store contract and its six implementations.
//!
//! Every backend resolves collisions locally to one home bucket and exposes the
//! same set of operations: `bucket_count`, `get`, `set`, `del`, `iter` and
//! `reallocate`. The backends are a closed set of tagged variants dispatched
//! through [`BucketStore`]; the facade selects one at construction time via
//! [`StoreKind`].
use core::fmt;

pub mod avl;
pub mod bst;
pub mod chained;
pub mod probe;
pub mod two_three;

use avl::AvlTree;
use bst::BinaryTree;
use chained::ChainedList;
use probe::{LinearProbe, QuadraticProbe};
use two_three::TwoThreeTree;

/// Key-value pair stored in a bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Entry {
    /// Key, unique within the whole table.
    pub key: i64,
    /// Payload stored for the key.
    pub value: i64,
}

/// Failure modes of the bucket-store operations.
///
/// Not-found is a normal outcome and reported as `Ok(None)`, never through this
/// type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// The probe sequence for the key's home bucket is fully occupied by other
    /// keys. Recoverable by the caller, typically by retrying with a larger
    /// table; the store never resizes itself.
    CapacityExhausted,
    /// The hash function produced an index outside the bucket array.
    IndexOutOfRange,
    /// Internal bookkeeping violated a structural invariant. Continuing would
    /// leave the store permanently corrupted, so the operation is abandoned.
    Corrupted(&'static str),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::CapacityExhausted => {
                write!(f, "probe sequence exhausted without a usable slot")
            }
            StoreError::IndexOutOfRange => {
                write!(f, "hash index out of range for the bucket count")
            }
            StoreError::Corrupted(detail) => {
                write!(f, "internal invariant violated: {detail}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Selects which [`BucketStore`] backend a table is built on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    /// Open addressing, scanning forward from the home slot.
    LinearProbe,
    /// Open addressing, scanning quadratic offsets around the home slot.
    QuadraticProbe,
    /// One doubly linked list per bucket.
    ChainedList,
    /// One unbalanced binary search tree per bucket.
    BinaryTree,
    /// One height-balanced AVL tree per bucket.
    AvlTree,
    /// One 2-3 tree per bucket.
    TwoThreeTree,
}

/// A collision store: resolves all operations locally to one home bucket.
///
/// `set` inserts or overwrites and reports the previous value on overwrite;
/// `del` reports the removed value. Iteration order is backend-defined (slot
/// order for probing, insertion order per chain, key order per tree bucket)
/// and not part of the contract.
pub enum BucketStore {
    /// See [`LinearProbe`].
    LinearProbe(LinearProbe),
    /// See [`QuadraticProbe`].
    QuadraticProbe(QuadraticProbe),
    /// See [`ChainedList`].
    ChainedList(ChainedList),
    /// See [`BinaryTree`].
    BinaryTree(BinaryTree),
    /// See [`AvlTree`].
    AvlTree(AvlTree),
    /// See [`TwoThreeTree`].
    TwoThreeTree(TwoThreeTree),
}

impl BucketStore {
    /// Creates a store of the given kind with `buckets` home slots.
    pub fn new(kind: StoreKind, buckets: usize) -> Self {
        match kind {
            StoreKind::LinearProbe => BucketStore::LinearProbe(LinearProbe::new(buckets)),
            StoreKind::QuadraticProbe => BucketStore::QuadraticProbe(QuadraticProbe::new(buckets)),
            StoreKind::ChainedList => BucketStore::ChainedList(ChainedList::new(buckets)),
            StoreKind::BinaryTree => BucketStore::BinaryTree(BinaryTree::new(buckets)),
            StoreKind::AvlTree => BucketStore::AvlTree(AvlTree::new(buckets)),
            StoreKind::TwoThreeTree => BucketStore::TwoThreeTree(TwoThreeTree::new(buckets)),
        }
    }

    /// Returns the kind of the active backend.
    pub fn kind(&self) -> StoreKind {
        match self {
            BucketStore::LinearProbe(_) => StoreKind::LinearProbe,
            BucketStore::QuadraticProbe(_) => StoreKind::QuadraticProbe,
            BucketStore::ChainedList(_) => StoreKind::ChainedList,
            BucketStore::BinaryTree(_) => StoreKind::BinaryTree,
            BucketStore::AvlTree(_) => StoreKind::AvlTree,
            BucketStore::TwoThreeTree(_) => StoreKind::TwoThreeTree,
        }
    }

    /// Returns the number of home buckets, not the number of entries.
    pub fn bucket_count(&self) -> usize {
        match self {
            BucketStore::LinearProbe(store) => store.bucket_count(),
            BucketStore::QuadraticProbe(store) => store.bucket_count(),
            BucketStore::ChainedList(store) => store.bucket_count(),
            BucketStore::BinaryTree(store) => store.bucket_count(),
            BucketStore::AvlTree(store) => store.bucket_count(),
            BucketStore::TwoThreeTree(store) => store.bucket_count(),
        }
    }

    /// Looks up `key` in its home bucket.
    pub fn get(&self, home: usize, key: i64) -> Option<i64> {
        match self {
            BucketStore::LinearProbe(store) => store.get(home, key),
            BucketStore::QuadraticProbe(store) => store.get(home, key),
            BucketStore::ChainedList(store) => store.get(home, key),
            BucketStore::BinaryTree(store) => store.get(home, key),
            BucketStore::AvlTree(store) => store.get(home, key),
            BucketStore::TwoThreeTree(store) => store.get(home, key),
        }
    }

    /// Inserts `entry` into its home bucket, or overwrites an existing entry
    /// with the same key, returning the previous value.
    pub fn set(&mut self, home: usize, entry: Entry) -> Result<Option<i64>, StoreError> {
        match self {
            BucketStore::LinearProbe(store) => store.set(home, entry),
            BucketStore::QuadraticProbe(store) => store.set(home, entry),
            BucketStore::ChainedList(store) => store.set(home, entry),
            BucketStore::BinaryTree(store) => store.set(home, entry),
            BucketStore::AvlTree(store) => store.set(home, entry),
            BucketStore::TwoThreeTree(store) => store.set(home, entry),
        }
    }

    /// Removes `key` from its home bucket, returning the removed value.
    pub fn del(&mut self, home: usize, key: i64) -> Result<Option<i64>, StoreError> {
        match self {
            BucketStore::LinearProbe(store) => store.del(home, key),
            BucketStore::QuadraticProbe(store) => store.del(home, key),
            BucketStore::ChainedList(store) => store.del(home, key),
            BucketStore::BinaryTree(store) => store.del(home, key),
            BucketStore::AvlTree(store) => store.del(home, key),
            BucketStore::TwoThreeTree(store) => store.del(home, key),
        }
    }

    /// Replaces the backing storage when `buckets` differs from the current
    /// bucket count. Existing entries are discarded, not migrated.
    pub fn reallocate(&mut self, buckets: usize) {
        if self.bucket_count() == buckets {
            return;
        }
        *self = BucketStore::new(self.kind(), buckets);
    }

    /// Returns an iterator over every live entry across every bucket.
    pub fn iter(&self) -> StoreIter<'_> {
        StoreIter {
            inner: match self {
                BucketStore::LinearProbe(store) => StoreIterInner::Probe(store.iter()),
                BucketStore::QuadraticProbe(store) => StoreIterInner::Probe(store.iter()),
                BucketStore::ChainedList(store) => StoreIterInner::Chained(store.iter()),
                BucketStore::BinaryTree(store) => StoreIterInner::BinaryTree(store.iter()),
                BucketStore::AvlTree(store) => StoreIterInner::AvlTree(store.iter()),
                BucketStore::TwoThreeTree(store) => StoreIterInner::TwoThreeTree(store.iter()),
            },
        }
    }
}

/// Iterator yielding every live entry of a [`BucketStore`].
pub struct StoreIter<'a> {
    inner: StoreIterInner<'a>,
}

enum StoreIterInner<'a> {
    Probe(probe::Iter<'a>),
    Chained(chained::Iter<'a>),
    BinaryTree(bst::Iter<'a>),
    AvlTree(avl::Iter<'a>),
    TwoThreeTree(two_three::Iter<'a>),
}

impl Iterator for StoreIter<'_> {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        match &mut self.inner {
            StoreIterInner::Probe(iter) => iter.next(),
            StoreIterInner::Chained(iter) => iter.next(),
            StoreIterInner::BinaryTree(iter) => iter.next(),
            StoreIterInner::AvlTree(iter) => iter.next(),
            StoreIterInner::TwoThreeTree(iter) => iter.next(),
        }
    }
}
