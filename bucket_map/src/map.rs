//! The hash table facade dispatching to a [`BucketStore`].

use std::fmt;

use crate::store::{BucketStore, Entry, StoreError, StoreIter, StoreKind};

/// Bucket count used by [`BucketMap::new`].
pub const DEFAULT_BUCKET_COUNT: usize = 1 << 10;

/// Conventional load factor threshold callers compare
/// [`BucketMap::load_factor`] against before growing a table.
pub const DEFAULT_LOAD_FACTOR: f64 = 0.75;

/// Maps a key to its home bucket index for a given bucket count.
pub type HashFn = fn(i64, usize) -> usize;

/// Default hash: mask the key with `buckets - 1`. Correct only for
/// power-of-two bucket counts, which the constructors enforce.
fn mask_hash(key: i64, buckets: usize) -> usize {
    (key as u64 & (buckets as u64 - 1)) as usize
}

/// A key-value table over `i64` keys and values.
///
/// The table itself only computes a home bucket index for each key and
/// delegates everything else to the active [`BucketStore`] backend, selected
/// by [`StoreKind`] at construction time. The table never resizes itself;
/// [`BucketMap::load_factor`] is observational and [`BucketMap::reallocate`]
/// discards all entries.
///
/// ```
/// use bucket_map::{BucketMap, StoreKind};
///
/// let mut map = BucketMap::new(StoreKind::AvlTree);
/// assert_eq!(map.set(3, 30), Ok(None));
/// assert_eq!(map.set(3, 31), Ok(Some(30)));
/// assert_eq!(map.get(3), Some(31));
/// assert_eq!(map.len(), 1);
/// assert_eq!(map.del(3), Ok(Some(31)));
/// assert!(map.is_empty());
/// ```
pub struct BucketMap {
    store: BucketStore,
    live: usize,
    hash: HashFn,
}

impl BucketMap {
    /// Creates a table with [`DEFAULT_BUCKET_COUNT`] buckets and the default
    /// masking hash.
    pub fn new(kind: StoreKind) -> Self {
        Self::with_bucket_count(kind, DEFAULT_BUCKET_COUNT)
    }

    /// Creates a table with the given bucket count and the default masking
    /// hash.
    ///
    /// # Panics
    /// Panics unless `buckets` is a power of two, which the masking hash
    /// requires.
    pub fn with_bucket_count(kind: StoreKind, buckets: usize) -> Self {
        Self::with_hasher(kind, buckets, mask_hash)
    }

    /// Creates a table computing home buckets with a caller-supplied hash.
    ///
    /// The hash is trusted to stay within `0..buckets`; indices outside that
    /// range make the affected operation report a miss or
    /// [`StoreError::IndexOutOfRange`] instead of touching the store.
    ///
    /// # Panics
    /// Panics unless `buckets` is a power of two.
    pub fn with_hasher(kind: StoreKind, buckets: usize, hash: HashFn) -> Self {
        assert!(buckets.is_power_of_two(), "bucket count must be a power of two");
        Self { store: BucketStore::new(kind, buckets), live: 0, hash }
    }

    /// Returns the kind of the active backend.
    pub fn kind(&self) -> StoreKind {
        self.store.kind()
    }

    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` when the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Returns the number of home buckets.
    pub fn bucket_count(&self) -> usize {
        self.store.bucket_count()
    }

    /// Returns the ratio of live entries, plus `additional` hypothetical
    /// ones, to buckets. Purely observational; the table never acts on it.
    pub fn load_factor(&self, additional: usize) -> f64 {
        (self.live + additional) as f64 / self.bucket_count() as f64
    }

    fn home(&self, key: i64) -> Option<usize> {
        let home = (self.hash)(key, self.bucket_count());
        (home < self.bucket_count()).then_some(home)
    }

    /// Looks up the value stored for `key`.
    pub fn get(&self, key: i64) -> Option<i64> {
        self.store.get(self.home(key)?, key)
    }

    /// Inserts or overwrites the value for `key`, returning the previous
    /// value on overwrite. The live count only grows for a fresh key.
    pub fn set(&mut self, key: i64, value: i64) -> Result<Option<i64>, StoreError> {
        let Some(home) = self.home(key) else {
            return Err(StoreError::IndexOutOfRange);
        };
        let previous = self.store.set(home, Entry { key, value })?;
        if previous.is_none() {
            self.live += 1;
        }
        Ok(previous)
    }

    /// Removes `key`, returning its value. A missing key is `Ok(None)`, not
    /// an error.
    pub fn del(&mut self, key: i64) -> Result<Option<i64>, StoreError> {
        let Some(home) = self.home(key) else {
            return Ok(None);
        };
        let removed = self.store.del(home, key)?;
        if removed.is_some() {
            self.live -= 1;
        }
        Ok(removed)
    }

    /// Replaces the backing storage when `buckets` differs from the current
    /// bucket count. All entries are discarded, not migrated, and the live
    /// count resets to zero.
    ///
    /// # Panics
    /// Panics unless `buckets` is a power of two.
    pub fn reallocate(&mut self, buckets: usize) {
        assert!(buckets.is_power_of_two(), "bucket count must be a power of two");
        if buckets != self.bucket_count() {
            self.store.reallocate(buckets);
            self.live = 0;
        }
    }

    /// Returns an iterator over all live entries, in backend-defined order.
    pub fn iter(&self) -> Iter<'_> {
        Iter { inner: self.store.iter() }
    }
}

impl fmt::Debug for BucketMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter().map(|entry| (entry.key, entry.value))).finish()
    }
}

/// Iterator over the live entries of a [`BucketMap`].
pub struct Iter<'a> {
    inner: StoreIter<'a>,
}

impl Iterator for Iter<'_> {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        self.inner.next()
    }
}

impl<'a> IntoIterator for &'a BucketMap {
    type Item = Entry;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}
