//! Open-addressing stores: linear and quadratic probing over a flat slot
//! array.
//!
//! Both stores keep at most one entry per slot and resolve collisions by
//! visiting alternative slots in a fixed order. Neither probe sequence wraps
//! around the array: a sequence that leaves the array simply ends, and an
//! insert that finds no usable slot reports [`StoreError::CapacityExhausted`].

use crate::store::{Entry, StoreError};

/// Open-addressing store scanning forward from the home slot.
///
/// The probe sequence for home slot `h` is `h, h + 1, ..., len - 1`. Slots
/// before `h` are never considered.
pub struct LinearProbe {
    slots: Vec<Option<Entry>>,
}

impl LinearProbe {
    /// Creates a store with `buckets` empty slots.
    pub fn new(buckets: usize) -> Self {
        Self { slots: vec![None; buckets] }
    }

    /// Returns the number of slots.
    pub fn bucket_count(&self) -> usize {
        self.slots.len()
    }

    /// Looks up `key` along its probe sequence.
    ///
    /// The scan runs to the end of the array even across empty slots, matching
    /// the deletion strategy of clearing slots without back-shifting.
    pub fn get(&self, home: usize, key: i64) -> Option<i64> {
        for slot in self.slots.get(home..)? {
            if let Some(entry) = slot {
                if entry.key == key {
                    return Some(entry.value);
                }
            }
        }
        None
    }

    /// Inserts or overwrites `entry` along its probe sequence.
    pub fn set(&mut self, home: usize, entry: Entry) -> Result<Option<i64>, StoreError> {
        if home >= self.slots.len() {
            return Err(StoreError::IndexOutOfRange);
        }
        let mut free = None;
        for (index, slot) in self.slots.iter_mut().enumerate().skip(home) {
            match slot {
                Some(occupant) if occupant.key == entry.key => {
                    let previous = occupant.value;
                    occupant.value = entry.value;
                    return Ok(Some(previous));
                }
                Some(_) => (),
                None => {
                    // Keep scanning for the key, it may sit past a cleared
                    // slot left behind by a deletion.
                    if free.is_none() {
                        free = Some(index);
                    }
                }
            }
        }
        match free {
            Some(index) => {
                self.slots[index] = Some(entry);
                Ok(None)
            }
            None => Err(StoreError::CapacityExhausted),
        }
    }

    /// Removes `key`, clearing its slot. Later entries are not shifted back.
    pub fn del(&mut self, home: usize, key: i64) -> Result<Option<i64>, StoreError> {
        let Some(slots) = self.slots.get_mut(home..) else { return Ok(None) };
        for slot in slots {
            if let Some(entry) = slot {
                if entry.key == key {
                    let removed = entry.value;
                    *slot = None;
                    return Ok(Some(removed));
                }
            }
        }
        Ok(None)
    }

    /// Returns an iterator over all occupied slots in slot order.
    pub fn iter(&self) -> Iter<'_> {
        Iter { slots: self.slots.iter() }
    }
}

/// Open-addressing store scanning quadratic offsets around the home slot.
///
/// The probe sequence for home slot `h` tries `h - j²` then `h + j²` for
/// `j = 1, 2, ..., len / 2`, skipping offsets that fall outside the array. The
/// home slot itself is never part of the sequence.
pub struct QuadraticProbe {
    slots: Vec<Option<Entry>>,
}

impl QuadraticProbe {
    /// Creates a store with `buckets` empty slots.
    pub fn new(buckets: usize) -> Self {
        Self { slots: vec![None; buckets] }
    }

    /// Returns the number of slots.
    pub fn bucket_count(&self) -> usize {
        self.slots.len()
    }

    fn probe_sequence(len: usize, home: usize) -> impl Iterator<Item = usize> {
        (1..=len / 2).flat_map(move |j| {
            let offset = j * j;
            let below = home.checked_sub(offset);
            let above = home.checked_add(offset).filter(|&index| index < len);
            below.into_iter().chain(above)
        })
    }

    /// Looks up `key` along its probe sequence.
    pub fn get(&self, home: usize, key: i64) -> Option<i64> {
        if home >= self.slots.len() {
            return None;
        }
        for index in Self::probe_sequence(self.slots.len(), home) {
            if let Some(entry) = self.slots[index] {
                if entry.key == key {
                    return Some(entry.value);
                }
            }
        }
        None
    }

    /// Inserts or overwrites `entry` along its probe sequence.
    pub fn set(&mut self, home: usize, entry: Entry) -> Result<Option<i64>, StoreError> {
        if home >= self.slots.len() {
            return Err(StoreError::IndexOutOfRange);
        }
        let mut free = None;
        for index in Self::probe_sequence(self.slots.len(), home) {
            match self.slots[index] {
                Some(occupant) if occupant.key == entry.key => {
                    let previous = occupant.value;
                    self.slots[index] = Some(entry);
                    return Ok(Some(previous));
                }
                Some(_) => (),
                None => {
                    if free.is_none() {
                        free = Some(index);
                    }
                }
            }
        }
        match free {
            Some(index) => {
                self.slots[index] = Some(entry);
                Ok(None)
            }
            None => Err(StoreError::CapacityExhausted),
        }
    }

    /// Removes `key`, clearing its slot.
    pub fn del(&mut self, home: usize, key: i64) -> Result<Option<i64>, StoreError> {
        if home >= self.slots.len() {
            return Ok(None);
        }
        for index in Self::probe_sequence(self.slots.len(), home) {
            if let Some(entry) = self.slots[index] {
                if entry.key == key {
                    self.slots[index] = None;
                    return Ok(Some(entry.value));
                }
            }
        }
        Ok(None)
    }

    /// Returns an iterator over all occupied slots in slot order.
    pub fn iter(&self) -> Iter<'_> {
        Iter { slots: self.slots.iter() }
    }
}

/// Iterator over the occupied slots of a probing store, in slot order.
pub struct Iter<'a> {
    slots: std::slice::Iter<'a, Option<Entry>>,
}

impl Iterator for Iter<'_> {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        self.slots.by_ref().find_map(|slot| *slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_spills_into_following_slots() {
        let mut store = LinearProbe::new(8);
        assert_eq!(store.set(2, Entry { key: 10, value: 100 }), Ok(None));
        assert_eq!(store.set(2, Entry { key: 11, value: 110 }), Ok(None));
        assert_eq!(store.set(2, Entry { key: 12, value: 120 }), Ok(None));
        assert_eq!(store.get(2, 10), Some(100));
        assert_eq!(store.get(2, 11), Some(110));
        assert_eq!(store.get(2, 12), Some(120));
        // The spilled entries occupy the slots right after the home slot.
        let slots: Vec<_> = store.iter().map(|entry| entry.key).collect();
        assert_eq!(slots, vec![10, 11, 12]);
    }

    #[test]
    fn linear_overwrite_returns_previous() {
        let mut store = LinearProbe::new(4);
        assert_eq!(store.set(1, Entry { key: 7, value: 70 }), Ok(None));
        assert_eq!(store.set(1, Entry { key: 7, value: 71 }), Ok(Some(70)));
        assert_eq!(store.get(1, 7), Some(71));
        assert_eq!(store.iter().count(), 1);
    }

    #[test]
    fn linear_never_wraps_around() {
        let mut store = LinearProbe::new(4);
        assert_eq!(store.set(3, Entry { key: 1, value: 1 }), Ok(None));
        // Slot 3 is the only slot reachable from home 3.
        assert_eq!(store.set(3, Entry { key: 2, value: 2 }), Err(StoreError::CapacityExhausted));
        // Slots 0..3 are free but unreachable from home 3.
        assert_eq!(store.set(0, Entry { key: 2, value: 2 }), Ok(None));
    }

    #[test]
    fn linear_finds_key_past_cleared_slot() {
        let mut store = LinearProbe::new(8);
        store.set(0, Entry { key: 1, value: 1 }).unwrap();
        store.set(0, Entry { key: 2, value: 2 }).unwrap();
        store.set(0, Entry { key: 3, value: 3 }).unwrap();
        assert_eq!(store.del(0, 2), Ok(Some(2)));
        // Key 3 now sits past an empty slot and must still be found.
        assert_eq!(store.get(0, 3), Some(3));
        assert_eq!(store.set(0, Entry { key: 3, value: 30 }), Ok(Some(3)));
        assert_eq!(store.get(0, 3), Some(30));
    }

    #[test]
    fn linear_delete_missing_is_ok_none() {
        let mut store = LinearProbe::new(4);
        assert_eq!(store.del(0, 42), Ok(None));
        assert_eq!(store.del(7, 42), Ok(None));
    }

    #[test]
    fn quadratic_home_slot_is_never_probed() {
        let mut store = QuadraticProbe::new(8);
        assert_eq!(store.set(4, Entry { key: 1, value: 10 }), Ok(None));
        // j = 1 places the first entry at 4 - 1 = 3, not at 4 itself.
        assert!(store.slots[4].is_none());
        assert_eq!(store.slots[3], Some(Entry { key: 1, value: 10 }));
    }

    #[test]
    fn quadratic_probe_order_below_then_above() {
        let mut store = QuadraticProbe::new(16);
        for key in 0..4 {
            store.set(8, Entry { key, value: key }).unwrap();
        }
        // j = 1: slots 7 and 9; j = 2: slots 4 and 12.
        assert_eq!(store.slots[7], Some(Entry { key: 0, value: 0 }));
        assert_eq!(store.slots[9], Some(Entry { key: 1, value: 1 }));
        assert_eq!(store.slots[4], Some(Entry { key: 2, value: 2 }));
        assert_eq!(store.slots[12], Some(Entry { key: 3, value: 3 }));
        for key in 0..4 {
            assert_eq!(store.get(8, key), Some(key));
        }
    }

    #[test]
    fn quadratic_tiny_table_exhausts_immediately() {
        // With two slots the offset range 1..=1 only reaches home ± 1, and a
        // home of 0 reaches a single slot.
        let mut store = QuadraticProbe::new(2);
        assert_eq!(store.set(0, Entry { key: 1, value: 1 }), Ok(None));
        assert_eq!(store.set(0, Entry { key: 2, value: 2 }), Err(StoreError::CapacityExhausted));
        assert_eq!(store.get(0, 1), Some(1));
        assert_eq!(store.get(0, 2), None);
    }

    #[test]
    fn quadratic_overwrite_and_delete() {
        let mut store = QuadraticProbe::new(8);
        assert_eq!(store.set(4, Entry { key: 9, value: 90 }), Ok(None));
        assert_eq!(store.set(4, Entry { key: 9, value: 91 }), Ok(Some(90)));
        assert_eq!(store.del(4, 9), Ok(Some(91)));
        assert_eq!(store.del(4, 9), Ok(None));
        assert_eq!(store.get(4, 9), None);
    }

    #[test]
    fn quadratic_out_of_range_home() {
        let mut store = QuadraticProbe::new(4);
        assert_eq!(store.set(4, Entry { key: 1, value: 1 }), Err(StoreError::IndexOutOfRange));
        assert_eq!(store.get(4, 1), None);
        assert_eq!(store.del(4, 1), Ok(None));
    }
}
