// File: src/table.rs
//
// A small open-addressed hash table mapping interned-string handles to
// values, in the spirit of clox's `table.c`. Interning (see
// `heap.rs`) guarantees at most one `Gc` handle per distinct string
// content, so handle equality already *is* string-content equality;
// the table below simply treats the handle's arena index as the key.

use crate::heap::Gc;
use ahash::AHasher;
use std::hash::{Hash, Hasher};

const MAX_LOAD: f64 = 0.75;

#[derive(Clone)]
enum Slot<V> {
    Empty,
    Tombstone,
    Occupied(Gc, V),
}

/// Open-addressed hash table with linear probing and tombstone
/// deletion, keyed by interned-string handles.
#[derive(Clone)]
pub struct Table<V> {
    entries: Vec<Slot<V>>,
    len: usize, // occupied, excludes tombstones
}

impl<V: Copy> Default for Table<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Copy> Table<V> {
    pub fn new() -> Self {
        Table { entries: Vec::new(), len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn hash_key(key: Gc) -> u64 {
        let mut hasher = AHasher::default();
        key.hash(&mut hasher);
        hasher.finish()
    }

    fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Find the slot `key` belongs in (existing occupant, first
    /// tombstone seen, or first empty slot), per clox's `findEntry`.
    fn find_slot(entries: &[Slot<V>], key: Gc) -> usize {
        let cap = entries.len();
        let mut index = (Self::hash_key(key) as usize) % cap;
        let mut tombstone: Option<usize> = None;
        loop {
            match &entries[index] {
                Slot::Empty => return tombstone.unwrap_or(index),
                Slot::Tombstone => {
                    if tombstone.is_none() {
                        tombstone = Some(index);
                    }
                }
                Slot::Occupied(k, _) if *k == key => return index,
                Slot::Occupied(_, _) => {}
            }
            index = (index + 1) % cap;
        }
    }

    fn grow(&mut self) {
        let new_cap = if self.entries.is_empty() { 8 } else { self.entries.len() * 2 };
        let mut new_entries: Vec<Slot<V>> = (0..new_cap).map(|_| Slot::Empty).collect();
        let mut new_len = 0;
        for slot in self.entries.drain(..) {
            if let Slot::Occupied(k, v) = slot {
                let idx = Self::find_slot(&new_entries, k);
                new_entries[idx] = Slot::Occupied(k, v);
                new_len += 1;
            }
        }
        self.entries = new_entries;
        self.len = new_len;
    }

    /// Insert, returning true if this created a new key (clox's
    /// `tableSet` return value).
    pub fn set(&mut self, key: Gc, value: V) -> bool {
        if self.capacity() == 0 || (self.len + 1) as f64 > self.capacity() as f64 * MAX_LOAD {
            self.grow();
        }
        let idx = Self::find_slot(&self.entries, key);
        let is_new = !matches!(self.entries[idx], Slot::Occupied(_, _));
        if is_new {
            self.len += 1;
        }
        self.entries[idx] = Slot::Occupied(key, value);
        is_new
    }

    pub fn get(&self, key: Gc) -> Option<V> {
        if self.entries.is_empty() {
            return None;
        }
        match self.entries[Self::find_slot(&self.entries, key)] {
            Slot::Occupied(_, v) => Some(v),
            _ => None,
        }
    }

    pub fn contains(&self, key: Gc) -> bool {
        self.get(key).is_some()
    }

    /// Delete via tombstone so later probes that skipped over this
    /// slot still find their target.
    pub fn delete(&mut self, key: Gc) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let idx = Self::find_slot(&self.entries, key);
        if matches!(self.entries[idx], Slot::Occupied(_, _)) {
            self.entries[idx] = Slot::Tombstone;
            self.len -= 1;
            true
        } else {
            false
        }
    }

    /// Copy every method from `other` into `self`, used by `OP_INHERIT`.
    pub fn copy_from(&mut self, other: &Table<V>) {
        for slot in &other.entries {
            if let Slot::Occupied(k, v) = slot {
                self.set(*k, *v);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Gc, &V)> {
        self.entries.iter().filter_map(|s| match s {
            Slot::Occupied(k, v) => Some((*k, v)),
            _ => None,
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Gc, &mut V)> {
        self.entries.iter_mut().filter_map(|s| match s {
            Slot::Occupied(k, v) => Some((*k, v)),
            _ => None,
        })
    }

    /// Remove every entry whose key does not satisfy `keep`. Used by
    /// the GC to drop unmarked interned strings after a mark phase.
    pub fn retain_keys(&mut self, mut keep: impl FnMut(Gc) -> bool) {
        for slot in &mut self.entries {
            if let Slot::Occupied(k, _) = slot {
                if !keep(*k) {
                    *slot = Slot::Tombstone;
                    self.len -= 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(i: u32) -> Gc {
        Gc::test_handle(i)
    }

    #[test]
    fn set_get_delete() {
        let mut t: Table<i32> = Table::new();
        assert!(t.set(h(1), 10));
        assert!(!t.set(h(1), 11));
        assert_eq!(t.get(h(1)), Some(11));
        assert_eq!(t.get(h(2)), None);
        assert!(t.delete(h(1)));
        assert_eq!(t.get(h(1)), None);
        assert!(!t.delete(h(1)));
    }

    #[test]
    fn grows_and_keeps_all_entries() {
        let mut t: Table<i32> = Table::new();
        for i in 0..200u32 {
            t.set(h(i), i as i32);
        }
        for i in 0..200u32 {
            assert_eq!(t.get(h(i)), Some(i as i32));
        }
        assert_eq!(t.len(), 200);
    }

    #[test]
    fn tombstone_does_not_break_later_probes() {
        let mut t: Table<i32> = Table::new();
        for i in 0..20u32 {
            t.set(h(i), i as i32);
        }
        t.delete(h(5));
        for i in 0..20u32 {
            if i != 5 {
                assert_eq!(t.get(h(i)), Some(i as i32));
            }
        }
    }
}
