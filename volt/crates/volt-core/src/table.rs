//! Open-addressed hash table keyed by interned strings.
//!
//! This is the one table type the interpreter uses for both the globals map
//! and the string-intern set. Keys are [`StrId`] handles whose hashes live in
//! the string arena, so key comparison during probing is handle identity and
//! never touches string content. The single exception is
//! [`Table::find_string`], which interning uses to look up raw bytes before
//! a handle exists.
//!
//! Invariants:
//! - capacity is 0 or 8·2^k; the table grows before an insertion would push
//!   the load factor above 0.75
//! - an empty slot is `(None, Nil)`; a tombstone is `(None, Bool(true))`
//! - `count` includes tombstones and is never decremented by `delete`;
//!   growing drops tombstones and recomputes it

use crate::object::StrId;
use crate::strings::Strings;
use crate::value::Value;

const TABLE_MAX_LOAD: f64 = 0.75;

#[derive(Debug, Clone, Copy)]
struct Entry {
    key: Option<StrId>,
    value: Value,
}

const EMPTY: Entry = Entry {
    key: None,
    value: Value::Nil,
};

const TOMBSTONE: Entry = Entry {
    key: None,
    value: Value::Bool(true),
};

#[derive(Debug, Default)]
pub struct Table {
    entries: Vec<Entry>,
    count: usize,
}

/// Probes for `key` starting at its hash slot and returns the index of
/// either the matching entry or the slot an insertion should use.
///
/// When the probe runs past a tombstone and ends on a truly empty slot, the
/// tombstone's index is returned instead so insertions reclaim it.
/// Termination relies on the load-factor invariant: there is always at least
/// one empty non-tombstone slot.
fn find_entry(entries: &[Entry], strings: &Strings, key: StrId) -> usize {
    let mut index = strings.hash(key) as usize % entries.len();
    let mut tombstone: Option<usize> = None;

    loop {
        let entry = &entries[index];
        match entry.key {
            None => {
                if matches!(entry.value, Value::Nil) {
                    // Truly empty.
                    return tombstone.unwrap_or(index);
                }
                // A tombstone; keep it in case the probe ends empty.
                if tombstone.is_none() {
                    tombstone = Some(index);
                }
            }
            Some(existing) if existing == key => return index,
            Some(_) => {}
        }
        index = (index + 1) % entries.len();
    }
}

impl Table {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            count: 0,
        }
    }

    /// Number of occupied slots, tombstones included.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Inserts or updates `key`. Returns true when the key was not present
    /// before; the VM uses this to detect assignment to an undefined global.
    pub fn set(&mut self, strings: &Strings, key: StrId, value: Value) -> bool {
        if self.count + 1 > (self.entries.len() as f64 * TABLE_MAX_LOAD) as usize {
            let new_capacity = grow_capacity(self.entries.len());
            self.adjust_capacity(strings, new_capacity);
        }

        let index = find_entry(&self.entries, strings, key);
        let entry = &mut self.entries[index];
        let is_new_key = entry.key.is_none();
        // Reusing a tombstone does not change count; it is already included.
        if is_new_key && matches!(entry.value, Value::Nil) {
            self.count += 1;
        }
        entry.key = Some(key);
        entry.value = value;
        is_new_key
    }

    pub fn get(&self, strings: &Strings, key: StrId) -> Option<Value> {
        if self.count == 0 {
            return None;
        }
        let index = find_entry(&self.entries, strings, key);
        let entry = &self.entries[index];
        entry.key.map(|_| entry.value)
    }

    /// Replaces the entry with a tombstone so later probes continue past it.
    /// `count` stays as it is.
    pub fn delete(&mut self, strings: &Strings, key: StrId) -> bool {
        if self.count == 0 {
            return false;
        }
        let index = find_entry(&self.entries, strings, key);
        if self.entries[index].key.is_none() {
            return false;
        }
        self.entries[index] = TOMBSTONE;
        true
    }

    /// Content-based lookup for interning: matches on length, hash, and
    /// bytes. This is the only place the table compares string content.
    pub fn find_string(&self, strings: &Strings, text: &str, hash: u32) -> Option<StrId> {
        if self.count == 0 {
            return None;
        }

        let mut index = hash as usize % self.entries.len();
        loop {
            let entry = &self.entries[index];
            match entry.key {
                None => {
                    // Stop on a truly empty slot; skip tombstones.
                    if matches!(entry.value, Value::Nil) {
                        return None;
                    }
                }
                Some(key) => {
                    if strings.hash(key) == hash
                        && strings.text(key).len() == text.len()
                        && strings.text(key) == text
                    {
                        return Some(key);
                    }
                }
            }
            index = (index + 1) % self.entries.len();
        }
    }

    /// Re-slots every live entry into a table of `new_capacity`, dropping
    /// tombstones and recomputing `count`.
    fn adjust_capacity(&mut self, strings: &Strings, new_capacity: usize) {
        let old_entries = std::mem::replace(&mut self.entries, vec![EMPTY; new_capacity]);

        self.count = 0;
        for entry in old_entries {
            if let Some(key) = entry.key {
                let dest = find_entry(&self.entries, strings, key);
                self.entries[dest] = entry;
                self.count += 1;
            }
        }
    }
}

/// Doubles a capacity, with a floor of 8.
fn grow_capacity(capacity: usize) -> usize {
    if capacity < 8 {
        8
    } else {
        capacity * 2
    }
}
