//! Open-addressed hash dictionary (spec §3, §4.C).
//!
//! A power-of-two bucket array; each occupied bucket stores the cached key
//! hash alongside the key/value pair. An empty bucket is a `Slot::Empty` —
//! the spec's "empty buckets are signalled by a null value pointer"
//! translated into an enum instead of a null-pointer sentinel, which is the
//! idiomatic way to express "this slot may or may not hold a value" in
//! Rust. Insertion order is not preserved, matching spec §5's "iteration
//! order over a dict is not guaranteed".

use crate::value::Value;
use ember_core::error::Error;

const INITIAL_CAPACITY: usize = 8;
/// Rehash once the table exceeds roughly two-thirds full (spec §3/§4.C).
const LOAD_NUMER: usize = 2;
const LOAD_DENOM: usize = 3;

#[derive(Debug, Clone)]
enum Slot {
    Empty,
    Occupied { hash: u64, key: Value, value: Value },
}

#[derive(Debug, Clone)]
pub struct KDict {
    buckets: Vec<Slot>,
    len: usize,
}

impl Default for KDict {
    fn default() -> Self {
        KDict::new()
    }
}

impl KDict {
    pub fn new() -> Self {
        KDict {
            buckets: vec![Slot::Empty; 0],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn capacity(&self) -> usize {
        self.buckets.len()
    }

    fn needs_grow(&self, extra: usize) -> bool {
        let cap = self.capacity();
        cap == 0 || (self.len + extra) * LOAD_DENOM > cap * LOAD_NUMER
    }

    /// Linear probe starting at `hash mod n_buckets`, returning the index of
    /// either a matching occupied slot or the first empty slot on the
    /// probe chain (spec §4.C: "probes buckets linearly... comparing cached
    /// hashes before invoking element equality").
    fn probe(&self, hash: u64, key: &Value) -> Result<usize, Error> {
        let cap = self.capacity();
        let mut idx = (hash as usize) & (cap - 1);
        for _ in 0..cap {
            match &self.buckets[idx] {
                Slot::Empty => return Ok(idx),
                Slot::Occupied { hash: h, key: k, .. } => {
                    if *h == hash && k == key {
                        return Ok(idx);
                    }
                }
            }
            idx = (idx + 1) & (cap - 1);
        }
        Err(Error::internal("dict probe exhausted all buckets"))
    }

    fn grow(&mut self) -> Result<(), Error> {
        let new_cap = if self.capacity() == 0 {
            INITIAL_CAPACITY
        } else {
            self.capacity() * 2
        };
        let old = std::mem::replace(&mut self.buckets, vec![Slot::Empty; new_cap]);
        self.len = 0;
        for slot in old {
            if let Slot::Occupied { hash, key, value } = slot {
                self.insert_prehashed(hash, key, value)?;
            }
        }
        Ok(())
    }

    fn insert_prehashed(&mut self, hash: u64, key: Value, value: Value) -> Result<(), Error> {
        let idx = self.probe(hash, &key)?;
        let was_empty = matches!(self.buckets[idx], Slot::Empty);
        self.buckets[idx] = Slot::Occupied { hash, key, value };
        if was_empty {
            self.len += 1;
        }
        Ok(())
    }

    pub fn set(&mut self, key: Value, value: Value) -> Result<(), Error> {
        if self.needs_grow(1) {
            self.grow()?;
        }
        let hash = key.try_hash()?;
        self.insert_prehashed(hash, key, value)
    }

    pub fn get(&self, key: &Value) -> Result<Option<&Value>, Error> {
        if self.capacity() == 0 {
            return Ok(None);
        }
        let hash = key.try_hash()?;
        let idx = self.probe(hash, key)?;
        match &self.buckets[idx] {
            Slot::Occupied { value, .. } => Ok(Some(value)),
            Slot::Empty => Ok(None),
        }
    }

    pub fn contains(&self, key: &Value) -> Result<bool, Error> {
        Ok(self.get(key)?.is_some())
    }

    /// Remove by tombstone-free shift: clear the slot and re-insert every
    /// entry on the remainder of its probe chain, which keeps lookups
    /// correct under pure linear probing without tracking tombstones.
    pub fn remove(&mut self, key: &Value) -> Result<Option<Value>, Error> {
        if self.capacity() == 0 {
            return Ok(None);
        }
        let hash = key.try_hash()?;
        let idx = self.probe(hash, key)?;
        let removed = match std::mem::replace(&mut self.buckets[idx], Slot::Empty) {
            Slot::Occupied { value, .. } => value,
            Slot::Empty => return Ok(None),
        };
        self.len -= 1;

        // Re-insert the rest of the probe chain so later entries don't
        // become unreachable behind the now-empty slot.
        let cap = self.capacity();
        let mut idx = (idx + 1) & (cap - 1);
        loop {
            match std::mem::replace(&mut self.buckets[idx], Slot::Empty) {
                Slot::Empty => break,
                Slot::Occupied { hash, key, value } => {
                    self.len -= 1;
                    self.insert_prehashed(hash, key, value)?;
                }
            }
            idx = (idx + 1) & (cap - 1);
        }
        Ok(Some(removed))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.buckets.iter().filter_map(|s| match s {
            Slot::Occupied { key, value, .. } => Some((key, value)),
            Slot::Empty => None,
        })
    }

    pub fn repr(&self) -> String {
        let parts: Vec<String> = self
            .iter()
            .map(|(k, v)| format!("{}: {}", k.repr_of(), v.repr_of()))
            .collect();
        format!("{{{}}}", parts.join(", "))
    }
}

impl PartialEq for KDict {
    fn eq(&self, other: &Self) -> bool {
        if self.len != other.len {
            return false;
        }
        self.iter().all(|(k, v)| match other.get(k) {
            Ok(Some(ov)) => ov == v,
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let mut d = KDict::new();
        d.set(Value::str("a"), Value::int(1)).unwrap();
        d.set(Value::str("b"), Value::int(2)).unwrap();
        assert_eq!(d.get(&Value::str("a")).unwrap(), Some(&Value::int(1)));
        assert_eq!(d.len(), 2);
    }

    #[test]
    fn set_existing_key_replaces_value() {
        let mut d = KDict::new();
        d.set(Value::str("a"), Value::int(1)).unwrap();
        d.set(Value::str("a"), Value::int(2)).unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!(d.get(&Value::str("a")).unwrap(), Some(&Value::int(2)));
    }

    #[test]
    fn remove_keeps_later_probe_chain_reachable() {
        let mut d = KDict::new();
        for i in 0..20 {
            d.set(Value::int(i), Value::int(i * 2)).unwrap();
        }
        d.remove(&Value::int(3)).unwrap();
        for i in 0..20 {
            if i == 3 {
                assert_eq!(d.get(&Value::int(i)).unwrap(), None);
            } else {
                assert_eq!(d.get(&Value::int(i)).unwrap(), Some(&Value::int(i * 2)));
            }
        }
    }

    #[test]
    fn grows_past_two_thirds_load() {
        let mut d = KDict::new();
        for i in 0..100 {
            d.set(Value::int(i), Value::int(i)).unwrap();
        }
        assert_eq!(d.len(), 100);
        for i in 0..100 {
            assert_eq!(d.get(&Value::int(i)).unwrap(), Some(&Value::int(i)));
        }
    }

    #[test]
    fn list_key_is_unhashable() {
        let mut d = KDict::new();
        let key = Value::List(ember_core::gc::Gc::new(std::cell::RefCell::new(
            crate::types::list::KList::new(),
        )));
        assert!(d.set(key, Value::int(1)).is_err());
    }
}
