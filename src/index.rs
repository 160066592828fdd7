//! The in-memory key index: an open-addressed hash table mapping key bytes
//! to log offsets, with tombstones and live doubling resize.

use crate::error::{Result, StoreError};

/// Initial slot count. Chosen to match the reference implementation; not
/// prime-significant beyond that (see the probing note on [`Index`]).
const INITIAL_CAPACITY: usize = 31;
/// Rehash triggers once `size / capacity` exceeds this.
const MAX_LOAD_FACTOR: f64 = 0.7;

enum Slot {
    Empty,
    Live { key: Vec<u8>, offset: i64 },
    Deleted { key: Vec<u8> },
}

impl Default for Slot {
    fn default() -> Self {
        Slot::Empty
    }
}

/// Open-addressed hash table from key bytes to file offset.
///
/// Uses quadratic probing (`start + i*i mod capacity`) over a flat slot
/// array. Capacity starts at 31 and doubles whenever the live load factor
/// would exceed 0.7. Quadratic probing over a non-prime, power-of-two-ish
/// capacity does not guarantee visiting every slot once load factor passes
/// 0.5 -- this implementation keeps that behavior for parity with the
/// reference design (see `SPEC_FULL.md` design notes) rather than switching
/// to linear probing or prime sizing.
pub struct Index {
    slots: Vec<Slot>,
    capacity: usize,
    size: usize,
}

impl Index {
    /// Allocates a fresh index with the initial capacity.
    pub fn init() -> Result<Self> {
        let slots = try_alloc_slots(INITIAL_CAPACITY)?;
        Ok(Index {
            slots,
            capacity: INITIAL_CAPACITY,
            size: 0,
        })
    }

    /// Number of live (non-tombstoned) entries.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the index has no live entries.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Inserts or updates `key -> offset`. Rehashes first if the load
    /// factor would exceed 0.7.
    pub fn insert(&mut self, key: &[u8], offset: i64) -> Result<()> {
        if self.size as f64 / self.capacity as f64 > MAX_LOAD_FACTOR {
            self.rehash()?;
        }

        let start = home_bucket(key, self.capacity);
        for i in 0..self.capacity {
            let probe = quadratic_probe(start, i, self.capacity);
            match &mut self.slots[probe] {
                Slot::Empty => {
                    self.slots[probe] = Slot::Live {
                        key: key.to_vec(),
                        offset,
                    };
                    self.size += 1;
                    return Ok(());
                }
                Slot::Deleted { key: stored } => {
                    if stored.as_slice() == key {
                        let key = std::mem::take(stored);
                        self.slots[probe] = Slot::Live { key, offset };
                        self.size += 1;
                        return Ok(());
                    }
                    // Different key tombstoned here: keep probing so this
                    // key never appears twice on the same probe chain.
                }
                Slot::Live {
                    key: stored,
                    offset: stored_offset,
                } => {
                    if stored.as_slice() == key {
                        *stored_offset = offset;
                        return Ok(());
                    }
                }
            }
        }

        Err(StoreError::IndexFull)
    }

    /// Looks up the current offset for `key`, if live.
    pub fn lookup(&self, key: &[u8]) -> Option<i64> {
        let start = home_bucket(key, self.capacity);
        for i in 0..self.capacity {
            let probe = quadratic_probe(start, i, self.capacity);
            match &self.slots[probe] {
                Slot::Empty => return None,
                Slot::Live { key: stored, offset } if stored.as_slice() == key => {
                    return Some(*offset)
                }
                _ => continue,
            }
        }
        None
    }

    /// Tombstones `key`. Fails if the key is not currently live.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        let start = home_bucket(key, self.capacity);
        for i in 0..self.capacity {
            let probe = quadratic_probe(start, i, self.capacity);
            match &mut self.slots[probe] {
                Slot::Empty => return Err(StoreError::KeyNotFound),
                Slot::Live { key: stored, .. } if stored.as_slice() == key => {
                    let key = std::mem::take(stored);
                    self.slots[probe] = Slot::Deleted { key };
                    self.size -= 1;
                    return Ok(());
                }
                _ => continue,
            }
        }
        Err(StoreError::KeyNotFound)
    }

    /// Doubles capacity and rehashes every live slot into the new array.
    /// Tombstones are dropped. Leaves `self` untouched if the new array
    /// cannot be allocated.
    fn rehash(&mut self) -> Result<()> {
        let new_capacity = self.capacity * 2;
        let mut new_slots = try_alloc_slots(new_capacity)?;
        let mut transferred = 0;

        for slot in self.slots.iter_mut() {
            if let Slot::Live { .. } = slot {
                let (key, offset) = match std::mem::replace(slot, Slot::Empty) {
                    Slot::Live { key, offset } => (key, offset),
                    _ => unreachable!(),
                };
                let start = home_bucket(&key, new_capacity);
                let mut placed = false;
                for i in 0..new_capacity {
                    let probe = quadratic_probe(start, i, new_capacity);
                    if matches!(new_slots[probe], Slot::Empty) {
                        new_slots[probe] = Slot::Live { key, offset };
                        placed = true;
                        break;
                    }
                }
                debug_assert!(placed, "rehash target table has no room for a live key");
                transferred += 1;
            }
        }

        self.slots = new_slots;
        self.capacity = new_capacity;
        self.size = transferred;
        Ok(())
    }
}

fn try_alloc_slots(capacity: usize) -> Result<Vec<Slot>> {
    let mut slots = Vec::new();
    slots
        .try_reserve_exact(capacity)
        .map_err(|e| StoreError::AllocationFailed(e.to_string()))?;
    slots.resize_with(capacity, Slot::default);
    Ok(slots)
}

/// DJB2 hash: `h = 5381; h = h * 33 + c` for each byte, wrapping on overflow.
fn djb2(key: &[u8]) -> u64 {
    let mut h: u64 = 5381;
    for &c in key {
        h = h.wrapping_mul(33).wrapping_add(c as u64);
    }
    h
}

fn home_bucket(key: &[u8], capacity: usize) -> usize {
    (djb2(key) % capacity as u64) as usize
}

fn quadratic_probe(start: usize, step: usize, capacity: usize) -> usize {
    (start + step * step) % capacity
}
