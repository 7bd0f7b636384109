//! Chained hash table keyed by entity ids.
//!
//! Every "by id" lookup in the catalogue goes through [`HashTable`]. It is a
//! classic separate-chaining table with two details worth knowing:
//!
//! - **Deterministic hashing**: keys provide a 32-bit native hash through
//!   [`TableKey`], which is bit-mixed and reduced modulo the capacity. There
//!   is no per-process seed, so slot assignment is reproducible run to run.
//! - **Staged growth**: capacity walks through [`GROWTH_SCHEDULE`] and then
//!   grows by a third at a time. Growth happens *before* an insert would push
//!   the table to its load bound, never after.

use std::fmt;
use std::mem;
use tracing::debug;

/// Capacities the table steps through before switching to proportional growth
pub const GROWTH_SCHEDULE: [usize; 5] = [16, 29, 23_503, 31_357, 41_813];

/// Ratio of entries to buckets that triggers growth
pub const LOAD_FACTOR: f64 = 0.75;

/// Keys that can index a [`HashTable`]
///
/// The native hash is the raw 32-bit value the table mixes before reducing
/// it to a bucket index. Implementations must agree with `Eq`.
pub trait TableKey: Eq {
    fn native_hash(&self) -> u32;
}

macro_rules! narrow_key {
    ($($ty:ty),*) => {
        $(impl TableKey for $ty {
            #[inline]
            fn native_hash(&self) -> u32 {
                *self as u32
            }
        })*
    };
}

macro_rules! wide_key {
    ($($ty:ty),*) => {
        $(impl TableKey for $ty {
            #[inline]
            fn native_hash(&self) -> u32 {
                let bits = *self as u64;
                (bits ^ (bits >> 32)) as u32
            }
        })*
    };
}

narrow_key!(u8, u16, u32, i8, i16, i32);
wide_key!(u64, i64, usize);

/// Spreads high bits of the native hash into the low bits used by `mod`.
#[inline]
fn mix(hash: u32) -> u32 {
    let h = hash ^ (hash >> 20) ^ (hash >> 12);
    h ^ (h >> 7) ^ (h >> 4)
}

/// Capacity that follows `capacity` in the growth policy.
fn next_capacity(capacity: usize) -> usize {
    match GROWTH_SCHEDULE.iter().position(|&step| step == capacity) {
        Some(i) if i + 1 < GROWTH_SCHEDULE.len() => GROWTH_SCHEDULE[i + 1],
        _ => capacity + capacity / 3,
    }
}

struct Entry<K, V> {
    key: K,
    value: V,
    next: Option<Box<Entry<K, V>>>,
}

type Link<K, V> = Option<Box<Entry<K, V>>>;

/// Separate-chaining hash map with a fixed growth schedule.
///
/// Supports both insertion modes the stores need:
/// - [`put`](HashTable::put) overwrites an existing value
/// - [`add`](HashTable::add) rejects a key that is already present
///
/// Lookups of absent keys return `None`; nothing in here returns an error.
pub struct HashTable<K, V> {
    buckets: Vec<Link<K, V>>,
    len: usize,
}

impl<K: TableKey, V> HashTable<K, V> {
    /// Creates an empty table at the first scheduled capacity
    pub fn new() -> Self {
        Self {
            buckets: empty_buckets(GROWTH_SCHEDULE[0]),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of buckets currently allocated
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Bucket index `key` maps to at the current capacity
    pub fn slot(&self, key: &K) -> usize {
        slot_for(key, self.buckets.len())
    }

    /// Inserts `value`, replacing (and returning) any previous value for `key`.
    ///
    /// Overwriting an existing key never grows the table.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        if let Some(existing) = self.get_mut(&key) {
            return Some(mem::replace(existing, value));
        }
        self.insert_absent(key, value);
        None
    }

    /// Inserts `value` only if `key` is absent.
    ///
    /// Returns `false` and leaves the table unchanged on a duplicate key.
    pub fn add(&mut self, key: K, value: V) -> bool {
        if self.contains_key(&key) {
            return false;
        }
        self.insert_absent(key, value);
        true
    }

    /// Returns the value for `key`, inserting `make()` first if it is absent
    pub fn get_or_insert_with(&mut self, key: K, make: impl FnOnce() -> V) -> &mut V {
        if !self.contains_key(&key) {
            return self.insert_absent(key, make());
        }

        let index = self.slot(&key);
        match find_link(&mut self.buckets[index], &key) {
            Some(entry) => &mut entry.value,
            None => unreachable!("key was found a moment ago"),
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let mut cursor = self.buckets[self.slot(key)].as_deref();
        while let Some(entry) = cursor {
            if entry.key == *key {
                return Some(&entry.value);
            }
            cursor = entry.next.as_deref();
        }
        None
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let index = self.slot(key);
        find_link(&mut self.buckets[index], key)
            .as_mut()
            .map(|entry| &mut entry.value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Detaches the entry for `key` from its chain and returns its value
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let index = self.slot(key);
        let link = find_link(&mut self.buckets[index], key);

        let mut removed = link.take()?;
        *link = removed.next.take();
        self.len -= 1;
        Some(removed.value)
    }

    /// Drops every entry but keeps the current capacity
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            let mut cursor = bucket.take();
            while let Some(mut entry) = cursor {
                cursor = entry.next.take();
            }
        }
        self.len = 0;
    }

    /// Iterates entries in bucket-then-chain order
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            buckets: self.buckets.iter(),
            chain: None,
            remaining: self.len,
        }
    }

    // Caller guarantees `key` is absent. Growth happens here and only here,
    // so lookups that find their key never resize.
    fn insert_absent(&mut self, key: K, value: V) -> &mut V {
        self.reserve_one();
        let index = self.slot(&key);
        let link = find_link(&mut self.buckets[index], &key);
        debug_assert!(link.is_none(), "insert_absent called with a present key");

        self.len += 1;
        let entry = link.insert(Box::new(Entry {
            key,
            value,
            next: None,
        }));
        &mut entry.value
    }

    /// Grows ahead of an insert when one more entry would reach the load bound.
    fn reserve_one(&mut self) {
        let capacity = self.buckets.len();
        if (self.len + 1) as f64 >= capacity as f64 * LOAD_FACTOR {
            self.grow_to(next_capacity(capacity));
        }
    }

    // Relinks every entry into a fresh bucket array. Entries are moved, not
    // cloned; the old array is dropped once empty.
    fn grow_to(&mut self, new_capacity: usize) {
        debug!(
            from = self.buckets.len(),
            to = new_capacity,
            entries = self.len,
            "growing hash table"
        );

        let old = mem::replace(&mut self.buckets, empty_buckets(new_capacity));
        let mut moved = 0;
        for mut bucket in old {
            while let Some(mut entry) = bucket.take() {
                bucket = entry.next.take();
                let index = slot_for(&entry.key, new_capacity);
                entry.next = self.buckets[index].take();
                self.buckets[index] = Some(entry);
                moved += 1;
            }
        }

        debug_assert_eq!(moved, self.len, "rehash lost or duplicated entries");
        debug_assert!(self.len < new_capacity);
    }
}

impl<K: TableKey + Clone, V> HashTable<K, V> {
    /// Snapshot of every key, in bucket order
    pub fn keys(&self) -> Vec<K> {
        self.iter().map(|(key, _)| key.clone()).collect()
    }
}

impl<K: TableKey, V: Clone> HashTable<K, V> {
    /// Snapshot of every value, in bucket order
    pub fn values(&self) -> Vec<V> {
        self.iter().map(|(_, value)| value.clone()).collect()
    }
}

fn empty_buckets<K, V>(capacity: usize) -> Vec<Link<K, V>> {
    let mut buckets = Vec::with_capacity(capacity);
    buckets.resize_with(capacity, || None);
    buckets
}

fn slot_for<K: TableKey>(key: &K, capacity: usize) -> usize {
    mix(key.native_hash()) as usize % capacity
}

/// Walks a chain to the link holding `key`, or to the empty tail link.
fn find_link<'a, K: TableKey, V>(mut link: &'a mut Link<K, V>, key: &K) -> &'a mut Link<K, V> {
    while link.as_ref().is_some_and(|entry| entry.key != *key) {
        if let Some(entry) = link {
            link = &mut entry.next;
        }
    }
    link
}

impl<K: TableKey, V> Default for HashTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: TableKey + fmt::Debug, V: fmt::Debug> fmt::Debug for HashTable<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K: TableKey, V> IntoIterator for &'a HashTable<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the entries of a [`HashTable`]
pub struct Iter<'a, K, V> {
    buckets: std::slice::Iter<'a, Link<K, V>>,
    chain: Option<&'a Entry<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.chain {
                self.chain = entry.next.as_deref();
                self.remaining -= 1;
                return Some((&entry.key, &entry.value));
            }
            self.chain = self.buckets.next()?.as_deref();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
