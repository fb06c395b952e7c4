//! Open-addressing hash maps with linear probing.
//!
//! [`Map<K, V>`] is the engine: two parallel slot arrays (keys and values)
//! whose capacity is zero or a power of two and which is never more than half
//! full. An insertion that finds `2 * len >= capacity` first doubles the table
//! (minimum 16 slots); growth re-inserts every entry into fresh arrays and
//! swaps them in only once they are complete. There is no removal.
//!
//! Slots are `Option<K>` / `Option<V>`, so no key or value is reserved.
//! With the non-zero integer types the `Option` niche makes each slot a
//! plain machine word where zero means "empty".
//!
//! [`IntMap`] is the integer surface over `Map<NonZeroU64, NonZeroU64>`:
//! keys and values are raw `u64`, key `0` is forbidden, a stored value of
//! `0` is indistinguishable from absence, and `put(k, 0)` does nothing.
//!
//! # Examples
//!
//! ```
//! use strata_mem::{IntMap, Map};
//!
//! let mut map: Map<u32, &str> = Map::new();
//! map.insert(0, "zero is an ordinary key here");
//! map.insert(7, "seven");
//! assert_eq!(map.get(7), Some("seven"));
//! assert_eq!(map.get(8), None);
//!
//! let mut ints = IntMap::new();
//! ints.put(42, 7);
//! ints.put(42, 9);
//! assert_eq!(ints.get(42), 9);
//! assert_eq!(ints.get(43), 0);
//! ```

use std::fmt;
use std::num::{NonZeroU32, NonZeroU64, NonZeroUsize};
use std::ptr::NonNull;

use strata_log::debug;

use crate::align::{clamp_min, is_pow2};
use crate::buf::StretchyBuf;
use crate::error::{Result, fatal};
use crate::hash::{hash_ptr, hash_u64};

/// Smallest non-zero table capacity.
pub const MIN_MAP_CAPACITY: usize = 16;

/// Keys usable in a [`Map`]: cheap to copy and compare, with a 64-bit hash.
pub trait MapKey: Copy + Eq {
    /// Hash used to pick the first probe slot.
    fn hash_key(&self) -> u64;
}

macro_rules! impl_int_key {
    ($($ty:ty),* $(,)?) => {
        $(
            impl MapKey for $ty {
                #[inline]
                fn hash_key(&self) -> u64 {
                    hash_u64(*self as u64)
                }
            }
        )*
    };
}

macro_rules! impl_nonzero_key {
    ($($ty:ty),* $(,)?) => {
        $(
            impl MapKey for $ty {
                #[inline]
                fn hash_key(&self) -> u64 {
                    hash_u64(self.get() as u64)
                }
            }
        )*
    };
}

impl_int_key!(u32, u64, usize);
impl_nonzero_key!(NonZeroU32, NonZeroU64, NonZeroUsize);

impl<T> MapKey for *const T {
    #[inline]
    fn hash_key(&self) -> u64 {
        hash_ptr(*self)
    }
}

impl<T> MapKey for *mut T {
    #[inline]
    fn hash_key(&self) -> u64 {
        hash_ptr(self.cast_const())
    }
}

impl<T> MapKey for NonNull<T> {
    #[inline]
    fn hash_key(&self) -> u64 {
        hash_ptr(self.as_ptr().cast_const())
    }
}

/// Open-addressing map from `K` to `V`.
#[derive(Clone)]
pub struct Map<K, V> {
    keys: StretchyBuf<Option<K>>,
    vals: StretchyBuf<Option<V>>,
    len: usize,
    cap: usize,
}

impl<K: MapKey, V: Copy> Map<K, V> {
    /// Creates an empty map without allocating.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            keys: StretchyBuf::new(),
            vals: StretchyBuf::new(),
            len: 0,
            cap: 0,
        }
    }

    /// Number of entries.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the map has no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots; zero or a power of two.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.cap
    }

    /// Looks up `key`.
    #[must_use]
    pub fn get(&self, key: K) -> Option<V> {
        if self.len == 0 {
            return None;
        }
        debug_assert!(is_pow2(self.cap));
        debug_assert!(self.len < self.cap);

        let mask = self.cap - 1;
        let mut i = key.hash_key() as usize;
        loop {
            i &= mask;
            match self.keys[i] {
                Some(found) if found == key => return self.vals[i],
                Some(_) => {}
                None => return None,
            }
            i = i.wrapping_add(1);
        }
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    /// Inserts or overwrites `key`, returning the previous value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.try_insert(key, value) {
            Ok(previous) => previous,
            Err(err) => fatal(err),
        }
    }

    /// Fallible form of [`insert`](Self::insert). On error the map is
    /// unchanged.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        if 2 * self.len >= self.cap {
            self.try_grow(clamp_min(2 * self.cap, MIN_MAP_CAPACITY))?;
        }
        Ok(self.insert_slot(key, value))
    }

    /// Probes for `key` and stores `value`. Requires a free slot.
    fn insert_slot(&mut self, key: K, value: V) -> Option<V> {
        debug_assert!(is_pow2(self.cap));
        debug_assert!(2 * self.len < self.cap);

        let mask = self.cap - 1;
        let mut i = key.hash_key() as usize;
        loop {
            i &= mask;
            match self.keys[i] {
                None => {
                    self.keys[i] = Some(key);
                    self.vals[i] = Some(value);
                    self.len += 1;
                    return None;
                }
                Some(found) if found == key => return self.vals[i].replace(value),
                Some(_) => {}
            }
            i = i.wrapping_add(1);
        }
    }

    /// Rehashes every entry into a table of `new_cap` slots.
    #[cold]
    fn try_grow(&mut self, new_cap: usize) -> Result<()> {
        debug_assert!(is_pow2(new_cap));
        let mut fresh = Self {
            keys: empty_slots(new_cap)?,
            vals: empty_slots(new_cap)?,
            len: 0,
            cap: new_cap,
        };
        for (key, value) in self.iter() {
            fresh.insert_slot(key, value);
        }
        debug_assert_eq!(fresh.len, self.len);

        debug!("map grew from {} to {} slots ({} entries)", self.cap, new_cap, self.len);
        *self = fresh;
        Ok(())
    }

    /// Removes every entry, keeping the slot arrays.
    pub fn clear(&mut self) {
        self.keys.fill(None);
        self.vals.fill(None);
        self.len = 0;
    }

    /// Iterates over entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (K, V)> + '_ {
        self.keys
            .iter()
            .zip(self.vals.iter())
            .filter_map(|(key, value)| Some(((*key)?, (*value)?)))
    }
}

fn empty_slots<T: Copy>(count: usize) -> Result<StretchyBuf<Option<T>>> {
    let mut slots = StretchyBuf::new();
    slots.try_fit(count)?;
    for _ in 0..count {
        slots.try_push(None)?;
    }
    Ok(slots)
}

impl<K: MapKey, V: Copy> Default for Map<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: MapKey + fmt::Debug, V: Copy + fmt::Debug> fmt::Debug for Map<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Integer-keyed map where `0` means "empty key" and "absent value".
#[derive(Clone, Default)]
pub struct IntMap {
    inner: Map<NonZeroU64, NonZeroU64>,
}

impl IntMap {
    /// Creates an empty map without allocating.
    #[must_use]
    pub const fn new() -> Self {
        Self { inner: Map::new() }
    }

    /// Returns the value stored under `key`, or `0` if there is none.
    ///
    /// `key` must not be zero.
    #[must_use]
    pub fn get(&self, key: u64) -> u64 {
        debug_assert_ne!(key, 0, "IntMap keys must be non-zero");
        NonZeroU64::new(key)
            .and_then(|key| self.inner.get(key))
            .map_or(0, NonZeroU64::get)
    }

    /// Stores `value` under `key`, overwriting any previous value.
    ///
    /// A `value` of zero is ignored: it neither inserts nor deletes.
    /// `key` must not be zero.
    pub fn put(&mut self, key: u64, value: u64) {
        if let Err(err) = self.try_put(key, value) {
            fatal(err);
        }
    }

    /// Fallible form of [`put`](Self::put).
    pub fn try_put(&mut self, key: u64, value: u64) -> Result<()> {
        debug_assert_ne!(key, 0, "IntMap keys must be non-zero");
        let (Some(key), Some(value)) = (NonZeroU64::new(key), NonZeroU64::new(value)) else {
            return Ok(());
        };
        self.inner.try_insert(key, value)?;
        Ok(())
    }

    /// Number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if the map has no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of slots; zero or a power of two.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Iterates over `(key, value)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.inner.iter().map(|(key, value)| (key.get(), value.get()))
    }
}

impl fmt::Debug for IntMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every key hashes to the same slot.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Colliding(u32);

    impl MapKey for Colliding {
        fn hash_key(&self) -> u64 {
            5
        }
    }

    fn assert_load_invariant<K: MapKey, V: Copy>(map: &Map<K, V>) {
        assert!(is_pow2(map.capacity()));
        assert!(2 * map.len() <= map.capacity());
    }

    #[test]
    fn test_empty_map() {
        let map: Map<u64, u64> = Map::new();
        assert_eq!(map.len(), 0);
        assert_eq!(map.capacity(), 0);
        assert_eq!(map.get(1), None);
        assert_eq!(map.iter().count(), 0);
    }

    #[test]
    fn test_first_insert_allocates_minimum() {
        let mut map: Map<u64, u64> = Map::new();
        assert_eq!(map.insert(3, 4), None);
        assert_eq!(map.capacity(), MIN_MAP_CAPACITY);
        assert_eq!(map.get(3), Some(4));
    }

    #[test]
    fn test_overwrite_returns_previous() {
        let mut map: Map<u64, u64> = Map::new();
        map.insert(42, 7);
        assert_eq!(map.insert(42, 9), Some(7));
        assert_eq!(map.get(42), Some(9));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_zero_key_allowed_in_generic_map() {
        let mut map: Map<u64, u64> = Map::new();
        map.insert(0, 0);
        assert_eq!(map.get(0), Some(0));
    }

    #[test]
    fn test_growth_sequence() {
        let mut map: Map<u64, u64> = Map::new();
        let mut caps = vec![];
        for k in 1..=100 {
            map.insert(k, k);
            assert_load_invariant(&map);
            if caps.last() != Some(&map.capacity()) {
                caps.push(map.capacity());
            }
        }
        assert_eq!(caps, vec![16, 32, 64, 128, 256]);
    }

    #[test]
    fn test_growth_preserves_entries() {
        let mut map: Map<u64, u64> = Map::new();
        for k in 1..=1000u64 {
            map.insert(k * 7919, k);
        }
        assert_eq!(map.len(), 1000);
        for k in 1..=1000u64 {
            assert_eq!(map.get(k * 7919), Some(k));
        }
        assert_eq!(map.get(3), None);
    }

    #[test]
    fn test_collisions_probe_linearly() {
        let mut map: Map<Colliding, u32> = Map::new();
        for i in 0..7 {
            map.insert(Colliding(i), i * 10);
        }
        for i in 0..7 {
            assert_eq!(map.get(Colliding(i)), Some(i * 10));
        }
        assert_eq!(map.get(Colliding(99)), None);
    }

    #[test]
    fn test_collisions_survive_growth() {
        let mut map: Map<Colliding, u32> = Map::new();
        for i in 0..40 {
            map.insert(Colliding(i), i);
        }
        assert!(map.capacity() >= 128);
        for i in 0..40 {
            assert_eq!(map.get(Colliding(i)), Some(i));
        }
    }

    #[test]
    fn test_probe_wraps_around() {
        // Slot 15 is the last slot of a 16-slot table.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        struct AtEnd(u8);
        impl MapKey for AtEnd {
            fn hash_key(&self) -> u64 {
                15
            }
        }

        let mut map: Map<AtEnd, u8> = Map::new();
        for i in 0..4 {
            map.insert(AtEnd(i), i);
        }
        assert_eq!(map.capacity(), 16);
        for i in 0..4 {
            assert_eq!(map.get(AtEnd(i)), Some(i));
        }
    }

    #[test]
    fn test_pointer_keys() {
        let values = [10u32, 20, 30];
        let mut map: Map<*const u32, usize> = Map::new();
        for (i, v) in values.iter().enumerate() {
            map.insert(v as *const u32, i);
        }
        for (i, v) in values.iter().enumerate() {
            assert_eq!(map.get(v as *const u32), Some(i));
        }
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut map: Map<u32, u32> = Map::new();
        for k in 0..20 {
            map.insert(k, k);
        }
        let cap = map.capacity();
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.capacity(), cap);
        assert_eq!(map.get(5), None);
        map.insert(5, 6);
        assert_eq!(map.get(5), Some(6));
    }

    #[test]
    fn test_iter_yields_all_entries() {
        let mut map: Map<u32, u32> = Map::new();
        for k in 0..50 {
            map.insert(k, k + 1);
        }
        let mut entries: Vec<_> = map.iter().collect();
        entries.sort_unstable();
        assert_eq!(entries, (0..50).map(|k| (k, k + 1)).collect::<Vec<_>>());
    }

    #[test]
    fn test_int_map_overwrite() {
        let mut map = IntMap::new();
        map.put(42, 7);
        map.put(42, 9);
        assert_eq!(map.get(42), 9);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_int_map_zero_value_is_noop() {
        let mut map = IntMap::new();
        map.put(5, 0);
        assert_eq!(map.get(5), 0);
        assert!(map.is_empty());
        assert_eq!(map.capacity(), 0);

        map.put(5, 11);
        map.put(5, 0);
        assert_eq!(map.get(5), 11);
    }

    #[test]
    fn test_int_map_unknown_key() {
        let mut map = IntMap::new();
        assert_eq!(map.get(17), 0);
        map.put(1, 1);
        assert_eq!(map.get(17), 0);
    }

    #[test]
    fn test_int_map_extreme_values() {
        let mut map = IntMap::new();
        map.put(u64::MAX, u64::MAX);
        map.put(1, u64::MAX - 1);
        assert_eq!(map.get(u64::MAX), u64::MAX);
        assert_eq!(map.get(1), u64::MAX - 1);
    }

    #[test]
    fn test_int_map_slot_layout() {
        // The niche keeps each slot one word wide.
        assert_eq!(std::mem::size_of::<Option<NonZeroU64>>(), 8);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "IntMap keys must be non-zero")]
    fn test_int_map_zero_key_asserts() {
        let mut map = IntMap::new();
        map.put(0, 1);
    }

    #[test]
    fn test_debug_format() {
        let mut map = IntMap::new();
        map.put(1, 2);
        assert_eq!(format!("{map:?}"), "{1: 2}");
    }
}
