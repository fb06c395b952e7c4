//! Stretchy buffers: growable, contiguous arrays.
//!
//! [`StretchyBuf<T>`] owns a single allocation of `capacity` slots, the first
//! `len` of which are initialized. Growth is amortized doubling from a
//! minimum of 16 slots: when a push or [`fit`](StretchyBuf::fit) needs more
//! room the new capacity is `max(16, max(2 * capacity, required))`.
//!
//! The empty buffer owns nothing, so `StretchyBuf::new()` is free and can be
//! used in `const` and `static` initializers.
//!
//! Growth may move the backing store. Raw pointers taken from
//! [`as_ptr`](StretchyBuf::as_ptr) are invalidated by any push that grows the
//! buffer; borrowed slices are protected by the borrow checker.
//!
//! # Examples
//!
//! ```
//! use strata_mem::StretchyBuf;
//!
//! let mut buf = StretchyBuf::new();
//! assert_eq!((buf.len(), buf.capacity()), (0, 0));
//!
//! for i in 0..1024u32 {
//!     buf.push(i);
//! }
//! assert_eq!(buf.len(), 1024);
//! assert_eq!(buf[1000], 1000);
//!
//! buf.free();
//! assert_eq!((buf.len(), buf.capacity()), (0, 0));
//! ```
//!
//! Byte buffers accept formatted text:
//!
//! ```
//! use strata_mem::StretchyBuf;
//!
//! let mut out = StretchyBuf::<u8>::new();
//! out.append_fmt(format_args!("{}:{}", "line", 42)).unwrap();
//! out.append_fmt(format_args!(" ok")).unwrap();
//! assert_eq!(out.as_slice(), b"line:42 ok");
//! ```

use std::alloc::{self, Layout};
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};
use std::slice;

use crate::align::clamp_min;
use crate::error::{AllocError, Result, fatal};

/// Smallest non-zero capacity a buffer grows to.
pub const MIN_CAPACITY: usize = 16;

/// A growable array with doubling growth from a minimum of 16 slots.
pub struct StretchyBuf<T> {
    ptr: NonNull<T>,
    len: usize,
    cap: usize,
    _marker: PhantomData<T>,
}

// SAFETY: the buffer uniquely owns its elements, exactly like `Vec<T>`.
unsafe impl<T: Send> Send for StretchyBuf<T> {}
unsafe impl<T: Sync> Sync for StretchyBuf<T> {}

impl<T> StretchyBuf<T> {
    const IS_ZST: bool = mem::size_of::<T>() == 0;

    /// Creates an empty buffer without allocating.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            cap: if Self::IS_ZST { usize::MAX } else { 0 },
            _marker: PhantomData,
        }
    }

    /// Creates an empty buffer able to hold `capacity` elements without
    /// growing.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut buf = Self::new();
        buf.fit(capacity);
        buf
    }

    /// Number of initialized elements.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Number of slots in the backing allocation.
    ///
    /// Zero-sized element types never allocate and report `usize::MAX`.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.cap
    }

    /// Returns true if the buffer holds no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size in bytes of the initialized elements.
    #[inline]
    #[must_use]
    pub const fn byte_len(&self) -> usize {
        self.len * mem::size_of::<T>()
    }

    /// Raw pointer to the first slot.
    ///
    /// Invalidated by any operation that grows or frees the buffer.
    #[inline]
    #[must_use]
    pub const fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// The initialized elements as a slice.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: the first `len` slots are initialized; `ptr` is dangling
        // but aligned when `len == 0`.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// The initialized elements as a mutable slice.
    #[inline]
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as in `as_slice`, and `&mut self` guarantees uniqueness.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Ensures room for at least `required` elements in total.
    pub fn fit(&mut self, required: usize) {
        if let Err(err) = self.try_fit(required) {
            fatal(err);
        }
    }

    /// Fallible form of [`fit`](Self::fit).
    pub fn try_fit(&mut self, required: usize) -> Result<()> {
        if required <= self.cap {
            return Ok(());
        }
        let doubled = self.cap.checked_mul(2).ok_or(AllocError::CapacityOverflow)?;
        let new_cap = clamp_min(doubled.max(required), MIN_CAPACITY);
        self.reallocate(new_cap)
    }

    fn reallocate(&mut self, new_cap: usize) -> Result<()> {
        debug_assert!(!Self::IS_ZST);
        debug_assert!(new_cap > self.cap);

        let new_layout = Layout::array::<T>(new_cap).map_err(|_| AllocError::CapacityOverflow)?;

        let raw = if self.cap == 0 {
            // SAFETY: `new_layout` has non-zero size (non-ZST, new_cap >= 1).
            unsafe { alloc::alloc(new_layout) }
        } else {
            // SAFETY: `ptr` was allocated with `old_layout`, which was valid
            // when it was created; the new size is non-zero and fits isize.
            unsafe {
                let old_layout = Layout::array::<T>(self.cap).unwrap_unchecked();
                alloc::realloc(self.ptr.as_ptr().cast::<u8>(), old_layout, new_layout.size())
            }
        };

        self.ptr = NonNull::new(raw.cast::<T>()).ok_or(AllocError::OutOfMemory {
            size: new_layout.size(),
            align: new_layout.align(),
        })?;
        self.cap = new_cap;
        Ok(())
    }

    /// Appends `value`, growing first if the buffer is full.
    #[inline]
    pub fn push(&mut self, value: T) {
        if let Err(err) = self.try_push(value) {
            fatal(err);
        }
    }

    /// Fallible form of [`push`](Self::push). On error `value` is dropped
    /// and the buffer is unchanged.
    #[inline]
    pub fn try_push(&mut self, value: T) -> Result<()> {
        if self.len == self.cap {
            let required = self.len.checked_add(1).ok_or(AllocError::CapacityOverflow)?;
            self.try_fit(required)?;
        }
        // SAFETY: `len < cap` after the fit above, so the slot is in bounds
        // and uninitialized.
        unsafe { self.ptr.as_ptr().add(self.len).write(value) };
        self.len += 1;
        Ok(())
    }

    /// Removes and returns the last element.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: the slot at the old `len - 1` was initialized and is now
        // outside the live range, so it is read exactly once.
        Some(unsafe { self.ptr.as_ptr().add(self.len).read() })
    }

    /// Drops every element, keeping the allocation.
    pub fn clear(&mut self) {
        let live: *mut [T] = self.as_mut_slice();
        // Length first: a panicking destructor must not cause a double drop.
        self.len = 0;
        // SAFETY: `live` covered exactly the initialized elements.
        unsafe { ptr::drop_in_place(live) };
    }

    /// Drops every element and releases the allocation. The buffer is then
    /// identical to `StretchyBuf::new()`.
    pub fn free(&mut self) {
        self.clear();
        if !Self::IS_ZST && self.cap != 0 {
            // SAFETY: `ptr` was allocated with this layout by `reallocate`.
            unsafe {
                let layout = Layout::array::<T>(self.cap).unwrap_unchecked();
                alloc::dealloc(self.ptr.as_ptr().cast::<u8>(), layout);
            }
        }
        self.ptr = NonNull::dangling();
        self.cap = if Self::IS_ZST { usize::MAX } else { 0 };
    }
}

impl<T: Clone> StretchyBuf<T> {
    /// Appends clones of every element of `items`.
    pub fn extend_from_slice(&mut self, items: &[T]) {
        if let Err(err) = self.try_extend_from_slice(items) {
            fatal(err);
        }
    }

    /// Fallible form of [`extend_from_slice`](Self::extend_from_slice).
    pub fn try_extend_from_slice(&mut self, items: &[T]) -> Result<()> {
        let required = self.len.checked_add(items.len()).ok_or(AllocError::CapacityOverflow)?;
        self.try_fit(required)?;
        for item in items {
            // SAFETY: capacity was reserved above.
            unsafe { self.ptr.as_ptr().add(self.len).write(item.clone()) };
            self.len += 1;
        }
        Ok(())
    }
}

impl StretchyBuf<u8> {
    /// Appends formatted text, without a terminating NUL.
    ///
    /// Fails only if a `Display` implementation reports an error.
    pub fn append_fmt(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        fmt::Write::write_fmt(self, args)
    }
}

impl fmt::Write for StretchyBuf<u8> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.extend_from_slice(s.as_bytes());
        Ok(())
    }
}

impl<T> Drop for StretchyBuf<T> {
    fn drop(&mut self) {
        self.free();
    }
}

impl<T> Default for StretchyBuf<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deref for StretchyBuf<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> DerefMut for StretchyBuf<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Clone> Clone for StretchyBuf<T> {
    fn clone(&self) -> Self {
        let mut copy = Self::new();
        copy.extend_from_slice(self.as_slice());
        copy
    }
}

impl<T: fmt::Debug> fmt::Debug for StretchyBuf<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for StretchyBuf<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq> Eq for StretchyBuf<T> {}

impl<T> Extend<T> for StretchyBuf<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        self.fit(self.len.saturating_add(lower));
        for value in iter {
            self.push(value);
        }
    }
}

impl<T> FromIterator<T> for StretchyBuf<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut buf = Self::new();
        buf.extend(iter);
        buf
    }
}

impl<'a, T> IntoIterator for &'a StretchyBuf<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut StretchyBuf<T> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fmt::Write;
    use std::rc::Rc;

    struct DropCounter(Rc<Cell<usize>>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_empty_buffer() {
        let buf: StretchyBuf<u64> = StretchyBuf::new();
        assert_eq!(buf.len(), 0);
        assert_eq!(buf.capacity(), 0);
        assert!(buf.is_empty());
        assert_eq!(buf.as_slice(), &[] as &[u64]);
    }

    #[test]
    fn test_first_push_allocates_minimum() {
        let mut buf = StretchyBuf::new();
        buf.push(7u8);
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.capacity(), MIN_CAPACITY);
    }

    #[test]
    fn test_capacity_doubles() {
        let mut buf = StretchyBuf::new();
        let mut seen = Vec::new();
        for i in 0..200u32 {
            buf.push(i);
            if seen.last() != Some(&buf.capacity()) {
                seen.push(buf.capacity());
            }
        }
        assert_eq!(seen, vec![16, 32, 64, 128, 256]);
    }

    #[test]
    fn test_push_order_preserved() {
        let mut buf = StretchyBuf::new();
        for i in 0..5000u64 {
            buf.push(i * 3);
        }
        assert_eq!(buf.len(), 5000);
        assert!(buf.capacity() >= 5000);
        for (i, &v) in buf.iter().enumerate() {
            assert_eq!(v, i as u64 * 3);
        }
    }

    #[test]
    fn test_fit_uses_required_when_larger() {
        let mut buf: StretchyBuf<u16> = StretchyBuf::new();
        buf.fit(100);
        assert_eq!(buf.capacity(), 100);
        buf.fit(101);
        assert_eq!(buf.capacity(), 200);
        buf.fit(50);
        assert_eq!(buf.capacity(), 200);
    }

    #[test]
    fn test_try_fit_overflow() {
        let mut buf: StretchyBuf<u64> = StretchyBuf::new();
        assert_eq!(buf.try_fit(usize::MAX), Err(AllocError::CapacityOverflow));
        assert_eq!(buf.capacity(), 0);

        buf.push(1);
        assert_eq!(buf.try_fit(usize::MAX / 2), Err(AllocError::CapacityOverflow));
        assert_eq!(buf.as_slice(), &[1]);
    }

    #[test]
    fn test_clear_keeps_allocation() {
        let mut buf: StretchyBuf<u32> = (0..40).collect();
        let cap = buf.capacity();
        buf.clear();
        assert_eq!(buf.len(), 0);
        assert_eq!(buf.capacity(), cap);
        buf.push(9);
        assert_eq!(buf.as_slice(), &[9]);
    }

    #[test]
    fn test_free_resets_to_empty() {
        let mut buf: StretchyBuf<u32> = (0..40).collect();
        buf.free();
        assert_eq!(buf.len(), 0);
        assert_eq!(buf.capacity(), 0);
        buf.push(1);
        assert_eq!(buf.capacity(), MIN_CAPACITY);
    }

    #[test]
    fn test_elements_dropped_once() {
        let drops = Rc::new(Cell::new(0));
        {
            let mut buf = StretchyBuf::new();
            for _ in 0..20 {
                buf.push(DropCounter(Rc::clone(&drops)));
            }
            drop(buf.pop());
            assert_eq!(drops.get(), 1);
            buf.clear();
            assert_eq!(drops.get(), 20);
            for _ in 0..5 {
                buf.push(DropCounter(Rc::clone(&drops)));
            }
        }
        assert_eq!(drops.get(), 25);
    }

    #[test]
    fn test_pop() {
        let mut buf: StretchyBuf<i32> = [1, 2, 3].into_iter().collect();
        assert_eq!(buf.pop(), Some(3));
        assert_eq!(buf.pop(), Some(2));
        assert_eq!(buf.pop(), Some(1));
        assert_eq!(buf.pop(), None);
    }

    #[test]
    fn test_zero_sized_elements() {
        let mut buf = StretchyBuf::new();
        assert_eq!(buf.capacity(), usize::MAX);
        for _ in 0..1000 {
            buf.push(());
        }
        assert_eq!(buf.len(), 1000);
        buf.free();
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn test_byte_len() {
        let buf: StretchyBuf<u64> = (0..10).collect();
        assert_eq!(buf.byte_len(), 80);
    }

    #[test]
    fn test_clone_and_eq() {
        let buf: StretchyBuf<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        let copy = buf.clone();
        assert_eq!(buf, copy);
        assert_ne!(buf.as_ptr(), copy.as_ptr());
    }

    #[test]
    fn test_debug_format() {
        let buf: StretchyBuf<u8> = [1, 2].into_iter().collect();
        assert_eq!(format!("{buf:?}"), "[1, 2]");
    }

    #[test]
    fn test_format_append_grows() {
        let mut out = StretchyBuf::<u8>::new();
        for i in 0..100 {
            write!(out, "{i},").unwrap();
        }
        let text = std::str::from_utf8(out.as_slice()).unwrap();
        assert!(text.starts_with("0,1,2,"));
        assert!(text.ends_with("98,99,"));
        assert!(!out.contains(&0));
    }

    #[test]
    fn test_deref_mut() {
        let mut buf: StretchyBuf<u32> = (0..4).collect();
        buf[2] = 40;
        buf.as_mut_slice().reverse();
        assert_eq!(buf.as_slice(), &[3, 40, 1, 0]);
    }
}
