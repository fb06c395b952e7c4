//! Symbol type for interned strings.
//!
//! A [`Symbol`] is a copyable handle to the one canonical copy of a byte
//! string held by an [`Interner`](crate::Interner). Two symbols from the same
//! interner are equal exactly when their contents are equal, and the test is
//! a single pointer comparison.
//!
//! Each canonical copy lives in an arena node laid out as
//!
//! ```text
//! +-----------+------------------+----------------+-----+
//! | len: usize| next: *InternNode| bytes[len]     | NUL |
//! +-----------+------------------+----------------+-----+
//! ```
//!
//! where `next` links nodes whose contents hashed to the same table key.
//!
//! # Examples
//!
//! ```
//! use strata_mem::Interner;
//!
//! let interner = Interner::new();
//! let a = interner.intern_str("count");
//! let b = interner.intern(b"count");
//!
//! assert_eq!(a, b);
//! assert_eq!(a.as_ptr(), b.as_ptr());
//! assert_eq!(a.as_str(), Some("count"));
//! assert_eq!(a.as_bytes_with_nul(), b"count\0");
//! ```

use std::cmp::Ordering;
use std::ffi::CStr;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;
use std::slice;

/// Header of an interned string; the bytes and a NUL follow it inline.
#[repr(C)]
#[derive(Debug)]
pub(crate) struct InternNode {
    pub(crate) len: usize,
    pub(crate) next: Option<NonNull<InternNode>>,
}

/// Offset of the inline bytes from the start of a node.
pub(crate) const NODE_HEADER_SIZE: usize = mem::size_of::<InternNode>();

/// A canonical interned string, valid while its interner is borrowed.
#[derive(Clone, Copy)]
pub struct Symbol<'a> {
    node: NonNull<InternNode>,
    _interner: PhantomData<&'a [u8]>,
}

impl<'a> Symbol<'a> {
    /// Wraps a node pointer.
    ///
    /// # Safety
    ///
    /// `node` must point to a fully written node (header, bytes and NUL)
    /// in arena memory that is neither freed nor mutated for `'a`.
    pub(crate) const unsafe fn from_node(node: NonNull<InternNode>) -> Self {
        Self {
            node,
            _interner: PhantomData,
        }
    }

    pub(crate) const fn node(self) -> NonNull<InternNode> {
        self.node
    }

    /// Next node in the same hash chain.
    pub(crate) fn next(self) -> Option<NonNull<InternNode>> {
        // SAFETY: the header is initialized and immutable (see `from_node`).
        unsafe { (*self.node.as_ptr()).next }
    }

    /// Length in bytes, excluding the NUL.
    #[inline]
    #[must_use]
    pub fn len(self) -> usize {
        // SAFETY: as in `next`.
        unsafe { (*self.node.as_ptr()).len }
    }

    /// Returns true for the empty string.
    #[inline]
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Pointer to the first byte; the bytes are followed by a NUL.
    #[inline]
    #[must_use]
    pub fn as_ptr(self) -> *const u8 {
        // SAFETY: the header is followed by `len + 1` bytes in the same
        // allocation.
        unsafe { self.node.as_ptr().cast::<u8>().add(NODE_HEADER_SIZE) }
    }

    /// The interned bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(self) -> &'a [u8] {
        // SAFETY: `len` initialized bytes follow the header and are never
        // written again while the interner lives.
        unsafe { slice::from_raw_parts(self.as_ptr(), self.len()) }
    }

    /// The interned bytes including the terminating NUL.
    #[inline]
    #[must_use]
    pub fn as_bytes_with_nul(self) -> &'a [u8] {
        // SAFETY: as in `as_bytes`, plus the NUL written at creation.
        unsafe { slice::from_raw_parts(self.as_ptr(), self.len() + 1) }
    }

    /// The contents as a C string, or `None` if they contain a NUL.
    #[must_use]
    pub fn as_c_str(self) -> Option<&'a CStr> {
        CStr::from_bytes_with_nul(self.as_bytes_with_nul()).ok()
    }

    /// The contents as UTF-8, or `None` if they are not valid UTF-8.
    #[must_use]
    pub fn as_str(self) -> Option<&'a str> {
        std::str::from_utf8(self.as_bytes()).ok()
    }
}

impl PartialEq for Symbol<'_> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl Eq for Symbol<'_> {}

impl Hash for Symbol<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.node.hash(state);
    }
}

/// Orders by address: stable for the interner's lifetime, unrelated to the
/// contents.
impl PartialOrd for Symbol<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.node.cmp(&other.node)
    }
}

impl fmt::Debug for Symbol<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol(\"{}\")", self.as_bytes().escape_ascii())
    }
}

impl fmt::Display for Symbol<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}
