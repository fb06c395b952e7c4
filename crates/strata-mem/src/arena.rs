//! Bump-pointer arena allocator.
//!
//! An [`Arena`] carves fixed-size blocks from the system allocator and hands
//! out 8-byte aligned sub-ranges of them by advancing a pointer. Individual
//! allocations are never freed or moved: every pointer the arena returns
//! stays valid until [`Arena::free_all`] or until the arena is dropped.
//! That stability is what lets intern nodes be referenced by address.
//!
//! Blocks are `max(block_size, request)` bytes rounded up to the alignment,
//! with a default block size of 1 MiB, so a single request larger than a
//! block gets a block of its own. The block list is kept in a
//! [`StretchyBuf`].
//!
//! # Examples
//!
//! ```
//! use strata_mem::Arena;
//!
//! let mut arena = Arena::new();
//!
//! let a = arena.alloc(24);
//! let b = arena.alloc(3);
//! assert_eq!(a.as_ptr() as usize % 8, 0);
//! assert_eq!(b.as_ptr() as usize % 8, 0);
//! assert!(arena.contains(b.as_ptr()));
//!
//! let v = arena.alloc_value(42u64);
//! unsafe {
//!     assert_eq!(*v.as_ptr(), 42);
//! }
//!
//! // Everything goes at once.
//! arena.free_all();
//! assert_eq!(arena.block_count(), 0);
//! ```

use std::alloc::{self, Layout};
use std::ptr::{self, NonNull};

use strata_log::debug;

use crate::align::{align_up, clamp_min};
use crate::buf::StretchyBuf;
use crate::error::{AllocError, FailurePolicy, Result, failure_policy};

/// Alignment of every arena allocation.
pub const ARENA_ALIGNMENT: usize = 8;

/// Default block size (1 MiB).
pub const ARENA_BLOCK_SIZE: usize = 1024 * 1024;

/// Arena allocation statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArenaStats {
    /// Bytes handed out, including alignment padding.
    pub total_allocated: usize,
    /// Number of blocks owned by the arena.
    pub block_count: usize,
    /// Sum of all block sizes in bytes.
    pub total_capacity: usize,
}

/// One system allocation owned by the arena.
#[derive(Debug, Clone, Copy)]
struct Block {
    start: NonNull<u8>,
    size: usize,
}

impl Block {
    fn layout(&self) -> Layout {
        // SAFETY: the same layout was validated by `Layout::from_size_align`
        // when the block was allocated.
        unsafe { Layout::from_size_align_unchecked(self.size, ARENA_ALIGNMENT) }
    }

    fn contains(&self, addr: usize) -> bool {
        let start = self.start.as_ptr().addr();
        addr >= start && addr - start < self.size
    }
}

/// Bump-pointer arena. Single-threaded.
pub struct Arena {
    /// Next free byte in the current block (null before the first block).
    ptr: *mut u8,
    /// End of the current block (exclusive).
    end: *mut u8,
    /// Every block allocated so far, current block last.
    blocks: StretchyBuf<Block>,
    /// Minimum size of a new block.
    block_size: usize,
    /// Bytes handed out since creation or the last `free_all`.
    total_allocated: usize,
    /// Overrides the process-wide failure policy when set.
    policy: Option<FailurePolicy>,
}

impl Arena {
    /// Creates an empty arena with 1 MiB blocks. No memory is allocated
    /// until the first request.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ptr: ptr::null_mut(),
            end: ptr::null_mut(),
            blocks: StretchyBuf::new(),
            block_size: ARENA_BLOCK_SIZE,
            total_allocated: 0,
            policy: None,
        }
    }

    /// Creates an empty arena whose blocks are at least `block_size` bytes.
    ///
    /// The size is rounded up to the arena alignment.
    #[must_use]
    pub fn with_block_size(block_size: usize) -> Self {
        let rounded = align_up(clamp_min(block_size, ARENA_ALIGNMENT), ARENA_ALIGNMENT);
        let mut arena = Self::new();
        arena.block_size = rounded.unwrap_or(ARENA_BLOCK_SIZE);
        arena
    }

    /// Sets the failure policy used by this arena's infallible methods.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Minimum size of a new block.
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Bytes left in the current block.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.end.addr() - self.ptr.addr()
    }

    /// Number of blocks currently owned.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Allocates `size` bytes aligned to [`ARENA_ALIGNMENT`].
    ///
    /// The memory is uninitialized and stays valid until
    /// [`free_all`](Self::free_all) or drop.
    #[inline]
    pub fn alloc(&mut self, size: usize) -> NonNull<u8> {
        match self.try_alloc(size) {
            Ok(ptr) => ptr,
            Err(err) => self.fail(err),
        }
    }

    /// Fallible form of [`alloc`](Self::alloc).
    pub fn try_alloc(&mut self, size: usize) -> Result<NonNull<u8>> {
        // A zero-byte request still gets an address inside a block.
        let needed = clamp_min(size, 1);
        if needed > self.remaining() {
            self.grow(needed)?;
        }
        debug_assert!(size <= self.remaining());

        let result = self.ptr;
        // SAFETY: `size <= remaining`, so the bumped pointer stays inside
        // (or one past) the current block. Blocks start aligned and have
        // aligned sizes, so padding up to the alignment cannot pass `end`.
        unsafe {
            let bumped = result.add(size);
            let pad = bumped.addr().wrapping_neg() & (ARENA_ALIGNMENT - 1);
            self.ptr = bumped.add(pad);
        }
        debug_assert!(self.ptr.addr() <= self.end.addr());
        debug_assert_eq!(result.addr() % ARENA_ALIGNMENT, 0);

        self.total_allocated += self.ptr.addr() - result.addr();
        // SAFETY: `result` points into a live block, so it is non-null.
        Ok(unsafe { NonNull::new_unchecked(result) })
    }

    /// Allocates a new block able to hold at least `min_size` bytes and
    /// makes it current. The rest of the previous block is abandoned.
    #[cold]
    fn grow(&mut self, min_size: usize) -> Result<()> {
        let size = align_up(min_size.max(self.block_size), ARENA_ALIGNMENT)
            .ok_or(AllocError::CapacityOverflow)?;
        let layout = Layout::from_size_align(size, ARENA_ALIGNMENT)
            .map_err(|_| AllocError::CapacityOverflow)?;

        // Reserve the list slot first so a fresh block is never orphaned.
        let slots = self.blocks.len() + 1;
        self.blocks.try_fit(slots)?;

        // SAFETY: `size` is non-zero (block_size >= ARENA_ALIGNMENT).
        let raw = unsafe { alloc::alloc(layout) };
        let start = NonNull::new(raw).ok_or(AllocError::OutOfMemory {
            size,
            align: ARENA_ALIGNMENT,
        })?;
        self.blocks.try_push(Block { start, size })?;

        self.ptr = start.as_ptr();
        // SAFETY: one past the end of the block just allocated.
        self.end = unsafe { self.ptr.add(size) };

        debug!("arena block #{} allocated: {} bytes", self.blocks.len(), size);
        Ok(())
    }

    /// Moves `value` into the arena and returns a pointer to it.
    ///
    /// The value is never dropped: the arena releases memory without running
    /// destructors.
    pub fn alloc_value<T>(&mut self, value: T) -> NonNull<T> {
        const { assert!(std::mem::align_of::<T>() <= ARENA_ALIGNMENT) };
        let ptr = self.alloc(std::mem::size_of::<T>()).cast::<T>();
        // SAFETY: freshly allocated, large enough and suitably aligned.
        unsafe { ptr.as_ptr().write(value) };
        ptr
    }

    /// Copies `bytes` into the arena.
    pub fn alloc_copy(&mut self, bytes: &[u8]) -> NonNull<[u8]> {
        let ptr = self.alloc(bytes.len());
        // SAFETY: `ptr` is valid for `bytes.len()` bytes and cannot overlap
        // a borrowed slice.
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), bytes.len()) };
        NonNull::slice_from_raw_parts(ptr, bytes.len())
    }

    /// Copies `bytes` into the arena followed by a NUL byte.
    pub fn alloc_bytes_nul(&mut self, bytes: &[u8]) -> NonNull<u8> {
        let len = bytes.len();
        let size = len.checked_add(1).unwrap_or_else(|| self.fail(AllocError::CapacityOverflow));
        let ptr = self.alloc(size);
        // SAFETY: `ptr` is valid for `len + 1` bytes.
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), len);
            ptr.as_ptr().add(len).write(0);
        }
        ptr
    }

    /// Returns true if `ptr` points into one of this arena's blocks.
    #[must_use]
    pub fn contains(&self, ptr: *const u8) -> bool {
        let addr = ptr.addr();
        self.blocks.iter().any(|block| block.contains(addr))
    }

    /// Returns allocation statistics.
    #[must_use]
    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            total_allocated: self.total_allocated,
            block_count: self.blocks.len(),
            total_capacity: self.blocks.iter().map(|block| block.size).sum(),
        }
    }

    /// Releases every block and returns the arena to its initial state.
    pub fn free_all(&mut self) {
        for block in self.blocks.iter() {
            // SAFETY: each block was allocated with exactly this layout and
            // is released once; `&mut self` rules out live borrows.
            unsafe { alloc::dealloc(block.start.as_ptr(), block.layout()) };
        }
        if !self.blocks.is_empty() {
            debug!("arena released {} blocks", self.blocks.len());
        }
        self.blocks.free();
        self.ptr = ptr::null_mut();
        self.end = ptr::null_mut();
        self.total_allocated = 0;
    }

    #[cold]
    fn fail(&self, err: AllocError) -> ! {
        self.policy.unwrap_or_else(failure_policy).fail(err)
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        self.free_all();
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("block_size", &self.block_size)
            .field("remaining", &self.remaining())
            .field("stats", &self.stats())
            .finish()
    }
}
