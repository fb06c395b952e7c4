//! String interning.
//!
//! An [`Interner`] canonicalizes byte strings: interning equal bytes twice
//! yields the same [`Symbol`], so equality anywhere in the host is a pointer
//! comparison.
//!
//! # Design
//!
//! - Every distinct string is copied once into the interner's [`Arena`] as a
//!   node holding its length, a link to the next node in its hash chain, the
//!   bytes and a terminating NUL.
//! - A [`Map`] from the content hash to the most recent node with that hash
//!   (the chain head) indexes the nodes. Strings whose hashes collide are
//!   told apart by walking the chain and comparing lengths, then bytes.
//! - A hash of zero is stored under key `1`; the key space is therefore
//!   `2^64 - 1` values, which only ever lengthens one chain.
//! - Chain links live in the arena, not the map, so rehashing the map moves
//!   heads between slots without touching any chain.
//!
//! Interning takes `&self`; returned symbols borrow the interner, so the
//! arena cannot be released while any symbol is alive.
//!
//! # Examples
//!
//! ```
//! use strata_mem::Interner;
//!
//! let interner = Interner::new();
//!
//! let foo = interner.intern_str("foo");
//! let bar = interner.intern_str("bar");
//! let foo_again = interner.intern_str("foo");
//!
//! assert_eq!(foo, foo_again); // same string, same symbol
//! assert_ne!(foo, bar);
//! assert_eq!(foo.len(), 3);
//! assert_eq!(interner.len(), 2);
//! ```
//!
//! # Performance
//!
//! - **Interned string**: one hash, one table probe sequence, one chain walk
//! - **New string**: the above plus an O(n) copy into the arena
//! - **Comparison**: O(1) pointer equality

use std::cell::{Cell, RefCell};
use std::ffi::CStr;
use std::fmt;
use std::num::NonZeroU64;
use std::ptr::{self, NonNull};

use strata_log::trace;

use crate::arena::{Arena, ArenaStats};
use crate::error::{AllocError, FailurePolicy, Result, failure_policy};
use crate::factory::ArenaConfig;
use crate::hash::hash_bytes;
use crate::map::Map;
use crate::symbol::{InternNode, NODE_HEADER_SIZE, Symbol};

/// Interning statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternerStats {
    /// Number of distinct strings.
    pub strings: usize,
    /// Number of chain heads in the table (distinct hash keys).
    pub chains: usize,
    /// Slots in the table.
    pub table_capacity: usize,
    /// Length of the longest hash chain.
    pub longest_chain: usize,
    /// Statistics of the backing arena.
    pub arena: ArenaStats,
}

/// String interner owning its arena and hash table.
pub struct Interner {
    arena: RefCell<Arena>,
    heads: RefCell<Map<NonZeroU64, NonNull<InternNode>>>,
    count: Cell<usize>,
    policy: Option<FailurePolicy>,
}

impl Interner {
    /// Creates an empty interner with 1 MiB arena blocks.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ArenaConfig::default())
    }

    /// Creates an empty interner whose arena follows `config`.
    #[must_use]
    pub fn with_config(config: ArenaConfig) -> Self {
        Self {
            arena: RefCell::new(config.build_arena()),
            heads: RefCell::new(Map::new()),
            count: Cell::new(0),
            policy: config.failure_policy,
        }
    }

    /// Number of distinct strings interned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count.get()
    }

    /// Returns true if nothing has been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count.get() == 0
    }

    /// Returns the canonical symbol for `bytes`, copying them in on first
    /// sight.
    pub fn intern(&self, bytes: &[u8]) -> Symbol<'_> {
        match self.try_intern(bytes) {
            Ok(sym) => sym,
            Err(err) => self.policy.unwrap_or_else(failure_policy).fail(err),
        }
    }

    /// Fallible form of [`intern`](Self::intern).
    pub fn try_intern(&self, bytes: &[u8]) -> Result<Symbol<'_>> {
        self.intern_keyed(table_key(hash_bytes(bytes)), bytes)
    }

    /// Interns UTF-8 text.
    pub fn intern_str(&self, s: &str) -> Symbol<'_> {
        self.intern(s.as_bytes())
    }

    /// Interns the bytes of a C string, up to but excluding its terminator.
    pub fn intern_cstr(&self, s: &CStr) -> Symbol<'_> {
        self.intern(s.to_bytes())
    }

    /// Looks up `bytes` without interning them.
    #[must_use]
    pub fn get(&self, bytes: &[u8]) -> Option<Symbol<'_>> {
        let head = self.heads.borrow().get(table_key(hash_bytes(bytes)));
        self.find_in_chain(head, bytes)
    }

    fn find_in_chain(&self, head: Option<NonNull<InternNode>>, bytes: &[u8]) -> Option<Symbol<'_>> {
        let mut cursor = head;
        while let Some(node) = cursor {
            // SAFETY: chain nodes are complete and live in our arena, which
            // outlives the `&self` borrow.
            let sym = unsafe { Symbol::from_node(node) };
            if sym.len() == bytes.len() && sym.as_bytes() == bytes {
                return Some(sym);
            }
            cursor = sym.next();
        }
        None
    }

    /// Interns `bytes` under an explicit table key.
    fn intern_keyed(&self, key: NonZeroU64, bytes: &[u8]) -> Result<Symbol<'_>> {
        let head = self.heads.borrow().get(key);
        if let Some(sym) = self.find_in_chain(head, bytes) {
            return Ok(sym);
        }

        let len = bytes.len();
        let size = NODE_HEADER_SIZE
            .checked_add(len)
            .and_then(|size| size.checked_add(1))
            .ok_or(AllocError::CapacityOverflow)?;
        let raw = self.arena.borrow_mut().try_alloc(size)?;
        let node = raw.cast::<InternNode>();

        // SAFETY: `raw` is a fresh, 8-byte aligned allocation of
        // `header + len + 1` bytes that nothing else references.
        unsafe {
            node.as_ptr().write(InternNode { len, next: head });
            let dst = raw.as_ptr().add(NODE_HEADER_SIZE);
            ptr::copy_nonoverlapping(bytes.as_ptr(), dst, len);
            dst.add(len).write(0);
        }

        self.heads.borrow_mut().try_insert(key, node)?;
        self.count.set(self.count.get() + 1);
        trace!("interned \"{}\" ({} bytes)", bytes.escape_ascii(), len);

        // SAFETY: the node was fully written above.
        Ok(unsafe { Symbol::from_node(node) })
    }

    /// Returns true if `sym` was produced by this interner.
    #[must_use]
    pub fn owns(&self, sym: Symbol<'_>) -> bool {
        self.arena.borrow().contains(sym.node().as_ptr().cast::<u8>())
    }

    /// Returns interning statistics. Walks every chain.
    #[must_use]
    pub fn stats(&self) -> InternerStats {
        let heads = self.heads.borrow();
        let longest_chain = heads
            .iter()
            .map(|(_, head)| {
                let mut length = 0;
                let mut cursor = Some(head);
                while let Some(node) = cursor {
                    length += 1;
                    // SAFETY: chain nodes are complete and live.
                    cursor = unsafe { Symbol::from_node(node) }.next();
                }
                length
            })
            .max()
            .unwrap_or(0);

        InternerStats {
            strings: self.count.get(),
            chains: heads.len(),
            table_capacity: heads.capacity(),
            longest_chain,
            arena: self.arena.borrow().stats(),
        }
    }

    /// Forgets every string and releases the arena.
    ///
    /// Takes `&mut self`, so no symbol can outlive the memory it points to.
    pub fn reset(&mut self) {
        self.heads.get_mut().clear();
        self.arena.get_mut().free_all();
        self.count.set(0);
    }
}

/// Table key for a content hash. Zero is the integer map's empty marker, so
/// it is folded onto one.
fn table_key(hash: u64) -> NonZeroU64 {
    NonZeroU64::new(hash).unwrap_or(NonZeroU64::MIN)
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Interner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interner")
            .field("strings", &self.count.get())
            .field("arena", &self.arena.borrow().stats())
            .finish()
    }
}

#[cfg(feature = "global-interner")]
thread_local! {
    static GLOBAL: &'static Interner = Box::leak(Box::new(Interner::new()));
}

/// Interns `bytes` in this thread's global interner.
///
/// The global interner is created on first use and never freed, so its
/// symbols are `'static`.
///
/// ```
/// use strata_mem::intern::global_intern;
///
/// let a = global_intern(b"main");
/// let b = global_intern(b"main");
/// assert_eq!(a, b);
/// ```
#[cfg(feature = "global-interner")]
pub fn global_intern(bytes: &[u8]) -> Symbol<'static> {
    GLOBAL.with(|interner| {
        let interner: &'static Interner = interner;
        interner.intern(bytes)
    })
}

/// Interns UTF-8 text in this thread's global interner.
#[cfg(feature = "global-interner")]
pub fn global_intern_str(s: &str) -> Symbol<'static> {
    global_intern(s.as_bytes())
}

/// Interns a C string in this thread's global interner.
#[cfg(feature = "global-interner")]
pub fn global_intern_cstr(s: &CStr) -> Symbol<'static> {
    global_intern(s.to_bytes())
}
