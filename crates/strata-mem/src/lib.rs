//! `Strata` runtime memory core
//!
//! Foundational memory and data-structure primitives for a compiler or
//! interpreter host:
//!
//! - **Stretchy buffers**: growable arrays with doubling growth ([`StretchyBuf`])
//! - **Arena allocation**: bump-pointer blocks with stable addresses ([`Arena`])
//! - **Hash maps**: open addressing, linear probing, integer keys ([`Map`], [`IntMap`])
//! - **String interning**: one canonical, NUL-terminated copy per byte string
//!   with pointer-equality comparison ([`Interner`], [`Symbol`])
//!
//! Every growing operation has a `try_*` form returning
//! [`AllocError`]; the plain form applies the [`FailurePolicy`]
//! (abort by default, see [`error`]).
//!
//! Everything here is single-threaded.
//!
//! # Example
//!
//! ```
//! use strata_mem::Interner;
//!
//! let interner = Interner::new();
//! let a = interner.intern_str("identifier");
//! let b = interner.intern_str("identifier");
//! assert_eq!(a.as_ptr(), b.as_ptr());
//! ```

pub mod align;
pub mod arena;
pub mod buf;
pub mod error;
pub mod factory;
pub mod hash;
pub mod intern;
pub mod map;
pub mod symbol;

pub use arena::{Arena, ArenaStats};
pub use buf::StretchyBuf;
pub use error::{AllocError, FailurePolicy};
pub use factory::{ArenaConfig, ArenaFactory};
pub use intern::{Interner, InternerStats};
pub use map::{IntMap, Map, MapKey};
pub use symbol::Symbol;

#[cfg(feature = "global-interner")]
pub use intern::{global_intern, global_intern_cstr, global_intern_str};
