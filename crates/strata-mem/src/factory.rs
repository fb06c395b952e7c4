//! Configuration and factory for arenas and interners.
//!
//! [`ArenaConfig`] describes how an arena grows and how it reacts to
//! allocation failure. [`ArenaFactory`] stamps out arenas (and interners
//! backed by them) from one config without pooling or reuse: each call
//! builds a fresh, empty instance, and dropping it releases everything.
//!
//! # Examples
//!
//! ```
//! use strata_mem::error::FailurePolicy;
//! use strata_mem::factory::{ArenaConfig, ArenaFactory};
//!
//! let factory = ArenaFactory::new(
//!     ArenaConfig::new()
//!         .block_size(64 * 1024)
//!         .failure_policy(FailurePolicy::Panic),
//! );
//!
//! let mut arena = factory.create_arena();
//! let value = arena.alloc_value(42u32);
//! unsafe {
//!     assert_eq!(*value.as_ptr(), 42);
//! }
//!
//! let interner = factory.create_interner();
//! assert_eq!(interner.intern_str("x"), interner.intern_str("x"));
//! ```
//!
//! # Phase-scoped use
//!
//! ```ignore
//! use strata_mem::factory::ArenaFactory;
//!
//! const SCRATCH: ArenaFactory = ArenaFactory::with_block_size(64 * 1024);
//!
//! fn lower_function(body: &Body) -> Lowered {
//!     let mut arena = SCRATCH.create_arena();
//!     // ... temporaries live in `arena` ...
//!     // arena dropped here, all blocks released
//! }
//! ```

use crate::arena::{ARENA_BLOCK_SIZE, Arena};
use crate::error::FailurePolicy;
use crate::intern::Interner;

/// How an arena is sized and how it fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Minimum size of each block; rounded up to the arena alignment.
    pub block_size: usize,
    /// Policy for infallible operations; `None` follows the process-wide
    /// policy at the time of failure.
    pub failure_policy: Option<FailurePolicy>,
}

impl ArenaConfig {
    /// 1 MiB blocks, process-wide failure policy.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            block_size: ARENA_BLOCK_SIZE,
            failure_policy: None,
        }
    }

    /// Sets the minimum block size.
    #[must_use]
    pub const fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Pins the failure policy for arenas built from this config.
    #[must_use]
    pub const fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = Some(policy);
        self
    }

    /// Builds an empty arena following this config.
    #[must_use]
    pub fn build_arena(&self) -> Arena {
        let arena = Arena::with_block_size(self.block_size);
        match self.failure_policy {
            Some(policy) => arena.with_failure_policy(policy),
            None => arena,
        }
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Factory for arenas and interners sharing one configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArenaFactory {
    config: ArenaConfig,
}

impl ArenaFactory {
    /// Creates a factory from a config.
    #[must_use]
    pub const fn new(config: ArenaConfig) -> Self {
        Self { config }
    }

    /// Creates a factory with the given block size and default policy.
    #[must_use]
    pub const fn with_block_size(block_size: usize) -> Self {
        Self::new(ArenaConfig::new().block_size(block_size))
    }

    /// The configuration used for every instance.
    #[must_use]
    pub const fn config(&self) -> ArenaConfig {
        self.config
    }

    /// Creates a fresh, empty arena.
    #[must_use]
    pub fn create_arena(&self) -> Arena {
        self.config.build_arena()
    }

    /// Creates a fresh, empty interner whose arena follows the config.
    #[must_use]
    pub fn create_interner(&self) -> Interner {
        Interner::with_config(self.config)
    }
}
