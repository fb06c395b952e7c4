//! Allocation errors and the policy applied when an infallible operation
//! cannot get memory.
//!
//! Every growing operation in this crate comes in two forms: a `try_*`
//! method returning [`Result`], and an infallible method that hands the
//! error to [`fatal`]. What `fatal` does is decided by the process-wide
//! [`FailurePolicy`]:
//!
//! - [`FailurePolicy::Abort`] (default) logs the error and aborts the process.
//! - [`FailurePolicy::Panic`] unwinds with the error as the panic message.
//!
//! ```
//! use strata_mem::error::{failure_policy, set_failure_policy, FailurePolicy};
//!
//! assert_eq!(failure_policy(), FailurePolicy::Abort);
//! set_failure_policy(FailurePolicy::Panic);
//! assert_eq!(failure_policy(), FailurePolicy::Panic);
//! # set_failure_policy(FailurePolicy::Abort);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use strata_log::error;

/// Errors raised at the allocation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// The system allocator returned no memory.
    OutOfMemory {
        /// Requested size in bytes.
        size: usize,
        /// Requested alignment in bytes.
        align: usize,
    },

    /// A size or capacity computation overflowed `usize` or exceeded
    /// `isize::MAX` bytes.
    CapacityOverflow,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::OutOfMemory { size, align } => {
                write!(f, "Out of memory: failed to allocate {size} bytes (align {align})")
            }
            AllocError::CapacityOverflow => write!(f, "Capacity overflow"),
        }
    }
}

impl std::error::Error for AllocError {}

/// Result type for fallible allocation.
pub type Result<T> = std::result::Result<T, AllocError>;

/// What infallible operations do when allocation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the error and abort the process.
    #[default]
    Abort = 0,
    /// Panic with the error message.
    Panic = 1,
}

impl FailurePolicy {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => FailurePolicy::Panic,
            _ => FailurePolicy::Abort,
        }
    }

    /// Applies this policy to `err`. Never returns.
    #[cold]
    pub fn fail(self, err: AllocError) -> ! {
        match self {
            FailurePolicy::Abort => {
                error!("fatal allocation failure: {err}");
                std::process::abort()
            }
            FailurePolicy::Panic => panic!("{err}"),
        }
    }
}

static POLICY: AtomicU8 = AtomicU8::new(FailurePolicy::Abort as u8);

/// Sets the process-wide failure policy.
pub fn set_failure_policy(policy: FailurePolicy) {
    POLICY.store(policy as u8, Ordering::SeqCst);
}

/// Returns the process-wide failure policy.
#[must_use]
pub fn failure_policy() -> FailurePolicy {
    FailurePolicy::from_u8(POLICY.load(Ordering::Relaxed))
}

/// Applies the process-wide failure policy to `err`.
#[cold]
#[inline(never)]
pub fn fatal(err: AllocError) -> ! {
    failure_policy().fail(err)
}
