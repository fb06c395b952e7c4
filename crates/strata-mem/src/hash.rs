//! Hash functions for table index distribution.
//!
//! These are fast, deterministic and allocation-free. They make no claim to
//! collision resistance and must not be used where an adversary picks keys.
//!
//! ```
//! use strata_mem::hash::{hash_bytes, hash_u64};
//!
//! assert_eq!(hash_u64(0), 0);
//! assert_ne!(hash_u64(1), hash_u64(2));
//! assert_eq!(hash_bytes(b"ident"), hash_bytes(b"ident"));
//! ```

/// Multiplier of the 64-bit avalanche mix.
const MIX_MULTIPLIER: u64 = 0xff51_afd7_ed55_8ccd;

/// FNV-1a 64-bit offset basis.
const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

/// FNV-1a 64-bit prime.
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Mixes a 64-bit integer: multiply by an odd constant, then fold the high
/// half into the low half.
#[inline]
#[must_use]
pub const fn hash_u64(x: u64) -> u64 {
    let x = x.wrapping_mul(MIX_MULTIPLIER);
    x ^ (x >> 32)
}

/// Hashes a pointer by its address.
#[inline]
#[must_use]
pub fn hash_ptr<T: ?Sized>(ptr: *const T) -> u64 {
    hash_u64(ptr.cast::<()>().addr() as u64)
}

/// Combines two hashes into one.
#[inline]
#[must_use]
pub const fn hash_mix(x: u64, y: u64) -> u64 {
    hash_u64(x ^ y)
}

/// FNV-1a over `bytes` with an extra xor-shift after every byte.
#[must_use]
pub const fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut x = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        x ^= bytes[i] as u64;
        x = x.wrapping_mul(FNV_PRIME);
        x ^= x >> 32;
        i += 1;
    }
    x
}
