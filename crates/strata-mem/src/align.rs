//! Alignment and clamping helpers shared by the buffer, arena and map.
//!
//! All alignment arguments must be powers of two.

/// Returns true if `x` is a non-zero power of two.
///
/// ```
/// use strata_mem::align::is_pow2;
///
/// assert!(is_pow2(16));
/// assert!(!is_pow2(0));
/// assert!(!is_pow2(24));
/// ```
#[inline]
#[must_use]
pub const fn is_pow2(x: usize) -> bool {
    x != 0 && (x & (x - 1)) == 0
}

/// Rounds `n` down to a multiple of `align`.
#[inline]
#[must_use]
pub const fn align_down(n: usize, align: usize) -> usize {
    debug_assert!(is_pow2(align));
    n & !(align - 1)
}

/// Rounds `n` up to a multiple of `align`, or `None` on overflow.
///
/// ```
/// use strata_mem::align::align_up;
///
/// assert_eq!(align_up(13, 8), Some(16));
/// assert_eq!(align_up(16, 8), Some(16));
/// assert_eq!(align_up(usize::MAX, 8), None);
/// ```
#[inline]
#[must_use]
pub const fn align_up(n: usize, align: usize) -> Option<usize> {
    debug_assert!(is_pow2(align));
    match n.checked_add(align - 1) {
        Some(bumped) => Some(align_down(bumped, align)),
        None => None,
    }
}

/// Returns true if `addr` is a multiple of `align`.
#[inline]
#[must_use]
pub const fn is_aligned(addr: usize, align: usize) -> bool {
    align_down(addr, align) == addr
}

/// `max(x, lo)`, usable in const contexts.
#[inline]
#[must_use]
pub const fn clamp_min(x: usize, lo: usize) -> usize {
    if x < lo { lo } else { x }
}

/// `min(x, hi)`, usable in const contexts.
#[inline]
#[must_use]
pub const fn clamp_max(x: usize, hi: usize) -> usize {
    if x > hi { hi } else { x }
}
