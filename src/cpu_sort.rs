//! Comparison sorts from the standard library.
//!
//! Callers guarantee every element is comparable (see
//! [`SortKey::is_comparable`]); the worker checks this before sorting.

use crate::key::SortKey;

/// Sort in place with the unstable pattern-defeating quicksort.
///
/// Falls back to heap sort, so the worst case stays O(n log n).
#[inline]
pub fn sort_unstable<T: SortKey>(data: &mut [T]) {
    data.sort_unstable_by(T::key_cmp);
}

/// Sort in place with the stable merge-based sort.
#[inline]
pub fn sort_stable<T: SortKey>(data: &mut [T]) {
    data.sort_by(T::key_cmp);
}

/// Check that a slice is non-decreasing.
#[inline]
pub fn is_sorted<T: SortKey>(data: &[T]) -> bool {
    data.windows(2).all(|w| w[0].key_cmp(&w[1]).is_le())
}
