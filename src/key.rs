//! Element types the pipeline can sort.
//!
//! Partitioning needs arithmetic (the bucket width is a real number), local
//! sorting needs a total order, and the radix strategy needs an
//! order-preserving unsigned encoding. [`SortKey`] bundles the three.

use std::cmp::Ordering;
use std::fmt::Debug;

/// A value that can travel through the pipeline.
///
/// Implemented for `u32`, `i32`, `f32`, `u64`, `i64` and `f64`.
pub trait SortKey: Copy + PartialOrd + Debug + Send + Sync + 'static {
    /// Width of the radix encoding in bits.
    const KEY_BITS: u32;

    /// Position on the real line, used for boundary arithmetic.
    ///
    /// Must be monotonic: `a <= b` implies `a.to_f64() <= b.to_f64()`.
    fn to_f64(self) -> f64;

    /// Whether the value takes part in the total order. Only NaN fails this.
    #[inline]
    fn is_comparable(&self) -> bool {
        true
    }

    /// Total order among comparable values.
    fn key_cmp(&self, other: &Self) -> Ordering;

    /// Unsigned encoding whose natural order matches [`SortKey::key_cmp`].
    fn radix_key(self) -> u64;

    /// Exact `self - origin` for `origin <= self`, when the key is an
    /// integer. Bucket assignment uses it instead of `to_f64`, which rounds
    /// 64-bit keys above 2^53. `None` keeps the `f64` path.
    #[inline]
    fn distance_from(self, _origin: Self) -> Option<u64> {
        None
    }
}

macro_rules! impl_unsigned_key {
    ($($t:ty),*) => {$(
        impl SortKey for $t {
            const KEY_BITS: u32 = <$t>::BITS;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn key_cmp(&self, other: &Self) -> Ordering {
                self.cmp(other)
            }

            #[inline]
            fn radix_key(self) -> u64 {
                self as u64
            }

            #[inline]
            fn distance_from(self, origin: Self) -> Option<u64> {
                Some(self.radix_key().wrapping_sub(origin.radix_key()))
            }
        }
    )*};
}

macro_rules! impl_signed_key {
    ($($t:ty => $u:ty),*) => {$(
        impl SortKey for $t {
            const KEY_BITS: u32 = <$t>::BITS;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn key_cmp(&self, other: &Self) -> Ordering {
                self.cmp(other)
            }

            // Flipping the sign bit moves negatives below positives.
            #[inline]
            fn radix_key(self) -> u64 {
                ((self as $u) ^ (1 << (<$t>::BITS - 1))) as u64
            }

            // The sign flip is an offset, so radix keys subtract exactly.
            #[inline]
            fn distance_from(self, origin: Self) -> Option<u64> {
                Some(self.radix_key().wrapping_sub(origin.radix_key()))
            }
        }
    )*};
}

macro_rules! impl_float_key {
    ($($t:ty => $u:ty),*) => {$(
        impl SortKey for $t {
            const KEY_BITS: u32 = <$u>::BITS;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn is_comparable(&self) -> bool {
                !self.is_nan()
            }

            #[inline]
            fn key_cmp(&self, other: &Self) -> Ordering {
                self.total_cmp(other)
            }

            // Negative values: invert every bit. Positive values: set the sign bit.
            #[inline]
            fn radix_key(self) -> u64 {
                let bits = self.to_bits();
                let sign = 1 << (<$u>::BITS - 1);
                let encoded = if bits & sign != 0 { !bits } else { bits | sign };
                encoded as u64
            }
        }
    )*};
}

impl_unsigned_key!(u32, u64);
impl_signed_key!(i32 => u32, i64 => u64);
impl_float_key!(f32 => u32, f64 => u64);
