//! Boundary calculation.
//!
//! Bucket ranges are uniform slices of `[min, max]`. With `P` workers the
//! width is `(max - min) / (P - 1)` and cut point `k` (for `k` in `0..P-1`)
//! sits at `min + k * width`. Cut point `k` is the inclusive upper edge of
//! bucket `k`, so bucket 0 holds exactly the values equal to `min`, and the
//! last bucket holds everything above the final cut point.
//!
//! Integer keys are assigned with exact integer arithmetic; the `f64` cut
//! points only drive float keys. Cut points stay finite even when
//! `max - min` overflows or an extreme is infinite.

use crate::error::{Result, SortError};
use crate::key::SortKey;

/// Cut points for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundaries<T> {
    pub min: T,
    pub max: T,
    pub width: f64,
    cuts: Vec<f64>,
    /// `max - min` for integer keys.
    span: Option<u64>,
}

impl<T: SortKey> Boundaries<T> {
    /// Derive the cut points for `worker_count` buckets from the input's range.
    ///
    /// Elements that cannot be ordered are skipped when looking for the
    /// extremes; the worker that receives them reports the problem.
    pub fn compute(input: &[T], worker_count: usize) -> Result<Self> {
        if worker_count < 2 {
            return Err(SortError::configuration(format!(
                "worker_count must be at least 2, got {worker_count}"
            )));
        }
        let Some(&first) = input.first() else {
            return Err(SortError::configuration("input collection is empty"));
        };

        let (min, max) = input
            .iter()
            .filter(|v| v.is_comparable())
            .fold(None, |acc: Option<(T, T)>, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((
                    if v.key_cmp(&lo).is_lt() { v } else { lo },
                    if v.key_cmp(&hi).is_gt() { v } else { hi },
                )),
            })
            .unwrap_or((first, first));

        let (width, cuts) = float_cuts(min.to_f64(), max.to_f64(), worker_count - 1);

        Ok(Boundaries {
            min,
            max,
            width,
            cuts,
            span: max.distance_from(min),
        })
    }

    /// Number of buckets these boundaries describe.
    pub fn bucket_count(&self) -> usize {
        self.cuts.len() + 1
    }

    /// The `P - 1` cut points, non-decreasing and never NaN.
    pub fn cuts(&self) -> &[f64] {
        &self.cuts
    }

    /// Bucket a value belongs to: the first bucket whose upper edge is at or
    /// above the value. Values on a cut point go to the lower bucket.
    #[inline]
    pub fn bucket_of(&self, value: T) -> usize {
        match (self.span, value.distance_from(self.min)) {
            (Some(span), Some(offset)) => exact_bucket(offset, span, self.cuts.len()),
            _ => {
                let v = value.to_f64();
                self.cuts.partition_point(|&cut| cut < v)
            }
        }
    }

    /// `(exclusive lower, inclusive upper)` value range of a bucket.
    /// Bucket 0 is open below.
    pub fn range_of(&self, bucket: usize) -> (f64, f64) {
        let lower = match bucket.checked_sub(1) {
            Some(prev) => self.cuts.get(prev).copied().unwrap_or(self.max.to_f64()),
            None => f64::NEG_INFINITY,
        };
        let upper = self.cuts.get(bucket).copied().unwrap_or(self.max.to_f64());
        (lower, upper)
    }
}

/// Width and cut points for `steps = P - 1` slices of `[lo, hi]`.
///
/// Cut 0 is `lo` itself. The others are computed on the finite part of the
/// range, interpolating when `hi - lo` does not fit in an `f64`.
fn float_cuts(lo: f64, hi: f64, steps: usize) -> (f64, Vec<f64>) {
    let lo_f = lo.clamp(-f64::MAX, f64::MAX);
    let hi_f = hi.clamp(-f64::MAX, f64::MAX);
    let n = steps as f64;
    let span = hi_f - lo_f;

    let width = if span.is_finite() {
        span / n
    } else {
        hi_f / n - lo_f / n
    };

    let cuts = (0..steps)
        .map(|k| {
            if k == 0 {
                lo
            } else if span.is_finite() {
                lo_f + width * k as f64
            } else {
                let t = k as f64 / n;
                lo_f * (1.0 - t) + hi_f * t
            }
        })
        .collect();

    (width, cuts)
}

/// Smallest `k` with `k * span / steps >= offset`, in exact arithmetic.
#[inline]
fn exact_bucket(offset: u64, span: u64, steps: usize) -> usize {
    if span == 0 {
        return 0;
    }
    let steps = steps as u64;
    let bucket = match offset.checked_mul(steps) {
        Some(scaled) => scaled.div_ceil(span),
        None => (offset as u128 * steps as u128).div_ceil(span as u128) as u64,
    };
    bucket.min(steps) as usize
}
