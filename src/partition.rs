//! Partitioner: splits the input into owned, value-disjoint buckets.

use crate::boundary::Boundaries;
use crate::key::SortKey;

/// Values assigned to one worker, tagged with the bucket index.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket<T> {
    pub index: usize,
    pub values: Vec<T>,
}

impl<T> Bucket<T> {
    pub fn new(index: usize, values: Vec<T>) -> Self {
        Bucket { index, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Copy every input element into exactly one of `boundaries.bucket_count()`
/// buckets. Input order is preserved within a bucket; empty buckets are kept
/// so bucket `k` always sits at position `k`.
///
/// Two passes: the first counts bucket sizes so each bucket is allocated
/// once, the second scatters the values.
pub fn partition<T: SortKey>(input: &[T], boundaries: &Boundaries<T>) -> Vec<Bucket<T>> {
    let bucket_count = boundaries.bucket_count();

    let assignments: Vec<usize> = input.iter().map(|&v| boundaries.bucket_of(v)).collect();

    let mut counts = vec![0usize; bucket_count];
    for &bucket in &assignments {
        counts[bucket] += 1;
    }

    let mut buckets: Vec<Bucket<T>> = counts
        .iter()
        .enumerate()
        .map(|(index, &count)| Bucket::new(index, Vec::with_capacity(count)))
        .collect();

    for (&value, &bucket) in input.iter().zip(&assignments) {
        buckets[bucket].values.push(value);
    }

    buckets
}
