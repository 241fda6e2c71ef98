//! Worker: sorts one bucket.
//!
//! Workers are stateless and interchangeable. A worker owns the bucket it is
//! given, sorts it in place and hands it back; it never sees another bucket.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::cpu_parallel_sort;
use crate::cpu_radix_sort;
use crate::cpu_sort;
use crate::error::{Result, SortError};
use crate::key::SortKey;
use crate::partition::Bucket;

/// Local sorting strategy a worker applies to its bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalSort {
    /// Pattern-defeating quicksort.
    #[default]
    Unstable,
    /// Stable merge-based sort.
    Stable,
    /// LSD radix sort over the key's radix encoding.
    Radix,
    /// Rayon parallel pdqsort within the worker.
    Parallel,
}

impl LocalSort {
    pub const ALL: [LocalSort; 4] = [
        LocalSort::Unstable,
        LocalSort::Stable,
        LocalSort::Radix,
        LocalSort::Parallel,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LocalSort::Unstable => "unstable",
            LocalSort::Stable => "stable",
            LocalSort::Radix => "radix",
            LocalSort::Parallel => "parallel",
        }
    }
}

impl fmt::Display for LocalSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LocalSort {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        LocalSort::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown local sort {s:?} (expected unstable, stable, radix or parallel)"))
    }
}

/// A bucket after local sorting.
#[derive(Debug, Clone)]
pub struct SortedBucket<T> {
    pub index: usize,
    pub values: Vec<T>,
    /// Time the worker spent validating and sorting.
    pub elapsed: Duration,
}

/// Sorts buckets with a fixed local strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Worker {
    algorithm: LocalSort,
}

impl Worker {
    pub fn new(algorithm: LocalSort) -> Self {
        Worker { algorithm }
    }

    pub fn algorithm(&self) -> LocalSort {
        self.algorithm
    }

    /// Sort one bucket. Fails with [`SortError::InvalidElement`] if any
    /// element has no place in the total order; nothing is sorted then.
    pub fn sort<T: SortKey>(&self, bucket: Bucket<T>) -> Result<SortedBucket<T>> {
        let start = Instant::now();
        let Bucket { index, mut values } = bucket;

        if let Some(position) = values.iter().position(|v| !v.is_comparable()) {
            warn!(bucket = index, position, "bucket holds an element that cannot be ordered");
            return Err(SortError::InvalidElement {
                bucket: index,
                position,
                value: format!("{:?}", values[position]),
            });
        }

        match self.algorithm {
            LocalSort::Unstable => cpu_sort::sort_unstable(&mut values),
            LocalSort::Stable => cpu_sort::sort_stable(&mut values),
            LocalSort::Radix => cpu_radix_sort::sort(&mut values),
            LocalSort::Parallel => cpu_parallel_sort::parallel_sort(&mut values),
        }

        let elapsed = start.elapsed();
        debug!(
            bucket = index,
            len = values.len(),
            algorithm = %self.algorithm,
            elapsed_us = elapsed.as_micros() as u64,
            "bucket sorted"
        );

        Ok(SortedBucket {
            index,
            values,
            elapsed,
        })
    }
}
