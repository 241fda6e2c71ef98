//! Parallel comparison sort using Rayon.
//!
//! Backs the `parallel` local sort, and serves as the
//! single-call baseline the benchmark compares the pipeline against.

use rayon::prelude::*;

use crate::key::SortKey;

/// Parallel unstable sort using rayon's parallel pdqsort.
///
/// # Example
///
/// ```
/// let mut data = vec![4u32, 2, 3, 1];
/// sample_sort::cpu_parallel_sort::parallel_sort(&mut data);
/// assert_eq!(data, vec![1, 2, 3, 4]);
/// ```
pub fn parallel_sort<T: SortKey>(data: &mut [T]) {
    data.par_sort_unstable_by(T::key_cmp);
}
