//! Property-based tests for the sample sort pipeline.

use proptest::prelude::*;

use sample_sort::{
    partition, sort_distributed, Boundaries, Bucket, Coordinator, LocalSort, PipelineConfig,
    SortKey, TransportKind, Worker,
};

fn transport_strategy() -> impl Strategy<Value = TransportKind> {
    prop::sample::select(TransportKind::ALL.to_vec())
}

fn algorithm_strategy() -> impl Strategy<Value = LocalSort> {
    prop::sample::select(LocalSort::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Output is the input, sorted: same multiset, non-decreasing order.
    #[test]
    fn output_matches_std_sort(
        data in prop::collection::vec(any::<i32>(), 1..500),
        workers in 2usize..12,
        transport in transport_strategy(),
        algorithm in algorithm_strategy(),
    ) {
        let config = PipelineConfig::new(workers)
            .with_transport(transport)
            .with_algorithm(algorithm);
        let sorted = Coordinator::from_config(config).unwrap().sort(data.clone()).unwrap();

        let mut expected = data;
        expected.sort_unstable();
        prop_assert_eq!(sorted, expected);
    }

    /// Narrow value ranges pile many duplicates onto the cut points.
    #[test]
    fn duplicates_survive(
        data in prop::collection::vec(0u32..8, 1..300),
        workers in 2usize..10,
    ) {
        let sorted = sort_distributed(data.clone(), workers).unwrap();
        let mut expected = data;
        expected.sort_unstable();
        prop_assert_eq!(sorted, expected);
    }

    /// Finite floats sort into the same order as `total_cmp`.
    #[test]
    fn finite_floats_sort(
        data in prop::collection::vec(prop::num::f64::NORMAL | prop::num::f64::ZERO, 1..300),
        workers in 2usize..8,
    ) {
        let sorted = sort_distributed(data.clone(), workers).unwrap();
        let mut expected = data;
        expected.sort_by(f64::total_cmp);
        prop_assert_eq!(
            sorted.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            expected.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
    }

    /// Every element lands in exactly one bucket, the bucket its value maps
    /// to, and all of bucket k orders strictly before all of bucket k + 1.
    #[test]
    fn buckets_are_disjoint_and_ordered(
        data in prop::collection::vec(any::<i64>(), 1..400),
        workers in 2usize..16,
    ) {
        let boundaries = Boundaries::compute(&data, workers).unwrap();
        let buckets = partition(&data, &boundaries);

        prop_assert_eq!(buckets.len(), workers);
        prop_assert_eq!(buckets.iter().map(Bucket::len).sum::<usize>(), data.len());

        for (k, bucket) in buckets.iter().enumerate() {
            prop_assert_eq!(bucket.index, k);
            for &v in &bucket.values {
                prop_assert_eq!(boundaries.bucket_of(v), k);
            }
        }

        // Integer keys are bucketed exactly: bucket 0 is the minimum only.
        for &v in &buckets[0].values {
            prop_assert_eq!(v, boundaries.min);
        }

        let non_empty: Vec<&Bucket<i64>> = buckets.iter().filter(|b| !b.is_empty()).collect();
        for pair in non_empty.windows(2) {
            let lower_max = pair[0].values.iter().max().unwrap();
            let upper_min = pair[1].values.iter().min().unwrap();
            prop_assert!(lower_max < upper_min, "{} !< {}", lower_max, upper_min);
        }
    }

    /// 64-bit keys that share one `f64` value still land in separate buckets.
    #[test]
    fn clustered_u64_keys_use_every_bucket(
        base in (1u64 << 54)..(u64::MAX >> 1),
        workers in 2usize..8,
    ) {
        let data: Vec<u64> = (0..workers as u64 * 4).map(|i| base + i).collect();
        let boundaries = Boundaries::compute(&data, workers).unwrap();
        for bucket in partition(&data, &boundaries) {
            prop_assert!(!bucket.is_empty(), "bucket {} empty", bucket.index);
        }
    }

    /// Partitioning keeps input order inside each bucket.
    #[test]
    fn partition_preserves_relative_order(
        data in prop::collection::vec(0u16..1000, 1..300),
        workers in 2usize..8,
    ) {
        let data: Vec<u32> = data.into_iter().map(u32::from).collect();
        let boundaries = Boundaries::compute(&data, workers).unwrap();
        for bucket in partition(&data, &boundaries) {
            let expected: Vec<u32> = data
                .iter()
                .copied()
                .filter(|&v| boundaries.bucket_of(v) == bucket.index)
                .collect();
            prop_assert_eq!(bucket.values, expected);
        }
    }

    /// Sorting an already sorted bucket changes nothing.
    #[test]
    fn worker_sort_is_idempotent(
        data in prop::collection::vec(any::<u64>(), 0..300),
        algorithm in algorithm_strategy(),
    ) {
        let worker = Worker::new(algorithm);
        let once = worker.sort(Bucket::new(3, data)).unwrap();
        prop_assert_eq!(once.index, 3);
        let twice = worker.sort(Bucket::new(3, once.values.clone())).unwrap();
        prop_assert_eq!(twice.values, once.values);
    }

    /// Radix keys order the same way as the natural comparison.
    #[test]
    fn radix_key_is_monotonic(a in any::<i64>(), b in any::<i64>()) {
        prop_assert_eq!(a.radix_key().cmp(&b.radix_key()), a.cmp(&b));
    }
}
