//! LSD radix sort over [`SortKey::radix_key`].
//!
//! 8-bit digits, one counting-sort pass per digit, least significant first.
//! 32-bit keys take at most 4 passes and 64-bit keys at most 8; a pass whose
//! digit is the same for every element is skipped.

use crate::key::SortKey;

/// Number of bits per digit (radix)
const RADIX_BITS: usize = 8;
/// Number of buckets (2^RADIX_BITS)
const NUM_BUCKETS: usize = 1 << RADIX_BITS;
/// Mask for extracting a digit
const RADIX_MASK: u64 = (NUM_BUCKETS - 1) as u64;

#[inline]
fn digit<T: SortKey>(value: T, shift: usize) -> usize {
    ((value.radix_key() >> shift) & RADIX_MASK) as usize
}

/// Sort a slice in place. Stable, O(n · KEY_BITS / 8).
pub fn sort<T: SortKey>(data: &mut [T]) {
    if data.len() <= 1 {
        return;
    }

    let n = data.len();
    let passes = (T::KEY_BITS as usize).div_ceil(RADIX_BITS);
    let mut temp: Vec<T> = data.to_vec();
    let mut histogram = [0usize; NUM_BUCKETS];

    for pass in 0..passes {
        let shift = pass * RADIX_BITS;

        histogram.fill(0);
        for &value in data.iter() {
            histogram[digit(value, shift)] += 1;
        }

        if histogram.iter().any(|&count| count == n) {
            continue;
        }

        // Exclusive prefix sum turns counts into scatter offsets.
        let mut sum = 0usize;
        for count in histogram.iter_mut() {
            let c = *count;
            *count = sum;
            sum += c;
        }

        for &value in data.iter() {
            let d = digit(value, shift);
            temp[histogram[d]] = value;
            histogram[d] += 1;
        }

        data.copy_from_slice(&temp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu_sort::is_sorted;
    use rand::Rng;

    #[test]
    fn test_radix_sort_empty() {
        let mut data: Vec<u32> = vec![];
        sort(&mut data);
        assert!(data.is_empty());
    }

    #[test]
    fn test_radix_sort_single() {
        let mut data = vec![42u32];
        sort(&mut data);
        assert_eq!(data, vec![42]);
    }

    #[test]
    fn test_radix_sort_small() {
        let mut data = vec![170u32, 45, 75, 90, 802, 24, 2, 66];
        sort(&mut data);
        assert_eq!(data, vec![2, 24, 45, 66, 75, 90, 170, 802]);
    }

    #[test]
    fn test_radix_sort_random_u32() {
        let mut rng = rand::thread_rng();
        let mut data: Vec<u32> = (0..10_000).map(|_| rng.gen()).collect();
        let mut expected = data.clone();
        expected.sort_unstable();
        sort(&mut data);
        assert_eq!(data, expected);
    }

    #[test]
    fn test_radix_sort_signed() {
        let mut rng = rand::thread_rng();
        let mut data: Vec<i64> = (0..5_000).map(|_| rng.gen()).collect();
        let mut expected = data.clone();
        expected.sort_unstable();
        sort(&mut data);
        assert_eq!(data, expected);
    }

    #[test]
    fn test_radix_sort_floats() {
        let mut data = vec![1.5f64, -3.25, 0.0, f64::INFINITY, -0.5, 1e9, f64::NEG_INFINITY];
        sort(&mut data);
        assert!(is_sorted(&data));
        assert_eq!(data[0], f64::NEG_INFINITY);
        assert_eq!(data[6], f64::INFINITY);
    }

    #[test]
    fn test_radix_sort_duplicates() {
        let mut data = vec![5u32; 100];
        data.extend(vec![3u32; 50]);
        sort(&mut data);
        assert!(is_sorted(&data));
        assert_eq!(data.iter().filter(|&&x| x == 3).count(), 50);
        assert_eq!(data.iter().filter(|&&x| x == 5).count(), 100);
    }
}
